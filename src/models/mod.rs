// src/models/mod.rs

//! Domain models for the sync engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod course;
mod roster;
mod task;

// Re-export all public types
pub use config::{
    ACCESS_TOKEN_ENV, ClassroomConfig, Config, InvokerConfig, LoggingConfig, SyncConfig,
};
pub use course::{CourseAlias, CourseAttributes, CourseState, RemoteCourse, code_tail};
pub use roster::{ClassGroup, Roster, Subject};
pub use task::{Role, SyncTask, TaskBatch, TaskKind};
