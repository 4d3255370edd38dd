// src/lib.rs

//! Roster Sync Library
//!
//! Reconciles a timetabled roster with courses on a remote classroom
//! service: projects desired courses, diffs them against remote state and
//! runs the resulting task batches.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
