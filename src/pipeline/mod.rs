//! Reconciliation pipeline.
//!
//! - `diff`: set difference underlying every membership and archival decision
//! - `project`: roster to desired courses
//! - `index`: alias-keyed snapshot of remote courses
//! - `generate`: typed task batches from desired vs. observed state
//! - `retry` / `invoke`: per-kind execution policy and batch execution
//! - `sync`: run orchestration (`run_sync`)

pub mod diff;
pub mod generate;
pub mod index;
pub mod invoke;
pub mod project;
pub mod retry;
pub mod sync;

pub use diff::{SetDiff, diff};
pub use generate::{CourseTasks, EnrolmentTasks, TaskGenerator};
pub use index::RemoteCourseIndex;
pub use invoke::{ExecutionReport, TaskFailure, TaskInvoker};
pub use project::{ProjectedCourse, Projection, Projector};
pub use retry::{ExecutionMode, ExecutionPolicy};
pub use sync::{KindOutcome, Selection, SyncSummary, TaskPlan, render_listing, run_sync};
