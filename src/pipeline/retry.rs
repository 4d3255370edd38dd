//! Per-kind execution policy for task batches.
//!
//! Creation runs sequentially so each alias exists before the next task
//! starts, and a failing creation pass is replayed in full. Every other kind
//! fans out concurrently under a ceiling and is not replayed by default.

use crate::models::{InvokerConfig, TaskKind};

/// How the tasks of one pass are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One task at a time, in generation order.
    Sequential,
    /// Up to `limit` tasks in flight, completion order unspecified.
    Concurrent { limit: usize },
}

/// Scheduling and bounded replay for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    pub mode: ExecutionMode,
    /// Full passes allowed after the first one fails.
    pub max_replays: u32,
}

impl ExecutionPolicy {
    /// Resolve the policy for a task kind from invoker settings.
    pub fn for_kind(kind: TaskKind, config: &InvokerConfig) -> Self {
        match kind {
            TaskKind::CreateCourse => Self {
                mode: ExecutionMode::Sequential,
                max_replays: config.create_replays,
            },
            _ => Self {
                mode: ExecutionMode::Concurrent {
                    limit: concurrency_limit(config.max_concurrent),
                },
                max_replays: config.other_replays,
            },
        }
    }

    /// Maximum number of passes, the first one included.
    pub fn max_passes(&self) -> u32 {
        self.max_replays.saturating_add(1)
    }
}

/// Map a configured ceiling to a stream buffer size (0 = unbounded).
fn concurrency_limit(max_concurrent: usize) -> usize {
    if max_concurrent == 0 {
        usize::MAX
    } else {
        max_concurrent
    }
}
