//! Task execution against the remote service.
//!
//! Each task failure is caught, logged with its position in the batch and
//! recorded to the error sink; the batch always runs to completion. A task
//! that succeeds on any pass is settled: errors it raises on a later replay
//! (typically a duplicate create) are logged but neither recorded nor
//! counted as failures.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{CourseAlias, CourseState, InvokerConfig, Role, SyncTask, TaskBatch, TaskKind};
use crate::pipeline::retry::{ExecutionMode, ExecutionPolicy};
use crate::services::ClassroomService;
use crate::storage::{ErrorEntry, ErrorSink};

/// A task that failed on every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskFailure {
    /// Position in the batch (0-based)
    pub index: usize,
    pub course_id: CourseAlias,
    pub message: String,
}

/// Outcome of running one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub kind: TaskKind,
    pub task_count: usize,
    /// Passes run, replays included
    pub passes: u32,
    /// Tasks that never succeeded, as seen on the last pass, ordered by index
    pub failures: Vec<TaskFailure>,
}

impl ExecutionReport {
    fn new(kind: TaskKind, task_count: usize) -> Self {
        Self {
            kind,
            task_count,
            passes: 0,
            failures: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures remain after at least one replay.
    pub fn retry_exhausted(&self) -> bool {
        self.passes > 1 && !self.failures.is_empty()
    }
}

/// Executes task batches under their per-kind policy.
pub struct TaskInvoker {
    service: Arc<dyn ClassroomService>,
    sink: Arc<dyn ErrorSink>,
    config: InvokerConfig,
}

impl TaskInvoker {
    pub fn new(
        service: Arc<dyn ClassroomService>,
        sink: Arc<dyn ErrorSink>,
        config: InvokerConfig,
    ) -> Self {
        Self {
            service,
            sink,
            config,
        }
    }

    /// Run a batch, replaying it in full while failures remain and the
    /// policy allows another pass.
    pub async fn invoke(&self, batch: &TaskBatch) -> ExecutionReport {
        let kind = batch.kind();
        let policy = ExecutionPolicy::for_kind(kind, &self.config);
        let mut report = ExecutionReport::new(kind, batch.len());

        if batch.is_empty() {
            return report;
        }

        let mut settled = vec![false; batch.len()];
        loop {
            report.passes += 1;
            report.failures = self.run_pass(batch, policy.mode, &settled).await;

            settled.iter_mut().for_each(|s| *s = true);
            for failure in &report.failures {
                settled[failure.index] = false;
            }

            if report.failures.is_empty() || report.passes >= policy.max_passes() {
                break;
            }
            log::warn!(
                "{} of {} {} tasks failed, replaying batch (pass {}/{})",
                report.failures.len(),
                batch.len(),
                kind,
                report.passes + 1,
                policy.max_passes()
            );
        }

        if report.retry_exhausted() {
            let err = AppError::RetryExhausted {
                kind: kind.to_string(),
                failures: report.failures.len(),
            };
            log::error!("{err}");
            self.sink
                .record(&ErrorEntry::new("invoke", kind.flag(), err.to_string()))
                .await;
        }

        report
    }

    async fn run_pass(
        &self,
        batch: &TaskBatch,
        mode: ExecutionMode,
        settled: &[bool],
    ) -> Vec<TaskFailure> {
        let total = batch.len();
        let tasks = batch.tasks().iter().enumerate();

        match mode {
            ExecutionMode::Sequential => {
                let mut failures = Vec::new();
                for (index, task) in tasks {
                    if let Some(failure) = self.run_task(index, total, task, settled[index]).await {
                        failures.push(failure);
                    }
                }
                failures
            }
            ExecutionMode::Concurrent { limit } => {
                let mut failures: Vec<TaskFailure> = stream::iter(tasks)
                    .map(|(index, task)| self.run_task(index, total, task, settled[index]))
                    .buffer_unordered(limit)
                    .filter_map(future::ready)
                    .collect()
                    .await;
                failures.sort_by_key(|f| f.index);
                failures
            }
        }
    }

    async fn run_task(
        &self,
        index: usize,
        total: usize,
        task: &SyncTask,
        settled: bool,
    ) -> Option<TaskFailure> {
        match self.dispatch(task).await {
            Ok(()) => {
                log::debug!("[{}/{}] {}", index + 1, total, task);
                None
            }
            Err(e) if settled => {
                log::info!(
                    "[{}/{}] {} already applied on an earlier pass: {}",
                    index + 1,
                    total,
                    task,
                    e.detail()
                );
                None
            }
            Err(e) => {
                let message = e.detail();
                log::error!(
                    "[{}/{}] {} {}: {}",
                    index + 1,
                    total,
                    task.kind(),
                    task.course_id(),
                    message
                );
                let context = format!("{} ({}/{})", task.course_id(), index + 1, total);
                self.sink
                    .record(&ErrorEntry::new(task.kind().flag(), context, message.clone()))
                    .await;

                Some(TaskFailure {
                    index,
                    course_id: task.course_id().clone(),
                    message,
                })
            }
        }
    }

    async fn dispatch(&self, task: &SyncTask) -> Result<()> {
        match task {
            SyncTask::CreateCourse { attributes } => self.service.create_course(attributes).await,
            SyncTask::UpdateCourse { attributes } => self.service.update_course(attributes).await,
            SyncTask::AddTeacher { course_id, teacher } => {
                self.service.add_member(course_id, Role::Teacher, teacher).await
            }
            SyncTask::RemoveTeacher { course_id, teacher } => {
                self.service
                    .remove_member(course_id, Role::Teacher, teacher)
                    .await
            }
            SyncTask::AddStudent { course_id, student } => {
                self.service.add_member(course_id, Role::Student, student).await
            }
            SyncTask::RemoveStudent { course_id, student } => {
                self.service
                    .remove_member(course_id, Role::Student, student)
                    .await
            }
            SyncTask::ArchiveCourse { course_id } => {
                self.service
                    .set_course_state(course_id, CourseState::Archived)
                    .await
            }
        }
    }
}
