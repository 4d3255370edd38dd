//! Sync task generation.
//!
//! Compares the desired projection against the remote index (courses,
//! archival) or live membership (enrolments) and emits typed task batches.
//! Generation never mutates its inputs, so running it twice against the same
//! inputs yields the same batches.

use futures::stream::{self, StreamExt};

use crate::models::{Role, SyncTask, TaskBatch, TaskKind};
use crate::pipeline::diff::diff;
use crate::pipeline::index::RemoteCourseIndex;
use crate::pipeline::project::{ProjectedCourse, Projection};
use crate::services::ClassroomService;
use crate::storage::{ErrorEntry, ErrorSink};

/// Creation and update batches for every desired course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseTasks {
    pub create: TaskBatch,
    pub update: TaskBatch,
}

/// Enrolment and removal batches for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrolmentTasks {
    pub add: TaskBatch,
    pub remove: TaskBatch,
}

/// Derives task batches from desired and observed state.
pub struct TaskGenerator<'a> {
    projection: &'a Projection,
    index: &'a RemoteCourseIndex,
    academic_year: u16,
    class_admin: &'a str,
    concurrency: usize,
}

impl<'a> TaskGenerator<'a> {
    pub fn new(
        projection: &'a Projection,
        index: &'a RemoteCourseIndex,
        academic_year: u16,
        class_admin: &'a str,
    ) -> Self {
        Self {
            projection,
            index,
            academic_year,
            class_admin,
            concurrency: usize::MAX,
        }
    }

    /// Bound the number of concurrent membership listings (0 = unbounded).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = if concurrency == 0 {
            usize::MAX
        } else {
            concurrency
        };
        self
    }

    /// Create courses missing from the index, update every course present.
    ///
    /// Updates are unconditional: no attribute-level comparison is made.
    pub fn course_tasks(&self) -> CourseTasks {
        let mut tasks = CourseTasks {
            create: TaskBatch::new(TaskKind::CreateCourse),
            update: TaskBatch::new(TaskKind::UpdateCourse),
        };

        for course in self.projection.courses() {
            if self.index.contains(course.alias()) {
                tasks.update.push(SyncTask::UpdateCourse {
                    attributes: course.attributes.without_owner(),
                });
            } else {
                tasks.create.push(SyncTask::CreateCourse {
                    attributes: course.attributes.clone(),
                });
            }
        }

        log::info!(
            "Generated {} course creation and {} course update tasks",
            tasks.create.len(),
            tasks.update.len()
        );
        tasks
    }

    /// Archive ACTIVE class courses of the period that are no longer timetabled.
    ///
    /// Subject courses are never archived.
    pub fn archive_tasks(&self) -> TaskBatch {
        let active = self.index.active_class_aliases(self.academic_year);
        let timetabled = self.projection.class_aliases();
        let result = diff(timetabled, active);

        let mut batch = TaskBatch::new(TaskKind::ArchiveCourse);
        batch.extend(
            result
                .to_remove
                .into_iter()
                .map(|course_id| SyncTask::ArchiveCourse { course_id }),
        );

        log::info!("Generated {} course archive tasks", batch.len());
        batch
    }

    /// Diff desired membership against live remote membership for `role`.
    ///
    /// Membership is fetched fresh, one listing per course. A course whose
    /// listing fails is logged and skipped; no task is emitted for it.
    pub async fn enrolment_tasks(
        &self,
        role: Role,
        service: &dyn ClassroomService,
        sink: &dyn ErrorSink,
    ) -> EnrolmentTasks {
        let courses: Vec<&ProjectedCourse> = match role {
            Role::Teacher => self.projection.courses().collect(),
            Role::Student => self.projection.class_courses.iter().collect(),
        };
        let total = courses.len();

        log::info!("Fetching current {} enrolments for {} courses", role, total);

        let fetched: Vec<_> = stream::iter(courses.into_iter().enumerate())
            .map(|(index, course)| async move {
                let result = service.list_members(course.alias(), role).await;
                (index, course, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let (add_kind, remove_kind) = match role {
            Role::Teacher => (TaskKind::AddTeacher, TaskKind::RemoveTeacher),
            Role::Student => (TaskKind::AddStudent, TaskKind::RemoveStudent),
        };
        let mut tasks = EnrolmentTasks {
            add: TaskBatch::new(add_kind),
            remove: TaskBatch::new(remove_kind),
        };

        for (index, course, result) in fetched {
            let remote = match result {
                Ok(members) => members,
                Err(e) => {
                    let context = format!("{} ({}/{})", course.alias(), index + 1, total);
                    log::error!("list_members {}: {}", context, e.detail());
                    sink.record(&ErrorEntry::new("list_members", context, e.detail()))
                        .await;
                    continue;
                }
            };

            let result = diff(course.members(role).iter().cloned(), remote);

            tasks.add.extend(
                result
                    .to_add
                    .into_iter()
                    .map(|member| SyncTask::enrol(role, course.alias().clone(), member)),
            );
            tasks.remove.extend(
                result
                    .to_remove
                    .into_iter()
                    .filter(|member| !(role == Role::Teacher && member == self.class_admin))
                    .map(|member| SyncTask::unenrol(role, course.alias().clone(), member)),
            );
        }

        log::info!(
            "Generated {} {} enrolment and {} {} removal tasks",
            tasks.add.len(),
            role,
            tasks.remove.len(),
            role
        );
        tasks
    }
}
