//! Sync run orchestration.
//!
//! Projects the roster, indexes remote courses once, then walks the selected
//! task kinds in canonical order: each batch is generated on its turn and
//! either listed (dry run) or handed to the invoker.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Config, Role, Roster, TaskBatch, TaskKind};
use crate::pipeline::generate::{CourseTasks, EnrolmentTasks, TaskGenerator};
use crate::pipeline::index::RemoteCourseIndex;
use crate::pipeline::invoke::{ExecutionReport, TaskInvoker};
use crate::pipeline::project::Projector;
use crate::services::ClassroomService;
use crate::storage::ErrorSink;
use crate::utils::log as console;

/// Task kinds chosen for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    kinds: BTreeSet<TaskKind>,
    show_tasks_only: bool,
}

impl Selection {
    /// Build a selection from individual kinds and the `all-tasks` switch.
    ///
    /// Listing every task (`all-tasks` with `show-tasks-only`) and an empty
    /// selection are both rejected.
    pub fn new(
        kinds: impl IntoIterator<Item = TaskKind>,
        all_tasks: bool,
        show_tasks_only: bool,
    ) -> Result<Self> {
        if all_tasks && show_tasks_only {
            return Err(AppError::validation(
                "show-tasks-only cannot be combined with all-tasks",
            ));
        }

        let kinds: BTreeSet<TaskKind> = if all_tasks {
            TaskKind::ALL.into_iter().collect()
        } else {
            kinds.into_iter().collect()
        };
        if kinds.is_empty() {
            let flags: Vec<String> = TaskKind::ALL
                .iter()
                .map(|k| format!("--{}", k.flag()))
                .collect();
            return Err(AppError::validation(format!(
                "no task category selected (use {} or --all-tasks)",
                flags.join(", ")
            )));
        }

        Ok(Self {
            kinds,
            show_tasks_only,
        })
    }

    /// Every kind, executed.
    pub fn all() -> Self {
        Self {
            kinds: TaskKind::ALL.into_iter().collect(),
            show_tasks_only: false,
        }
    }

    /// Selected kinds in run order.
    pub fn kinds(&self) -> impl Iterator<Item = TaskKind> + '_ {
        TaskKind::ALL
            .into_iter()
            .filter(|kind| self.kinds.contains(kind))
    }

    pub fn contains(&self, kind: TaskKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn show_tasks_only(&self) -> bool {
        self.show_tasks_only
    }
}

/// Batches generated once per run, keyed by kind.
///
/// Course and archive batches come from the index alone. Enrolment batches
/// fetch live membership, so both batches of a role are produced by a single
/// fetch and only when first requested.
pub struct TaskPlan<'a> {
    generator: TaskGenerator<'a>,
    service: &'a dyn ClassroomService,
    sink: &'a dyn ErrorSink,
    courses: Option<CourseTasks>,
    archive: Option<TaskBatch>,
    teachers: Option<EnrolmentTasks>,
    students: Option<EnrolmentTasks>,
}

impl<'a> TaskPlan<'a> {
    pub fn new(
        generator: TaskGenerator<'a>,
        service: &'a dyn ClassroomService,
        sink: &'a dyn ErrorSink,
    ) -> Self {
        Self {
            generator,
            service,
            sink,
            courses: None,
            archive: None,
            teachers: None,
            students: None,
        }
    }

    /// The batch for `kind`, generating it on first request.
    pub async fn batch(&mut self, kind: TaskKind) -> &TaskBatch {
        match kind {
            TaskKind::CreateCourse => &self.course_tasks().create,
            TaskKind::UpdateCourse => &self.course_tasks().update,
            TaskKind::AddTeacher => &self.enrolments(Role::Teacher).await.add,
            TaskKind::RemoveTeacher => &self.enrolments(Role::Teacher).await.remove,
            TaskKind::AddStudent => &self.enrolments(Role::Student).await.add,
            TaskKind::RemoveStudent => &self.enrolments(Role::Student).await.remove,
            TaskKind::ArchiveCourse => {
                let generator = &self.generator;
                self.archive.get_or_insert_with(|| generator.archive_tasks())
            }
        }
    }

    fn course_tasks(&mut self) -> &CourseTasks {
        let generator = &self.generator;
        self.courses.get_or_insert_with(|| generator.course_tasks())
    }

    async fn enrolments(&mut self, role: Role) -> &EnrolmentTasks {
        let slot = match role {
            Role::Teacher => &mut self.teachers,
            Role::Student => &mut self.students,
        };
        let tasks = match slot.take() {
            Some(tasks) => tasks,
            None => {
                self.generator
                    .enrolment_tasks(role, self.service, self.sink)
                    .await
            }
        };
        slot.insert(tasks)
    }
}

/// Per-kind result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindOutcome {
    pub kind: TaskKind,
    pub generated: usize,
    /// Absent for dry runs
    pub report: Option<ExecutionReport>,
}

/// Result of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub dry_run: bool,
    pub desired_courses: usize,
    pub remote_courses: usize,
    pub outcomes: Vec<KindOutcome>,
}

impl SyncSummary {
    pub fn generated(&self, kind: TaskKind) -> usize {
        self.outcome(kind).map_or(0, |o| o.generated)
    }

    pub fn outcome(&self, kind: TaskKind) -> Option<&KindOutcome> {
        self.outcomes.iter().find(|o| o.kind == kind)
    }

    pub fn total_generated(&self) -> usize {
        self.outcomes.iter().map(|o| o.generated).sum()
    }

    /// Tasks still failing after their batch's final pass.
    pub fn total_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.report.as_ref())
            .map(|r| r.failures.len())
            .sum()
    }
}

/// Render a batch as the dry-run listing.
pub fn render_listing(batch: &TaskBatch) -> Result<String> {
    let json = serde_json::to_string_pretty(batch.tasks())?;
    Ok(format!("{json}\n[ {} tasks were generated ]", batch.len()))
}

/// Run one reconciliation pass.
///
/// Fails only on malformed roster input or when the remote course list
/// cannot be fetched. Individual task failures are logged, recorded to
/// `sink` and reported in the summary.
pub async fn run_sync(
    config: &Config,
    roster: &Roster,
    service: Arc<dyn ClassroomService>,
    sink: Arc<dyn ErrorSink>,
    selection: &Selection,
) -> Result<SyncSummary> {
    const TOTAL_STEPS: usize = 3;
    let sync = &config.sync;

    console::header(&format!(
        "Roster Sync {} ({})",
        sync.academic_year,
        if selection.show_tasks_only() {
            "dry run"
        } else {
            "live"
        }
    ));

    // Step 1: Desired state
    console::step(1, TOTAL_STEPS, "Projecting roster");
    let projection = Projector::from_config(sync).project(roster)?;
    console::sub_item(&format!(
        "{} subject courses, {} class courses",
        projection.subject_courses.len(),
        projection.class_courses.len()
    ));

    // Step 2: Remote snapshot
    console::step(2, TOTAL_STEPS, "Indexing remote courses");
    let index = RemoteCourseIndex::build(service.list_courses().await?);
    if index.is_empty() {
        log::warn!("Remote listing returned no courses; every projected course will be created");
    }
    console::sub_item(&format!("{} remote courses", index.len()));

    // Step 3: Generate and run
    console::step(3, TOTAL_STEPS, "Generating tasks");
    let generator = TaskGenerator::new(&projection, &index, sync.academic_year, &sync.class_admin)
        .with_concurrency(config.invoker.max_concurrent);
    let mut plan = TaskPlan::new(generator, service.as_ref(), sink.as_ref());
    let invoker = TaskInvoker::new(Arc::clone(&service), Arc::clone(&sink), config.invoker.clone());

    let mut summary = SyncSummary {
        dry_run: selection.show_tasks_only(),
        desired_courses: projection.course_count(),
        remote_courses: index.len(),
        outcomes: Vec::new(),
    };

    for kind in selection.kinds() {
        let batch = plan.batch(kind).await;
        console::sub_item(&format!("{}: {} tasks", kind.title(), batch.len()));

        let report = if selection.show_tasks_only() {
            println!("{}", render_listing(batch)?);
            None
        } else if batch.is_empty() {
            None
        } else {
            let report = invoker.invoke(batch).await;
            if !report.succeeded() {
                console::warn(&format!(
                    "{}: {} of {} tasks failed",
                    kind.title(),
                    report.failures.len(),
                    report.task_count
                ));
            }
            Some(report)
        };

        summary.outcomes.push(KindOutcome {
            kind,
            generated: batch.len(),
            report,
        });
    }

    log::info!(
        "Sync finished: {} tasks generated, {} failing",
        summary.total_generated(),
        summary.total_failures()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ClassGroup, CourseAlias, CourseState, RemoteCourse, Subject, SyncTask,
    };
    use crate::services::{Call, InMemoryClassroom};
    use crate::storage::NullErrorSink;

    const ADMIN: &str = "classadmin@school.edu";

    fn config() -> Config {
        let mut config = Config::default();
        config.sync.academic_year = 2024;
        config.sync.class_admin = ADMIN.into();
        config
    }

    fn roster() -> Roster {
        Roster {
            subjects: vec![Subject {
                code: "10MAT".into(),
                name: "Mathematics".into(),
                faculty: "Maths".into(),
                teachers: ["t1@school.edu".to_string()].into(),
                classes: vec![ClassGroup {
                    code: "10MATa".into(),
                    students: ["s1@school.edu".to_string()].into(),
                }],
            }],
        }
    }

    fn seeded() -> Arc<InMemoryClassroom> {
        let service = Arc::new(InMemoryClassroom::new());
        for alias in ["d:SUBJ-0MAT", "d:2024-0MATa"] {
            service.insert_course(RemoteCourse::new(
                CourseAlias::from_remote(alias),
                CourseState::Active,
            ));
        }
        service
    }

    #[test]
    fn test_selection_rejects_show_only_with_all_tasks() {
        let none: [TaskKind; 0] = [];
        assert!(Selection::new(none, true, true).is_err());
        assert!(Selection::new(none, false, false).is_err());
        assert!(Selection::new([TaskKind::AddStudent], false, true).is_ok());
    }

    #[test]
    fn test_selection_runs_in_canonical_order() {
        let selection = Selection::new(
            [TaskKind::ArchiveCourse, TaskKind::AddStudent, TaskKind::CreateCourse],
            false,
            false,
        )
        .unwrap();
        let kinds: Vec<TaskKind> = selection.kinds().collect();
        assert_eq!(
            kinds,
            vec![TaskKind::CreateCourse, TaskKind::AddStudent, TaskKind::ArchiveCourse]
        );
        assert_eq!(Selection::all().kinds().count(), 7);
    }

    #[tokio::test]
    async fn test_teacher_membership_is_fetched_once() {
        let service = seeded();
        let selection =
            Selection::new([TaskKind::AddTeacher, TaskKind::RemoveTeacher], false, true).unwrap();

        let summary = run_sync(
            &config(),
            &roster(),
            service.clone(),
            Arc::new(NullErrorSink),
            &selection,
        )
        .await
        .unwrap();

        let listings = service
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ListMembers(_, Role::Teacher)))
            .count();
        assert_eq!(listings, 2);
        assert_eq!(summary.generated(TaskKind::AddTeacher), 2);
        assert_eq!(summary.generated(TaskKind::RemoveTeacher), 0);
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_mutating_calls() {
        let service = Arc::new(InMemoryClassroom::new());
        let selection = Selection::new([TaskKind::CreateCourse], false, true).unwrap();

        let summary = run_sync(
            &config(),
            &roster(),
            service.clone(),
            Arc::new(NullErrorSink),
            &selection,
        )
        .await
        .unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.generated(TaskKind::CreateCourse), 2);
        assert!(summary.outcome(TaskKind::CreateCourse).unwrap().report.is_none());
        assert_eq!(service.calls(), vec![Call::ListCourses]);
    }

    #[tokio::test]
    async fn test_live_run_converges() {
        let service = Arc::new(InMemoryClassroom::new());
        let summary = run_sync(
            &config(),
            &roster(),
            service.clone(),
            Arc::new(NullErrorSink),
            &Selection::all(),
        )
        .await
        .unwrap();

        assert_eq!(summary.total_failures(), 0);
        assert_eq!(summary.generated(TaskKind::CreateCourse), 2);
        assert!(service.members("d:2024-0MATa", Role::Student).contains("s1@school.edu"));
        assert!(service.members("d:SUBJ-0MAT", Role::Teacher).contains("t1@school.edu"));
        // Created courses are owned by the admin, who is never removed.
        assert!(service.members("d:SUBJ-0MAT", Role::Teacher).contains(ADMIN));

        let rerun = run_sync(
            &config(),
            &roster(),
            service.clone(),
            Arc::new(NullErrorSink),
            &Selection::all(),
        )
        .await
        .unwrap();
        assert_eq!(rerun.generated(TaskKind::CreateCourse), 0);
        assert_eq!(rerun.generated(TaskKind::UpdateCourse), 2);
        assert_eq!(rerun.generated(TaskKind::AddTeacher), 0);
        assert_eq!(rerun.generated(TaskKind::AddStudent), 0);
        assert_eq!(rerun.generated(TaskKind::ArchiveCourse), 0);
    }

    #[tokio::test]
    async fn test_malformed_roster_aborts_before_remote_calls() {
        let service = Arc::new(InMemoryClassroom::new());
        let mut roster = roster();
        roster.subjects[0].name.clear();

        let result = run_sync(
            &config(),
            &roster,
            service.clone(),
            Arc::new(NullErrorSink),
            &Selection::all(),
        )
        .await;

        assert!(matches!(result, Err(AppError::MalformedRoster { .. })));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn test_render_listing() {
        let mut batch = TaskBatch::new(TaskKind::ArchiveCourse);
        batch.push(SyncTask::ArchiveCourse {
            course_id: CourseAlias::from_remote("d:2024-0OLDa"),
        });
        let listing = render_listing(&batch).unwrap();
        assert!(listing.contains("\"type\": \"archiveCourse\""));
        assert!(listing.contains("\"courseId\": \"d:2024-0OLDa\""));
        assert!(listing.ends_with("[ 1 tasks were generated ]"));
    }
}
