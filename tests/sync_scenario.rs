//! End-to-end reconciliation against the in-memory classroom service.

use std::sync::Arc;

use roster_sync::models::{
    ClassGroup, Config, CourseAlias, CourseState, RemoteCourse, Role, Roster, Subject, SyncTask,
    TaskKind,
};
use roster_sync::pipeline::{
    Projector, RemoteCourseIndex, Selection, TaskGenerator, run_sync,
};
use roster_sync::services::{Call, ClassroomService, InMemoryClassroom};
use roster_sync::storage::{ErrorEntry, FileErrorLog, NullErrorSink};

const ADMIN: &str = "classadmin@school.edu";
const YEAR: u16 = 2024;

fn config() -> Config {
    let mut config = Config::default();
    config.sync.academic_year = YEAR;
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
                students: ["s1@school.edu".to_string(), "s2@school.edu".to_string()].into(),
            }],
        }],
    }
}

fn active(alias: &str) -> RemoteCourse {
    RemoteCourse::new(CourseAlias::from_remote(alias), CourseState::Active)
}

#[tokio::test]
async fn new_class_is_created_then_only_missing_student_is_added() {
    let projection = Projector::new(YEAR, ADMIN).project(&roster()).unwrap();
    let service = InMemoryClassroom::new();
    service.insert_course(active("d:SUBJ-0MAT"));

    // First run: the class course does not exist remotely.
    let index = RemoteCourseIndex::build(service.list_courses().await.unwrap());
    let generator = TaskGenerator::new(&projection, &index, YEAR, ADMIN);
    let first = generator.course_tasks();

    assert_eq!(first.create.len(), 1);
    assert_eq!(first.create.tasks()[0].course_id().as_str(), "d:2024-0MATa");

    // Simulated creation, with one of the two students already enrolled.
    service.insert_course(active("d:2024-0MATa"));
    service.insert_member("d:2024-0MATa", Role::Student, "s1@school.edu");

    // Second run against the refreshed snapshot.
    let index = RemoteCourseIndex::build(service.list_courses().await.unwrap());
    let generator = TaskGenerator::new(&projection, &index, YEAR, ADMIN);

    assert!(generator.course_tasks().create.is_empty());

    let students = generator
        .enrolment_tasks(Role::Student, &service, &NullErrorSink)
        .await;
    assert_eq!(
        students.add.tasks(),
        &[SyncTask::AddStudent {
            course_id: CourseAlias::from_remote("d:2024-0MATa"),
            student: "s2@school.edu".into(),
        }]
    );
    assert!(students.remove.is_empty());
}

#[tokio::test]
async fn full_run_archives_dropped_classes_and_records_failures() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("logs/sync-errors.log");

    let service = Arc::new(InMemoryClassroom::new());
    service.insert_course(active("d:SUBJ-0MAT"));
    service.insert_course(active("d:SUBJ-0HIS"));
    service.insert_course(active("d:2024-0HISb"));
    service.insert_course(active("d:2023-0MATa"));
    service.insert_member("d:SUBJ-0MAT", Role::Teacher, "former@school.edu");
    // Every call addressed to the new class course fails.
    service.fail_course("d:2024-0MATa");

    let sink = Arc::new(FileErrorLog::new(&log_path));
    let summary = run_sync(
        &config(),
        &roster(),
        service.clone(),
        sink,
        &Selection::all(),
    )
    .await
    .unwrap();

    // Only the dropped class of this year is archived.
    assert_eq!(summary.generated(TaskKind::ArchiveCourse), 1);
    assert_eq!(
        service.course("d:2024-0HISb").unwrap().course_state,
        CourseState::Archived
    );
    assert_eq!(
        service.course("d:SUBJ-0HIS").unwrap().course_state,
        CourseState::Active
    );
    assert_eq!(
        service.course("d:2023-0MATa").unwrap().course_state,
        CourseState::Active
    );

    // The failing creation was replayed once.
    let creates = service
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::CreateCourse(_)))
        .count();
    assert_eq!(creates, 2);
    let create = summary.outcome(TaskKind::CreateCourse).unwrap();
    assert!(create.report.as_ref().unwrap().retry_exhausted());

    // Teacher sync still ran for the subject course.
    let teachers = service.members("d:SUBJ-0MAT", Role::Teacher);
    assert!(teachers.contains("t1@school.edu"));
    assert!(!teachers.contains("former@school.edu"));

    let content = std::fs::read_to_string(&log_path).unwrap();
    let entries: Vec<ErrorEntry> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(entries.iter().any(|e| e.source == "add-courses"));
    assert!(entries.iter().any(|e| e.source == "list_members"));
    assert!(entries.iter().all(|e| !e.message.is_empty()));
}
