// src/models/task.rs

//! Sync task records and batches.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use super::course::{CourseAlias, CourseAttributes};

/// Membership role within a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
}

impl Role {
    /// Collection name used by the remote API (`teachers` / `students`).
    pub fn collection(&self) -> &'static str {
        match self {
            Role::Teacher => "teachers",
            Role::Student => "students",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Teacher => f.write_str("teacher"),
            Role::Student => f.write_str("student"),
        }
    }
}

/// Kind of sync task. Each kind is also a selectable task category.
///
/// Serialised as its command-line flag, so reports, error log sources and
/// console output all name a category the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    CreateCourse,
    UpdateCourse,
    AddTeacher,
    RemoveTeacher,
    AddStudent,
    RemoveStudent,
    ArchiveCourse,
}

impl TaskKind {
    /// Every kind, in the order batches are run.
    ///
    /// Creation comes first so later categories can address new aliases.
    pub const ALL: [TaskKind; 7] = [
        TaskKind::CreateCourse,
        TaskKind::UpdateCourse,
        TaskKind::AddTeacher,
        TaskKind::RemoveTeacher,
        TaskKind::AddStudent,
        TaskKind::RemoveStudent,
        TaskKind::ArchiveCourse,
    ];

    /// Command-line flag selecting this category.
    pub fn flag(&self) -> &'static str {
        match self {
            TaskKind::CreateCourse => "add-courses",
            TaskKind::UpdateCourse => "update-courses",
            TaskKind::AddTeacher => "add-teachers",
            TaskKind::RemoveTeacher => "remove-teachers",
            TaskKind::AddStudent => "add-students",
            TaskKind::RemoveStudent => "remove-students",
            TaskKind::ArchiveCourse => "archive-courses",
        }
    }

    /// Human-readable batch title for console output.
    pub fn title(&self) -> &'static str {
        match self {
            TaskKind::CreateCourse => "Course Creation",
            TaskKind::UpdateCourse => "Course Attribute Update",
            TaskKind::AddTeacher => "Teacher Course Enrolment",
            TaskKind::RemoveTeacher => "Teacher Course Removal",
            TaskKind::AddStudent => "Student Course Enrolment",
            TaskKind::RemoveStudent => "Student Course Removal",
            TaskKind::ArchiveCourse => "Course Archival",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

impl Serialize for TaskKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.flag())
    }
}

impl<'de> Deserialize<'de> for TaskKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flag = String::deserialize(deserializer)?;
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.flag() == flag)
            .ok_or_else(|| de::Error::custom(format!("unknown task kind `{flag}`")))
    }
}

/// One atomic mutation intent directed at the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncTask {
    CreateCourse {
        #[serde(rename = "courseAttributes")]
        attributes: CourseAttributes,
    },
    UpdateCourse {
        #[serde(rename = "courseAttributes")]
        attributes: CourseAttributes,
    },
    AddTeacher {
        #[serde(rename = "courseId")]
        course_id: CourseAlias,
        teacher: String,
    },
    RemoveTeacher {
        #[serde(rename = "courseId")]
        course_id: CourseAlias,
        teacher: String,
    },
    AddStudent {
        #[serde(rename = "courseId")]
        course_id: CourseAlias,
        student: String,
    },
    RemoveStudent {
        #[serde(rename = "courseId")]
        course_id: CourseAlias,
        student: String,
    },
    ArchiveCourse {
        #[serde(rename = "courseId")]
        course_id: CourseAlias,
    },
}

impl SyncTask {
    /// Enrolment task adding `member` to `course_id` in `role`.
    pub fn enrol(role: Role, course_id: CourseAlias, member: String) -> Self {
        match role {
            Role::Teacher => SyncTask::AddTeacher {
                course_id,
                teacher: member,
            },
            Role::Student => SyncTask::AddStudent {
                course_id,
                student: member,
            },
        }
    }

    /// Removal task taking `member` out of `course_id` in `role`.
    pub fn unenrol(role: Role, course_id: CourseAlias, member: String) -> Self {
        match role {
            Role::Teacher => SyncTask::RemoveTeacher {
                course_id,
                teacher: member,
            },
            Role::Student => SyncTask::RemoveStudent {
                course_id,
                student: member,
            },
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            SyncTask::CreateCourse { .. } => TaskKind::CreateCourse,
            SyncTask::UpdateCourse { .. } => TaskKind::UpdateCourse,
            SyncTask::AddTeacher { .. } => TaskKind::AddTeacher,
            SyncTask::RemoveTeacher { .. } => TaskKind::RemoveTeacher,
            SyncTask::AddStudent { .. } => TaskKind::AddStudent,
            SyncTask::RemoveStudent { .. } => TaskKind::RemoveStudent,
            SyncTask::ArchiveCourse { .. } => TaskKind::ArchiveCourse,
        }
    }

    /// Alias of the course this task addresses.
    pub fn course_id(&self) -> &CourseAlias {
        match self {
            SyncTask::CreateCourse { attributes } | SyncTask::UpdateCourse { attributes } => {
                &attributes.id
            }
            SyncTask::AddTeacher { course_id, .. }
            | SyncTask::RemoveTeacher { course_id, .. }
            | SyncTask::AddStudent { course_id, .. }
            | SyncTask::RemoveStudent { course_id, .. }
            | SyncTask::ArchiveCourse { course_id } => course_id,
        }
    }
}

impl fmt::Display for SyncTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncTask::CreateCourse { attributes } => write!(f, "create {}", attributes.id),
            SyncTask::UpdateCourse { attributes } => write!(f, "update {}", attributes.id),
            SyncTask::AddTeacher { course_id, teacher } => {
                write!(f, "add teacher {teacher} to {course_id}")
            }
            SyncTask::RemoveTeacher { course_id, teacher } => {
                write!(f, "remove teacher {teacher} from {course_id}")
            }
            SyncTask::AddStudent { course_id, student } => {
                write!(f, "add student {student} to {course_id}")
            }
            SyncTask::RemoveStudent { course_id, student } => {
                write!(f, "remove student {student} from {course_id}")
            }
            SyncTask::ArchiveCourse { course_id } => write!(f, "archive {course_id}"),
        }
    }
}

/// Ordered sequence of tasks of a single kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskBatch {
    kind: TaskKind,
    tasks: Vec<SyncTask>,
}

impl TaskBatch {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            tasks: Vec::new(),
        }
    }

    /// Append a task; tasks of another kind are rejected.
    pub fn push(&mut self, task: SyncTask) -> bool {
        if task.kind() != self.kind {
            log::warn!("Dropping {} task from {} batch", task.kind(), self.kind);
            return false;
        }
        self.tasks.push(task);
        true
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn tasks(&self) -> &[SyncTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Extend<SyncTask> for TaskBatch {
    fn extend<I: IntoIterator<Item = SyncTask>>(&mut self, iter: I) {
        for task in iter {
            self.push(task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_rejects_foreign_kind() {
        let mut batch = TaskBatch::new(TaskKind::ArchiveCourse);
        let alias = CourseAlias::class(2024, "10MATa");
        assert!(batch.push(SyncTask::ArchiveCourse {
            course_id: alias.clone()
        }));
        assert!(!batch.push(SyncTask::enrol(Role::Student, alias, "s1".into())));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_task_listing_shape() {
        let task = SyncTask::enrol(
            Role::Teacher,
            CourseAlias::subject("10MAT"),
            "t1@school.edu".into(),
        );
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "addTeacher");
        assert_eq!(json["courseId"], "d:SUBJ-0MAT");
        assert_eq!(json["teacher"], "t1@school.edu");
    }

    #[test]
    fn test_kinds_run_creation_first() {
        assert_eq!(TaskKind::ALL[0], TaskKind::CreateCourse);
        assert_eq!(TaskKind::ALL[6], TaskKind::ArchiveCourse);
    }

    #[test]
    fn test_kind_serializes_as_flag() {
        for kind in TaskKind::ALL {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.flag());
            assert_eq!(serde_json::from_value::<TaskKind>(json).unwrap(), kind);
        }

        let batch = TaskBatch::new(TaskKind::CreateCourse);
        assert_eq!(serde_json::to_value(&batch).unwrap()["kind"], "add-courses");
        assert!(serde_json::from_str::<TaskKind>("\"create-course\"").is_err());
    }
}
