//! Desired-state projection.
//!
//! Turns the roster into the course aliases and attribute snapshots the
//! remote service expects. The name, section and description templates are
//! matched against courses created by earlier runs, so they must stay
//! byte-for-byte stable.

use std::collections::{BTreeSet, HashSet};

use crate::error::{AppError, Result};
use crate::models::{
    ClassGroup, CourseAlias, CourseAttributes, CourseState, Role, Roster, Subject, SyncConfig,
    code_tail,
};

/// A desired course with its desired membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedCourse {
    pub attributes: CourseAttributes,
    pub teachers: BTreeSet<String>,
    pub students: BTreeSet<String>,
}

impl ProjectedCourse {
    pub fn alias(&self) -> &CourseAlias {
        &self.attributes.id
    }

    /// Desired members for a role.
    pub fn members(&self, role: Role) -> &BTreeSet<String> {
        match role {
            Role::Teacher => &self.teachers,
            Role::Student => &self.students,
        }
    }
}

/// Desired state for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub subject_courses: Vec<ProjectedCourse>,
    pub class_courses: Vec<ProjectedCourse>,
}

impl Projection {
    /// Subject courses followed by class courses, in roster order.
    pub fn courses(&self) -> impl Iterator<Item = &ProjectedCourse> {
        self.subject_courses.iter().chain(self.class_courses.iter())
    }

    /// Aliases of every timetabled class course.
    pub fn class_aliases(&self) -> BTreeSet<CourseAlias> {
        self.class_courses.iter().map(|c| c.alias().clone()).collect()
    }

    pub fn course_count(&self) -> usize {
        self.subject_courses.len() + self.class_courses.len()
    }
}

/// Projects a roster for a given academic year and class administrator.
#[derive(Debug, Clone)]
pub struct Projector {
    academic_year: u16,
    class_admin: String,
}

impl Projector {
    pub fn new(academic_year: u16, class_admin: impl Into<String>) -> Self {
        Self {
            academic_year,
            class_admin: class_admin.into(),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.academic_year, config.class_admin.clone())
    }

    /// Project the whole roster. Any malformed record fails the projection.
    ///
    /// Codes are trimmed once; validation, aliases and names all see the
    /// trimmed code.
    pub fn project(&self, roster: &Roster) -> Result<Projection> {
        let mut projection = Projection::default();
        let mut seen = HashSet::new();

        for (index, subject) in roster.subjects.iter().enumerate() {
            let subject_code = subject.code.trim();
            Self::check_subject(index, subject_code, subject)?;

            let subject_course = self.subject_course(subject_code, subject);
            Self::claim_alias(&mut seen, subject_course.alias(), subject_code)?;
            projection.subject_courses.push(subject_course);

            for class in &subject.classes {
                let class_code = class.code.trim();
                Self::check_class(subject_code, class_code)?;

                let class_course = self.class_course(subject, class_code, class);
                Self::claim_alias(&mut seen, class_course.alias(), class_code)?;
                projection.class_courses.push(class_course);
            }
        }

        log::debug!(
            "Projected {} subject courses and {} class courses",
            projection.subject_courses.len(),
            projection.class_courses.len()
        );
        Ok(projection)
    }

    fn subject_course(&self, code: &str, subject: &Subject) -> ProjectedCourse {
        ProjectedCourse {
            attributes: CourseAttributes {
                id: CourseAlias::subject(code),
                owner_id: Some(self.class_admin.clone()),
                name: format!("{} (Teachers)", code_tail(code)),
                section: subject.name.clone(),
                description: description(subject),
                description_heading: description_heading(subject),
                course_state: CourseState::Active,
            },
            teachers: subject.teachers.clone(),
            students: BTreeSet::new(),
        }
    }

    fn class_course(&self, subject: &Subject, code: &str, class: &ClassGroup) -> ProjectedCourse {
        ProjectedCourse {
            attributes: CourseAttributes {
                id: CourseAlias::class(self.academic_year, code),
                owner_id: Some(self.class_admin.clone()),
                name: code.to_string(),
                section: subject.name.clone(),
                description: description(subject),
                description_heading: description_heading(subject),
                course_state: CourseState::Active,
            },
            teachers: subject.teachers.clone(),
            students: class.students.clone(),
        }
    }

    fn check_subject(index: usize, code: &str, subject: &Subject) -> Result<()> {
        let record = if code.is_empty() {
            format!("subject #{}", index + 1)
        } else {
            format!("subject {code}")
        };
        if code_tail(code).is_empty() {
            return Err(AppError::malformed(record, "code must have at least two characters"));
        }
        if subject.name.trim().is_empty() {
            return Err(AppError::malformed(record, "name is missing"));
        }
        Ok(())
    }

    fn check_class(subject_code: &str, code: &str) -> Result<()> {
        if code_tail(code).is_empty() {
            return Err(AppError::malformed(
                format!("class of subject {subject_code}"),
                "code must have at least two characters",
            ));
        }
        Ok(())
    }

    fn claim_alias(seen: &mut HashSet<CourseAlias>, alias: &CourseAlias, code: &str) -> Result<()> {
        if !seen.insert(alias.clone()) {
            return Err(AppError::malformed(
                code,
                format!("alias {alias} is already used by another record"),
            ));
        }
        Ok(())
    }
}

fn description(subject: &Subject) -> String {
    format!("Domain: {} - {}", subject.faculty, subject.name)
}

fn description_heading(subject: &Subject) -> String {
    format!("Subject Domain: {}", subject.faculty)
}
