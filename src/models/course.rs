// src/models/course.rs

//! Course identifiers and attribute snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

const ALIAS_PREFIX: &str = "d:";
const SUBJECT_ALIAS_PREFIX: &str = "d:SUBJ-";

/// Domain-scoped alias joining a local subject or class to a remote course.
///
/// Two canonical forms exist:
/// - subject course: `d:SUBJ-<code tail>`
/// - class course: `d:<academic year>-<class code tail>`
///
/// The "tail" is the code with its leading character dropped. These strings
/// already exist on the remote end, so the format must not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseAlias(String);

impl CourseAlias {
    /// Alias for a subject course.
    pub fn subject(subject_code: &str) -> Self {
        Self(format!("{SUBJECT_ALIAS_PREFIX}{}", code_tail(subject_code)))
    }

    /// Alias for a class course within an academic year.
    pub fn class(academic_year: u16, class_code: &str) -> Self {
        Self(format!(
            "{ALIAS_PREFIX}{academic_year}-{}",
            code_tail(class_code)
        ))
    }

    /// Wrap an alias string observed at the remote end.
    pub fn from_remote(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a domain alias (`d:` prefix).
    pub fn is_domain(&self) -> bool {
        self.0.starts_with(ALIAS_PREFIX)
    }

    /// Whether this alias names a subject course (`d:SUBJ-` prefix).
    pub fn is_subject(&self) -> bool {
        self.0.starts_with(SUBJECT_ALIAS_PREFIX)
    }

    /// Whether this alias names a class course of the given academic year.
    pub fn is_class_of_year(&self, academic_year: u16) -> bool {
        self.0
            .strip_prefix(ALIAS_PREFIX)
            .and_then(|rest| rest.strip_prefix(academic_year.to_string().as_str()))
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl fmt::Display for CourseAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CourseAlias {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Drop the leading character of a timetable code.
///
/// Timetable codes carry a one-character year-level prefix that the remote
/// aliases omit (`10MAT` becomes `0MAT`).
pub fn code_tail(code: &str) -> &str {
    let mut chars = code.chars();
    chars.next();
    chars.as_str()
}

/// Lifecycle state of a remote course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CourseState {
    Active,
    Archived,
    Provisioned,
    Declined,
    Suspended,
    #[serde(other)]
    CourseStateUnspecified,
}

impl CourseState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseState::Active => "ACTIVE",
            CourseState::Archived => "ARCHIVED",
            CourseState::Provisioned => "PROVISIONED",
            CourseState::Declined => "DECLINED",
            CourseState::Suspended => "SUSPENDED",
            CourseState::CourseStateUnspecified => "COURSE_STATE_UNSPECIFIED",
        }
    }
}

impl fmt::Display for CourseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute snapshot sent with create and update calls.
///
/// Built fresh from desired state on every generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAttributes {
    pub id: CourseAlias,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub name: String,
    pub section: String,
    pub description: String,
    pub description_heading: String,
    pub course_state: CourseState,
}

impl CourseAttributes {
    /// Copy of these attributes suitable for an update call (no owner).
    pub fn without_owner(&self) -> Self {
        Self {
            owner_id: None,
            ..self.clone()
        }
    }
}

/// A course as observed at the remote end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCourse {
    pub alias: CourseAlias,
    pub course_state: CourseState,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_heading: Option<String>,
}

impl RemoteCourse {
    /// Minimal remote course with only an alias and state.
    pub fn new(alias: CourseAlias, course_state: CourseState) -> Self {
        Self {
            alias,
            course_state,
            name: None,
            section: None,
            description: None,
            description_heading: None,
        }
    }

    /// Remote view of a course just created from `attributes`.
    pub fn from_attributes(attributes: &CourseAttributes) -> Self {
        Self {
            alias: attributes.id.clone(),
            course_state: attributes.course_state,
            name: Some(attributes.name.clone()),
            section: Some(attributes.section.clone()),
            description: Some(attributes.description.clone()),
            description_heading: Some(attributes.description_heading.clone()),
        }
    }
}
