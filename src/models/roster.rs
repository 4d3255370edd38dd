// src/models/roster.rs

//! Desired-state roster: subjects, their classes, teachers and students.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Timetabled roster for one academic period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl Roster {
    /// Load a roster from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Count classes across all subjects.
    pub fn class_count(&self) -> usize {
        self.subjects.iter().map(|s| s.classes.len()).sum()
    }
}

/// A subject taught in the period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    /// Timetable code (e.g., "10MAT")
    #[serde(default)]
    pub code: String,

    /// Display name (e.g., "Mathematics")
    #[serde(default)]
    pub name: String,

    /// Faculty / learning domain
    #[serde(default)]
    pub faculty: String,

    /// Teacher email addresses
    #[serde(default)]
    pub teachers: BTreeSet<String>,

    /// Timetabled classes of this subject
    #[serde(default)]
    pub classes: Vec<ClassGroup>,
}

/// A timetabled class of a subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassGroup {
    /// Class code (e.g., "10MATa")
    #[serde(default)]
    pub code: String,

    /// Student email addresses
    #[serde(default)]
    pub students: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_roster_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "subjects": [{{
                    "code": "10MAT",
                    "name": "Mathematics",
                    "faculty": "Maths",
                    "teachers": ["t1@school.edu", "t1@school.edu"],
                    "classes": [{{ "code": "10MATa", "students": ["s1@school.edu"] }}]
                }}]
            }}"#
        )
        .unwrap();

        let roster = Roster::load(file.path()).unwrap();
        assert_eq!(roster.subjects.len(), 1);
        assert_eq!(roster.subjects[0].teachers.len(), 1);
        assert_eq!(roster.class_count(), 1);
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let roster: Roster = serde_json::from_str(r#"{"subjects": [{"name": "Art"}]}"#).unwrap();
        assert!(roster.subjects[0].code.is_empty());
        assert!(roster.subjects[0].classes.is_empty());
    }
}
