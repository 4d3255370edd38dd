//! Remote-state index.
//!
//! A read-only lookup from course alias to the remote course, built once per
//! run from a bulk listing. There is no incremental update; a fresh listing
//! means a fresh index.

use std::collections::{BTreeSet, HashMap};

use crate::models::{CourseAlias, CourseState, RemoteCourse};

/// Snapshot of remote courses keyed by alias.
#[derive(Debug, Clone, Default)]
pub struct RemoteCourseIndex {
    courses: HashMap<CourseAlias, RemoteCourse>,
}

impl RemoteCourseIndex {
    /// Build the index in a single pass. The first course seen for an alias wins.
    pub fn build(remote_courses: impl IntoIterator<Item = RemoteCourse>) -> Self {
        let mut courses = HashMap::new();

        for course in remote_courses {
            if courses.contains_key(&course.alias) {
                log::warn!("Duplicate remote alias {}, keeping first", course.alias);
                continue;
            }
            courses.insert(course.alias.clone(), course);
        }

        Self { courses }
    }

    pub fn lookup(&self, alias: &CourseAlias) -> Option<&RemoteCourse> {
        self.courses.get(alias)
    }

    pub fn contains(&self, alias: &CourseAlias) -> bool {
        self.courses.contains_key(alias)
    }

    /// Aliases of ACTIVE class courses belonging to `academic_year`.
    pub fn active_class_aliases(&self, academic_year: u16) -> BTreeSet<CourseAlias> {
        self.courses
            .values()
            .filter(|c| c.course_state == CourseState::Active)
            .filter(|c| !c.alias.is_subject())
            .filter(|c| c.alias.is_class_of_year(academic_year))
            .map(|c| c.alias.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(alias: &str, state: CourseState) -> RemoteCourse {
        RemoteCourse::new(CourseAlias::from_remote(alias), state)
    }

    #[test]
    fn test_lookup() {
        let index = RemoteCourseIndex::build(vec![course("d:SUBJ-0MAT", CourseState::Active)]);
        assert!(index.lookup(&CourseAlias::subject("10MAT")).is_some());
        assert!(index.lookup(&CourseAlias::subject("10ENG")).is_none());
        assert_eq!(index.len(), 1);
        assert!(!index.is_empty());
        assert!(RemoteCourseIndex::build(Vec::new()).is_empty());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let index = RemoteCourseIndex::build(vec![
            course("d:2024-0MATa", CourseState::Active),
            course("d:2024-0MATa", CourseState::Archived),
        ]);
        let found = index.lookup(&CourseAlias::class(2024, "10MATa")).unwrap();
        assert_eq!(found.course_state, CourseState::Active);
    }

    #[test]
    fn test_active_class_aliases_filters_state_year_and_subjects() {
        let index = RemoteCourseIndex::build(vec![
            course("d:2024-0MATa", CourseState::Active),
            course("d:2024-0ENGa", CourseState::Archived),
            course("d:2023-0MATa", CourseState::Active),
            course("d:SUBJ-0MAT", CourseState::Active),
        ]);

        let active = index.active_class_aliases(2024);
        assert_eq!(active.len(), 1);
        assert!(active.contains(&CourseAlias::class(2024, "10MATa")));
    }
}
