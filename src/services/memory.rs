//! In-process classroom service.
//!
//! Keeps courses and memberships in memory, records every call and can be
//! told to fail calls for chosen courses. Duplicate creates and enrolments
//! fail the same way the remote service rejects them.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{CourseAlias, CourseAttributes, CourseState, RemoteCourse, Role};
use crate::services::ClassroomService;

const NOT_FOUND: &str = "Requested entity was not found.";
const ALREADY_EXISTS: &str = "Requested entity already exists";

/// A call received by [`InMemoryClassroom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListCourses,
    ListMembers(CourseAlias, Role),
    CreateCourse(CourseAlias),
    UpdateCourse(CourseAlias),
    AddMember(CourseAlias, Role, String),
    RemoveMember(CourseAlias, Role, String),
    SetCourseState(CourseAlias, CourseState),
}

#[derive(Debug, Default)]
struct State {
    courses: BTreeMap<CourseAlias, RemoteCourse>,
    members: BTreeMap<(CourseAlias, Role), BTreeSet<String>>,
    failing: HashSet<CourseAlias>,
    failing_once: HashSet<CourseAlias>,
    calls: Vec<Call>,
}

impl State {
    fn check(&mut self, course_id: &CourseAlias, operation: &str) -> Result<()> {
        if self.failing.contains(course_id) || self.failing_once.remove(course_id) {
            return Err(AppError::remote(
                format!("{operation} {course_id}"),
                "Injected failure",
            ));
        }
        Ok(())
    }

    fn require_course(&self, course_id: &CourseAlias, operation: &str) -> Result<()> {
        if !self.courses.contains_key(course_id) {
            return Err(AppError::remote(format!("{operation} {course_id}"), NOT_FOUND));
        }
        Ok(())
    }
}

/// Classroom service held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryClassroom {
    state: Mutex<State>,
}

impl InMemoryClassroom {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a course.
    pub fn insert_course(&self, course: RemoteCourse) {
        self.state().courses.insert(course.alias.clone(), course);
    }

    /// Seed a member of a course.
    pub fn insert_member(&self, alias: &str, role: Role, member: &str) {
        self.state()
            .members
            .entry((CourseAlias::from_remote(alias), role))
            .or_default()
            .insert(member.to_string());
    }

    /// Make every call addressed to `alias` fail.
    pub fn fail_course(&self, alias: &str) {
        self.state().failing.insert(CourseAlias::from_remote(alias));
    }

    /// Make only the next call addressed to `alias` fail.
    pub fn fail_course_once(&self, alias: &str) {
        self.state().failing_once.insert(CourseAlias::from_remote(alias));
    }

    /// Stop failing calls addressed to `alias`.
    pub fn heal_course(&self, alias: &str) {
        self.state().failing.remove(&CourseAlias::from_remote(alias));
    }

    /// Calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn course(&self, alias: &str) -> Option<RemoteCourse> {
        self.state()
            .courses
            .get(&CourseAlias::from_remote(alias))
            .cloned()
    }

    pub fn members(&self, alias: &str, role: Role) -> BTreeSet<String> {
        self.state()
            .members
            .get(&(CourseAlias::from_remote(alias), role))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ClassroomService for InMemoryClassroom {
    async fn list_courses(&self) -> Result<Vec<RemoteCourse>> {
        let mut state = self.state();
        state.calls.push(Call::ListCourses);
        Ok(state.courses.values().cloned().collect())
    }

    async fn list_members(&self, course_id: &CourseAlias, role: Role) -> Result<Vec<String>> {
        let mut state = self.state();
        state.calls.push(Call::ListMembers(course_id.clone(), role));
        state.check(course_id, "list_members")?;
        state.require_course(course_id, "list_members")?;

        Ok(state
            .members
            .get(&(course_id.clone(), role))
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn create_course(&self, attributes: &CourseAttributes) -> Result<()> {
        let mut state = self.state();
        let alias = attributes.id.clone();
        state.calls.push(Call::CreateCourse(alias.clone()));
        state.check(&alias, "create_course")?;

        if state.courses.contains_key(&alias) {
            return Err(AppError::remote(format!("create_course {alias}"), ALREADY_EXISTS));
        }
        state
            .courses
            .insert(alias.clone(), RemoteCourse::from_attributes(attributes));

        // The owner is enrolled as a teacher of the new course.
        if let Some(owner) = &attributes.owner_id {
            state
                .members
                .entry((alias, Role::Teacher))
                .or_default()
                .insert(owner.clone());
        }
        Ok(())
    }

    async fn update_course(&self, attributes: &CourseAttributes) -> Result<()> {
        let mut state = self.state();
        let alias = attributes.id.clone();
        state.calls.push(Call::UpdateCourse(alias.clone()));
        state.check(&alias, "update_course")?;
        state.require_course(&alias, "update_course")?;

        state
            .courses
            .insert(alias, RemoteCourse::from_attributes(attributes));
        Ok(())
    }

    async fn add_member(&self, course_id: &CourseAlias, role: Role, member: &str) -> Result<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::AddMember(course_id.clone(), role, member.to_string()));
        state.check(course_id, "add_member")?;
        state.require_course(course_id, "add_member")?;

        let inserted = state
            .members
            .entry((course_id.clone(), role))
            .or_default()
            .insert(member.to_string());
        if !inserted {
            return Err(AppError::remote(
                format!("add_member {course_id}"),
                ALREADY_EXISTS,
            ));
        }
        Ok(())
    }

    async fn remove_member(
        &self,
        course_id: &CourseAlias,
        role: Role,
        member: &str,
    ) -> Result<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::RemoveMember(course_id.clone(), role, member.to_string()));
        state.check(course_id, "remove_member")?;

        let removed = state
            .members
            .get_mut(&(course_id.clone(), role))
            .is_some_and(|m| m.remove(member));
        if !removed {
            return Err(AppError::remote(format!("remove_member {course_id}"), NOT_FOUND));
        }
        Ok(())
    }

    async fn set_course_state(&self, course_id: &CourseAlias, course_state: CourseState) -> Result<()> {
        let mut state = self.state();
        state
            .calls
            .push(Call::SetCourseState(course_id.clone(), course_state));
        state.check(course_id, "set_course_state")?;

        match state.courses.get_mut(course_id) {
            Some(course) => {
                course.course_state = course_state;
                Ok(())
            }
            None => Err(AppError::remote(
                format!("set_course_state {course_id}"),
                NOT_FOUND,
            )),
        }
    }
}
