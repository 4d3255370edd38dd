//! Remote classroom service layer.
//!
//! This module defines the operations the sync engine needs from the remote
//! course-management service:
//! - Bulk course listing (`list_courses`)
//! - Live membership listing (`list_members`)
//! - Course mutations (`create_course`, `update_course`, `set_course_state`)
//! - Membership mutations (`add_member`, `remove_member`)

mod classroom;
mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{CourseAlias, CourseAttributes, CourseState, RemoteCourse, Role};

pub use classroom::ClassroomHttpClient;
pub use memory::{Call, InMemoryClassroom};

/// Operations against the remote course-management service.
///
/// Every failure is an [`AppError::Remote`](crate::error::AppError::Remote)
/// carrying the service's message.
#[async_trait]
pub trait ClassroomService: Send + Sync {
    /// List every course carrying a domain alias.
    async fn list_courses(&self) -> Result<Vec<RemoteCourse>>;

    /// List member email addresses of a course in a role.
    async fn list_members(&self, course_id: &CourseAlias, role: Role) -> Result<Vec<String>>;

    async fn create_course(&self, attributes: &CourseAttributes) -> Result<()>;

    async fn update_course(&self, attributes: &CourseAttributes) -> Result<()>;

    async fn add_member(&self, course_id: &CourseAlias, role: Role, member: &str) -> Result<()>;

    async fn remove_member(&self, course_id: &CourseAlias, role: Role, member: &str)
    -> Result<()>;

    async fn set_course_state(&self, course_id: &CourseAlias, state: CourseState) -> Result<()>;
}
