// src/services/classroom.rs

//! Google Classroom REST client.
//!
//! Courses are addressed by their domain alias (`courses/d:SUBJ-0MAT`), so the
//! remote numeric course id is never needed. Bulk course listing pages through
//! `courses`, then fetches each course's aliases to key it by domain alias.

use futures::stream::{self, StreamExt};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ClassroomConfig, CourseAlias, CourseAttributes, CourseState, RemoteCourse, Role};
use crate::services::ClassroomService;
use crate::utils::http::{create_client, error_message};

const UPDATE_MASK: &str = "name,section,description,descriptionHeading,courseState";
const STATE_MASK: &str = "courseState";
const DEFAULT_ALIAS_CONCURRENCY: usize = 10;

// --- Wire types ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseResource {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    description_heading: Option<String>,
    #[serde(default = "unspecified")]
    course_state: CourseState,
}

fn unspecified() -> CourseState {
    CourseState::CourseStateUnspecified
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoursePage {
    #[serde(default)]
    courses: Vec<CourseResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AliasResource {
    alias: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AliasPage {
    #[serde(default)]
    aliases: Vec<AliasResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    #[serde(default)]
    email_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberResource {
    #[serde(default)]
    profile: Profile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberPage {
    #[serde(default)]
    teachers: Vec<MemberResource>,
    #[serde(default)]
    students: Vec<MemberResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewMember<'a> {
    user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatePatch {
    course_state: CourseState,
}

/// Classroom service over HTTPS.
pub struct ClassroomHttpClient {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
    page_size: u32,
    concurrency: usize,
}

impl ClassroomHttpClient {
    /// Create a client from configuration.
    pub fn new(config: &ClassroomConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::config(format!(
                "classroom.base_url cannot be a base: {}",
                config.base_url
            )));
        }
        // Keep a trailing slash so joined segments nest under the API root.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: create_client(config)?,
            base_url,
            access_token: config.access_token.clone(),
            page_size: config.page_size,
            concurrency: DEFAULT_ALIAS_CONCURRENCY,
        })
    }

    /// Bound concurrent alias listings during `list_courses` (0 = unbounded).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = if concurrency == 0 {
            usize::MAX
        } else {
            concurrency
        };
        self
    }

    /// Build an endpoint URL from path segments, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::config("classroom.base_url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request, mapping non-success statuses to remote errors.
    async fn send(&self, context: &str, builder: RequestBuilder) -> Result<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::remote(context, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AppError::remote(context, error_message(status, &body)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        context: &str,
        segments: &[&str],
        page_token: Option<&str>,
    ) -> Result<T> {
        let mut url = self.endpoint(segments)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", &self.page_size.to_string());
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        let response = self.send(context, self.request(Method::GET, url)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::remote(context, e))
    }

    async fn list_all_courses(&self) -> Result<Vec<CourseResource>> {
        let mut courses = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: CoursePage = self
                .get_json("list_courses", &["courses"], page_token.as_deref())
                .await?;
            courses.extend(page.courses);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(courses)
    }

    async fn list_aliases(&self, course_id: &str) -> Result<Vec<String>> {
        let context = format!("list_aliases {course_id}");
        let mut aliases = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: AliasPage = self
                .get_json(
                    &context,
                    &["courses", course_id, "aliases"],
                    page_token.as_deref(),
                )
                .await?;
            aliases.extend(page.aliases.into_iter().map(|a| a.alias));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(aliases)
    }
}

#[async_trait::async_trait]
impl ClassroomService for ClassroomHttpClient {
    async fn list_courses(&self) -> Result<Vec<RemoteCourse>> {
        let courses = self.list_all_courses().await?;
        log::debug!("Listed {} remote courses, fetching aliases", courses.len());

        let mut results = stream::iter(courses)
            .map(|course| async move {
                let aliases = self.list_aliases(&course.id).await;
                (course, aliases)
            })
            .buffer_unordered(self.concurrency);

        let mut remote = Vec::new();
        while let Some((course, aliases)) = results.next().await {
            for alias in aliases? {
                let alias = CourseAlias::from_remote(alias);
                if !alias.is_domain() {
                    continue;
                }
                remote.push(RemoteCourse {
                    alias,
                    course_state: course.course_state,
                    name: course.name.clone(),
                    section: course.section.clone(),
                    description: course.description.clone(),
                    description_heading: course.description_heading.clone(),
                });
            }
        }

        // Alias listings complete out of order.
        remote.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(remote)
    }

    async fn list_members(&self, course_id: &CourseAlias, role: Role) -> Result<Vec<String>> {
        let context = format!("list_{} {course_id}", role.collection());
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page: MemberPage = self
                .get_json(
                    &context,
                    &["courses", course_id.as_str(), role.collection()],
                    page_token.as_deref(),
                )
                .await?;
            let entries = match role {
                Role::Teacher => page.teachers,
                Role::Student => page.students,
            };
            members.extend(entries.into_iter().filter_map(|m| m.profile.email_address));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(members)
    }

    async fn create_course(&self, attributes: &CourseAttributes) -> Result<()> {
        let url = self.endpoint(&["courses"])?;
        let context = format!("create_course {}", attributes.id);
        self.send(&context, self.request(Method::POST, url).json(attributes))
            .await?;
        Ok(())
    }

    async fn update_course(&self, attributes: &CourseAttributes) -> Result<()> {
        let mut url = self.endpoint(&["courses", attributes.id.as_str()])?;
        url.query_pairs_mut().append_pair("updateMask", UPDATE_MASK);
        let context = format!("update_course {}", attributes.id);
        self.send(
            &context,
            self.request(Method::PATCH, url).json(&attributes.without_owner()),
        )
        .await?;
        Ok(())
    }

    async fn add_member(&self, course_id: &CourseAlias, role: Role, member: &str) -> Result<()> {
        let url = self.endpoint(&["courses", course_id.as_str(), role.collection()])?;
        let context = format!("add_{} {course_id}", role);
        self.send(
            &context,
            self.request(Method::POST, url)
                .json(&NewMember { user_id: member }),
        )
        .await?;
        Ok(())
    }

    async fn remove_member(
        &self,
        course_id: &CourseAlias,
        role: Role,
        member: &str,
    ) -> Result<()> {
        let url = self.endpoint(&["courses", course_id.as_str(), role.collection(), member])?;
        let context = format!("remove_{} {course_id}", role);
        self.send(&context, self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn set_course_state(&self, course_id: &CourseAlias, state: CourseState) -> Result<()> {
        let mut url = self.endpoint(&["courses", course_id.as_str()])?;
        url.query_pairs_mut().append_pair("updateMask", STATE_MASK);
        let context = format!("set_course_state {course_id}");
        self.send(
            &context,
            self.request(Method::PATCH, url)
                .json(&StatePatch { course_state: state }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ClassroomHttpClient {
        let config = ClassroomConfig {
            base_url: base_url.into(),
            ..ClassroomConfig::default()
        };
        ClassroomHttpClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_nests_under_api_root() {
        let client = client("https://classroom.googleapis.com/v1/");
        let url = client
            .endpoint(&["courses", "d:SUBJ-0MAT", "teachers"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://classroom.googleapis.com/v1/courses/d:SUBJ-0MAT/teachers"
        );
    }

    #[test]
    fn test_endpoint_without_trailing_slash() {
        let client = client("https://classroom.googleapis.com/v1");
        let url = client.endpoint(&["courses"]).unwrap();
        assert_eq!(url.as_str(), "https://classroom.googleapis.com/v1/courses");
    }

    #[test]
    fn test_endpoint_encodes_member_segment() {
        let client = client("https://classroom.googleapis.com/v1/");
        let url = client
            .endpoint(&["courses", "d:2024-0MATa", "students", "a b/c@school.edu"])
            .unwrap();
        assert!(url.as_str().ends_with("/students/a%20b%2Fc@school.edu"));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = ClassroomConfig {
            base_url: "not a url".into(),
            ..ClassroomConfig::default()
        };
        assert!(ClassroomHttpClient::new(&config).is_err());
    }

    #[test]
    fn test_member_page_reads_profile_email() {
        let page: MemberPage = serde_json::from_str(
            r#"{"students":[{"userId":"1","profile":{"emailAddress":"s1@school.edu"}},{"userId":"2"}],"nextPageToken":""}"#,
        )
        .unwrap();
        assert_eq!(page.students.len(), 2);
        assert_eq!(
            page.students[0].profile.email_address.as_deref(),
            Some("s1@school.edu")
        );
        assert!(page.students[1].profile.email_address.is_none());
    }

    #[test]
    fn test_course_page_defaults() {
        let page: CoursePage =
            serde_json::from_str(r#"{"courses":[{"id":"123","courseState":"ACTIVE"}]}"#).unwrap();
        assert_eq!(page.courses[0].course_state, CourseState::Active);
        assert!(page.next_page_token.is_none());
    }
}
