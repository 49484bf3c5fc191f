use reqwest::Method;
use serde_json::{Value, json};
use trainercentral_core::TcError;

use super::{Paging, delete_ack, require_id};
use crate::context::TenantContext;

pub struct Courses<'a> {
    pub(super) ctx: &'a mut TenantContext,
}

impl Courses<'_> {
    /// `course` carries `courseName`, `subTitle`, `description` and
    /// optional `courseCategories`.
    pub async fn create(&mut self, course: Value) -> Result<Value, TcError> {
        self.ctx
            .send(Method::POST, "courses.json", Some(json!({ "course": course })))
            .await
    }

    pub async fn get(&mut self, course_id: &str) -> Result<Value, TcError> {
        require_id("course_id", course_id)?;
        self.ctx
            .send(Method::GET, &format!("courses/{course_id}.json"), None)
            .await
    }

    pub async fn list(&mut self, paging: Paging) -> Result<Value, TcError> {
        self.ctx
            .send_with_query(Method::GET, "courses.json", &paging.query(), None)
            .await
    }

    pub async fn update(&mut self, course_id: &str, updates: Value) -> Result<Value, TcError> {
        require_id("course_id", course_id)?;
        self.ctx
            .send(
                Method::PUT,
                &format!("courses/{course_id}.json"),
                Some(json!({ "course": updates })),
            )
            .await
    }

    pub async fn delete(&mut self, course_id: &str) -> Result<Value, TcError> {
        require_id("course_id", course_id)?;
        let body = self
            .ctx
            .send(Method::DELETE, &format!("courses/{course_id}.json"), None)
            .await?;
        Ok(delete_ack(body, "Course deleted successfully", "courseId", course_id))
    }

    /// Course summary plus its sessions, following the course's
    /// `links.sessions` reference on the tenant domain.
    pub async fn sessions(&mut self, course_id: &str) -> Result<Value, TcError> {
        let course_response = self.get(course_id).await?;
        let Some(course) = course_response.get("course") else {
            return Err(TcError::MalformedResponse {
                message: "course response did not include 'course'".to_string(),
                body: course_response,
            });
        };
        let Some(link) = course
            .pointer("/links/sessions")
            .and_then(Value::as_str)
            .filter(|link| !link.is_empty())
        else {
            return Err(TcError::MalformedResponse {
                message: "course response did not include links.sessions".to_string(),
                body: course_response.clone(),
            });
        };
        let link = link.to_string();
        let summary = json!({
            "courseId": course.get("courseId").cloned().unwrap_or(Value::Null),
            "name": course.get("courseName").cloned().unwrap_or(Value::Null),
        });

        let sessions_response = self.ctx.get_on_domain(&link).await?;
        let sessions: Vec<Value> = sessions_response
            .get("sessions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|s| {
                        json!({
                            "sessionId": s.get("sessionId").cloned().unwrap_or(Value::Null),
                            "name": s.get("name").cloned().unwrap_or(Value::Null),
                            "description": s.get("description").cloned().unwrap_or(Value::Null),
                            "testsLink": s.pointer("/links/tests").cloned().unwrap_or(Value::Null),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({
            "course": summary,
            "sessions": sessions,
            "raw": sessions_response,
        }))
    }
}
