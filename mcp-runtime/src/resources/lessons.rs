use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use trainercentral_core::TcError;

use super::{delete_ack, require_id, session_id_from};
use crate::context::TenantContext;

/// View type the vendor uses for HTML materials.
const HTML_VIEW_TYPE: &str = "4";
pub const DEFAULT_CONTENT_FILENAME: &str = "Content";

/// Lessons are sessions with a self-paced delivery mode.
pub struct Lessons<'a> {
    pub(super) ctx: &'a mut TenantContext,
}

impl Lessons<'_> {
    /// `session` carries `courseId`, `name` and optionally `sectionId`,
    /// `deliveryMode` and `description`.
    pub async fn create(&mut self, session: Value) -> Result<Value, TcError> {
        self.ctx
            .send(Method::POST, "sessions.json", Some(json!({ "session": session })))
            .await
    }

    /// Creates the lesson, then uploads `content_html` as its first
    /// material. The upload is skipped when no session id comes back.
    pub async fn create_with_content(
        &mut self,
        session: Value,
        content_html: &str,
        content_filename: &str,
    ) -> Result<Value, TcError> {
        let lesson = self.create(session).await?;
        let session_id = session_id_from(&lesson)?;
        let content = self
            .upload_content(&session_id, content_html, content_filename)
            .await?;
        Ok(json!({ "lesson": lesson, "content": content }))
    }

    pub async fn upload_content(
        &mut self,
        session_id: &str,
        content_html: &str,
        filename: &str,
    ) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        let label = if filename.trim().is_empty() {
            DEFAULT_CONTENT_FILENAME
        } else {
            filename
        };
        let html = content_html.to_string();
        let label = label.to_string();
        self.ctx
            .send_multipart(&format!("sessions/{session_id}/materials.json"), || {
                let part = Part::text(html.clone())
                    .file_name(format!("{label}.html"))
                    .mime_str("text/html")
                    .map_err(|e| TcError::dispatch(format!("Invalid content type: {e}")))?;
                Ok(Form::new()
                    .part("file", part)
                    .text("viewType", HTML_VIEW_TYPE)
                    .text("label", label.clone()))
            })
            .await
    }

    pub async fn get(&mut self, session_id: &str) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        self.ctx
            .send(Method::GET, &format!("sessions/{session_id}.json"), None)
            .await
    }

    pub async fn list_for_course(&mut self, course_id: &str) -> Result<Value, TcError> {
        require_id("course_id", course_id)?;
        self.ctx
            .send(Method::GET, &format!("course/{course_id}/sessions.json"), None)
            .await
    }

    pub async fn update(&mut self, session_id: &str, updates: Value) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        self.ctx
            .send(
                Method::PUT,
                &format!("sessions/{session_id}.json"),
                Some(json!({ "session": updates })),
            )
            .await
    }

    pub async fn delete(&mut self, session_id: &str) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        let body = self
            .ctx
            .send(Method::DELETE, &format!("sessions/{session_id}.json"), None)
            .await?;
        Ok(delete_ack(body, "Lesson deleted successfully", "sessionId", session_id))
    }

    pub async fn materials(&mut self, session_id: &str) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        self.ctx
            .send(
                Method::GET,
                &format!("sessions/{session_id}/materials.json"),
                None,
            )
            .await
    }
}
