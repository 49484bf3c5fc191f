use reqwest::Method;
use serde_json::{Value, json};
use trainercentral_core::TcError;

use super::{delete_ack, require_id};
use crate::context::TenantContext;

/// Chapters are called sections by the vendor API.
pub struct Chapters<'a> {
    pub(super) ctx: &'a mut TenantContext,
}

impl Chapters<'_> {
    /// `section` needs `courseId` and `name`.
    pub async fn create(&mut self, section: Value) -> Result<Value, TcError> {
        self.ctx
            .send(Method::POST, "sections.json", Some(json!({ "section": section })))
            .await
    }

    pub async fn get(&mut self, section_id: &str) -> Result<Value, TcError> {
        require_id("section_id", section_id)?;
        self.ctx
            .send(Method::GET, &format!("sections/{section_id}.json"), None)
            .await
    }

    pub async fn list_for_course(&mut self, course_id: &str) -> Result<Value, TcError> {
        require_id("course_id", course_id)?;
        self.ctx
            .send(Method::GET, &format!("course/{course_id}/sections.json"), None)
            .await
    }

    pub async fn update(
        &mut self,
        course_id: &str,
        section_id: &str,
        updates: Value,
    ) -> Result<Value, TcError> {
        require_id("course_id", course_id)?;
        require_id("section_id", section_id)?;
        self.ctx
            .send(
                Method::PUT,
                &format!("course/{course_id}/sections/{section_id}.json"),
                Some(json!({ "section": updates })),
            )
            .await
    }

    pub async fn delete(&mut self, course_id: &str, section_id: &str) -> Result<Value, TcError> {
        require_id("course_id", course_id)?;
        require_id("section_id", section_id)?;
        let body = self
            .ctx
            .send(
                Method::DELETE,
                &format!("course/{course_id}/sections/{section_id}.json"),
                None,
            )
            .await?;
        Ok(delete_ack(body, "Chapter deleted successfully", "sectionId", section_id))
    }
}
