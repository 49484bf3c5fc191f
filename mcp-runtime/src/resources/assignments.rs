use reqwest::Method;
use serde_json::{Value, json};
use trainercentral_core::TcError;

use super::{delete_ack, require_id, session_id_from};
use crate::context::TenantContext;

/// Delivery mode marking a session as an assignment.
pub const ASSIGNMENT_DELIVERY_MODE: u64 = 7;
pub const DEFAULT_INSTRUCTIONS_FILENAME: &str = "Instructions";
pub const DEFAULT_INSTRUCTIONS_VIEW_TYPE: u64 = 4;

pub struct Assignments<'a> {
    pub(super) ctx: &'a mut TenantContext,
}

impl Assignments<'_> {
    /// Creates the assignment session; `deliveryMode` defaults to 7.
    pub async fn create(&mut self, mut assignment: Value) -> Result<Value, TcError> {
        let Some(fields) = assignment.as_object_mut() else {
            return Err(TcError::invalid_field(
                "assignment_data",
                "'assignment_data' must be an object",
            ));
        };
        fields
            .entry("deliveryMode")
            .or_insert(json!(ASSIGNMENT_DELIVERY_MODE));
        self.ctx
            .send(Method::POST, "sessions.json", Some(json!({ "session": assignment })))
            .await
    }

    /// Attaches rich-text instructions to an existing session.
    pub async fn add_instructions(
        &mut self,
        session_id: &str,
        html: &str,
        filename: &str,
        view_type: u64,
    ) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        self.ctx
            .send(
                Method::POST,
                &format!("session/{session_id}/createTextFile.json"),
                Some(json!({
                    "richTextContent": html,
                    "filename": filename,
                    "viewType": view_type,
                })),
            )
            .await
    }

    pub async fn create_with_instructions(
        &mut self,
        assignment: Value,
        instruction_html: &str,
        instruction_filename: &str,
        view_type: u64,
    ) -> Result<Value, TcError> {
        let created = self.create(assignment).await?;
        let session_id = session_id_from(&created)?;
        let instructions = self
            .add_instructions(&session_id, instruction_html, instruction_filename, view_type)
            .await?;
        Ok(json!({ "assignment": created, "instructions": instructions }))
    }

    pub async fn delete(&mut self, session_id: &str) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        let body = self
            .ctx
            .send(Method::DELETE, &format!("sessions/{session_id}.json"), None)
            .await?;
        Ok(delete_ack(body, "Assignment deleted successfully", "sessionId", session_id))
    }
}
