use reqwest::Method;
use serde_json::{Value, json};
use trainercentral_core::TcError;

use super::{form_id_value_from, require_id};
use crate::context::TenantContext;

/// Form type the vendor uses for graded tests.
const TEST_FORM_TYPE: u64 = 3;

/// Tests attached to a lesson: a form first, then its question fields.
pub struct TestForms<'a> {
    pub(super) ctx: &'a mut TenantContext,
}

impl TestForms<'_> {
    pub async fn create_form(
        &mut self,
        session_id: &str,
        name: &str,
        description_html: &str,
    ) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        self.ctx
            .send_with_query(
                Method::POST,
                &format!("session/{session_id}/forms.json"),
                &[("type", TEST_FORM_TYPE.to_string())],
                Some(json!({
                    "form": {
                        "name": name,
                        "description": description_html,
                        "sessionId": session_id,
                        "type": TEST_FORM_TYPE,
                    }
                })),
            )
            .await
    }

    /// `questions` follows the vendor field schema: `{"field": [...]}`.
    pub async fn add_questions(
        &mut self,
        session_id: &str,
        form_id_value: &str,
        questions: Value,
    ) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        require_id("form_id_value", form_id_value)?;
        self.ctx
            .send_with_query(
                Method::POST,
                &format!("session/{session_id}/form/{form_id_value}/fields.json"),
                &[("type", TEST_FORM_TYPE.to_string())],
                Some(questions),
            )
            .await
    }

    pub async fn create_full(
        &mut self,
        session_id: &str,
        name: &str,
        description_html: &str,
        questions: Value,
    ) -> Result<Value, TcError> {
        let form = self.create_form(session_id, name, description_html).await?;
        let form_id_value = form_id_value_from(&form)?;
        let added = self
            .add_questions(session_id, &form_id_value, questions)
            .await?;
        Ok(json!({ "form": form, "questions": added }))
    }
}
