//! Thin wrappers over the TrainerCentral REST resources.
//!
//! Every wrapper borrows the tenant context and only ever calls its `send*`
//! methods, so token freshness and the 401 retry live in one place.

mod assignments;
mod chapters;
mod course_workshops;
mod courses;
mod lessons;
mod test_forms;
mod workshops;

pub use assignments::{
    Assignments, DEFAULT_INSTRUCTIONS_FILENAME, DEFAULT_INSTRUCTIONS_VIEW_TYPE,
};
pub use chapters::Chapters;
pub use course_workshops::{CourseWorkshops, LearnerInvite};
pub use courses::Courses;
pub use lessons::{DEFAULT_CONTENT_FILENAME, Lessons};
pub use test_forms::TestForms;
pub use workshops::{
    ALL_UPCOMING_FILTER, DEFAULT_LIST_LIMIT, DEFAULT_MEMBER_ROLE, DEFAULT_MEMBER_SOURCE,
    Workshops,
};

use serde::Deserialize;
use serde_json::{Value, json};
use trainercentral_core::TcError;
use trainercentral_core::dates::convert_date_to_millis_i64;

use crate::context::TenantContext;

impl TenantContext {
    pub fn courses(&mut self) -> Courses<'_> {
        Courses { ctx: self }
    }

    pub fn chapters(&mut self) -> Chapters<'_> {
        Chapters { ctx: self }
    }

    pub fn lessons(&mut self) -> Lessons<'_> {
        Lessons { ctx: self }
    }

    pub fn assignments(&mut self) -> Assignments<'_> {
        Assignments { ctx: self }
    }

    pub fn test_forms(&mut self) -> TestForms<'_> {
        TestForms { ctx: self }
    }

    pub fn workshops(&mut self) -> Workshops<'_> {
        Workshops { ctx: self }
    }

    pub fn course_workshops(&mut self) -> CourseWorkshops<'_> {
        CourseWorkshops { ctx: self }
    }
}

/// Optional `limit`/`si` (start index) paging parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Paging {
    pub limit: Option<u64>,
    pub si: Option<u64>,
}

impl Paging {
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(si) = self.si {
            query.push(("si", si.to_string()));
        }
        query
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(u64),
}

impl IdValue {
    fn into_id(self) -> Option<String> {
        match self {
            IdValue::Text(text) if !text.trim().is_empty() => Some(text),
            IdValue::Text(_) => None,
            IdValue::Number(number) => Some(number.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct SessionRef {
    #[serde(rename = "sessionId", default)]
    session_id: Option<IdValue>,
    #[serde(default)]
    id: Option<IdValue>,
}

#[derive(Deserialize)]
struct CreatedSession {
    #[serde(default)]
    session: Option<SessionRef>,
    #[serde(rename = "sessionId", default)]
    session_id: Option<IdValue>,
    #[serde(default)]
    id: Option<IdValue>,
}

#[derive(Deserialize)]
struct FormRef {
    #[serde(rename = "formIdValue", default)]
    form_id_value: Option<IdValue>,
}

#[derive(Deserialize)]
struct CreatedForm {
    #[serde(default)]
    form: Option<FormRef>,
}

/// Session id of a freshly created session: `session.sessionId`, then
/// `session.id`, then the same keys at the top level.
pub fn session_id_from(body: &Value) -> Result<String, TcError> {
    let missing = || TcError::MalformedResponse {
        message: "session creation response did not include a sessionId".to_string(),
        body: body.clone(),
    };
    let created: CreatedSession = serde_json::from_value(body.clone()).map_err(|_| missing())?;
    let nested = created
        .session
        .and_then(|s| s.session_id.and_then(IdValue::into_id).or_else(|| s.id.and_then(IdValue::into_id)));
    nested
        .or_else(|| created.session_id.and_then(IdValue::into_id))
        .or_else(|| created.id.and_then(IdValue::into_id))
        .ok_or_else(missing)
}

/// `form.formIdValue` of a created test form. Not `id`, not `formId`.
pub fn form_id_value_from(body: &Value) -> Result<String, TcError> {
    let missing = || TcError::MalformedResponse {
        message: "test form response did not include form.formIdValue".to_string(),
        body: body.clone(),
    };
    let created: CreatedForm = serde_json::from_value(body.clone()).map_err(|_| missing())?;
    created
        .form
        .and_then(|f| f.form_id_value)
        .and_then(IdValue::into_id)
        .ok_or_else(missing)
}

/// Deletes answer 204 with no body; substitute an acknowledgement.
pub(crate) fn delete_ack(body: Value, message: &str, id_field: &str, id: &str) -> Value {
    if body.is_null() {
        json!({
            "success": true,
            "message": message,
            id_field: id,
        })
    } else {
        body
    }
}

/// Start/end pair in epoch milliseconds; the end must follow the start.
pub(crate) fn schedule_window(
    ctx: &TenantContext,
    start: &str,
    end: &str,
) -> Result<(i64, i64), TcError> {
    let tz = ctx.timezone();
    let start_ms = convert_date_to_millis_i64(start, tz)
        .map_err(|e| TcError::invalid_field("start_time", e.to_string()))?;
    let end_ms = convert_date_to_millis_i64(end, tz)
        .map_err(|e| TcError::invalid_field("end_time", e.to_string()))?;
    if end_ms <= start_ms {
        return Err(TcError::invalid_field(
            "end_time",
            format!("end_time '{end}' must be after start_time '{start}'"),
        ));
    }
    Ok((start_ms, end_ms))
}

pub(crate) fn require_id(field: &str, value: &str) -> Result<(), TcError> {
    if value.trim().is_empty() {
        return Err(TcError::invalid_field(field, format!("'{field}' must not be empty")));
    }
    if value.contains('/') || value.contains('?') || value.contains('#') {
        return Err(TcError::invalid_field(
            field,
            format!("'{field}' must be a plain identifier"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_found_under_each_documented_key() {
        for body in [
            json!({"session": {"sessionId": "11"}}),
            json!({"session": {"id": "11"}}),
            json!({"session": {"sessionId": 11}}),
            json!({"sessionId": "11"}),
            json!({"id": "11"}),
        ] {
            assert_eq!(session_id_from(&body).unwrap(), "11", "{body}");
        }
    }

    #[test]
    fn missing_session_id_is_malformed_response() {
        for body in [json!({"session": {"name": "x"}}), json!([]), json!({"session": {"sessionId": ""}})] {
            let err = session_id_from(&body).unwrap_err();
            assert_eq!(err.kind(), "malformed_response", "{body}");
        }
    }

    #[test]
    fn form_id_value_ignores_other_id_keys() {
        assert_eq!(
            form_id_value_from(&json!({"form": {"formIdValue": "f-1", "id": "x"}})).unwrap(),
            "f-1"
        );
        assert!(form_id_value_from(&json!({"form": {"id": "x", "formId": "y"}})).is_err());
    }

    #[test]
    fn delete_ack_only_replaces_empty_bodies() {
        let ack = delete_ack(Value::Null, "Lesson deleted successfully", "sessionId", "9");
        assert_eq!(ack["success"], true);
        assert_eq!(ack["sessionId"], "9");
        let passthrough = delete_ack(json!({"code": 0}), "x", "sessionId", "9");
        assert_eq!(passthrough, json!({"code": 0}));
    }

    #[test]
    fn ids_with_path_characters_are_rejected() {
        assert!(require_id("course_id", "123").is_ok());
        assert!(require_id("course_id", "../admin").is_err());
        assert!(require_id("course_id", " ").is_err());
    }

    #[test]
    fn paging_only_emits_present_values() {
        assert!(Paging::default().query().is_empty());
        let query = Paging { limit: Some(10), si: None }.query();
        assert_eq!(query, vec![("limit", "10".to_string())]);
    }
}
