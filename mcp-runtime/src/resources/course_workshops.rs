use reqwest::Method;
use serde_json::{Map, Value, json};
use trainercentral_core::TcError;

use super::workshops::LIVE_DELIVERY_MODE;
use super::{delete_ack, require_id, schedule_window};
use crate::context::TenantContext;

/// Live workshops scheduled inside a course, plus learner invitations.
pub struct CourseWorkshops<'a> {
    pub(super) ctx: &'a mut TenantContext,
}

/// Invitation of a learner to a course or to a course live workshop.
#[derive(Debug, Clone, Default)]
pub struct LearnerInvite {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub course_id: Option<String>,
    pub session_id: Option<String>,
    pub is_access_granted: bool,
    pub expiry_time: Option<u64>,
    pub expiry_duration: Option<String>,
}

impl LearnerInvite {
    fn into_attendee(self) -> Result<Value, TcError> {
        if self.course_id.is_none() && self.session_id.is_none() {
            return Err(TcError::invalid_field(
                "course_id",
                "Provide either course_id or session_id",
            ));
        }
        let mut attendee = Map::new();
        attendee.insert("email".into(), json!(self.email));
        attendee.insert("firstName".into(), json!(self.first_name));
        attendee.insert("lastName".into(), json!(self.last_name));
        attendee.insert("isAccessGranted".into(), json!(self.is_access_granted));
        if let Some(course_id) = self.course_id {
            attendee.insert("courseId".into(), json!(course_id));
        }
        if let Some(session_id) = self.session_id {
            attendee.insert("sessionId".into(), json!(session_id));
        }
        if let Some(expiry_time) = self.expiry_time {
            attendee.insert("expiryTime".into(), json!(expiry_time));
        }
        if let Some(expiry_duration) = self.expiry_duration {
            attendee.insert("expiryDuration".into(), json!(expiry_duration));
        }
        Ok(Value::Object(attendee))
    }
}

impl CourseWorkshops<'_> {
    pub async fn create(
        &mut self,
        course_id: &str,
        name: &str,
        description_html: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<Value, TcError> {
        require_id("course_id", course_id)?;
        let (start_ms, end_ms) = schedule_window(self.ctx, start_time, end_time)?;
        self.ctx
            .send(
                Method::POST,
                "sessions.json",
                Some(json!({
                    "session": {
                        "name": name,
                        "description": description_html,
                        "courseId": course_id,
                        "deliveryMode": LIVE_DELIVERY_MODE,
                        "scheduledTime": start_ms,
                        "scheduledEndTime": end_ms,
                        "durationTime": end_ms - start_ms,
                    }
                })),
            )
            .await
    }

    pub async fn list_upcoming(
        &mut self,
        filter_type: u64,
        limit: u64,
        si: u64,
    ) -> Result<Value, TcError> {
        self.ctx
            .send_with_query(
                Method::GET,
                "upcomingSessions.json",
                &[
                    ("filterType", filter_type.to_string()),
                    ("limit", limit.to_string()),
                    ("si", si.to_string()),
                ],
                None,
            )
            .await
    }

    pub async fn delete(&mut self, session_id: &str) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        let body = self
            .ctx
            .send(Method::DELETE, &format!("sessions/{session_id}.json"), None)
            .await?;
        Ok(delete_ack(
            body,
            "Live session deleted successfully",
            "sessionId",
            session_id,
        ))
    }

    pub async fn invite_learner(&mut self, invite: LearnerInvite) -> Result<Value, TcError> {
        let attendee = invite.into_attendee()?;
        self.ctx
            .send(
                Method::POST,
                "addCourseAttendee.json",
                Some(json!({ "courseAttendee": attendee })),
            )
            .await
    }
}
