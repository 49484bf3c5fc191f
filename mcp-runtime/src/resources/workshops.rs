use reqwest::Method;
use serde_json::{Value, json};
use trainercentral_core::TcError;

use super::{require_id, schedule_window};
use crate::context::TenantContext;

/// Delivery mode of live workshops.
pub const LIVE_DELIVERY_MODE: u64 = 3;
/// `filter` value listing every upcoming workshop of the academy.
pub const ALL_UPCOMING_FILTER: u64 = 5;
pub const DEFAULT_LIST_LIMIT: u64 = 50;
pub const DEFAULT_MEMBER_ROLE: u64 = 3;
pub const DEFAULT_MEMBER_SOURCE: u64 = 1;

/// Global live workshops (not tied to a course) and their occurrences,
/// which the vendor calls talks.
pub struct Workshops<'a> {
    pub(super) ctx: &'a mut TenantContext,
}

impl Workshops<'_> {
    /// Times use the `DD-MM-YYYY H:MMAM/PM` agent format.
    pub async fn create(
        &mut self,
        name: &str,
        description_html: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<Value, TcError> {
        let (start_ms, end_ms) = schedule_window(self.ctx, start_time, end_time)?;
        self.ctx
            .send(
                Method::POST,
                "sessions.json",
                Some(json!({
                    "session": {
                        "name": name,
                        "description": description_html,
                        "deliveryMode": LIVE_DELIVERY_MODE,
                        "scheduledTime": start_ms,
                        "scheduledEndTime": end_ms,
                        "durationTime": end_ms - start_ms,
                    }
                })),
            )
            .await
    }

    /// Also used for cancellation with `{"isCancelled": true}`.
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

    pub async fn create_occurrence(&mut self, talk: Value) -> Result<Value, TcError> {
        self.ctx
            .send(Method::POST, "talks.json", Some(json!({ "talk": talk })))
            .await
    }

    pub async fn update_occurrence(&mut self, talk_id: &str, updates: Value) -> Result<Value, TcError> {
        require_id("talk_id", talk_id)?;
        self.ctx
            .send(
                Method::PUT,
                &format!("talks/{talk_id}.json"),
                Some(json!({ "talk": updates })),
            )
            .await
    }

    pub async fn list_upcoming(&mut self, filter: u64, limit: u64, si: u64) -> Result<Value, TcError> {
        self.ctx
            .send_with_query(
                Method::GET,
                "talks.json",
                &[
                    ("filter", filter.to_string()),
                    ("limit", limit.to_string()),
                    ("si", si.to_string()),
                ],
                None,
            )
            .await
    }

    pub async fn invite_user(
        &mut self,
        session_id: &str,
        email: &str,
        role: u64,
        source: u64,
    ) -> Result<Value, TcError> {
        require_id("session_id", session_id)?;
        self.ctx
            .send(
                Method::POST,
                "sessionMembers.json",
                Some(json!({
                    "sessionMembers": [{
                        "emailId": email,
                        "sessionId": session_id,
                        "role": role,
                        "source": source,
                    }]
                })),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::FakeVendor;

    #[tokio::test]
    async fn create_converts_agent_dates_to_milliseconds() {
        let vendor = FakeVendor::start().await;
        vendor.respond(
            "POST",
            &FakeVendor::api_path("sessions.json"),
            200,
            json!({"session": {"sessionId": "w1"}}),
        );
        let mut ctx = vendor.context();

        ctx.workshops()
            .create("AI Masterclass", "<div>Learn AI</div>", "29-11-2025 4:30PM", "29-11-2025 5:30PM")
            .await
            .unwrap();
        let session = vendor.requests()[0].json()["session"].clone();
        assert_eq!(session["deliveryMode"], 3);
        assert_eq!(session["scheduledTime"], 1_764_433_800_000_i64);
        assert_eq!(session["scheduledEndTime"], 1_764_437_400_000_i64);
        assert_eq!(session["durationTime"], 3_600_000);
    }

    #[tokio::test]
    async fn end_before_start_is_rejected_without_network() {
        let vendor = FakeVendor::start().await;
        let mut ctx = vendor.context();
        let err = ctx
            .workshops()
            .create("x", "", "29-11-2025 5:30PM", "29-11-2025 4:30PM")
            .await
            .unwrap_err();
        assert_eq!(err.to_data()["field"], "end_time");
        assert!(vendor.requests().is_empty());
    }

    #[tokio::test]
    async fn malformed_date_is_a_dispatch_error() {
        let vendor = FakeVendor::start().await;
        let mut ctx = vendor.context();
        let err = ctx
            .workshops()
            .create("x", "", "2025-11-29 16:30", "29-11-2025 4:30PM")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "dispatch_error");
        assert_eq!(err.to_data()["field"], "start_time");
    }

    #[tokio::test]
    async fn list_upcoming_sends_filter_and_paging() {
        let vendor = FakeVendor::start().await;
        vendor.respond("GET", &FakeVendor::api_path("talks.json"), 200, json!({"talks": []}));
        let mut ctx = vendor.context();
        ctx.workshops()
            .list_upcoming(ALL_UPCOMING_FILTER, DEFAULT_LIST_LIMIT, 0)
            .await
            .unwrap();
        assert_eq!(
            vendor.requests()[0].query.as_deref(),
            Some("filter=5&limit=50&si=0")
        );
    }

    #[tokio::test]
    async fn invite_user_posts_session_member() {
        let vendor = FakeVendor::start().await;
        vendor.respond(
            "POST",
            &FakeVendor::api_path("sessionMembers.json"),
            200,
            json!({"sessionMembers": [{"memberId": "m"}]}),
        );
        let mut ctx = vendor.context();
        ctx.workshops()
            .invite_user("w1", "learner@example.com", DEFAULT_MEMBER_ROLE, DEFAULT_MEMBER_SOURCE)
            .await
            .unwrap();
        assert_eq!(
            vendor.requests()[0].json(),
            json!({"sessionMembers": [{
                "emailId": "learner@example.com",
                "sessionId": "w1",
                "role": 3,
                "source": 1
            }]})
        );
    }
}
