//! Tool surface exposed over MCP: argument parsing into [`ToolCall`] and
//! execution against a tenant context.

mod args;
mod catalog;

pub use catalog::{ToolDefinition, tool_definitions, tools_list_payload};

use serde_json::{Value, json};
use trainercentral_core::TcError;
use trainercentral_core::dates::convert_date_to_millis;

pub(crate) use args::Args;
use args::{
    arg_bool, arg_optional_string, arg_optional_u64, arg_string, arg_u64, required_object,
    required_string,
};

use crate::context::TenantContext;
use crate::resources::{
    ALL_UPCOMING_FILTER, DEFAULT_CONTENT_FILENAME, DEFAULT_INSTRUCTIONS_FILENAME,
    DEFAULT_INSTRUCTIONS_VIEW_TYPE, DEFAULT_LIST_LIMIT, DEFAULT_MEMBER_ROLE,
    DEFAULT_MEMBER_SOURCE, LearnerInvite, Paging,
};

/// A validated tool invocation. Parsing never touches the network.
#[derive(Debug, Clone)]
pub enum ToolCall {
    CreateCourse { course: Value },
    GetCourse { course_id: String },
    ListCourses { paging: Paging },
    UpdateCourse { course_id: String, updates: Value },
    DeleteCourse { course_id: String },
    GetCourseSessions { course_id: String },

    CreateChapter { section: Value },
    GetChapter { section_id: String },
    ListCourseChapters { course_id: String },
    UpdateChapter { course_id: String, section_id: String, updates: Value },
    DeleteChapter { course_id: String, section_id: String },

    CreateLesson { session: Value, content_html: String, content_filename: String },
    GetLesson { session_id: String },
    ListCourseLessons { course_id: String },
    UpdateLesson { session_id: String, updates: Value },
    DeleteLesson { session_id: String },
    UploadLessonContent { session_id: String, content_html: String, filename: String },
    GetLessonMaterials { session_id: String },

    CreateAssignment {
        assignment: Value,
        instruction_html: String,
        instruction_filename: String,
        view_type: u64,
    },
    DeleteAssignment { session_id: String },

    CreateFullTest { session_id: String, name: String, description_html: String, questions: Value },
    CreateTestForm { session_id: String, name: String, description_html: String },
    AddTestQuestions { session_id: String, form_id_value: String, questions: Value },

    CreateWorkshop { name: String, description_html: String, start_time: String, end_time: String },
    UpdateWorkshop { session_id: String, updates: Value },
    CreateWorkshopOccurrence { talk: Value },
    UpdateWorkshopOccurrence { talk_id: String, updates: Value },
    ListGlobalWorkshops { filter_type: u64, limit: u64, si: u64 },
    InviteUserToSession { session_id: String, email: String, role: u64, source: u64 },

    CreateCourseLiveSession {
        course_id: String,
        name: String,
        description_html: String,
        start_time: String,
        end_time: String,
    },
    ListCourseLiveSessions { filter_type: u64, limit: u64, si: u64 },
    DeleteCourseLiveSession { session_id: String },
    InviteLearner(LearnerInvite),

    ConvertDate { date: String },
}

/// `Ok(None)` means the tool name is unknown.
pub fn parse_tool_call(name: &str, args: &Args) -> Result<Option<ToolCall>, TcError> {
    let call = match name {
        "tc_create_course" => ToolCall::CreateCourse {
            course: required_object(args, "course_data")?,
        },
        "tc_get_course" => ToolCall::GetCourse {
            course_id: required_string(args, "course_id")?,
        },
        "tc_list_courses" => ToolCall::ListCourses {
            paging: Paging {
                limit: arg_optional_u64(args, "limit")?,
                si: arg_optional_u64(args, "si")?,
            },
        },
        "tc_update_course" => ToolCall::UpdateCourse {
            course_id: required_string(args, "course_id")?,
            updates: required_object(args, "updates")?,
        },
        "tc_delete_course" => ToolCall::DeleteCourse {
            course_id: required_string(args, "course_id")?,
        },
        "tc_get_course_sessions" => ToolCall::GetCourseSessions {
            course_id: required_string(args, "course_id")?,
        },

        "tc_create_chapter" => ToolCall::CreateChapter {
            section: required_object(args, "section_data")?,
        },
        "tc_get_chapter" => ToolCall::GetChapter {
            section_id: required_string(args, "section_id")?,
        },
        "tc_list_course_chapters" => ToolCall::ListCourseChapters {
            course_id: required_string(args, "course_id")?,
        },
        "tc_update_chapter" => ToolCall::UpdateChapter {
            course_id: required_string(args, "course_id")?,
            section_id: required_string(args, "section_id")?,
            updates: required_object(args, "updates")?,
        },
        "tc_delete_chapter" => ToolCall::DeleteChapter {
            course_id: required_string(args, "course_id")?,
            section_id: required_string(args, "section_id")?,
        },

        "tc_create_lesson" => ToolCall::CreateLesson {
            session: required_object(args, "session_data")?,
            content_html: required_string(args, "content_html")?,
            content_filename: arg_string(args, "content_filename", DEFAULT_CONTENT_FILENAME)?,
        },
        "tc_get_lesson" => ToolCall::GetLesson {
            session_id: required_string(args, "session_id")?,
        },
        "tc_list_course_lessons" => ToolCall::ListCourseLessons {
            course_id: required_string(args, "course_id")?,
        },
        "tc_update_lesson" => ToolCall::UpdateLesson {
            session_id: required_string(args, "session_id")?,
            updates: required_object(args, "updates")?,
        },
        "tc_delete_lesson" => ToolCall::DeleteLesson {
            session_id: required_string(args, "session_id")?,
        },
        "tc_upload_lesson_content" => ToolCall::UploadLessonContent {
            session_id: required_string(args, "session_id")?,
            content_html: required_string(args, "content_html")?,
            filename: arg_string(args, "filename", DEFAULT_CONTENT_FILENAME)?,
        },
        "tc_get_lesson_materials" => ToolCall::GetLessonMaterials {
            session_id: required_string(args, "session_id")?,
        },

        "tc_create_assignment" => ToolCall::CreateAssignment {
            assignment: required_object(args, "assignment_data")?,
            instruction_html: required_string(args, "instruction_html")?,
            instruction_filename: arg_string(
                args,
                "instruction_filename",
                DEFAULT_INSTRUCTIONS_FILENAME,
            )?,
            view_type: arg_u64(args, "view_type", DEFAULT_INSTRUCTIONS_VIEW_TYPE)?,
        },
        "tc_delete_assignment" => ToolCall::DeleteAssignment {
            session_id: required_string(args, "session_id")?,
        },

        "tc_create_full_test" => ToolCall::CreateFullTest {
            session_id: required_string(args, "session_id")?,
            name: required_string(args, "name")?,
            description_html: arg_string(args, "description_html", "")?,
            questions: required_object(args, "questions")?,
        },
        "tc_create_test_form" => ToolCall::CreateTestForm {
            session_id: required_string(args, "session_id")?,
            name: required_string(args, "name")?,
            description_html: arg_string(args, "description_html", "")?,
        },
        "tc_add_test_questions" => ToolCall::AddTestQuestions {
            session_id: required_string(args, "session_id")?,
            form_id_value: required_string(args, "form_id_value")?,
            questions: required_object(args, "questions")?,
        },

        "tc_create_workshop" => ToolCall::CreateWorkshop {
            name: required_string(args, "name")?,
            description_html: arg_string(args, "description_html", "")?,
            start_time: required_string(args, "start_time")?,
            end_time: required_string(args, "end_time")?,
        },
        "tc_update_workshop" => ToolCall::UpdateWorkshop {
            session_id: required_string(args, "session_id")?,
            updates: required_object(args, "updates")?,
        },
        "tc_create_workshop_occurrence" => ToolCall::CreateWorkshopOccurrence {
            talk: required_object(args, "talk_data")?,
        },
        "tc_update_workshop_occurrence" => ToolCall::UpdateWorkshopOccurrence {
            talk_id: required_string(args, "talk_id")?,
            updates: required_object(args, "updates")?,
        },
        "tc_list_all_global_workshops" => ToolCall::ListGlobalWorkshops {
            filter_type: arg_u64(args, "filter_type", ALL_UPCOMING_FILTER)?,
            limit: arg_u64(args, "limit", DEFAULT_LIST_LIMIT)?,
            si: arg_u64(args, "si", 0)?,
        },
        "tc_invite_user_to_session" => ToolCall::InviteUserToSession {
            session_id: required_string(args, "session_id")?,
            email: required_string(args, "email")?,
            role: arg_u64(args, "role", DEFAULT_MEMBER_ROLE)?,
            source: arg_u64(args, "source", DEFAULT_MEMBER_SOURCE)?,
        },

        "tc_create_course_live_session" => ToolCall::CreateCourseLiveSession {
            course_id: required_string(args, "course_id")?,
            name: required_string(args, "name")?,
            description_html: arg_string(args, "description_html", "")?,
            start_time: required_string(args, "start_time")?,
            end_time: required_string(args, "end_time")?,
        },
        "tc_list_course_live_sessions" => ToolCall::ListCourseLiveSessions {
            filter_type: arg_u64(args, "filter_type", ALL_UPCOMING_FILTER)?,
            limit: arg_u64(args, "limit", DEFAULT_LIST_LIMIT)?,
            si: arg_u64(args, "si", 0)?,
        },
        "tc_delete_course_live_session" => ToolCall::DeleteCourseLiveSession {
            session_id: required_string(args, "session_id")?,
        },
        "tc_invite_learner" => ToolCall::InviteLearner(LearnerInvite {
            email: required_string(args, "email")?,
            first_name: required_string(args, "first_name")?,
            last_name: required_string(args, "last_name")?,
            course_id: arg_optional_string(args, "course_id")?,
            session_id: arg_optional_string(args, "session_id")?,
            is_access_granted: arg_bool(args, "is_access_granted", true)?,
            expiry_time: arg_optional_u64(args, "expiry_time")?,
            expiry_duration: arg_optional_string(args, "expiry_duration")?,
        }),

        "tc_convert_date" => ToolCall::ConvertDate {
            date: required_string(args, "date")?,
        },
        _ => return Ok(None),
    };
    Ok(Some(call))
}

impl ToolCall {
    pub async fn execute(self, ctx: &mut TenantContext) -> Result<Value, TcError> {
        match self {
            ToolCall::CreateCourse { course } => ctx.courses().create(course).await,
            ToolCall::GetCourse { course_id } => ctx.courses().get(&course_id).await,
            ToolCall::ListCourses { paging } => ctx.courses().list(paging).await,
            ToolCall::UpdateCourse { course_id, updates } => {
                ctx.courses().update(&course_id, updates).await
            }
            ToolCall::DeleteCourse { course_id } => ctx.courses().delete(&course_id).await,
            ToolCall::GetCourseSessions { course_id } => ctx.courses().sessions(&course_id).await,

            ToolCall::CreateChapter { section } => ctx.chapters().create(section).await,
            ToolCall::GetChapter { section_id } => ctx.chapters().get(&section_id).await,
            ToolCall::ListCourseChapters { course_id } => {
                ctx.chapters().list_for_course(&course_id).await
            }
            ToolCall::UpdateChapter { course_id, section_id, updates } => {
                ctx.chapters().update(&course_id, &section_id, updates).await
            }
            ToolCall::DeleteChapter { course_id, section_id } => {
                ctx.chapters().delete(&course_id, &section_id).await
            }

            ToolCall::CreateLesson { session, content_html, content_filename } => {
                ctx.lessons()
                    .create_with_content(session, &content_html, &content_filename)
                    .await
            }
            ToolCall::GetLesson { session_id } => ctx.lessons().get(&session_id).await,
            ToolCall::ListCourseLessons { course_id } => {
                ctx.lessons().list_for_course(&course_id).await
            }
            ToolCall::UpdateLesson { session_id, updates } => {
                ctx.lessons().update(&session_id, updates).await
            }
            ToolCall::DeleteLesson { session_id } => ctx.lessons().delete(&session_id).await,
            ToolCall::UploadLessonContent { session_id, content_html, filename } => {
                ctx.lessons()
                    .upload_content(&session_id, &content_html, &filename)
                    .await
            }
            ToolCall::GetLessonMaterials { session_id } => {
                ctx.lessons().materials(&session_id).await
            }

            ToolCall::CreateAssignment {
                assignment,
                instruction_html,
                instruction_filename,
                view_type,
            } => {
                ctx.assignments()
                    .create_with_instructions(
                        assignment,
                        &instruction_html,
                        &instruction_filename,
                        view_type,
                    )
                    .await
            }
            ToolCall::DeleteAssignment { session_id } => {
                ctx.assignments().delete(&session_id).await
            }

            ToolCall::CreateFullTest { session_id, name, description_html, questions } => {
                ctx.test_forms()
                    .create_full(&session_id, &name, &description_html, questions)
                    .await
            }
            ToolCall::CreateTestForm { session_id, name, description_html } => {
                ctx.test_forms()
                    .create_form(&session_id, &name, &description_html)
                    .await
            }
            ToolCall::AddTestQuestions { session_id, form_id_value, questions } => {
                ctx.test_forms()
                    .add_questions(&session_id, &form_id_value, questions)
                    .await
            }

            ToolCall::CreateWorkshop { name, description_html, start_time, end_time } => {
                ctx.workshops()
                    .create(&name, &description_html, &start_time, &end_time)
                    .await
            }
            ToolCall::UpdateWorkshop { session_id, updates } => {
                ctx.workshops().update(&session_id, updates).await
            }
            ToolCall::CreateWorkshopOccurrence { talk } => {
                ctx.workshops().create_occurrence(talk).await
            }
            ToolCall::UpdateWorkshopOccurrence { talk_id, updates } => {
                ctx.workshops().update_occurrence(&talk_id, updates).await
            }
            ToolCall::ListGlobalWorkshops { filter_type, limit, si } => {
                ctx.workshops().list_upcoming(filter_type, limit, si).await
            }
            ToolCall::InviteUserToSession { session_id, email, role, source } => {
                ctx.workshops()
                    .invite_user(&session_id, &email, role, source)
                    .await
            }

            ToolCall::CreateCourseLiveSession {
                course_id,
                name,
                description_html,
                start_time,
                end_time,
            } => {
                ctx.course_workshops()
                    .create(&course_id, &name, &description_html, &start_time, &end_time)
                    .await
            }
            ToolCall::ListCourseLiveSessions { filter_type, limit, si } => {
                ctx.course_workshops()
                    .list_upcoming(filter_type, limit, si)
                    .await
            }
            ToolCall::DeleteCourseLiveSession { session_id } => {
                ctx.course_workshops().delete(&session_id).await
            }
            ToolCall::InviteLearner(invite) => ctx.course_workshops().invite_learner(invite).await,

            ToolCall::ConvertDate { date } => {
                let tz = ctx.timezone();
                let milliseconds = convert_date_to_millis(&date, tz)
                    .map_err(|e| TcError::invalid_field("date", e.to_string()))?;
                Ok(json!({
                    "input": date,
                    "milliseconds": milliseconds,
                    "timezone": tz.name(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::FakeVendor;

    fn args(value: Value) -> Args {
        value.as_object().cloned().unwrap()
    }

    /// Minimal arguments satisfying each tool's required list.
    fn sample_arguments(tool: &ToolDefinition) -> Args {
        let mut out = Args::new();
        let properties = tool.input_schema["properties"].as_object().unwrap();
        for required in tool.input_schema["required"].as_array().unwrap() {
            let key = required.as_str().unwrap();
            let value = match properties[key]["type"].as_str() {
                Some("object") => json!({"name": "x"}),
                Some("integer") => json!(1),
                Some("boolean") => json!(true),
                _ if key.ends_with("_time") || key == "date" => json!("05-12-2025 3:00PM"),
                _ => json!("123"),
            };
            out.insert(key.to_string(), value);
        }
        out
    }

    #[test]
    fn every_catalogued_tool_parses_with_its_required_arguments() {
        for tool in tool_definitions() {
            let parsed = parse_tool_call(tool.name, &sample_arguments(&tool));
            assert!(
                matches!(parsed, Ok(Some(_))),
                "{} did not parse: {parsed:?}",
                tool.name
            );
        }
    }

    #[test]
    fn every_required_argument_is_enforced() {
        for tool in tool_definitions() {
            let full = sample_arguments(&tool);
            for key in full.keys() {
                let mut partial = full.clone();
                partial.remove(key);
                let err = parse_tool_call(tool.name, &partial).unwrap_err();
                assert_eq!(err.to_data()["field"], key.as_str(), "{}", tool.name);
            }
        }
    }

    #[test]
    fn unknown_tool_is_not_an_error() {
        assert!(parse_tool_call("tc_launch_rocket", &Args::new()).unwrap().is_none());
    }

    #[test]
    fn defaults_are_filled_in() {
        let call = parse_tool_call("tc_list_all_global_workshops", &Args::new())
            .unwrap()
            .unwrap();
        assert!(matches!(
            call,
            ToolCall::ListGlobalWorkshops { filter_type: 5, limit: 50, si: 0 }
        ));

        let call = parse_tool_call(
            "tc_create_assignment",
            &args(json!({"assignment_data": {"name": "Essay"}, "instruction_html": "<p>Write</p>"})),
        )
        .unwrap()
        .unwrap();
        match call {
            ToolCall::CreateAssignment { instruction_filename, view_type, .. } => {
                assert_eq!(instruction_filename, "Instructions");
                assert_eq!(view_type, 4);
            }
            other => panic!("unexpected call {other:?}"),
        }

        let call = parse_tool_call(
            "tc_invite_learner",
            &args(json!({"email": "a@b.c", "first_name": "A", "last_name": "B", "course_id": 7})),
        )
        .unwrap()
        .unwrap();
        match call {
            ToolCall::InviteLearner(invite) => {
                assert!(invite.is_access_granted);
                assert_eq!(invite.course_id.as_deref(), Some("7"));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn convert_date_uses_context_timezone_without_network() {
        let vendor = FakeVendor::start().await;
        let mut config = vendor.config();
        config.timezone = "Asia/Kolkata".parse().unwrap();
        let mut ctx = vendor.context_with(config);

        let result = parse_tool_call("tc_convert_date", &args(json!({"date": "29-11-2025 4:30PM"})))
            .unwrap()
            .unwrap()
            .execute(&mut ctx)
            .await
            .unwrap();
        assert_eq!(result["milliseconds"], "1764414000000");
        assert_eq!(result["timezone"], "Asia/Kolkata");
        assert!(vendor.requests().is_empty());
    }

    #[tokio::test]
    async fn convert_date_reports_bad_input_on_date_field() {
        let vendor = FakeVendor::start().await;
        let mut ctx = vendor.context();
        let err = parse_tool_call("tc_convert_date", &args(json!({"date": "tomorrow 4pm"})))
            .unwrap()
            .unwrap()
            .execute(&mut ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_data()["field"], "date");
    }

    #[tokio::test]
    async fn create_lesson_runs_create_then_upload() {
        let vendor = FakeVendor::start().await;
        vendor.respond(
            "POST",
            &FakeVendor::api_path("sessions.json"),
            200,
            json!({"session": {"sessionId": "s-1"}}),
        );
        vendor.respond(
            "POST",
            &FakeVendor::api_path("sessions/s-1/materials.json"),
            200,
            json!({"material": {"materialId": "m-1"}}),
        );
        let mut ctx = vendor.context();

        let result = parse_tool_call(
            "tc_create_lesson",
            &args(json!({
                "session_data": {"courseId": "55", "name": "Ownership"},
                "content_html": "<h1>Ownership</h1>"
            })),
        )
        .unwrap()
        .unwrap()
        .execute(&mut ctx)
        .await
        .unwrap();

        assert_eq!(result["lesson"]["session"]["sessionId"], "s-1");
        assert_eq!(result["content"]["material"]["materialId"], "m-1");
        assert_eq!(vendor.requests().len(), 2);
    }
}
