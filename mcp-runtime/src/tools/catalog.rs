use serde_json::{Value, json};

use trainercentral_core::dates::AGENT_DATE_FORMAT;

#[derive(Debug)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn id(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn object(description: &str) -> Value {
    json!({ "type": "object", "description": description })
}

fn html(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn agent_date(description: &str) -> Value {
    json!({
        "type": "string",
        "description": format!("{description} Format {AGENT_DATE_FORMAT}, e.g. 05-12-2025 3:00PM."),
    })
}

fn integer(description: &str) -> Value {
    json!({ "type": "integer", "minimum": 0, "description": description })
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        // Courses
        ToolDefinition {
            name: "tc_create_course",
            description: "Create a new course. course_data holds courseName, subTitle, description and optional courseCategories [{categoryName}].",
            input_schema: schema(
                json!({ "course_data": object("Course fields: courseName, subTitle, description, courseCategories.") }),
                &["course_data"],
            ),
        },
        ToolDefinition {
            name: "tc_get_course",
            description: "Fetch a single course by id.",
            input_schema: schema(json!({ "course_id": id("Course id.") }), &["course_id"]),
        },
        ToolDefinition {
            name: "tc_list_courses",
            description: "List the courses of the academy, optionally paged.",
            input_schema: schema(
                json!({
                    "limit": integer("Maximum number of courses to return."),
                    "si": integer("Start index for paging."),
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: "tc_update_course",
            description: "Update fields of an existing course.",
            input_schema: schema(
                json!({
                    "course_id": id("Course id."),
                    "updates": object("Course fields to change."),
                }),
                &["course_id", "updates"],
            ),
        },
        ToolDefinition {
            name: "tc_delete_course",
            description: "Delete a course permanently.",
            input_schema: schema(json!({ "course_id": id("Course id.") }), &["course_id"]),
        },
        ToolDefinition {
            name: "tc_get_course_sessions",
            description: "List the sessions (lessons) of a course with their ids, names and test links.",
            input_schema: schema(json!({ "course_id": id("Course id.") }), &["course_id"]),
        },
        // Chapters
        ToolDefinition {
            name: "tc_create_chapter",
            description: "Create a chapter (section) under a course. section_data holds courseId and name.",
            input_schema: schema(
                json!({ "section_data": object("Chapter fields: courseId, name.") }),
                &["section_data"],
            ),
        },
        ToolDefinition {
            name: "tc_get_chapter",
            description: "Fetch a single chapter by section id.",
            input_schema: schema(json!({ "section_id": id("Chapter (section) id.") }), &["section_id"]),
        },
        ToolDefinition {
            name: "tc_list_course_chapters",
            description: "List the chapters of a course.",
            input_schema: schema(json!({ "course_id": id("Course id.") }), &["course_id"]),
        },
        ToolDefinition {
            name: "tc_update_chapter",
            description: "Update a chapter's name and/or position.",
            input_schema: schema(
                json!({
                    "course_id": id("Course id."),
                    "section_id": id("Chapter (section) id."),
                    "updates": object("Chapter fields to change."),
                }),
                &["course_id", "section_id", "updates"],
            ),
        },
        ToolDefinition {
            name: "tc_delete_chapter",
            description: "Delete a chapter from a course.",
            input_schema: schema(
                json!({
                    "course_id": id("Course id."),
                    "section_id": id("Chapter (section) id."),
                }),
                &["course_id", "section_id"],
            ),
        },
        // Lessons
        ToolDefinition {
            name: "tc_create_lesson",
            description: "Create a lesson under a course/chapter and upload its HTML content in one step.",
            input_schema: schema(
                json!({
                    "session_data": object("Lesson fields: courseId, name, optional sectionId, deliveryMode, description."),
                    "content_html": html("Full HTML body of the lesson."),
                    "content_filename": { "type": "string", "description": "Display name of the uploaded content. Defaults to Content." },
                }),
                &["session_data", "content_html"],
            ),
        },
        ToolDefinition {
            name: "tc_get_lesson",
            description: "Fetch a single lesson by session id.",
            input_schema: schema(json!({ "session_id": id("Lesson (session) id.") }), &["session_id"]),
        },
        ToolDefinition {
            name: "tc_list_course_lessons",
            description: "List the lessons of a course.",
            input_schema: schema(json!({ "course_id": id("Course id.") }), &["course_id"]),
        },
        ToolDefinition {
            name: "tc_update_lesson",
            description: "Update fields of an existing lesson.",
            input_schema: schema(
                json!({
                    "session_id": id("Lesson (session) id."),
                    "updates": object("Lesson fields to change."),
                }),
                &["session_id", "updates"],
            ),
        },
        ToolDefinition {
            name: "tc_delete_lesson",
            description: "Delete a lesson and its materials.",
            input_schema: schema(json!({ "session_id": id("Lesson (session) id.") }), &["session_id"]),
        },
        ToolDefinition {
            name: "tc_upload_lesson_content",
            description: "Upload HTML content as a material of an existing lesson.",
            input_schema: schema(
                json!({
                    "session_id": id("Lesson (session) id."),
                    "content_html": html("HTML content to upload."),
                    "filename": { "type": "string", "description": "Display name of the material. Defaults to Content." },
                }),
                &["session_id", "content_html"],
            ),
        },
        ToolDefinition {
            name: "tc_get_lesson_materials",
            description: "List the materials attached to a lesson.",
            input_schema: schema(json!({ "session_id": id("Lesson (session) id.") }), &["session_id"]),
        },
        // Assignments
        ToolDefinition {
            name: "tc_create_assignment",
            description: "Create an assignment (deliveryMode 7) and attach rich-text instructions.",
            input_schema: schema(
                json!({
                    "assignment_data": object("Assignment fields: courseId, name, optional sectionId."),
                    "instruction_html": html("Instructions shown to learners."),
                    "instruction_filename": { "type": "string", "description": "Title of the instructions. Defaults to Instructions." },
                    "view_type": integer("Material view type. Defaults to 4."),
                }),
                &["assignment_data", "instruction_html"],
            ),
        },
        ToolDefinition {
            name: "tc_delete_assignment",
            description: "Delete an assignment by session id.",
            input_schema: schema(json!({ "session_id": id("Assignment (session) id.") }), &["session_id"]),
        },
        // Tests
        ToolDefinition {
            name: "tc_create_full_test",
            description: "Create a test under a lesson and add its questions in one step.",
            input_schema: schema(
                json!({
                    "session_id": id("Lesson (session) id."),
                    "name": { "type": "string", "description": "Test title." },
                    "description_html": html("Test instructions."),
                    "questions": object("Question body: {\"field\": [{fieldType, label, score, ...}]}."),
                }),
                &["session_id", "name", "questions"],
            ),
        },
        ToolDefinition {
            name: "tc_create_test_form",
            description: "Create an empty test form under a lesson. Returns form.formIdValue for adding questions.",
            input_schema: schema(
                json!({
                    "session_id": id("Lesson (session) id."),
                    "name": { "type": "string", "description": "Test title." },
                    "description_html": html("Test instructions."),
                }),
                &["session_id", "name"],
            ),
        },
        ToolDefinition {
            name: "tc_add_test_questions",
            description: "Add questions to an existing test form.",
            input_schema: schema(
                json!({
                    "session_id": id("Lesson (session) id."),
                    "form_id_value": id("form.formIdValue returned when the test form was created."),
                    "questions": object("Question body: {\"field\": [...]}."),
                }),
                &["session_id", "form_id_value", "questions"],
            ),
        },
        // Global live workshops
        ToolDefinition {
            name: "tc_create_workshop",
            description: "Create a global live workshop (not tied to a course).",
            input_schema: schema(
                json!({
                    "name": { "type": "string", "description": "Workshop title." },
                    "description_html": html("Workshop description."),
                    "start_time": agent_date("Start time."),
                    "end_time": agent_date("End time, after the start time."),
                }),
                &["name", "start_time", "end_time"],
            ),
        },
        ToolDefinition {
            name: "tc_update_workshop",
            description: "Update or cancel ({\"isCancelled\": true}) a global live workshop.",
            input_schema: schema(
                json!({
                    "session_id": id("Workshop (session) id."),
                    "updates": object("Workshop fields to change."),
                }),
                &["session_id", "updates"],
            ),
        },
        ToolDefinition {
            name: "tc_create_workshop_occurrence",
            description: "Create an occurrence (talk) of a workshop.",
            input_schema: schema(
                json!({ "talk_data": object("Talk fields: sessionId, scheduledTime, scheduledEndTime, durationTime, optional recurrence.") }),
                &["talk_data"],
            ),
        },
        ToolDefinition {
            name: "tc_update_workshop_occurrence",
            description: "Update or cancel a workshop occurrence (talk).",
            input_schema: schema(
                json!({
                    "talk_id": id("Talk id."),
                    "updates": object("Talk fields to change, e.g. isCancelled, informRegistrants."),
                }),
                &["talk_id", "updates"],
            ),
        },
        ToolDefinition {
            name: "tc_list_all_global_workshops",
            description: "List upcoming global live workshops.",
            input_schema: schema(
                json!({
                    "filter_type": integer("1 = your upcoming, 5 = all upcoming. Defaults to 5."),
                    "limit": integer("Page size. Defaults to 50."),
                    "si": integer("Start index. Defaults to 0."),
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: "tc_invite_user_to_session",
            description: "Invite a user by email to a live workshop session.",
            input_schema: schema(
                json!({
                    "session_id": id("Workshop (session) id."),
                    "email": { "type": "string", "description": "Email address to invite." },
                    "role": integer("Member role. Defaults to 3 (attendee)."),
                    "source": integer("Source indicator. Defaults to 1."),
                }),
                &["session_id", "email"],
            ),
        },
        // Course live workshops
        ToolDefinition {
            name: "tc_create_course_live_session",
            description: "Create a live workshop inside a course.",
            input_schema: schema(
                json!({
                    "course_id": id("Course id."),
                    "name": { "type": "string", "description": "Workshop title." },
                    "description_html": html("Workshop description."),
                    "start_time": agent_date("Start time."),
                    "end_time": agent_date("End time, after the start time."),
                }),
                &["course_id", "name", "start_time", "end_time"],
            ),
        },
        ToolDefinition {
            name: "tc_list_course_live_sessions",
            description: "List upcoming course live workshops.",
            input_schema: schema(
                json!({
                    "filter_type": integer("Defaults to 5 (all upcoming)."),
                    "limit": integer("Page size. Defaults to 50."),
                    "si": integer("Start index. Defaults to 0."),
                }),
                &[],
            ),
        },
        ToolDefinition {
            name: "tc_delete_course_live_session",
            description: "Delete a course live workshop by session id.",
            input_schema: schema(json!({ "session_id": id("Workshop (session) id.") }), &["session_id"]),
        },
        ToolDefinition {
            name: "tc_invite_learner",
            description: "Invite a learner to a course or to a course live workshop. Provide course_id or session_id.",
            input_schema: schema(
                json!({
                    "email": { "type": "string", "description": "Learner email." },
                    "first_name": { "type": "string" },
                    "last_name": { "type": "string" },
                    "course_id": id("Course id."),
                    "session_id": id("Course live workshop id."),
                    "is_access_granted": { "type": "boolean", "description": "Defaults to true." },
                    "expiry_time": integer("Access expiry as epoch milliseconds."),
                    "expiry_duration": { "type": "string", "description": "Access duration, e.g. 30d." },
                }),
                &["email", "first_name", "last_name"],
            ),
        },
        // Utilities
        ToolDefinition {
            name: "tc_convert_date",
            description: "Convert a DD-MM-YYYY H:MMAM/PM date to epoch milliseconds in the academy timezone.",
            input_schema: schema(
                json!({ "date": agent_date("Date to convert.") }),
                &["date"],
            ),
        },
    ]
}

pub fn tools_list_payload() -> Value {
    let tools: Vec<Value> = tool_definitions()
        .into_iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "inputSchema": tool.input_schema,
            })
        })
        .collect();
    json!({ "tools": tools })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tool_names_are_unique_and_prefixed() {
        let definitions = tool_definitions();
        let names: HashSet<&str> = definitions.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), definitions.len());
        assert!(names.iter().all(|name| name.starts_with("tc_")));
    }

    #[test]
    fn every_required_field_is_a_declared_property() {
        for tool in tool_definitions() {
            let properties = tool.input_schema["properties"].as_object().unwrap();
            for required in tool.input_schema["required"].as_array().unwrap() {
                let required = required.as_str().unwrap();
                assert!(
                    properties.contains_key(required),
                    "{} requires undeclared '{required}'",
                    tool.name
                );
            }
        }
    }
}
