use crate::accounts;
use crate::auth::Principal;
use crate::domain::COURSES;
use crate::ipc::error::{message, ok};
use crate::ipc::helpers::{conn, get_course, get_opt_str, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{Roster, SqliteStore};
use serde_json::json;

pub const METHODS: &[&str] = &["courses.list", "enrollments.list", "enrollments.add"];

fn courses_list() -> Result<serde_json::Value, HandlerErr> {
    let courses: Vec<_> = COURSES
        .iter()
        .map(|(code, title)| json!({ "code": code, "title": title }))
        .collect();
    Ok(json!({ "courses": courses }))
}

fn enrollments_list(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let store = SqliteStore::new(conn(state)?);
    let enrollments = match get_opt_str(params, "course")
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
    {
        Some(course) => store.enrollments_for_course(&course)?,
        None => store.all_enrollments()?,
    };
    Ok(json!({ "enrollments": enrollments }))
}

fn enrollments_add(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let student_index = get_required_str(params, "studentIndex")?;
    let course = get_course(params)?;
    let mut store = SqliteStore::new(conn(state)?);
    let enrollment = accounts::enroll_student(&mut store, &student_index, &course)?;
    let text = format!(
        "Student {} enrolled in {}.",
        enrollment.student_index, enrollment.course_code
    );
    Ok(json!({
        "enrollment": enrollment,
        "messages": [message("success", text)],
    }))
}

pub fn try_handle(
    state: &mut AppState,
    req: &Request,
    principal: &Principal,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "courses.list" => courses_list(),
        "enrollments.list" => enrollments_list(state, &req.params, principal),
        "enrollments.add" => enrollments_add(state, &req.params, principal),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
