use crate::auth::Principal;
use crate::domain::DATE_FORMAT;
use crate::error::AttendError;
use crate::exchange;
use crate::ipc::error::{message, ok};
use crate::ipc::helpers::{
    conn, get_course, get_opt_str, get_required_date, get_required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::reconcile::{self, Observation, ReconciliationResult, Source};
use crate::store::{Ledger, SqliteStore};
use serde_json::json;
use std::path::PathBuf;

pub const METHODS: &[&str] = &[
    "attendance.mark",
    "attendance.rosterLoad",
    "attendance.bulkMark",
    "attendance.importCsv",
    "attendance.exportCsv",
];

/// Row errors as warning lines, capped at the configured limit.
fn issue_messages(result: &ReconciliationResult, limit: usize) -> Vec<serde_json::Value> {
    let summary = result.error_summary(limit);
    let mut out: Vec<_> = summary
        .shown
        .iter()
        .map(|line| message("warning", line.as_str()))
        .collect();
    if let Some(notice) = summary.notice() {
        out.push(message("warning", notice));
    }
    out
}

fn entry_field<'a>(entry: &'a serde_json::Value, key: &str) -> &'a str {
    entry.get(key).and_then(|v| v.as_str()).unwrap_or("").trim()
}

fn attendance_mark(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let course = get_course(params)?;
    let student_index = get_required_str(params, "studentIndex")?;
    let date = get_required_date(params, "date")?;
    let status = get_required_str(params, "status")?;

    let mut store = SqliteStore::new(conn(state)?);
    let obs = [Observation::marked(1, student_index.trim(), status.trim())];
    let result = reconcile::reconcile(&mut store, &course, Source::Interactive { date }, &obs)?;

    // A batch of one either lands or carries exactly one row issue.
    if let Some(issue) = result.errors.first() {
        return Err(match issue.kind {
            reconcile::IssueKind::StudentNotFound => {
                AttendError::not_found(format!("Student {} not found.", student_index.trim()))
            }
            _ => AttendError::validation(issue.message.clone()),
        }
        .into());
    }
    Ok(json!({
        "result": result,
        "messages": [message("success", "Attendance marked successfully.")],
    }))
}

fn roster_load(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let course = get_course(params)?;
    let date = get_required_date(params, "date")?;

    let store = SqliteStore::new(conn(state)?);
    let students = reconcile::load_roster(&store, &course, date)?;
    let mut messages = Vec::new();
    if students.is_empty() {
        messages.push(message(
            "warning",
            format!("No students enrolled in {course}"),
        ));
    }
    Ok(json!({
        "course": course,
        "date": date.format(DATE_FORMAT).to_string(),
        "students": students,
        "messages": messages,
    }))
}

fn bulk_mark(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let course = get_course(params)?;
    let date = get_required_date(params, "date")?;
    let entries = params
        .get("entries")
        .and_then(|v| v.as_array())
        .ok_or_else(|| HandlerErr::bad_params("missing entries"))?;

    if entries.is_empty() {
        return Ok(json!({
            "result": ReconciliationResult::default(),
            "messages": [message("warning", "No students selected.")],
        }));
    }

    let observations: Vec<Observation> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            Observation::marked(i + 1, entry_field(e, "studentIndex"), entry_field(e, "status"))
        })
        .collect();

    let mut store = SqliteStore::new(conn(state)?);
    let result =
        reconcile::reconcile(&mut store, &course, Source::Interactive { date }, &observations)?;

    let mut messages = Vec::new();
    if result.applied > 0 {
        messages.push(message(
            "success",
            format!(
                "Attendance marked for {} on {}",
                course,
                date.format(DATE_FORMAT)
            ),
        ));
    }
    messages.extend(issue_messages(&result, state.config.error_detail_limit));
    Ok(json!({ "result": result, "messages": messages }))
}

fn import_csv(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let course = get_course(params)?;
    let in_path = get_opt_str(params, "inPath")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AttendError::validation("Please select a CSV file."))?;

    let batch = exchange::read_import_file(&PathBuf::from(&in_path)).map_err(|e| {
        tracing::warn!(path = in_path.as_str(), error = %e, "import rejected");
        e
    })?;
    let mut store = SqliteStore::new(conn(state)?);
    let result = exchange::import_batch(&mut store, &course, batch)?;

    let mut messages = vec![message(
        "success",
        format!(
            "Uploaded {} records successfully for {}. Skipped {} records.",
            result.applied, course, result.skipped
        ),
    )];
    messages.extend(issue_messages(&result, state.config.error_detail_limit));
    Ok(json!({ "result": result, "messages": messages }))
}

fn export_csv(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_administrator()?;
    let out_path = PathBuf::from(get_required_str(params, "outPath")?);
    let store = SqliteStore::new(conn(state)?);
    let records = store.all_entries()?;
    exchange::export_to_file(&out_path, &records).map_err(|e| HandlerErr {
        code: "io_failed",
        message: format!("{e:?}"),
        details: None,
    })?;
    tracing::info!(path = %out_path.display(), rows = records.len(), "attendance exported");
    Ok(json!({
        "path": out_path.to_string_lossy(),
        "rows": records.len(),
    }))
}

pub fn try_handle(
    state: &mut AppState,
    req: &Request,
    principal: &Principal,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.mark" => attendance_mark(state, &req.params, principal),
        "attendance.rosterLoad" => roster_load(state, &req.params, principal),
        "attendance.bulkMark" => bulk_mark(state, &req.params, principal),
        "attendance.importCsv" => import_csv(state, &req.params, principal),
        "attendance.exportCsv" => export_csv(state, &req.params, principal),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
