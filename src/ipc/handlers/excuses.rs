use crate::auth::Principal;
use crate::documents::Upload;
use crate::error::AttendError;
use crate::excuse;
use crate::ipc::error::{message, ok};
use crate::ipc::helpers::{conn, get_opt_str, get_required_i64, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{ExcuseStore, SqliteStore};
use serde_json::json;
use std::path::PathBuf;

pub const METHODS: &[&str] = &[
    "excuses.mine",
    "excuses.submit",
    "excuses.pending",
    "excuses.approve",
    "excuses.reject",
];

fn excuses_mine(state: &AppState, principal: &Principal) -> Result<serde_json::Value, HandlerErr> {
    principal.require_student()?;
    let store = SqliteStore::new(conn(state)?);
    Ok(json!({
        "availableAbsences": excuse::available_absences(&store, &principal.index_number)?,
        "reports": store.excuses_for_student(&principal.index_number)?,
    }))
}

fn excuses_submit(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_student()?;
    let missing =
        || AttendError::validation("Please select an absence record and upload a document.");
    let attendance_id = get_required_i64(params, "attendanceId").map_err(|_| missing())?;
    let file_path = get_opt_str(params, "filePath")
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(missing)?;
    let upload = Upload::from_path(PathBuf::from(file_path), get_opt_str(params, "fileName"));
    let reason = get_opt_str(params, "reason");

    let docs = state.documents().ok_or_else(HandlerErr::no_workspace)?;
    let mut store = SqliteStore::new(conn(state)?);
    let report = excuse::submit(
        &mut store,
        &docs,
        principal,
        attendance_id,
        &upload,
        reason.as_deref(),
    )?;
    Ok(json!({
        "report": report,
        "messages": [message(
            "success",
            "Medical report uploaded successfully. Pending admin approval."
        )],
    }))
}

fn excuses_pending(state: &AppState, principal: &Principal) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let store = SqliteStore::new(conn(state)?);
    Ok(json!({ "reports": excuse::pending_views(&store)? }))
}

fn excuses_approve(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let report_id = get_required_i64(params, "reportId")?;
    let mut store = SqliteStore::new(conn(state)?);
    let record = excuse::approve(&mut store, principal, report_id)?;
    Ok(json!({
        "attendance": record,
        "messages": [message("success", "Medical report approved. Attendance status updated.")],
    }))
}

fn excuses_reject(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let report_id = get_required_i64(params, "reportId")?;
    let docs = state.documents().ok_or_else(HandlerErr::no_workspace)?;
    let mut store = SqliteStore::new(conn(state)?);
    let report = excuse::reject(&mut store, &docs, principal, report_id)?;
    Ok(json!({
        "report": report,
        "messages": [message("info", "Medical report rejected.")],
    }))
}

pub fn try_handle(
    state: &mut AppState,
    req: &Request,
    principal: &Principal,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "excuses.mine" => excuses_mine(state, principal),
        "excuses.submit" => excuses_submit(state, &req.params, principal),
        "excuses.pending" => excuses_pending(state, principal),
        "excuses.approve" => excuses_approve(state, &req.params, principal),
        "excuses.reject" => excuses_reject(state, &req.params, principal),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
