use crate::accounts::UserSummary;
use crate::auth::Principal;
use crate::domain::Role;
use crate::excuse;
use crate::ipc::error::ok;
use crate::ipc::helpers::{conn, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::stats;
use crate::store::{IdentityStore, Ledger, SqliteStore};
use serde_json::json;

pub const METHODS: &[&str] = &["student.dashboard", "admin.dashboard"];

fn student_dashboard(
    state: &AppState,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_student()?;
    let store = SqliteStore::new(conn(state)?);
    let records = store.entries_for_student(&principal.index_number)?;
    let monthly = stats::monthly_stats(&records);
    Ok(json!({
        "student": principal,
        "records": records,
        "monthlyStats": monthly,
    }))
}

fn admin_dashboard(state: &AppState, principal: &Principal) -> Result<serde_json::Value, HandlerErr> {
    principal.require_staff()?;
    let store = SqliteStore::new(conn(state)?);
    let is_administrator = principal.role == Role::Administrator;
    let users: Option<Vec<UserSummary>> = if is_administrator {
        Some(store.list_users()?.iter().map(UserSummary::from).collect())
    } else {
        None
    };
    Ok(json!({
        "records": store.all_entries()?,
        "users": users,
        "pendingReports": excuse::pending_views(&store)?,
        "isAdministrator": is_administrator,
    }))
}

pub fn try_handle(
    state: &mut AppState,
    req: &Request,
    principal: &Principal,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "student.dashboard" => student_dashboard(state, principal),
        "admin.dashboard" => admin_dashboard(state, principal),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
