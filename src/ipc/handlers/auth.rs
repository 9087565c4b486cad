use crate::accounts;
use crate::auth;
use crate::error::AttendError;
use crate::ipc::error::{message, ok};
use crate::ipc::helpers::{conn, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::SqliteStore;
use serde_json::json;

fn login(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let index_number = get_required_str(params, "indexNumber")?;
    let password = get_required_str(params, "password")?;

    let principal = {
        let store = SqliteStore::new(conn(state)?);
        match auth::authenticate(&store, &index_number, &password) {
            Ok(p) => p,
            Err(e) => {
                if matches!(e, AttendError::InvalidCredentials) {
                    tracing::warn!(index = index_number.as_str(), "rejected login");
                }
                return Err(e.into());
            }
        }
    };
    let token = state.sessions.open(principal.clone());
    tracing::info!(
        index = principal.index_number.as_str(),
        role = principal.role.as_str(),
        "login"
    );
    Ok(json!({
        "session": token,
        "principal": principal,
        "messages": [message("success", format!("Welcome, {}!", principal.name))],
    }))
}

fn logout(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let closed = req
        .session
        .as_deref()
        .map(|t| state.sessions.close(t))
        .unwrap_or(false);
    Ok(json!({
        "closed": closed,
        "messages": [message("info", "You have been logged out.")],
    }))
}

fn reset_password(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let index_number = get_required_str(params, "indexNumber")?;
    let new_password = get_required_str(params, "newPassword")?;
    let mut store = SqliteStore::new(conn(state)?);
    accounts::reset_password(&mut store, &index_number, &new_password)?;
    Ok(json!({
        "messages": [message("success", "Password reset successful. Please log in.")],
    }))
}

/// Methods that run without a session.
pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "auth.login" => login(state, &req.params),
        "auth.logout" => logout(state, req),
        "auth.resetPassword" => reset_password(state, &req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
