use super::handlers;
use super::helpers::HandlerErr;
use super::types::{AppState, Request};
use crate::auth::Principal;
use crate::error::AttendError;
use crate::ipc::error::err;

/// Resolves the request's session token to the principal it acts as.
fn authenticate(state: &AppState, req: &Request) -> Result<Principal, HandlerErr> {
    req.session
        .as_deref()
        .and_then(|token| state.sessions.resolve(token))
        .cloned()
        .ok_or_else(|| AttendError::Unauthenticated.into())
}

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    tracing::debug!(id = req.id.as_str(), method = req.method.as_str(), "dispatch");

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, &req) {
        return resp;
    }
    if !handlers::is_protected(&req.method) {
        return err(
            &req.id,
            "not_implemented",
            format!("unknown method: {}", req.method),
            None,
        );
    }

    let principal = match authenticate(state, &req) {
        Ok(p) => p,
        Err(e) => return e.response(&req.id),
    };
    if let Some(resp) = handlers::profile::try_handle(state, &req, &principal) {
        return resp;
    }
    if let Some(resp) = handlers::dashboard::try_handle(state, &req, &principal) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req, &principal) {
        return resp;
    }
    if let Some(resp) = handlers::enrollments::try_handle(state, &req, &principal) {
        return resp;
    }
    if let Some(resp) = handlers::users::try_handle(state, &req, &principal) {
        return resp;
    }
    if let Some(resp) = handlers::excuses::try_handle(state, &req, &principal) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
