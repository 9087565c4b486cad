use crate::accounts::{self, UserSummary};
use crate::auth::Principal;
use crate::error::AttendError;
use crate::ipc::error::{message, ok};
use crate::ipc::helpers::{conn, get_opt_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{IdentityStore, SqliteStore};
use serde_json::json;

pub const METHODS: &[&str] = &["profile.get", "profile.update"];

fn profile_get(state: &AppState, principal: &Principal) -> Result<serde_json::Value, HandlerErr> {
    let store = SqliteStore::new(conn(state)?);
    let user = store
        .find_user_by_id(principal.user_id)?
        .ok_or_else(|| AttendError::not_found("User not found."))?;
    Ok(json!({ "user": UserSummary::from(&user) }))
}

fn profile_update(
    state: &mut AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_opt_str(params, "name");
    let password = get_opt_str(params, "password");
    let user = {
        let mut store = SqliteStore::new(conn(state)?);
        accounts::update_profile(&mut store, principal, name.as_deref(), password.as_deref())?
    };
    state.sessions.rename_user(user.id, &user.name);
    tracing::info!(index = user.index_number.as_str(), "profile updated");
    Ok(json!({
        "user": UserSummary::from(&user),
        "messages": [message("success", "Profile updated successfully.")],
    }))
}

pub fn try_handle(
    state: &mut AppState,
    req: &Request,
    principal: &Principal,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "profile.get" => profile_get(state, principal),
        "profile.update" => profile_update(state, &req.params, principal),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
