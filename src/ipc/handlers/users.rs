use crate::accounts::{self, UserDraft, UserSummary};
use crate::auth::Principal;
use crate::ipc::error::{message, ok};
use crate::ipc::helpers::{conn, get_opt_str, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{IdentityStore, SqliteStore};
use serde_json::json;

pub const METHODS: &[&str] = &["users.list", "users.create", "users.delete"];

fn users_list(state: &AppState, principal: &Principal) -> Result<serde_json::Value, HandlerErr> {
    principal.require_administrator()?;
    let store = SqliteStore::new(conn(state)?);
    let users: Vec<UserSummary> = store.list_users()?.iter().map(UserSummary::from).collect();
    Ok(json!({ "users": users }))
}

fn users_create(
    state: &AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_administrator()?;
    let draft = UserDraft {
        index_number: get_required_str(params, "indexNumber")?,
        name: get_required_str(params, "name")?,
        password: get_required_str(params, "password")?,
        role: get_opt_str(params, "role").unwrap_or_else(|| "student".to_string()),
    };
    let mut store = SqliteStore::new(conn(state)?);
    let user = accounts::create_user(&mut store, &draft)?;
    Ok(json!({
        "user": UserSummary::from(&user),
        "messages": [message("success", "User added successfully.")],
    }))
}

fn users_delete(
    state: &mut AppState,
    params: &serde_json::Value,
    principal: &Principal,
) -> Result<serde_json::Value, HandlerErr> {
    principal.require_administrator()?;
    let index_number = get_required_str(params, "indexNumber")?;
    let user = {
        let mut store = SqliteStore::new(conn(state)?);
        accounts::remove_user(&mut store, &index_number)?
    };
    let closed = state.sessions.close_user(user.id);
    Ok(json!({
        "user": UserSummary::from(&user),
        "sessionsClosed": closed,
        "messages": [message("success", "User removed successfully.")],
    }))
}

pub fn try_handle(
    state: &mut AppState,
    req: &Request,
    principal: &Principal,
) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "users.list" => users_list(state, principal),
        "users.create" => users_create(state, &req.params, principal),
        "users.delete" => users_delete(state, &req.params, principal),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
