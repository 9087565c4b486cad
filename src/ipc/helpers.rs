use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

use crate::domain::parse_date;
use crate::error::AttendError;
use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::store::StoreError;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn no_workspace() -> Self {
        Self {
            code: "no_workspace",
            message: "select a workspace first".to_string(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<AttendError> for HandlerErr {
    fn from(e: AttendError) -> Self {
        let details = match e {
            AttendError::Unauthenticated => Some(json!({ "redirect": "auth.login" })),
            _ => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        AttendError::from(e).into()
    }
}

pub fn conn(state: &AppState) -> Result<&Connection, HandlerErr> {
    state.db.as_ref().ok_or_else(HandlerErr::no_workspace)
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    let v = params
        .get(key)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    // Form posts send numeric ids as strings.
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an integer", key)))
}

pub fn get_required_date(params: &serde_json::Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    let raw = get_required_str(params, key)?;
    parse_date(&raw).ok_or_else(|| {
        AttendError::validation(format!("Invalid date format '{}' (use YYYY-MM-DD)", raw)).into()
    })
}

/// A required, non-blank course code.
pub fn get_course(params: &serde_json::Value) -> Result<String, HandlerErr> {
    let course = get_opt_str(params, "course").unwrap_or_default();
    let course = course.trim();
    if course.is_empty() {
        return Err(AttendError::validation("Please select a course.").into());
    }
    Ok(course.to_string())
}
