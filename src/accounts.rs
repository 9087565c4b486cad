use serde::Serialize;

use crate::auth::{self, Principal};
use crate::domain::{Enrollment, NewUser, Role, User};
use crate::error::{AttendError, AttendResult};
use crate::store::{IdentityStore, Roster};

/// A user as shown to staff; the credential hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub index_number: String,
    pub name: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            index_number: user.index_number.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserDraft {
    pub index_number: String,
    pub name: String,
    pub password: String,
    pub role: String,
}

pub fn create_user<S: IdentityStore>(store: &mut S, draft: &UserDraft) -> AttendResult<User> {
    let index_number = draft.index_number.trim();
    let name = draft.name.trim();
    if index_number.is_empty() || name.is_empty() || draft.password.is_empty() {
        return Err(AttendError::validation(
            "index number, name and password are required",
        ));
    }
    let role = Role::parse(&draft.role)
        .ok_or_else(|| AttendError::validation(format!("unknown role '{}'", draft.role)))?;
    if store.find_user(index_number)?.is_some() {
        return Err(AttendError::conflict("User already exists."));
    }

    let new_user = NewUser {
        index_number: index_number.to_string(),
        password_hash: auth::hash_password(&draft.password)?,
        role,
        name: name.to_string(),
    };
    let id = store.insert_user(&new_user)?;
    tracing::info!(index = index_number, role = role.as_str(), "user added");
    Ok(User {
        id,
        index_number: new_user.index_number,
        password_hash: new_user.password_hash,
        role,
        name: new_user.name,
    })
}

pub fn remove_user<S: IdentityStore>(store: &mut S, index_number: &str) -> AttendResult<User> {
    let user = store
        .find_user(index_number.trim())?
        .ok_or_else(|| AttendError::not_found("User not found."))?;
    store.delete_user(user.id)?;
    tracing::info!(index = user.index_number.as_str(), "user removed");
    Ok(user)
}

pub fn reset_password<S: IdentityStore>(
    store: &mut S,
    index_number: &str,
    new_password: &str,
) -> AttendResult<()> {
    if new_password.is_empty() {
        return Err(AttendError::validation("new password is required"));
    }
    let user = store
        .find_user(index_number.trim())?
        .ok_or_else(|| AttendError::not_found("User not found."))?;
    let hash = auth::hash_password(new_password)?;
    store.update_user(user.id, None, Some(&hash))?;
    tracing::info!(index = user.index_number.as_str(), "password reset");
    Ok(())
}

/// Blank fields are left unchanged.
pub fn update_profile<S: IdentityStore>(
    store: &mut S,
    principal: &Principal,
    name: Option<&str>,
    password: Option<&str>,
) -> AttendResult<User> {
    let name = name.map(str::trim).filter(|s| !s.is_empty());
    let hash = match password.filter(|s| !s.is_empty()) {
        Some(p) => Some(auth::hash_password(p)?),
        None => None,
    };
    store.update_user(principal.user_id, name, hash.as_deref())?;
    store
        .find_user_by_id(principal.user_id)?
        .ok_or_else(|| AttendError::not_found("User not found."))
}

pub fn enroll_student<S>(
    store: &mut S,
    student_index: &str,
    course_code: &str,
) -> AttendResult<Enrollment>
where
    S: IdentityStore + Roster,
{
    let student_index = student_index.trim();
    let course_code = course_code.trim();
    if course_code.is_empty() {
        return Err(AttendError::validation("Please select a course."));
    }
    if store.find_student(student_index)?.is_none() {
        return Err(AttendError::not_found(format!(
            "Student {student_index} not found."
        )));
    }
    if store.is_enrolled(student_index, course_code)? {
        return Err(AttendError::conflict(format!(
            "Student {student_index} is already enrolled in {course_code}."
        )));
    }
    let id = store.enroll(student_index, course_code)?;
    tracing::info!(student = student_index, course = course_code, "student enrolled");
    Ok(Enrollment {
        id,
        student_index: student_index.to_string(),
        course_code: course_code.to_string(),
    })
}
