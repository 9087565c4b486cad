//! Medical excuse lifecycle: a student submits a document against one of
//! their absences, staff approve it (the absence becomes Medical) or reject
//! it (the submission disappears, the absence stays).

use chrono::Utc;
use serde::Serialize;
use std::path::Path;

use crate::auth::Principal;
use crate::documents::{DocumentStore, Upload};
use crate::domain::{AttendanceRecord, AttendanceStatus, ExcuseState, MedicalExcuse, NewExcuse};
use crate::error::{AttendError, AttendResult};
use crate::store::{ExcuseStore, Ledger};

pub fn submit<S>(
    store: &mut S,
    docs: &DocumentStore,
    student: &Principal,
    attendance_id: i64,
    upload: &Upload,
    reason: Option<&str>,
) -> AttendResult<MedicalExcuse>
where
    S: Ledger + ExcuseStore,
{
    student.require_student()?;
    docs.check(upload)?;

    let entry = store
        .get_entry(attendance_id)?
        .filter(|e| e.student_index == student.index_number)
        .filter(|e| e.status == AttendanceStatus::Absent)
        .ok_or_else(|| AttendError::validation("Invalid attendance record."))?;
    if store.excuse_for_entry(entry.id)?.is_some() {
        return Err(AttendError::conflict(
            "Medical report already submitted for this absence.",
        ));
    }

    let saved = docs.save(&student.index_number, entry.id, upload)?;
    let new = NewExcuse {
        student_index: student.index_number.clone(),
        attendance_id: entry.id,
        date_submitted: Utc::now(),
        document_path: saved.to_string_lossy().to_string(),
        reason: reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
    };
    let id = match store.insert_excuse(&new) {
        Ok(id) => id,
        Err(e) => {
            docs.remove(&saved);
            return Err(e.into());
        }
    };
    tracing::info!(
        excuse = id,
        student = new.student_index.as_str(),
        attendance = entry.id,
        "medical report submitted"
    );
    Ok(MedicalExcuse {
        id,
        student_index: new.student_index,
        attendance_id: new.attendance_id,
        date_submitted: new.date_submitted,
        document_path: new.document_path,
        reason: new.reason,
        approved: false,
        approved_by: None,
        approved_date: None,
    })
}

fn submitted<S: ExcuseStore>(store: &S, excuse_id: i64) -> AttendResult<MedicalExcuse> {
    let excuse = store
        .get_excuse(excuse_id)?
        .ok_or_else(|| AttendError::not_found("Medical report not found."))?;
    if excuse.state() == ExcuseState::Approved {
        return Err(AttendError::conflict("Medical report was already approved."));
    }
    Ok(excuse)
}

/// Returns the ledger entry as it reads after the flip to Medical.
pub fn approve<S>(
    store: &mut S,
    approver: &Principal,
    excuse_id: i64,
) -> AttendResult<AttendanceRecord>
where
    S: Ledger + ExcuseStore,
{
    approver.require_staff()?;
    let excuse = submitted(store, excuse_id)?;
    let mut entry = store.get_entry(excuse.attendance_id)?.ok_or_else(|| {
        AttendError::not_found(format!(
            "broken link: attendance record {} no longer exists",
            excuse.attendance_id
        ))
    })?;

    store.approve_excuse(excuse.id, &approver.index_number, Utc::now())?;
    entry.status = AttendanceStatus::Medical;
    tracing::info!(
        excuse = excuse.id,
        attendance = entry.id,
        approved_by = approver.index_number.as_str(),
        "medical report approved"
    );
    Ok(entry)
}

pub fn reject<S>(
    store: &mut S,
    docs: &DocumentStore,
    reviewer: &Principal,
    excuse_id: i64,
) -> AttendResult<MedicalExcuse>
where
    S: ExcuseStore,
{
    reviewer.require_staff()?;
    let excuse = submitted(store, excuse_id)?;
    store.delete_excuse(excuse.id)?;
    docs.remove(Path::new(&excuse.document_path));
    tracing::info!(
        excuse = excuse.id,
        reviewer = reviewer.index_number.as_str(),
        "medical report rejected"
    );
    Ok(excuse)
}

/// The student's Absent entries that no excuse references yet, newest first.
pub fn available_absences<S>(store: &S, student_index: &str) -> AttendResult<Vec<AttendanceRecord>>
where
    S: Ledger + ExcuseStore,
{
    let mut open = Vec::new();
    for entry in store.entries_for_student(student_index)? {
        if entry.status == AttendanceStatus::Absent && store.excuse_for_entry(entry.id)?.is_none()
        {
            open.push(entry);
        }
    }
    Ok(open)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingExcuseView {
    #[serde(flatten)]
    pub excuse: MedicalExcuse,
    /// `None` when the referenced entry is gone.
    pub attendance: Option<AttendanceRecord>,
}

pub fn pending_views<S>(store: &S) -> AttendResult<Vec<PendingExcuseView>>
where
    S: Ledger + ExcuseStore,
{
    store
        .pending_excuses()?
        .into_iter()
        .map(|excuse| {
            let attendance = store.get_entry(excuse.attendance_id)?;
            Ok(PendingExcuseView { excuse, attendance })
        })
        .collect()
}
