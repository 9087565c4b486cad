//! Bulk attendance reconciliation.
//!
//! Turns a batch of raw `(student, status)` observations for one course into
//! ledger upserts, skip decisions and per-row issues, then commits the upserts
//! as one unit. Two sources feed it:
//!
//! - the interactive roster form, where every observation shares the batch
//!   date and an existing entry is overwritten;
//! - a CSV import, where each row carries its own date and an existing entry
//!   is left alone and counted as skipped.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::domain::{parse_date, AttendanceStatus, LedgerKey, LedgerUpsert};
use crate::store::{IdentityStore, Ledger, Roster, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Interactive { date: NaiveDate },
    Import,
}

impl Source {
    fn label(self) -> &'static str {
        match self {
            Source::Interactive { .. } => "interactive",
            Source::Import => "import",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Row number for imports (header is row 1), entry number for the form.
    pub position: usize,
    pub student_index: String,
    pub status: String,
    /// Raw row date; only read for imports.
    pub date: Option<String>,
}

impl Observation {
    pub fn marked(position: usize, student_index: &str, status: &str) -> Self {
        Self {
            position,
            student_index: student_index.to_string(),
            status: status.to_string(),
            date: None,
        }
    }

    pub fn imported(position: usize, student_index: &str, date: &str, status: &str) -> Self {
        Self {
            position,
            student_index: student_index.to_string(),
            status: status.to_string(),
            date: Some(date.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidStatus,
    StudentNotFound,
    InvalidDate,
    Unreadable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    pub position: usize,
    pub kind: IssueKind,
    pub message: String,
}

impl RowIssue {
    pub fn line(&self) -> String {
        format!("Row {}: {}", self.position, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub upserts: Vec<LedgerUpsert>,
    pub applied: usize,
    pub skipped: usize,
    pub errors: Vec<RowIssue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconciliationResult {
    pub applied: usize,
    pub skipped: usize,
    pub errors: Vec<RowIssue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSummary {
    pub shown: Vec<String>,
    pub remaining: usize,
}

impl ErrorSummary {
    pub fn notice(&self) -> Option<String> {
        if self.remaining == 0 {
            return None;
        }
        Some(format!(
            "First {} errors shown. {} more errors found.",
            self.shown.len(),
            self.remaining
        ))
    }
}

impl ReconciliationResult {
    pub fn error_summary(&self, limit: usize) -> ErrorSummary {
        let shown: Vec<String> = self.errors.iter().take(limit).map(RowIssue::line).collect();
        let remaining = self.errors.len() - shown.len();
        ErrorSummary { shown, remaining }
    }
}

/// Validates every observation and decides what to write, without writing.
pub fn plan<S>(
    store: &S,
    course: &str,
    source: Source,
    observations: &[Observation],
) -> StoreResult<Plan>
where
    S: IdentityStore + Ledger,
{
    let mut out = Plan::default();
    let mut pending: HashMap<LedgerKey, usize> = HashMap::new();

    for obs in observations {
        let Some(status) = AttendanceStatus::parse_markable(&obs.status) else {
            out.skipped += 1;
            out.errors.push(RowIssue {
                position: obs.position,
                kind: IssueKind::InvalidStatus,
                message: format!(
                    "Invalid status '{}' (must be 'Present' or 'Absent')",
                    obs.status
                ),
            });
            continue;
        };

        if store.find_student(&obs.student_index)?.is_none() {
            out.skipped += 1;
            out.errors.push(RowIssue {
                position: obs.position,
                kind: IssueKind::StudentNotFound,
                message: format!("Student {} not found", obs.student_index),
            });
            continue;
        }

        let date = match source {
            Source::Interactive { date } => date,
            Source::Import => {
                let raw = obs.date.as_deref().unwrap_or("");
                let Some(date) = parse_date(raw) else {
                    out.skipped += 1;
                    out.errors.push(RowIssue {
                        position: obs.position,
                        kind: IssueKind::InvalidDate,
                        message: format!("Invalid date format '{}' (use YYYY-MM-DD)", raw),
                    });
                    continue;
                };
                date
            }
        };

        let key = LedgerKey {
            student_index: obs.student_index.clone(),
            course_code: course.to_string(),
            date,
        };

        if let Some(&slot) = pending.get(&key) {
            match source {
                Source::Interactive { .. } => {
                    match &mut out.upserts[slot] {
                        LedgerUpsert::Insert { status: s, .. }
                        | LedgerUpsert::Overwrite { status: s, .. } => *s = status,
                    }
                    out.applied += 1;
                }
                Source::Import => out.skipped += 1,
            }
            continue;
        }

        let upsert = match (source, store.find_entry(&key)?) {
            (Source::Import, Some(_)) => {
                out.skipped += 1;
                continue;
            }
            (Source::Interactive { .. }, Some(existing)) => LedgerUpsert::Overwrite {
                id: existing.id,
                status,
            },
            (_, None) => LedgerUpsert::Insert {
                key: key.clone(),
                status,
            },
        };
        pending.insert(key, out.upserts.len());
        out.upserts.push(upsert);
        out.applied += 1;
    }

    Ok(out)
}

/// Plans the batch and commits every upsert in one unit.
pub fn reconcile<S>(
    store: &mut S,
    course: &str,
    source: Source,
    observations: &[Observation],
) -> StoreResult<ReconciliationResult>
where
    S: IdentityStore + Ledger,
{
    let plan = plan(store, course, source, observations)?;
    if !plan.upserts.is_empty() {
        store.apply(&plan.upserts)?;
    }
    tracing::info!(
        course,
        source = source.label(),
        applied = plan.applied,
        skipped = plan.skipped,
        errors = plan.errors.len(),
        "attendance batch reconciled"
    );
    Ok(ReconciliationResult {
        applied: plan.applied,
        skipped: plan.skipped,
        errors: plan.errors,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub index: String,
    pub name: String,
    pub status: AttendanceStatus,
    pub has_record: bool,
}

/// Enrolled students for `course` with their status on `date`.
///
/// Enrollments without a student identity are dropped. Students with no
/// entry yet default to Present.
pub fn load_roster<S>(store: &S, course: &str, date: NaiveDate) -> StoreResult<Vec<RosterEntry>>
where
    S: IdentityStore + Ledger + Roster,
{
    let mut out = Vec::new();
    for enrollment in store.enrollments_for_course(course)? {
        let Some(student) = store.find_student(&enrollment.student_index)? else {
            continue;
        };
        let existing = store.find_entry(&LedgerKey {
            student_index: student.index_number.clone(),
            course_code: course.to_string(),
            date,
        })?;
        out.push(RosterEntry {
            index: student.index_number,
            name: student.name,
            status: existing
                .as_ref()
                .map(|e| e.status)
                .unwrap_or(AttendanceStatus::Present),
            has_record: existing.is_some(),
        });
    }
    Ok(out)
}
