//! CSV formats for attendance import and export.

use std::io::Write;
use std::path::Path;

use anyhow::Context;

use crate::domain::{AttendanceRecord, DATE_FORMAT};
use crate::error::{AttendError, AttendResult};
use crate::reconcile::{self, IssueKind, Observation, ReconciliationResult, RowIssue, Source};
use crate::store::{IdentityStore, Ledger, StoreResult};

pub const IMPORT_HEADER: [&str; 3] = ["student_index", "date", "status"];
pub const EXPORT_HEADER: [&str; 4] = ["Student Index", "Date", "Course", "Status"];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// A row the CSV reader itself could not decode. It is reported against its
/// row number and counted as skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadableRow {
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ImportBatch {
    pub observations: Vec<Observation>,
    pub unreadable: Vec<UnreadableRow>,
}

pub fn read_import_file(path: &Path) -> AttendResult<ImportBatch> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(AttendError::validation("Please upload a CSV file."));
    }
    let bytes = std::fs::read(path).map_err(|e| {
        AttendError::validation(format!("Error processing CSV file: {e}"))
    })?;
    parse_import(&bytes)
}

/// Parses an import file. A header other than `student_index,date,status`
/// rejects the whole file before any row is looked at.
pub fn parse_import(bytes: &[u8]) -> AttendResult<ImportBatch> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if std::str::from_utf8(bytes).is_err() {
        return Err(AttendError::validation(
            "Error processing CSV file: file is not valid UTF-8",
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let header_ok = match reader.headers() {
        Ok(h) => h.iter().eq(IMPORT_HEADER.iter().copied()),
        Err(_) => false,
    };
    if !header_ok {
        return Err(AttendError::validation(
            "CSV must have columns: student_index, date, status",
        ));
    }

    let mut batch = ImportBatch::default();
    for (i, record) in reader.records().enumerate() {
        let position = i + 2;
        match record {
            Ok(row) => {
                let field = |n: usize| row.get(n).unwrap_or("").trim();
                batch
                    .observations
                    .push(Observation::imported(position, field(0), field(1), field(2)));
            }
            Err(e) => batch.unreadable.push(UnreadableRow {
                position,
                message: e.to_string(),
            }),
        }
    }
    Ok(batch)
}

impl From<UnreadableRow> for RowIssue {
    fn from(row: UnreadableRow) -> Self {
        RowIssue {
            position: row.position,
            kind: IssueKind::Unreadable,
            message: row.message,
        }
    }
}

/// Reconciles a parsed file for `course`. Unreadable rows count as skipped
/// and are reported in row order with the rest.
pub fn import_batch<S>(
    store: &mut S,
    course: &str,
    batch: ImportBatch,
) -> StoreResult<ReconciliationResult>
where
    S: IdentityStore + Ledger,
{
    let mut result = reconcile::reconcile(store, course, Source::Import, &batch.observations)?;
    if !batch.unreadable.is_empty() {
        result.skipped += batch.unreadable.len();
        result
            .errors
            .extend(batch.unreadable.into_iter().map(RowIssue::from));
        result.errors.sort_by_key(|e| e.position);
    }
    Ok(result)
}

pub fn write_export<W: Write>(out: W, records: &[AttendanceRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(EXPORT_HEADER)?;
    for r in records {
        let date = r.date.format(DATE_FORMAT).to_string();
        writer.write_record([
            r.student_index.as_str(),
            date.as_str(),
            r.course_code.as_str(),
            r.status.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_to_file(path: &Path, records: &[AttendanceRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create output file {}", path.to_string_lossy()))?;
    write_export(file, records)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))
}
