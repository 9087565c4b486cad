use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use super::{ExcuseStore, IdentityStore, Ledger, Roster, StoreError, StoreResult};
use crate::domain::{
    AttendanceRecord, AttendanceStatus, Enrollment, LedgerKey, LedgerUpsert, MedicalExcuse,
    NewExcuse, NewUser, Role, User, DATE_FORMAT,
};

pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

type RawUser = (i64, String, String, String, String);
type RawEntry = (i64, String, String, String, String);
type RawExcuse = (
    i64,
    String,
    i64,
    String,
    String,
    Option<String>,
    i64,
    Option<String>,
    Option<String>,
);

const USER_COLS: &str = "id, index_number, password, role, name";
const ENTRY_COLS: &str = "id, student_index, course_code, date, status";
const EXCUSE_COLS: &str = "id, student_index, attendance_id, date_submitted, document_path, reason, approved, approved_by, approved_date";

fn raw_user(r: &Row<'_>) -> rusqlite::Result<RawUser> {
    Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
}

fn raw_entry(r: &Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
}

fn raw_excuse(r: &Row<'_>) -> rusqlite::Result<RawExcuse> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
        r.get(6)?,
        r.get(7)?,
        r.get(8)?,
    ))
}

fn corrupt(table: &'static str, message: String) -> StoreError {
    StoreError::Corrupt { table, message }
}

fn user_from_raw(raw: RawUser) -> StoreResult<User> {
    let (id, index_number, password_hash, role, name) = raw;
    let role =
        Role::parse(&role).ok_or_else(|| corrupt("users", format!("unknown role {role:?}")))?;
    Ok(User {
        id,
        index_number,
        password_hash,
        role,
        name,
    })
}

fn entry_from_raw(raw: RawEntry) -> StoreResult<AttendanceRecord> {
    let (id, student_index, course_code, date, status) = raw;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .map_err(|e| corrupt("attendance", format!("bad date {date:?}: {e}")))?;
    let status = AttendanceStatus::parse(&status)
        .ok_or_else(|| corrupt("attendance", format!("unknown status {status:?}")))?;
    Ok(AttendanceRecord {
        id,
        student_index,
        course_code,
        date,
        status,
    })
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt("medical_reports", format!("bad timestamp {s:?}: {e}")))
}

fn excuse_from_raw(raw: RawExcuse) -> StoreResult<MedicalExcuse> {
    let (
        id,
        student_index,
        attendance_id,
        date_submitted,
        document_path,
        reason,
        approved,
        approved_by,
        approved_date,
    ) = raw;
    Ok(MedicalExcuse {
        id,
        student_index,
        attendance_id,
        date_submitted: parse_timestamp(&date_submitted)?,
        document_path,
        reason,
        approved: approved != 0,
        approved_by,
        approved_date: approved_date.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn format_date(d: NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

impl IdentityStore for SqliteStore<'_> {
    fn find_user(&self, index_number: &str) -> StoreResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE index_number = ?"),
                [index_number],
                raw_user,
            )
            .optional()?
            .map(user_from_raw)
            .transpose()
    }

    fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users WHERE id = ?"),
                [id],
                raw_user,
            )
            .optional()?
            .map(user_from_raw)
            .transpose()
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLS} FROM users ORDER BY role, index_number"
        ))?;
        let rows = stmt
            .query_map([], raw_user)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(user_from_raw).collect()
    }

    fn insert_user(&mut self, user: &NewUser) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO users(index_number, password, role, name) VALUES(?, ?, ?, ?)",
            (
                &user.index_number,
                &user.password_hash,
                user.role.as_str(),
                &user.name,
            ),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        self.conn.execute("DELETE FROM users WHERE id = ?", [id])?;
        Ok(())
    }

    fn update_user(
        &mut self,
        id: i64,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        if let Some(name) = name {
            tx.execute("UPDATE users SET name = ? WHERE id = ?", (name, id))?;
        }
        if let Some(hash) = password_hash {
            tx.execute("UPDATE users SET password = ? WHERE id = ?", (hash, id))?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl Ledger for SqliteStore<'_> {
    fn find_entry(&self, key: &LedgerKey) -> StoreResult<Option<AttendanceRecord>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {ENTRY_COLS} FROM attendance
                     WHERE student_index = ? AND course_code = ? AND date = ?
                     ORDER BY id
                     LIMIT 1"
                ),
                (&key.student_index, &key.course_code, format_date(key.date)),
                raw_entry,
            )
            .optional()?
            .map(entry_from_raw)
            .transpose()
    }

    fn get_entry(&self, id: i64) -> StoreResult<Option<AttendanceRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {ENTRY_COLS} FROM attendance WHERE id = ?"),
                [id],
                raw_entry,
            )
            .optional()?
            .map(entry_from_raw)
            .transpose()
    }

    fn entries_for_student(&self, student_index: &str) -> StoreResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLS} FROM attendance
             WHERE student_index = ?
             ORDER BY date DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([student_index], raw_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(entry_from_raw).collect()
    }

    fn all_entries(&self) -> StoreResult<Vec<AttendanceRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLS} FROM attendance ORDER BY date DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([], raw_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(entry_from_raw).collect()
    }

    fn apply(&mut self, upserts: &[LedgerUpsert]) -> StoreResult<()> {
        // Dropping the transaction on an early return rolls the batch back.
        let tx = self.conn.unchecked_transaction()?;
        for upsert in upserts {
            match upsert {
                LedgerUpsert::Insert { key, status } => {
                    tx.execute(
                        "INSERT INTO attendance(student_index, course_code, date, status)
                         VALUES(?, ?, ?, ?)",
                        (
                            &key.student_index,
                            &key.course_code,
                            format_date(key.date),
                            status.as_str(),
                        ),
                    )?;
                }
                LedgerUpsert::Overwrite { id, status } => {
                    tx.execute(
                        "UPDATE attendance SET status = ? WHERE id = ?",
                        (status.as_str(), id),
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl Roster for SqliteStore<'_> {
    fn enrollments_for_course(&self, course_code: &str) -> StoreResult<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_index, course_code FROM student_courses
             WHERE course_code = ?
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([course_code], |r| {
                Ok(Enrollment {
                    id: r.get(0)?,
                    student_index: r.get(1)?,
                    course_code: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn all_enrollments(&self) -> StoreResult<Vec<Enrollment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_index, course_code FROM student_courses
             ORDER BY course_code, student_index",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Enrollment {
                    id: r.get(0)?,
                    student_index: r.get(1)?,
                    course_code: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn is_enrolled(&self, student_index: &str, course_code: &str) -> StoreResult<bool> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM student_courses WHERE student_index = ? AND course_code = ?",
                (student_index, course_code),
                |r| r.get::<_, i64>(0),
            )
            .optional()?
            .is_some())
    }

    fn enroll(&mut self, student_index: &str, course_code: &str) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO student_courses(student_index, course_code) VALUES(?, ?)",
            (student_index, course_code),
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}

impl ExcuseStore for SqliteStore<'_> {
    fn get_excuse(&self, id: i64) -> StoreResult<Option<MedicalExcuse>> {
        self.conn
            .query_row(
                &format!("SELECT {EXCUSE_COLS} FROM medical_reports WHERE id = ?"),
                [id],
                raw_excuse,
            )
            .optional()?
            .map(excuse_from_raw)
            .transpose()
    }

    fn excuse_for_entry(&self, attendance_id: i64) -> StoreResult<Option<MedicalExcuse>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {EXCUSE_COLS} FROM medical_reports
                     WHERE attendance_id = ?
                     ORDER BY id
                     LIMIT 1"
                ),
                [attendance_id],
                raw_excuse,
            )
            .optional()?
            .map(excuse_from_raw)
            .transpose()
    }

    fn excuses_for_student(&self, student_index: &str) -> StoreResult<Vec<MedicalExcuse>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXCUSE_COLS} FROM medical_reports
             WHERE student_index = ?
             ORDER BY date_submitted DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([student_index], raw_excuse)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(excuse_from_raw).collect()
    }

    fn pending_excuses(&self) -> StoreResult<Vec<MedicalExcuse>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EXCUSE_COLS} FROM medical_reports
             WHERE approved = 0
             ORDER BY date_submitted DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([], raw_excuse)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(excuse_from_raw).collect()
    }

    fn insert_excuse(&mut self, excuse: &NewExcuse) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO medical_reports(student_index, attendance_id, date_submitted, document_path, reason, approved)
             VALUES(?, ?, ?, ?, ?, 0)",
            (
                &excuse.student_index,
                excuse.attendance_id,
                excuse.date_submitted.to_rfc3339(),
                &excuse.document_path,
                &excuse.reason,
            ),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn approve_excuse(
        &mut self,
        id: i64,
        approved_by: &str,
        approved_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE attendance SET status = ?
             WHERE id = (SELECT attendance_id FROM medical_reports WHERE id = ?)",
            (AttendanceStatus::Medical.as_str(), id),
        )?;
        tx.execute(
            "UPDATE medical_reports
             SET approved = 1, approved_by = ?, approved_date = ?
             WHERE id = ?",
            (approved_by, approved_at.to_rfc3339(), id),
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_excuse(&mut self, id: i64) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM medical_reports WHERE id = ?", [id])?;
        Ok(())
    }
}
