//! Persistence ports for the attendance core.
//!
//! The reconciliation engine and the excuse workflow only talk to these
//! traits. `SqliteStore` backs the running sidecar; unit tests swap in
//! `MemoryStore`.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    AttendanceRecord, Enrollment, LedgerKey, LedgerUpsert, MedicalExcuse, NewExcuse, NewUser,
    Role, User,
};

#[cfg(test)]
pub mod memory;
pub mod sqlite;

#[cfg(test)]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt row in {table}: {message}")]
    Corrupt {
        table: &'static str,
        message: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

pub trait IdentityStore {
    fn find_user(&self, index_number: &str) -> StoreResult<Option<User>>;
    fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    /// Users ordered by role, then index number.
    fn list_users(&self) -> StoreResult<Vec<User>>;
    fn insert_user(&mut self, user: &NewUser) -> StoreResult<i64>;
    fn delete_user(&mut self, id: i64) -> StoreResult<()>;
    fn update_user(
        &mut self,
        id: i64,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> StoreResult<()>;

    fn find_student(&self, index_number: &str) -> StoreResult<Option<User>> {
        Ok(self
            .find_user(index_number)?
            .filter(|u| u.role == Role::Student))
    }
}

pub trait Ledger {
    fn find_entry(&self, key: &LedgerKey) -> StoreResult<Option<AttendanceRecord>>;
    fn get_entry(&self, id: i64) -> StoreResult<Option<AttendanceRecord>>;
    /// Entries for one student, newest date first.
    fn entries_for_student(&self, student_index: &str) -> StoreResult<Vec<AttendanceRecord>>;
    /// Every entry, newest date first.
    fn all_entries(&self) -> StoreResult<Vec<AttendanceRecord>>;
    /// Applies the whole batch or nothing.
    fn apply(&mut self, upserts: &[LedgerUpsert]) -> StoreResult<()>;
}

pub trait Roster {
    fn enrollments_for_course(&self, course_code: &str) -> StoreResult<Vec<Enrollment>>;
    fn all_enrollments(&self) -> StoreResult<Vec<Enrollment>>;
    fn is_enrolled(&self, student_index: &str, course_code: &str) -> StoreResult<bool>;
    fn enroll(&mut self, student_index: &str, course_code: &str) -> StoreResult<i64>;
}

pub trait ExcuseStore {
    fn get_excuse(&self, id: i64) -> StoreResult<Option<MedicalExcuse>>;
    fn excuse_for_entry(&self, attendance_id: i64) -> StoreResult<Option<MedicalExcuse>>;
    /// Newest submission first.
    fn excuses_for_student(&self, student_index: &str) -> StoreResult<Vec<MedicalExcuse>>;
    /// Unapproved excuses, newest submission first.
    fn pending_excuses(&self) -> StoreResult<Vec<MedicalExcuse>>;
    fn insert_excuse(&mut self, excuse: &NewExcuse) -> StoreResult<i64>;
    /// Marks the excuse approved and flips its ledger entry to Medical in one
    /// unit of work.
    fn approve_excuse(
        &mut self,
        id: i64,
        approved_by: &str,
        approved_at: DateTime<Utc>,
    ) -> StoreResult<()>;
    fn delete_excuse(&mut self, id: i64) -> StoreResult<()>;
}
