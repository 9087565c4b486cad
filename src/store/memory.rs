use chrono::{DateTime, Utc};

use super::{ExcuseStore, IdentityStore, Ledger, Roster, StoreResult};
use crate::domain::{
    AttendanceRecord, AttendanceStatus, Enrollment, LedgerKey, LedgerUpsert, MedicalExcuse,
    NewExcuse, NewUser, Role, User,
};

/// Vec-backed store for unit tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Vec<User>,
    entries: Vec<AttendanceRecord>,
    enrollments: Vec<Enrollment>,
    excuses: Vec<MedicalExcuse>,
    next_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_student(&mut self, index: &str, name: &str) -> i64 {
        self.add_user(index, name, Role::Student)
    }

    pub fn add_user(&mut self, index: &str, name: &str, role: Role) -> i64 {
        let id = self.next_id();
        self.users.push(User {
            id,
            index_number: index.to_string(),
            password_hash: String::new(),
            role,
            name: name.to_string(),
        });
        id
    }

    pub fn entries(&self) -> &[AttendanceRecord] {
        &self.entries
    }

    pub fn excuses(&self) -> &[MedicalExcuse] {
        &self.excuses
    }

    pub fn remove_entry(&mut self, id: i64) {
        self.entries.retain(|e| e.id != id);
    }
}

impl IdentityStore for MemoryStore {
    fn find_user(&self, index_number: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.index_number == index_number)
            .cloned())
    }

    fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.id == id).cloned())
    }

    fn list_users(&self) -> StoreResult<Vec<User>> {
        let mut users = self.users.clone();
        users.sort_by(|a, b| {
            a.role
                .as_str()
                .cmp(b.role.as_str())
                .then_with(|| a.index_number.cmp(&b.index_number))
        });
        Ok(users)
    }

    fn insert_user(&mut self, user: &NewUser) -> StoreResult<i64> {
        let id = self.next_id();
        self.users.push(User {
            id,
            index_number: user.index_number.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            name: user.name.clone(),
        });
        Ok(id)
    }

    fn delete_user(&mut self, id: i64) -> StoreResult<()> {
        self.users.retain(|u| u.id != id);
        Ok(())
    }

    fn update_user(
        &mut self,
        id: i64,
        name: Option<&str>,
        password_hash: Option<&str>,
    ) -> StoreResult<()> {
        if let Some(user) = self.users.iter_mut().find(|u| u.id == id) {
            if let Some(name) = name {
                user.name = name.to_string();
            }
            if let Some(hash) = password_hash {
                user.password_hash = hash.to_string();
            }
        }
        Ok(())
    }
}

impl Ledger for MemoryStore {
    fn find_entry(&self, key: &LedgerKey) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.entries.iter().find(|e| e.key() == *key).cloned())
    }

    fn get_entry(&self, id: i64) -> StoreResult<Option<AttendanceRecord>> {
        Ok(self.entries.iter().find(|e| e.id == id).cloned())
    }

    fn entries_for_student(&self, student_index: &str) -> StoreResult<Vec<AttendanceRecord>> {
        let mut rows: Vec<_> = self
            .entries
            .iter()
            .filter(|e| e.student_index == student_index)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    fn all_entries(&self) -> StoreResult<Vec<AttendanceRecord>> {
        let mut rows = self.entries.clone();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    fn apply(&mut self, upserts: &[LedgerUpsert]) -> StoreResult<()> {
        for upsert in upserts {
            match upsert {
                LedgerUpsert::Insert { key, status } => {
                    let id = self.next_id();
                    self.entries.push(AttendanceRecord {
                        id,
                        student_index: key.student_index.clone(),
                        course_code: key.course_code.clone(),
                        date: key.date,
                        status: *status,
                    });
                }
                LedgerUpsert::Overwrite { id, status } => {
                    if let Some(e) = self.entries.iter_mut().find(|e| e.id == *id) {
                        e.status = *status;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Roster for MemoryStore {
    fn enrollments_for_course(&self, course_code: &str) -> StoreResult<Vec<Enrollment>> {
        Ok(self
            .enrollments
            .iter()
            .filter(|e| e.course_code == course_code)
            .cloned()
            .collect())
    }

    fn all_enrollments(&self) -> StoreResult<Vec<Enrollment>> {
        let mut rows = self.enrollments.clone();
        rows.sort_by(|a, b| {
            a.course_code
                .cmp(&b.course_code)
                .then_with(|| a.student_index.cmp(&b.student_index))
        });
        Ok(rows)
    }

    fn is_enrolled(&self, student_index: &str, course_code: &str) -> StoreResult<bool> {
        Ok(self
            .enrollments
            .iter()
            .any(|e| e.student_index == student_index && e.course_code == course_code))
    }

    fn enroll(&mut self, student_index: &str, course_code: &str) -> StoreResult<i64> {
        let id = self.next_id();
        self.enrollments.push(Enrollment {
            id,
            student_index: student_index.to_string(),
            course_code: course_code.to_string(),
        });
        Ok(id)
    }
}

impl ExcuseStore for MemoryStore {
    fn get_excuse(&self, id: i64) -> StoreResult<Option<MedicalExcuse>> {
        Ok(self.excuses.iter().find(|x| x.id == id).cloned())
    }

    fn excuse_for_entry(&self, attendance_id: i64) -> StoreResult<Option<MedicalExcuse>> {
        Ok(self
            .excuses
            .iter()
            .find(|x| x.attendance_id == attendance_id)
            .cloned())
    }

    fn excuses_for_student(&self, student_index: &str) -> StoreResult<Vec<MedicalExcuse>> {
        let mut rows: Vec<_> = self
            .excuses
            .iter()
            .filter(|x| x.student_index == student_index)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.date_submitted
                .cmp(&a.date_submitted)
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    fn pending_excuses(&self) -> StoreResult<Vec<MedicalExcuse>> {
        let mut rows: Vec<_> = self.excuses.iter().filter(|x| !x.approved).cloned().collect();
        rows.sort_by(|a, b| {
            b.date_submitted
                .cmp(&a.date_submitted)
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    fn insert_excuse(&mut self, excuse: &NewExcuse) -> StoreResult<i64> {
        let id = self.next_id();
        self.excuses.push(MedicalExcuse {
            id,
            student_index: excuse.student_index.clone(),
            attendance_id: excuse.attendance_id,
            date_submitted: excuse.date_submitted,
            document_path: excuse.document_path.clone(),
            reason: excuse.reason.clone(),
            approved: false,
            approved_by: None,
            approved_date: None,
        });
        Ok(id)
    }

    fn approve_excuse(
        &mut self,
        id: i64,
        approved_by: &str,
        approved_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let Some(excuse) = self.excuses.iter_mut().find(|x| x.id == id) else {
            return Ok(());
        };
        excuse.approved = true;
        excuse.approved_by = Some(approved_by.to_string());
        excuse.approved_date = Some(approved_at);
        let attendance_id = excuse.attendance_id;
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == attendance_id) {
            entry.status = AttendanceStatus::Medical;
        }
        Ok(())
    }

    fn delete_excuse(&mut self, id: i64) -> StoreResult<()> {
        self.excuses.retain(|x| x.id != id);
        Ok(())
    }
}
