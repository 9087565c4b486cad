use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
    Administrator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Administrator => "administrator",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim() {
            "student" => Some(Role::Student),
            "admin" => Some(Role::Admin),
            "administrator" => Some(Role::Administrator),
            _ => None,
        }
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Administrator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Medical,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::Medical => "Medical",
        }
    }

    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s {
            "Present" => Some(AttendanceStatus::Present),
            "Absent" => Some(AttendanceStatus::Absent),
            "Medical" => Some(AttendanceStatus::Medical),
            _ => None,
        }
    }

    /// Statuses an administrator may set directly; Medical only comes from an
    /// approved excuse.
    pub fn parse_markable(s: &str) -> Option<AttendanceStatus> {
        match Self::parse(s) {
            Some(AttendanceStatus::Medical) | None => None,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub index_number: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub index_number: String,
    pub password_hash: String,
    pub role: Role,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub student_index: String,
    pub course_code: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_index: String,
    pub course_code: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn key(&self) -> LedgerKey {
        LedgerKey {
            student_index: self.student_index.clone(),
            course_code: self.course_code.clone(),
            date: self.date,
        }
    }
}

/// One planned mutation of the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerUpsert {
    Insert {
        key: LedgerKey,
        status: AttendanceStatus,
    },
    Overwrite {
        id: i64,
        status: AttendanceStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExcuseState {
    Submitted,
    Approved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalExcuse {
    pub id: i64,
    pub student_index: String,
    pub attendance_id: i64,
    pub date_submitted: DateTime<Utc>,
    pub document_path: String,
    pub reason: Option<String>,
    pub approved: bool,
    pub approved_by: Option<String>,
    pub approved_date: Option<DateTime<Utc>>,
}

impl MedicalExcuse {
    pub fn state(&self) -> ExcuseState {
        if self.approved {
            ExcuseState::Approved
        } else {
            ExcuseState::Submitted
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewExcuse {
    pub student_index: String,
    pub attendance_id: i64,
    pub date_submitted: DateTime<Utc>,
    pub document_path: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub student_index: String,
    pub course_code: String,
}

pub const COURSES: &[(&str, &str)] = &[
    ("NANO2112", "Mathematics for Nano Science Technology I"),
    ("NANO2122", "Fundamentals of Nano-Electronics"),
    ("NANO2132", "Digital Electronics"),
    ("NANO2142", "Introduction to Software Development"),
    ("NANO2151", "Principles of Material Science Engineering"),
    ("NANO2162", "Engineering Design & Drawings"),
    ("NANO2172", "Physical Chemistry for Nanotechnology"),
    ("NANO2182", "Management for Technology"),
    ("ETCH2111", "English Language & Communication Skills II"),
    ("PDEV2110", "Career Development II"),
];

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}
