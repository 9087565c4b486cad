use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

use crate::auth;
use crate::domain::Role;

pub const DB_FILE: &str = "attendance.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!("failed to create workspace {}", workspace.to_string_lossy())
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    seed_defaults(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            index_number TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL,
            name TEXT NOT NULL
        )",
        [],
    )?;

    // (student_index, course_code, date) is kept unique by reconciliation; the
    // key index is lookup-only.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_index TEXT NOT NULL,
            course_code TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_key ON attendance(student_index, course_code, date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS medical_reports(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_index TEXT NOT NULL,
            attendance_id INTEGER NOT NULL,
            date_submitted TEXT NOT NULL,
            document_path TEXT NOT NULL,
            reason TEXT,
            approved INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;
    // Early workspaces tracked approval as a bare flag.
    ensure_medical_reports_approval_columns(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_medical_reports_attendance ON medical_reports(attendance_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_medical_reports_student ON medical_reports(student_index)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_courses(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_index TEXT NOT NULL,
            course_code TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_courses_course ON student_courses(course_code)",
        [],
    )?;

    Ok(())
}

fn ensure_medical_reports_approval_columns(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "medical_reports", "approved_by")? {
        conn.execute("ALTER TABLE medical_reports ADD COLUMN approved_by TEXT", [])?;
    }
    if !table_has_column(conn, "medical_reports", "approved_date")? {
        conn.execute(
            "ALTER TABLE medical_reports ADD COLUMN approved_date TEXT",
            [],
        )?;
    }
    Ok(())
}

/// Seeds the bootstrap accounts into an empty users table.
pub fn seed_defaults(conn: &Connection) -> anyhow::Result<()> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
    if count > 0 {
        return Ok(());
    }
    let seeds = [
        ("admin", "admin123", Role::Administrator, "System Administrator"),
        ("S1234", "1234", Role::Student, "John Doe"),
    ];
    for (index, password, role, name) in seeds {
        let hash = auth::hash_password(password)
            .with_context(|| format!("failed to hash bootstrap password for {index}"))?;
        conn.execute(
            "INSERT INTO users(index_number, password, role, name) VALUES(?, ?, ?, ?)",
            (index, &hash, role.as_str(), name),
        )?;
    }
    tracing::info!("database initialized with bootstrap accounts");
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
