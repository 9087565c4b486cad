#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

pub const ADMIN: (&str, &str) = ("admin", "admin123");
pub const SEED_STUDENT: (&str, &str) = ("S1234", "1234");

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
    pub session: Option<String>,
}

impl Sidecar {
    pub fn spawn() -> Self {
        Self::spawn_with_args(&[])
    }

    /// Spawns and selects `workspace` over IPC.
    pub fn open(workspace: &Path) -> Self {
        let mut sidecar = Self::spawn();
        sidecar.request_ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        sidecar
    }

    pub fn spawn_with_args(args: &[&str]) -> Self {
        let exe = env!("CARGO_BIN_EXE_attendd");
        let mut child = Command::new(exe)
            .args(args)
            .env_remove("ATTENDD_WORKSPACE")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn attendd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
            session: None,
        }
    }

    pub fn send_raw(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");
        let mut out = String::new();
        self.reader.read_line(&mut out).expect("read response line");
        assert!(!out.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(out.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let mut payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        if let Some(token) = &self.session {
            payload["session"] = json!(token);
        }
        let value = self.send_raw(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    pub fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    /// Returns the error object; panics if the call succeeded.
    pub fn request_err(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value.get("error").cloned().expect("error object")
    }

    pub fn login(&mut self, index_number: &str, password: &str) -> serde_json::Value {
        let result = self.request_ok(
            "auth.login",
            json!({ "indexNumber": index_number, "password": password }),
        );
        self.session = result
            .get("session")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        assert!(self.session.is_some(), "login returned no session");
        result
    }

    pub fn login_admin(&mut self) {
        self.login(ADMIN.0, ADMIN.1);
    }

    pub fn create_user(&mut self, index_number: &str, name: &str, role: &str) {
        self.request_ok(
            "users.create",
            json!({
                "indexNumber": index_number,
                "name": name,
                "password": "pw",
                "role": role,
            }),
        );
    }

    pub fn enroll(&mut self, index_number: &str, course: &str) {
        self.request_ok(
            "enrollments.add",
            json!({ "studentIndex": index_number, "course": course }),
        );
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn error_code(error: &serde_json::Value) -> &str {
    error.get("code").and_then(|v| v.as_str()).unwrap_or("")
}

pub fn message_texts(result: &serde_json::Value) -> Vec<String> {
    result
        .get("messages")
        .and_then(|v| v.as_array())
        .map(|msgs| {
            msgs.iter()
                .filter_map(|m| m.get("text").and_then(|t| t.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Ledger rows for `student` as listed on the admin dashboard.
pub fn records_for<'a>(
    dashboard: &'a serde_json::Value,
    student: &str,
) -> Vec<&'a serde_json::Value> {
    dashboard
        .get("records")
        .and_then(|v| v.as_array())
        .map(|rows| {
            rows.iter()
                .filter(|r| r.get("studentIndex").and_then(|v| v.as_str()) == Some(student))
                .collect()
        })
        .unwrap_or_default()
}
