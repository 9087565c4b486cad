use std::path::{Path, PathBuf};

use crate::error::{AttendError, AttendResult};

pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "doc", "docx"];
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// A document the host has placed on disk for ingestion.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub source: PathBuf,
}

impl Upload {
    /// Uses the source file name when the host gives no original name.
    pub fn from_path(source: PathBuf, original_name: Option<String>) -> Self {
        let original_name = original_name.unwrap_or_else(|| {
            source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        });
        Self {
            original_name,
            source,
        }
    }
}

pub fn allowed_file(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS
            .iter()
            .any(|a| a.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Reduces a name to `[A-Za-z0-9_.-]`, turning separators and whitespace into
/// underscores and stripping leading/trailing dots and underscores.
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
    max_bytes: u64,
}

impl DocumentStore {
    pub fn new(root: PathBuf, max_bytes: u64) -> Self {
        Self { root, max_bytes }
    }

    pub fn for_workspace(workspace: &Path, max_bytes: u64) -> Self {
        Self::new(workspace.join("uploads").join("medical_reports"), max_bytes)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Extension and size checks; nothing is written.
    pub fn check(&self, upload: &Upload) -> AttendResult<()> {
        if !allowed_file(&upload.original_name) {
            return Err(AttendError::validation(
                "Invalid file type. Allowed: PDF, JPG, PNG, DOC, DOCX",
            ));
        }
        let meta = std::fs::metadata(&upload.source).map_err(|e| {
            AttendError::validation(format!(
                "Please select an absence record and upload a document. ({e})"
            ))
        })?;
        if !meta.is_file() {
            return Err(AttendError::validation(
                "Please select an absence record and upload a document.",
            ));
        }
        if meta.len() > self.max_bytes {
            return Err(AttendError::validation(format!(
                "File too large: {} bytes (limit {} bytes)",
                meta.len(),
                self.max_bytes
            )));
        }
        Ok(())
    }

    /// Copies the upload to `{student}_{attendance_id}_{name}` under the root.
    pub fn save(
        &self,
        student_index: &str,
        attendance_id: i64,
        upload: &Upload,
    ) -> AttendResult<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let name = secure_filename(&format!(
            "{}_{}_{}",
            student_index, attendance_id, upload.original_name
        ));
        let dest = self.root.join(name);
        std::fs::copy(&upload.source, &dest)?;
        Ok(dest)
    }

    /// Best-effort; only paths under the root are touched.
    pub fn remove(&self, path: &Path) {
        if !path.starts_with(&self.root) {
            return;
        }
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not remove document");
        }
    }
}
