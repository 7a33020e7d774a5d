//! Limits for message text and uploaded files.
//!
//! All files of a request are checked before anything is written, so a bad
//! file never leaves a partial record behind.

use uuid::Uuid;

use crate::errors::{DomainError, FieldError};
use crate::models::AttachmentScope;

pub const DEFAULT_MAX_FILES: usize = 10;
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 5000;
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "pdf", "doc", "docx"];

/// Upload limits, usually built from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_size_bytes: u64,
    pub max_message_length: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// What the policy needs to know about one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub size: u64,
}

/// Lowercased extension of a filename, without the dot.
pub fn file_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// MIME type recorded for an allowed extension.
pub fn canonical_mime(ext: &str) -> &'static str {
    match ext {
        "jpeg" | "jpg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// A declared type is accepted when it matches the extension or is generic.
fn content_type_matches(declared: Option<&str>, ext: &str) -> bool {
    let Some(declared) = declared else {
        return true;
    };
    let declared = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if declared.is_empty() || declared == "application/octet-stream" {
        return true;
    }
    if declared == "image/jpg" && matches!(ext, "jpeg" | "jpg") {
        return true;
    }
    declared == canonical_mime(ext)
}

impl UploadLimits {
    /// Message text: required, not blank, at most `max_message_length` characters.
    pub fn validate_message(&self, text: &str) -> Result<(), DomainError> {
        if text.trim().is_empty() {
            return Err(DomainError::invalid("message", "Message is required"));
        }
        if text.chars().count() > self.max_message_length {
            return Err(DomainError::invalid(
                "message",
                format!(
                    "Message must be at most {} characters",
                    self.max_message_length
                ),
            ));
        }
        Ok(())
    }

    fn is_allowed(&self, ext: &str) -> bool {
        self.allowed_extensions.iter().any(|a| a == ext)
    }

    /// Checks the whole batch and returns each file's extension and MIME type.
    pub fn validate_files(
        &self,
        files: &[IncomingFile],
    ) -> Result<Vec<(String, &'static str)>, DomainError> {
        if files.len() > self.max_files {
            return Err(DomainError::invalid(
                "attachments",
                format!("At most {} files can be uploaded at once", self.max_files),
            ));
        }

        let mut accepted = Vec::with_capacity(files.len());
        let mut errors = Vec::new();
        for (index, file) in files.iter().enumerate() {
            let field = format!("attachments.{}", index);
            let ext = match file_extension(&file.original_name) {
                Some(ext) if self.is_allowed(&ext) => ext,
                _ => {
                    errors.push(FieldError::new(
                        field,
                        format!(
                            "File type not allowed. Allowed: {}",
                            self.allowed_extensions.join(", ")
                        ),
                    ));
                    continue;
                }
            };
            if !content_type_matches(file.content_type.as_deref(), &ext) {
                errors.push(FieldError::new(
                    field,
                    "File content type does not match its extension",
                ));
                continue;
            }
            if file.size == 0 {
                errors.push(FieldError::new(field, "File is empty"));
                continue;
            }
            if file.size > self.max_file_size_bytes {
                errors.push(FieldError::new(
                    field,
                    format!(
                        "File exceeds the maximum size of {} MB",
                        self.max_file_size_bytes / (1024 * 1024)
                    ),
                ));
                continue;
            }
            let mime = canonical_mime(&ext);
            accepted.push((ext, mime));
        }

        if errors.is_empty() {
            Ok(accepted)
        } else {
            Err(DomainError::Validation(errors))
        }
    }
}

/// Generated storage key for a file. The original filename never appears in it.
pub fn storage_key(scope: AttachmentScope, ext: &str) -> String {
    let name = Uuid::new_v4().simple();
    match scope {
        AttachmentScope::Ticket { ticket_id } => format!("tickets/{ticket_id}/{name}.{ext}"),
        AttachmentScope::Message {
            ticket_id,
            message_id,
        } => format!("tickets/{ticket_id}/messages/{message_id}/{name}.{ext}"),
    }
}
