//! Multipart bodies for message and attachment uploads.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header,
    Json,
};
use bytes::Bytes;
use domain::models::CreateTicketMessageRequest;
use domain::services::IncomingFile;

use crate::error::ApiError;

/// A file read from a multipart field, held in memory until it is stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// What the upload policy inspects.
    pub fn incoming(&self) -> IncomingFile {
        IncomingFile {
            original_name: self.original_name.clone(),
            content_type: self.content_type.clone(),
            size: self.bytes.len() as u64,
        }
    }
}

fn is_file_field(name: &str, accepted: &[&str]) -> bool {
    let base = name.split('[').next().unwrap_or(name);
    accepted.contains(&base)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

async fn read_file(field: axum::extract::multipart::Field<'_>) -> Result<UploadedFile, ApiError> {
    let original_name = field
        .file_name()
        .map(|n| n.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(n).to_string())
        .unwrap_or_default();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await?;
    Ok(UploadedFile {
        original_name,
        content_type,
        bytes,
    })
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Body of `POST /tickets/{id}/messages-internal`: multipart with
/// `message`, `is_internal` and `attachments[]`, or plain JSON without files.
#[derive(Debug, Clone)]
pub struct MessageForm {
    pub message: String,
    pub is_internal: bool,
    pub files: Vec<UploadedFile>,
}

#[async_trait]
impl<S> FromRequest<S> for MessageForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let Json(body) = Json::<CreateTicketMessageRequest>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
            return Ok(MessageForm {
                message: body.message,
                is_internal: body.is_internal,
                files: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        let mut form = MessageForm {
            message: String::new(),
            is_internal: false,
            files: Vec::new(),
        };
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "message" => form.message = field.text().await?,
                "is_internal" => form.is_internal = parse_flag(&field.text().await?),
                other if is_file_field(other, &["attachments"]) => {
                    form.files.push(read_file(field).await?)
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

/// Body of `POST /tickets/{id}/attachments`: files under `files` / `files[]`.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub files: Vec<UploadedFile>,
}

#[async_trait]
impl<S> FromRequest<S> for FileUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            return Err(ApiError::BadRequest(
                "Expected a multipart/form-data body".to_string(),
            ));
        }
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        let mut files = Vec::new();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if is_file_field(&name, &["files", "file"]) {
                files.push(read_file(field).await?);
            }
        }
        Ok(FileUpload { files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart_request(parts: &[(&str, Option<&str>, &str)]) -> Request {
        let mut body = String::new();
        for (name, filename, content) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match filename {
                Some(f) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        Request::builder()
            .method("POST")
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_file_field_names() {
        assert!(is_file_field("attachments[]", &["attachments"]));
        assert!(is_file_field("attachments[0]", &["attachments"]));
        assert!(is_file_field("files", &["files", "file"]));
        assert!(!is_file_field("message", &["attachments"]));
    }

    #[test]
    fn test_flag_parsing() {
        assert!(parse_flag("1"));
        assert!(parse_flag("true"));
        assert!(parse_flag(" On "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
    }

    #[tokio::test]
    async fn test_message_form_from_multipart() {
        let req = multipart_request(&[
            ("message", None, "Please see the attached invoice"),
            ("is_internal", None, "1"),
            ("attachments[]", Some("docs/invoice.pdf"), "%PDF-1.4"),
        ]);
        let form = MessageForm::from_request(req, &()).await.unwrap();
        assert_eq!(form.message, "Please see the attached invoice");
        assert!(form.is_internal);
        assert_eq!(form.files.len(), 1);
        assert_eq!(form.files[0].original_name, "invoice.pdf");
        assert_eq!(form.files[0].content_type.as_deref(), Some("application/pdf"));
        assert_eq!(form.files[0].incoming().size, 8);
    }

    #[tokio::test]
    async fn test_message_form_from_json() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message":"hello"}"#))
            .unwrap();
        let form = MessageForm::from_request(req, &()).await.unwrap();
        assert_eq!(form.message, "hello");
        assert!(!form.is_internal);
        assert!(form.files.is_empty());
    }

    #[tokio::test]
    async fn test_file_upload_requires_multipart() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let result = FileUpload::from_request(req, &()).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_file_upload_collects_files() {
        let req = multipart_request(&[
            ("files[]", Some("a.pdf"), "one"),
            ("files[]", Some("b.pdf"), "two"),
            ("note", None, "ignored"),
        ]);
        let upload = FileUpload::from_request(req, &()).await.unwrap();
        assert_eq!(upload.files.len(), 2);
        assert_eq!(upload.files[1].original_name, "b.pdf");
    }
}
