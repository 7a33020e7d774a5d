//! Request extractors.

pub mod client_info;
pub mod multipart;
pub mod user_auth;

pub use client_info::{client_ip, ClientInfo};
pub use multipart::{FileUpload, MessageForm, UploadedFile};
pub use user_auth::{bearer_token, AuthUser};
