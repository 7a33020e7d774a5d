//! Domain layer for the helpdesk backend.
//!
//! This crate contains:
//! - Domain models (User/Role, Ticket, messages, attachments, notifications)
//! - Pure business rules: access control, ticket lifecycle, recipient planning
//! - Domain events and error types

pub mod errors;
pub mod models;
pub mod services;

pub use errors::{AccessDenied, DomainError, FieldError};
