//! Shared utilities and common types for the helpdesk backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Cryptographic utilities (hashing, opaque token generation, HMAC checks)
//! - Password hashing with Argon2id
//! - Page-based pagination
//! - Reusable field validators

pub mod crypto;
pub mod pagination;
pub mod password;
pub mod validation;
