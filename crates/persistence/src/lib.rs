//! Persistence layer for the helpdesk backend.
//!
//! This crate contains:
//! - Connection pool and embedded migrations
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - Query timing metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
