//! Domain model for users, the document tree, pages and blocks.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID v4.
//! - Documents and pages are soft-deleted via `is_archived`; blocks are not.
//! - Timestamps are Unix epoch milliseconds.
//! - JSON field names are camelCase, matching the HTTP surface.

pub mod block;
pub mod document;
pub mod page;
pub mod user;
