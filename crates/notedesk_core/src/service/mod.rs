//! Core use-case services.
//!
//! # Responsibility
//! - Compose repositories, the lookup cache and timing into façade APIs.
//! - Keep route layers decoupled from storage details.

pub mod data_access;
