//! Core domain logic for NoteDesk.
//! Storage, caching and timing for users, documents, pages and blocks.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod perf;
pub mod repo;
pub mod service;
pub mod util;

pub use cache::{CacheConfig, CacheKey, LookupCache};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::block::{Block, BlockId, BlockOrder, BlockType, BlockUpdate, NewBlock};
pub use model::document::{Document, DocumentDetail, DocumentId, DocumentUpdate, NewDocument};
pub use model::page::{NewPage, Page, PageDetail, PageId, PageUpdate};
pub use model::user::{NewUser, User, UserId};
pub use perf::{measured, measured_async, MetricSummary, PerformanceMonitor, Timer};
pub use repo::{
    BlockRepository, DocumentRepository, EntityKind, PageRepository, RepoError, RepoResult,
    SqliteStore, Store, UserRepository,
};
pub use service::data_access::{CachedEntry, DataAccess, USER_LOOKUP_LABEL};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
