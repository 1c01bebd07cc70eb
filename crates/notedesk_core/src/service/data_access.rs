//! Cached data access façade over the backing store.
//!
//! # Responsibility
//! - Expose one named operation per entity/action pair to route handlers.
//! - Read users and documents through the lookup cache; invalidate on write.
//! - Time user lookups under [`USER_LOOKUP_LABEL`].
//!
//! # Invariants
//! - A cache hit never touches the store.
//! - Every document write drops `document:<id>`, the owner's
//!   `documents:<userId>` listing and the parent's detail entry.
//! - Page writes drop the detail entry of the owning document.
//! - Store errors are returned unchanged; nothing here retries or translates.
//!
//! Two concurrent reads of the same missing key may both query the store and
//! both populate the cache. The second write overwrites the first with an
//! equivalent value.

use crate::cache::{CacheKey, LookupCache};
use crate::config::CoreConfig;
use crate::model::block::{Block, BlockId, BlockOrder, BlockUpdate, NewBlock};
use crate::model::document::{Document, DocumentDetail, DocumentId, DocumentUpdate, NewDocument};
use crate::model::page::{NewPage, Page, PageDetail, PageId, PageUpdate};
use crate::model::user::{NewUser, User, UserId};
use crate::perf::PerformanceMonitor;
use crate::repo::{RepoResult, Store};
use log::debug;
use std::sync::Arc;

/// Timing label for [`DataAccess::get_user_by_clerk_id`].
pub const USER_LOOKUP_LABEL: &str = "getUserByClerkId";

/// Values held by the façade's lookup cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedEntry {
    User(User),
    Documents(Vec<Document>),
    Document(DocumentDetail),
}

/// Façade combining a store, a lookup cache and a timing monitor.
pub struct DataAccess<S: Store> {
    store: S,
    cache: Arc<LookupCache<CachedEntry>>,
    monitor: Arc<PerformanceMonitor>,
}

impl<S: Store> DataAccess<S> {
    /// Creates a façade over shared cache/monitor instances.
    pub fn new(
        store: S,
        cache: Arc<LookupCache<CachedEntry>>,
        monitor: Arc<PerformanceMonitor>,
    ) -> Self {
        Self {
            store,
            cache,
            monitor,
        }
    }

    /// Creates a façade with fresh cache/monitor instances built from `config`.
    pub fn from_config(store: S, config: &CoreConfig) -> Self {
        Self::new(
            store,
            Arc::new(LookupCache::with_config(config.cache_config())),
            Arc::new(PerformanceMonitor::with_window(config.metrics_window)),
        )
    }

    pub fn cache(&self) -> &Arc<LookupCache<CachedEntry>> {
        &self.cache
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // Users

    /// Loads the account for an identity-provider subject id, read-through.
    pub fn get_user_by_clerk_id(&self, clerk_id: &str) -> RepoResult<Option<User>> {
        self.monitor.measure(USER_LOOKUP_LABEL, || {
            let key = CacheKey::User(clerk_id.to_string());
            if let Some(CachedEntry::User(user)) = self.cache.get(&key) {
                return Ok(Some(user));
            }

            let user = self.store.find_user_by_clerk_id(clerk_id)?;
            if let Some(user) = &user {
                self.cache.set(key, CachedEntry::User(user.clone()));
            }
            Ok(user)
        })
    }

    pub fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        self.store.create_user(user)
    }

    // Documents

    /// Lists visible root documents of one user, newest first, read-through.
    ///
    /// Empty listings are cached too.
    pub fn get_documents_by_user_id(&self, user_id: UserId) -> RepoResult<Vec<Document>> {
        let key = CacheKey::Documents(user_id);
        if let Some(CachedEntry::Documents(documents)) = self.cache.get(&key) {
            return Ok(documents);
        }

        let documents = self.store.list_root_documents(user_id)?;
        self.cache.set(key, CachedEntry::Documents(documents.clone()));
        Ok(documents)
    }

    /// Loads one document with visible children and pages, read-through.
    ///
    /// Archived documents are still returned; only listings hide them.
    pub fn get_document_by_id(&self, id: DocumentId) -> RepoResult<Option<DocumentDetail>> {
        let key = CacheKey::Document(id);
        if let Some(CachedEntry::Document(detail)) = self.cache.get(&key) {
            return Ok(Some(detail));
        }

        let detail = self.store.get_document_detail(id)?;
        if let Some(detail) = &detail {
            self.cache.set(key, CachedEntry::Document(detail.clone()));
        }
        Ok(detail)
    }

    pub fn create_document(&self, document: &NewDocument) -> RepoResult<Document> {
        let created = self.store.create_document(document)?;
        self.invalidate_document(&created);
        Ok(created)
    }

    pub fn update_document(
        &self,
        id: DocumentId,
        update: &DocumentUpdate,
    ) -> RepoResult<Document> {
        let updated = self.store.update_document(id, update)?;
        self.invalidate_document(&updated);
        Ok(updated)
    }

    /// Archives one document. The row stays in storage.
    pub fn delete_document(&self, id: DocumentId) -> RepoResult<Document> {
        let archived = self.store.archive_document(id)?;
        self.invalidate_document(&archived);
        Ok(archived)
    }

    // Pages

    /// Loads one page with its ordered blocks. Not cached.
    pub fn get_page_by_id(&self, id: PageId) -> RepoResult<Option<PageDetail>> {
        self.store.get_page_detail(id)
    }

    pub fn create_page(&self, page: &NewPage) -> RepoResult<Page> {
        let created = self.store.create_page(page)?;
        self.invalidate_page_parent(&created);
        Ok(created)
    }

    pub fn update_page(&self, id: PageId, update: &PageUpdate) -> RepoResult<Page> {
        let updated = self.store.update_page(id, update)?;
        self.invalidate_page_parent(&updated);
        Ok(updated)
    }

    /// Archives one page. The row stays in storage.
    pub fn delete_page(&self, id: PageId) -> RepoResult<Page> {
        let archived = self.store.archive_page(id)?;
        self.invalidate_page_parent(&archived);
        Ok(archived)
    }

    // Blocks

    pub fn get_blocks_by_page_id(&self, page_id: PageId) -> RepoResult<Vec<Block>> {
        self.store.list_blocks(page_id)
    }

    pub fn create_block(&self, block: &NewBlock) -> RepoResult<Block> {
        self.store.create_block(block)
    }

    pub fn update_block(&self, id: BlockId, update: &BlockUpdate) -> RepoResult<Block> {
        self.store.update_block(id, update)
    }

    /// Removes one block row for good.
    pub fn delete_block(&self, id: BlockId) -> RepoResult<Block> {
        self.store.delete_block(id)
    }

    /// Applies a batch of block order changes; all of them or none.
    pub fn reorder_blocks(&self, orders: &[BlockOrder]) -> RepoResult<Vec<Block>> {
        self.store.reorder_blocks(orders)
    }

    fn invalidate_document(&self, document: &Document) {
        self.cache.delete(&CacheKey::Document(document.id));
        let listings = self.cache.invalidate_owner(document.user_id);
        if let Some(parent_id) = document.parent_document_id {
            self.cache.delete(&CacheKey::Document(parent_id));
        }
        debug!(
            "event=document_write module=service status=ok listings_invalidated={listings} has_parent={}",
            document.parent_document_id.is_some()
        );
    }

    fn invalidate_page_parent(&self, page: &Page) {
        if let Some(document_id) = page.document_id {
            self.cache.delete(&CacheKey::Document(document_id));
        }
    }
}
