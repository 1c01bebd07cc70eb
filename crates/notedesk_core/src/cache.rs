//! Process-local lookup cache with per-entry expiry.
//!
//! # Responsibility
//! - Hold read results keyed by entity kind and id/owner.
//! - Support exact, owner-indexed and regex-pattern invalidation.
//!
//! # Invariants
//! - An expired entry is never returned; `get` removes it on sight.
//! - Without `sweep_on_write`/`purge_expired`, expired entries stay in memory
//!   until their exact key is read or a bulk invalidation touches them.
//! - The owner index always mirrors the owner-derived keys present in
//!   `entries`.

use crate::model::document::DocumentId;
use crate::model::page::PageId;
use crate::model::user::UserId;
use log::debug;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Entry lifetime used by `set` unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Structured cache key. `Display` renders the canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `user:<clerkId>`
    User(String),
    /// `documents:<userId>`, the root listing of one user.
    Documents(UserId),
    /// `document:<documentId>`
    Document(DocumentId),
    /// `page:<pageId>`
    Page(PageId),
}

impl CacheKey {
    /// Entity family prefix, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Documents(_) => "documents",
            Self::Document(_) => "document",
            Self::Page(_) => "page",
        }
    }

    /// Owner whose writes make this key stale.
    pub fn owner(&self) -> Option<UserId> {
        match self {
            Self::Documents(user_id) => Some(*user_id),
            Self::User(_) | Self::Document(_) | Self::Page(_) => None,
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(clerk_id) => write!(f, "user:{clerk_id}"),
            Self::Documents(user_id) => write!(f, "documents:{user_id}"),
            Self::Document(document_id) => write!(f, "document:{document_id}"),
            Self::Page(page_id) => write!(f, "page:{page_id}"),
        }
    }
}

/// Cache tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime applied by `set`.
    pub default_ttl: Duration,
    /// Upper bound on stored entries. `None` means unbounded.
    pub max_entries: Option<usize>,
    /// Purge expired entries on every write.
    pub sweep_on_write: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_entries: None,
            sweep_on_write: false,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Bounds the number of stored entries (minimum 1).
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max.max(1));
        self
    }

    pub fn with_sweep_on_write(mut self, enabled: bool) -> Self {
        self.sweep_on_write = enabled;
        self
    }
}

struct CacheEntry<V> {
    value: V,
    /// `None` when `now + ttl` overflows; such entries never expire.
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

struct CacheState<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    owners: HashMap<UserId, HashSet<CacheKey>>,
}

impl<V> CacheState<V> {
    fn insert(&mut self, key: CacheKey, entry: CacheEntry<V>) {
        if let Some(owner) = key.owner() {
            self.owners.entry(owner).or_default().insert(key.clone());
        }
        self.entries.insert(key, entry);
    }

    fn remove(&mut self, key: &CacheKey) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        if let Some(owner) = key.owner() {
            if let Some(keys) = self.owners.get_mut(&owner) {
                keys.remove(key);
                if keys.is_empty() {
                    self.owners.remove(&owner);
                }
            }
        }
        true
    }

    fn remove_where(&mut self, predicate: impl Fn(&CacheKey, &CacheEntry<V>) -> bool) -> usize {
        let doomed: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(key, entry)| predicate(key, entry))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    fn evict_soonest_expiring(&mut self) {
        // Entries that never expire sort last.
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.expires_at.is_none(), entry.expires_at))
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            debug!("event=cache_evict module=cache status=ok kind={}", key.kind());
            self.remove(&key);
        }
    }
}

/// Key-value cache with lazy TTL expiry.
///
/// All operations take `&self`; each call is atomic with respect to the
/// others. Read-miss-populate sequences built on top are not.
pub struct LookupCache<V> {
    config: CacheConfig,
    state: Mutex<CacheState<V>>,
}

impl<V: Clone> Default for LookupCache<V> {
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}

impl<V: Clone> LookupCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                owners: HashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Stores `value` for the configured default TTL.
    pub fn set(&self, key: CacheKey, value: V) {
        self.set_with_ttl(key, value, self.config.default_ttl);
    }

    /// Stores `value` until `now + ttl`, replacing any previous entry.
    pub fn set_with_ttl(&self, key: CacheKey, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut state = self.state.lock();

        if self.config.sweep_on_write {
            state.remove_where(|_, entry| entry.is_expired(now));
        }
        if let Some(max_entries) = self.config.max_entries {
            if !state.entries.contains_key(&key) && state.entries.len() >= max_entries {
                state.remove_where(|_, entry| entry.is_expired(now));
                while !state.entries.is_empty() && state.entries.len() >= max_entries {
                    state.evict_soonest_expiring();
                }
            }
        }

        let entry = CacheEntry {
            value,
            expires_at: now.checked_add(ttl),
        };
        state.remove(&key);
        state.insert(key, entry);
    }

    /// Returns the live value for `key`, dropping it if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        let mut state = self.state.lock();
        match state.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                debug!("event=cache_lookup module=cache status=hit kind={}", key.kind());
                return Some(entry.value.clone());
            }
            Some(_) => {}
            None => {
                debug!("event=cache_lookup module=cache status=miss kind={}", key.kind());
                return None;
            }
        }

        state.remove(key);
        debug!("event=cache_lookup module=cache status=expired kind={}", key.kind());
        None
    }

    /// Removes one exact key. Returns whether it was present.
    pub fn delete(&self, key: &CacheKey) -> bool {
        self.state.lock().remove(key)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.owners.clear();
    }

    /// Removes every key whose canonical form matches `pattern` anywhere.
    ///
    /// # Errors
    /// - Returns the regex compile error; nothing is removed in that case.
    pub fn clear_pattern(&self, pattern: &str) -> Result<usize, regex::Error> {
        let regex = Regex::new(pattern)?;
        let removed = self
            .state
            .lock()
            .remove_where(|key, _| regex.is_match(&key.to_string()));
        debug!("event=cache_invalidate module=cache status=ok mode=pattern removed={removed}");
        Ok(removed)
    }

    /// Removes every key derived from `owner` data, via the owner index.
    pub fn invalidate_owner(&self, owner: UserId) -> usize {
        let mut state = self.state.lock();
        let keys = state.owners.remove(&owner).unwrap_or_default();
        let removed = keys
            .iter()
            .filter(|key| state.entries.remove(*key).is_some())
            .count();
        debug!("event=cache_invalidate module=cache status=ok mode=owner removed={removed}");
        removed
    }

    /// Removes all expired entries now.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        self.state
            .lock()
            .remove_where(|_, entry| entry.is_expired(now))
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheConfig, CacheKey, LookupCache, DEFAULT_TTL};
    use std::thread::sleep;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn canonical_key_forms() {
        let id = Uuid::nil();
        assert_eq!(CacheKey::User("clerk_1".into()).to_string(), "user:clerk_1");
        assert_eq!(
            CacheKey::Documents(id).to_string(),
            format!("documents:{id}")
        );
        assert_eq!(CacheKey::Document(id).to_string(), format!("document:{id}"));
        assert_eq!(CacheKey::Page(id).to_string(), format!("page:{id}"));
    }

    #[test]
    fn set_then_get_returns_value() {
        let cache = LookupCache::new();
        let key = CacheKey::User("u1".into());
        cache.set(key.clone(), 7);
        assert_eq!(cache.get(&key), Some(7));
        assert_eq!(cache.config().default_ttl, DEFAULT_TTL);
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let cache = LookupCache::new();
        let key = CacheKey::User("u1".into());
        cache.set_with_ttl(key.clone(), "stale", Duration::from_millis(5));
        sleep(Duration::from_millis(20));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn expired_entries_linger_until_touched() {
        let cache = LookupCache::new();
        cache.set_with_ttl(CacheKey::User("a".into()), 1, Duration::from_millis(5));
        cache.set(CacheKey::User("b".into()), 2);
        sleep(Duration::from_millis(20));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn delete_and_clear() {
        let cache = LookupCache::new();
        let a = CacheKey::User("a".into());
        let b = CacheKey::User("b".into());
        cache.set(a.clone(), 1);
        cache.set(b.clone(), 2);

        assert!(cache.delete(&a));
        assert!(!cache.delete(&a));
        assert_eq!(cache.get(&b), Some(2));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_pattern_does_not_confuse_singular_and_plural_prefixes() {
        let cache = LookupCache::new();
        let owner = Uuid::new_v4();
        let other_owner = Uuid::new_v4();
        let document = Uuid::new_v4();
        cache.set(CacheKey::Documents(owner), 1);
        cache.set(CacheKey::Documents(other_owner), 2);
        cache.set(CacheKey::Document(document), 3);
        cache.set(CacheKey::Page(document), 4);

        let removed = cache.clear_pattern("^documents:").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.get(&CacheKey::Documents(owner)), None);
        assert_eq!(cache.get(&CacheKey::Documents(other_owner)), None);
        assert_eq!(cache.get(&CacheKey::Document(document)), Some(3));
        assert_eq!(cache.get(&CacheKey::Page(document)), Some(4));
    }

    #[test]
    fn clear_pattern_is_unanchored() {
        let cache = LookupCache::new();
        cache.set(CacheKey::User("team-alpha".into()), 1);
        cache.set(CacheKey::User("beta".into()), 2);

        assert_eq!(cache.clear_pattern("alpha").unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_pattern_rejects_invalid_regex() {
        let cache: LookupCache<u8> = LookupCache::new();
        assert!(cache.clear_pattern("documents:(").is_err());
    }

    #[test]
    fn invalidate_owner_only_touches_that_owner() {
        let cache = LookupCache::new();
        let owner = Uuid::new_v4();
        let other_owner = Uuid::new_v4();
        cache.set(CacheKey::Documents(owner), 1);
        cache.set(CacheKey::Documents(other_owner), 2);
        cache.set(CacheKey::Document(owner), 3);

        assert_eq!(cache.invalidate_owner(owner), 1);
        assert_eq!(cache.get(&CacheKey::Documents(owner)), None);
        assert_eq!(cache.get(&CacheKey::Documents(other_owner)), Some(2));
        assert_eq!(cache.get(&CacheKey::Document(owner)), Some(3));
        assert_eq!(cache.invalidate_owner(owner), 0);
    }

    #[test]
    fn owner_index_forgets_deleted_keys() {
        let cache = LookupCache::new();
        let owner = Uuid::new_v4();
        cache.set(CacheKey::Documents(owner), 1);
        cache.delete(&CacheKey::Documents(owner));
        cache.set(CacheKey::Documents(owner), 2);

        assert_eq!(cache.invalidate_owner(owner), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn bounded_cache_evicts_entry_closest_to_expiry() {
        let cache = LookupCache::with_config(CacheConfig::new().with_max_entries(2));
        let short = CacheKey::User("short".into());
        let long = CacheKey::User("long".into());
        let newcomer = CacheKey::User("new".into());
        cache.set_with_ttl(short.clone(), 1, Duration::from_secs(1));
        cache.set_with_ttl(long.clone(), 2, Duration::from_secs(600));
        cache.set(newcomer.clone(), 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&short), None);
        assert_eq!(cache.get(&long), Some(2));
        assert_eq!(cache.get(&newcomer), Some(3));
    }

    #[test]
    fn zero_max_entries_still_holds_one_entry() {
        let cache = LookupCache::with_config(CacheConfig::new().with_max_entries(0));
        assert_eq!(cache.config().max_entries, Some(1));

        cache.set(CacheKey::User("first".into()), 1);
        cache.set(CacheKey::User("second".into()), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&CacheKey::User("second".into())), Some(2));
    }

    #[test]
    fn overwriting_existing_key_does_not_evict() {
        let cache = LookupCache::with_config(CacheConfig::new().with_max_entries(1));
        let key = CacheKey::User("only".into());
        cache.set(key.clone(), 1);
        cache.set(key.clone(), 2);
        assert_eq!(cache.get(&key), Some(2));
    }

    #[test]
    fn sweep_on_write_purges_expired_entries() {
        let cache = LookupCache::with_config(CacheConfig::new().with_sweep_on_write(true));
        cache.set_with_ttl(CacheKey::User("old".into()), 1, Duration::from_millis(5));
        sleep(Duration::from_millis(20));
        cache.set(CacheKey::User("fresh".into()), 2);

        assert_eq!(cache.len(), 1);
    }
}
