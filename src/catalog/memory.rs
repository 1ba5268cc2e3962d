//! In-memory catalog used by unit tests.
//!
//! Behaves like the remote service (append-only add, remove-all-occurrences
//! remove, atomic replace) and records every call so tests can assert on
//! request counts, offsets and chunk sizes.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::{CatalogError, CatalogResult};
use crate::schema::{AccessToken, CollectionId, Identity, ItemId, Page};

use super::client::CatalogClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Refresh,
    Identity,
    List { collection: String, limit: usize, offset: usize },
    Replace { collection: String, len: usize },
    Add { collection: String, items: Vec<ItemId> },
    Remove { collection: String, items: Vec<ItemId> },
}

#[derive(Default)]
struct State {
    collections: HashMap<CollectionId, Vec<Option<ItemId>>>,
    calls: Vec<Call>,
    fail_refresh: bool,
    fail_identity: bool,
    fail_replace: bool,
    failing_reads: HashMap<CollectionId, usize>,
    shrink_after_first_page: HashMap<CollectionId, usize>,
    fail_add_at: Option<usize>,
    fail_remove_at: Option<usize>,
    add_calls: usize,
    remove_calls: usize,
}

#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

pub fn ids(raw: &[&str]) -> Vec<ItemId> {
    raw.iter().map(|s| ItemId::new(*s)).collect()
}

pub fn numbered(prefix: &str, n: usize) -> Vec<ItemId> {
    (0..n).map(|i| ItemId::new(format!("{prefix}{i}"))).collect()
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(self, id: &str, items: Vec<ItemId>) -> Self {
        self.with_entries(id, items.into_iter().map(Some).collect())
    }

    pub fn with_entries(self, id: &str, entries: Vec<Option<ItemId>>) -> Self {
        self.lock().collections.insert(CollectionId::new(id), entries);
        self
    }

    pub fn failing_refresh(self) -> Self {
        self.lock().fail_refresh = true;
        self
    }

    pub fn failing_identity(self) -> Self {
        self.lock().fail_identity = true;
        self
    }

    pub fn failing_replace(self) -> Self {
        self.lock().fail_replace = true;
        self
    }

    pub fn failing_reads_of(self, id: &str) -> Self {
        self.failing_reads_from(id, 0)
    }

    /// Listing requests for `id` fail once `offset` reaches `from`.
    pub fn failing_reads_from(self, id: &str, from: usize) -> Self {
        self.lock().failing_reads.insert(CollectionId::new(id), from);
        self
    }

    /// Truncates the collection to `len` entries right after its first
    /// page has been served.
    pub fn shrinking_after_first_page(self, id: &str, len: usize) -> Self {
        self.lock()
            .shrink_after_first_page
            .insert(CollectionId::new(id), len);
        self
    }

    /// The n-th add call (0-based) fails with a rate-limit error.
    pub fn failing_add_call(self, n: usize) -> Self {
        self.lock().fail_add_at = Some(n);
        self
    }

    /// The n-th remove call (0-based) fails with a rate-limit error.
    pub fn failing_remove_call(self, n: usize) -> Self {
        self.lock().fail_remove_at = Some(n);
        self
    }

    /// Live items of a collection, tombstones skipped.
    pub fn items(&self, id: &str) -> Vec<ItemId> {
        self.lock()
            .collections
            .get(&CollectionId::new(id))
            .map(|entries| entries.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

fn rate_limited() -> CatalogError {
    CatalogError::RateLimited { retry_after: None }
}

#[async_trait::async_trait]
impl CatalogClient for MemoryCatalog {
    async fn refresh_access_token(&self) -> CatalogResult<AccessToken> {
        let mut state = self.lock();
        state.calls.push(Call::Refresh);
        if state.fail_refresh {
            return Err(CatalogError::Status { status: 400, body: "invalid_grant".into() });
        }
        Ok(AccessToken::new("test-token"))
    }

    async fn current_identity(&self, _token: &AccessToken) -> CatalogResult<Identity> {
        let mut state = self.lock();
        state.calls.push(Call::Identity);
        if state.fail_identity {
            return Err(CatalogError::Status { status: 500, body: String::new() });
        }
        Ok(Identity {
            display_name: Some("Test Listener".into()),
            id: "listener".into(),
        })
    }

    async fn list_items(
        &self,
        _token: &AccessToken,
        collection: &CollectionId,
        limit: usize,
        offset: usize,
    ) -> CatalogResult<Page> {
        let mut state = self.lock();
        state.calls.push(Call::List {
            collection: collection.to_string(),
            limit,
            offset,
        });

        if state.failing_reads.get(collection).is_some_and(|from| offset >= *from) {
            return Err(rate_limited());
        }

        let entries = state
            .collections
            .get(collection)
            .cloned()
            .ok_or_else(|| CatalogError::Status { status: 404, body: "not found".into() })?;

        let total = entries.len();
        let items = entries.iter().skip(offset).take(limit).cloned().collect();

        if offset == 0 {
            if let Some(len) = state.shrink_after_first_page.remove(collection) {
                if let Some(entries) = state.collections.get_mut(collection) {
                    entries.truncate(len);
                }
            }
        }

        Ok(Page { items, total })
    }

    async fn replace_all(
        &self,
        _token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Replace {
            collection: collection.to_string(),
            len: items.len(),
        });
        if state.fail_replace {
            return Err(CatalogError::Status { status: 403, body: "forbidden".into() });
        }
        state
            .collections
            .insert(collection.clone(), items.iter().cloned().map(Some).collect());
        Ok(())
    }

    async fn add_items(
        &self,
        _token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Add {
            collection: collection.to_string(),
            items: items.to_vec(),
        });

        let call = state.add_calls;
        state.add_calls += 1;
        if state.fail_add_at == Some(call) {
            return Err(rate_limited());
        }

        state
            .collections
            .entry(collection.clone())
            .or_default()
            .extend(items.iter().cloned().map(Some));
        Ok(())
    }

    async fn remove_items(
        &self,
        _token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Remove {
            collection: collection.to_string(),
            items: items.to_vec(),
        });

        let call = state.remove_calls;
        state.remove_calls += 1;
        if state.fail_remove_at == Some(call) {
            return Err(rate_limited());
        }

        let doomed: HashSet<&ItemId> = items.iter().collect();
        if let Some(entries) = state.collections.get_mut(collection) {
            entries.retain(|e| e.as_ref().is_none_or(|id| !doomed.contains(id)));
        }
        Ok(())
    }
}
