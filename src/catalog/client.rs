use crate::error::CatalogResult;
use crate::schema::{AccessToken, CollectionId, Identity, ItemId, Page};

/// Largest page the catalog will return for a single listing request.
pub const PAGE_SIZE: usize = 100;

/// Largest number of items a single add/remove request may carry.
pub const CHUNK_SIZE: usize = 100;

/// CatalogClient is the abstraction layer between:
/// - The rotation pipeline
/// - The remote catalog's HTTP API
///
/// Each implementation must:
/// - Issue exactly one remote request per call
/// - Map transport and status failures into `CatalogError`
/// - Never retry or pace on its own (pacing belongs to the mutator)
///
/// THREAD SAFETY:
/// - Must be Send + Sync
///
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {

    /// Exchanges the long-lived refresh credential for an access token.
    ///
    /// Called once at the start of a run.
    async fn refresh_access_token(&self) -> CatalogResult<AccessToken>;

    /// Returns the account behind `token`. Used for logging only.
    async fn current_identity(&self, token: &AccessToken) -> CatalogResult<Identity>;

    /// Lists one page of a collection.
    ///
    /// OUTPUT:
    /// - `items`: at most `limit` entries, `None` for tombstones
    /// - `total`: collection size as seen by this request
    async fn list_items(
        &self,
        token: &AccessToken,
        collection: &CollectionId,
        limit: usize,
        offset: usize,
    ) -> CatalogResult<Page>;

    /// Atomically replaces the whole collection.
    ///
    /// The rotator only ever calls this with an empty slice to clear.
    async fn replace_all(
        &self,
        token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()>;

    /// Appends up to `CHUNK_SIZE` items.
    async fn add_items(
        &self,
        token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()>;

    /// Removes up to `CHUNK_SIZE` items.
    async fn remove_items(
        &self,
        token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()>;
}

/// An authenticated handle: the client plus the credential obtained
/// for this run.
///
/// Every pipeline stage receives a `&Session` instead of reaching for
/// shared client state.
pub struct Session<'a> {
    client: &'a dyn CatalogClient,
    token: AccessToken,
}

impl<'a> Session<'a> {
    pub fn new(client: &'a dyn CatalogClient, token: AccessToken) -> Self {
        Self { client, token }
    }

    pub async fn current_identity(&self) -> CatalogResult<Identity> {
        self.client.current_identity(&self.token).await
    }

    pub async fn list_items(
        &self,
        collection: &CollectionId,
        limit: usize,
        offset: usize,
    ) -> CatalogResult<Page> {
        self.client.list_items(&self.token, collection, limit, offset).await
    }

    pub async fn replace_all(&self, collection: &CollectionId, items: &[ItemId]) -> CatalogResult<()> {
        self.client.replace_all(&self.token, collection, items).await
    }

    pub async fn add_items(&self, collection: &CollectionId, items: &[ItemId]) -> CatalogResult<()> {
        self.client.add_items(&self.token, collection, items).await
    }

    pub async fn remove_items(&self, collection: &CollectionId, items: &[ItemId]) -> CatalogResult<()> {
        self.client.remove_items(&self.token, collection, items).await
    }
}
