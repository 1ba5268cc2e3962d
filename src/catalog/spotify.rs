use std::sync::atomic::Ordering;
use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::CatalogConfig,
    error::{CatalogError, CatalogResult},
    metrics::METRICS,
    schema::{AccessToken, CollectionId, Identity, ItemId, Page},
};

use super::client::CatalogClient;

/// Field filter for playlist listings. Only the track URI is needed,
/// which keeps pages small.
const LIST_FIELDS: &str = "total,items(track(uri))";

/// Spotify Web API client
///
/// This client implements the `CatalogClient` trait and encapsulates
/// all Spotify-specific HTTP behavior:
/// - token refresh against the accounts service
/// - playlist item listing, replacement, append and removal
/// - status and rate-limit mapping
///
/// DESIGN PRINCIPLES:
/// - One call, one request
/// - No retries, no pacing
/// - Pure protocol translation only
pub struct SpotifyClient {
    http: Client,
    api_base: String,
    accounts_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    log_requests: bool,
}

// ------------------------------------------------------------
// Wire payloads
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistTracksResponse {
    #[serde(default)]
    items: Vec<Option<PlaylistEntry>>,
    total: usize,
}

#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    track: Option<TrackRef>,
}

#[derive(Debug, Deserialize)]
struct TrackRef {
    uri: Option<String>,
}

impl PlaylistTracksResponse {
    /// Entries without a track payload become tombstones.
    fn into_page(self) -> Page {
        let items = self
            .items
            .into_iter()
            .map(|entry| {
                entry
                    .and_then(|e| e.track)
                    .and_then(|t| t.uri)
                    .map(ItemId)
            })
            .collect();

        Page { items, total: self.total }
    }
}

impl SpotifyClient {
    pub fn new(cfg: &CatalogConfig, log_requests: bool) -> CatalogResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            accounts_url: cfg.accounts_url.trim_end_matches('/').to_string(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            refresh_token: cfg.refresh_token.clone(),
            log_requests,
        })
    }

    fn tracks_url(&self, collection: &CollectionId) -> String {
        format!("{}/playlists/{}/tracks", self.api_base, collection)
    }

    /// Sends a request and turns any non-2xx answer into an error.
    async fn send(&self, what: &str, request: RequestBuilder) -> CatalogResult<Response> {
        if self.log_requests {
            log::debug!("[catalog] {what}");
        }
        METRICS.requests_issued.fetch_add(1, Ordering::Relaxed);

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.unwrap_or_default();

        Err(classify_failure(status, retry_after.as_deref(), body))
    }
}

/// Maps a failed HTTP answer into the catalog error taxonomy.
///
/// 429 is kept apart so callers and logs can tell a rate-limit
/// rejection from a genuine failure.
fn classify_failure(status: StatusCode, retry_after: Option<&str>, body: String) -> CatalogError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = retry_after
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return CatalogError::RateLimited { retry_after };
    }

    CatalogError::Status {
        status: status.as_u16(),
        body,
    }
}

fn uris(items: &[ItemId]) -> Vec<&str> {
    items.iter().map(ItemId::as_str).collect()
}

#[async_trait::async_trait]
impl CatalogClient for SpotifyClient {

    async fn refresh_access_token(&self) -> CatalogResult<AccessToken> {
        let request = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
            ]);

        let response = self.send("refresh access token", request).await?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(format!("token response: {e}")))?;

        Ok(AccessToken::new(body.access_token))
    }

    async fn current_identity(&self, token: &AccessToken) -> CatalogResult<Identity> {
        let request = self
            .http
            .get(format!("{}/me", self.api_base))
            .bearer_auth(token.secret());

        let response = self.send("get current user", request).await?;
        response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(format!("user profile: {e}")))
    }

    async fn list_items(
        &self,
        token: &AccessToken,
        collection: &CollectionId,
        limit: usize,
        offset: usize,
    ) -> CatalogResult<Page> {
        let request = self
            .http
            .get(self.tracks_url(collection))
            .bearer_auth(token.secret())
            .query(&[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("fields", LIST_FIELDS.to_string()),
            ]);

        let what = format!("list {collection} limit={limit} offset={offset}");
        let response = self.send(&what, request).await?;
        let body: PlaylistTracksResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(format!("playlist tracks of {collection}: {e}")))?;

        Ok(body.into_page())
    }

    async fn replace_all(
        &self,
        token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()> {
        let request = self
            .http
            .put(self.tracks_url(collection))
            .bearer_auth(token.secret())
            .json(&json!({ "uris": uris(items) }));

        let what = format!("replace {collection} with {} items", items.len());
        self.send(&what, request).await?;
        Ok(())
    }

    async fn add_items(
        &self,
        token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()> {
        let request = self
            .http
            .post(self.tracks_url(collection))
            .bearer_auth(token.secret())
            .json(&json!({ "uris": uris(items) }));

        let what = format!("add {} items to {collection}", items.len());
        self.send(&what, request).await?;
        Ok(())
    }

    async fn remove_items(
        &self,
        token: &AccessToken,
        collection: &CollectionId,
        items: &[ItemId],
    ) -> CatalogResult<()> {
        let tracks: Vec<_> = items.iter().map(|i| json!({ "uri": i.as_str() })).collect();
        let request = self
            .http
            .delete(self.tracks_url(collection))
            .bearer_auth(token.secret())
            .json(&json!({ "tracks": tracks }));

        let what = format!("remove {} items from {collection}", items.len());
        self.send(&what, request).await?;
        Ok(())
    }
}
