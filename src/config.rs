use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use serde::Deserialize;

use crate::schema::CollectionId;

// ------------------------------------------------------------
// Root configuration
// ------------------------------------------------------------
//
// This is the top-level configuration structure loaded from
// `config.json` (see `config.example.json`).
//
// It defines:
// - How to reach and authenticate against the catalog
// - Which collections take part in the rotation
// - Optional debug configuration
//
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// Catalog endpoints and credentials
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Destination, carry-over and sampled sources
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Optional debug configuration
    pub debug: Option<DebugConfig>,
}

// ------------------------------------------------------------
// Catalog configuration
// ------------------------------------------------------------
//
// Notes:
// - `client_secret` and `refresh_token` are security-sensitive
//   and must never be committed. Prefer the environment
//   variables listed in `apply_env_overrides`.
//
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    pub refresh_token: String,

    /// Per-request timeout applied by the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            accounts_url: default_accounts_url(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

// ------------------------------------------------------------
// Rotation configuration
// ------------------------------------------------------------
//
// The strategy is a deployment decision. It is never derived
// from what the collections currently contain.
//
// When the `rotation` section is omitted the reference layout is
// used: four sources whose playlist IDs come from the environment
// (see `apply_env_overrides`).
//
#[derive(Debug, Deserialize, Clone)]
pub struct RotationConfig {
    #[serde(default)]
    pub strategy: RotationStrategy,

    /// The collection being rotated
    #[serde(default)]
    pub destination: CollectionId,

    /// Evergreen collection copied in full ahead of the samples
    pub carry_over: Option<CarryOverConfig>,

    /// Sampled sources, in append priority order
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub on_read_failure: ReadFailurePolicy,

    /// Delay between consecutive mutation chunks
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

fn default_pacing_ms() -> u64 {
    100
}

impl Default for RotationConfig {
    fn default() -> Self {
        let source = |name: &str, env: &str, count| SourceConfig {
            name: name.to_string(),
            playlist: CollectionId::default(),
            count,
            env: Some(env.to_string()),
        };

        Self {
            strategy: RotationStrategy::default(),
            destination: CollectionId::default(),
            carry_over: None,
            sources: vec![
                source("2025 Favorites", "FAVES_2025", 10),
                source("Season", "SEASON", 5),
                source("A-List", "A_LIST", 10),
                source("B-List", "B_LIST", 5),
            ],
            on_read_failure: ReadFailurePolicy::default(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

impl RotationConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// Clear the destination, append carry-over, append samples
    #[default]
    FullReset,

    /// Strip items that came from the sources, append fresh samples
    Differential,
}

/// What to do when a collection listing fails.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReadFailurePolicy {
    /// Log and continue with an empty snapshot for that collection
    #[default]
    Degrade,

    /// End the run before anything is mutated
    Abort,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CarryOverConfig {
    pub playlist: CollectionId,

    /// Reverse so the most recently added items come first
    #[serde(default = "default_reverse")]
    pub reverse: bool,
}

fn default_reverse() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Label used in logs (e.g. "A-List")
    pub name: String,

    pub playlist: CollectionId,

    /// Number of items to sample per run
    #[serde(default = "default_count")]
    pub count: usize,

    /// Prefix of the `<KEY>_PLAYLIST_ID` / `<KEY>_COUNT` variables.
    /// Derived from `name` when absent ("A-List" -> "A_LIST").
    pub env: Option<String>,
}

fn default_count() -> usize {
    5
}

impl SourceConfig {
    pub fn env_key(&self) -> String {
        match &self.env {
            Some(key) => key.clone(),
            None => env_key_from_name(&self.name),
        }
    }
}

fn env_key_from_name(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

// ------------------------------------------------------------
// Debug configuration
// ------------------------------------------------------------
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    /// Log every catalog request at debug level
    pub log_requests: Option<bool>,

    /// Build and log the plan without touching the destination
    pub dry_run: Option<bool>,
}

impl Config {
    pub fn log_requests(&self) -> bool {
        self.debug
            .as_ref()
            .is_some_and(|d| d.log_requests.unwrap_or(false))
    }

    pub fn dry_run(&self) -> bool {
        self.debug
            .as_ref()
            .is_some_and(|d| d.dry_run.unwrap_or(false))
    }

    /// Layer the environment over the file.
    ///
    /// Recognized variables:
    /// - SPOTIFY_CLIENT_ID, SPOTIFY_CLIENT_SECRET, SPOTIFY_REFRESH_TOKEN
    /// - DAILY_PLAYLIST_ID (destination)
    /// - EVERYDAY_PLAYLIST_ID (carry-over, added when the file has none)
    /// - <KEY>_PLAYLIST_ID and <KEY>_COUNT per source, see `SourceConfig::env_key`
    ///
    /// Non-empty environment values win over the file. A count that is
    /// not a non-negative integer is an error.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let catalog = &mut self.catalog;
        let slots = [
            ("SPOTIFY_CLIENT_ID", &mut catalog.client_id),
            ("SPOTIFY_CLIENT_SECRET", &mut catalog.client_secret),
            ("SPOTIFY_REFRESH_TOKEN", &mut catalog.refresh_token),
        ];
        for (name, slot) in slots {
            if let Some(value) = var(name) {
                *slot = value;
            }
        }

        let rotation = &mut self.rotation;
        if let Some(id) = var("DAILY_PLAYLIST_ID") {
            rotation.destination = CollectionId::new(id.trim());
        }

        if let Some(id) = var("EVERYDAY_PLAYLIST_ID") {
            let playlist = CollectionId::new(id.trim());
            match rotation.carry_over.as_mut() {
                Some(carry) => carry.playlist = playlist,
                None => {
                    rotation.carry_over = Some(CarryOverConfig {
                        playlist,
                        reverse: default_reverse(),
                    })
                }
            }
        }

        for source in &mut rotation.sources {
            let key = source.env_key();

            if let Some(id) = var(&format!("{key}_PLAYLIST_ID")) {
                source.playlist = CollectionId::new(id.trim());
            }

            let count_var = format!("{key}_COUNT");
            if let Some(raw) = var(&count_var) {
                source.count = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{count_var} must be a non-negative integer, got '{raw}'"))?;
            }
        }

        Ok(())
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> anyhow::Result<()> {
        let rotation = &self.rotation;

        if rotation.destination.as_str().trim().is_empty() {
            bail!("rotation.destination must not be empty (set it in the config file or DAILY_PLAYLIST_ID)");
        }

        if rotation.carry_over.is_none() && rotation.sources.is_empty() {
            bail!("nothing to rotate: configure a carry_over collection or at least one source");
        }

        let mut seen = HashSet::new();
        for source in &rotation.sources {
            if source.playlist.as_str().trim().is_empty() {
                bail!(
                    "source '{}' has no playlist (set it in the config file or {}_PLAYLIST_ID)",
                    source.name,
                    source.env_key()
                );
            }
            if source.playlist == rotation.destination {
                bail!("source '{}' points at the destination collection", source.name);
            }
            if !seen.insert(&source.playlist) {
                bail!("collection {} is listed as a source more than once", source.playlist);
            }
        }

        if let Some(carry) = &rotation.carry_over {
            if carry.playlist == rotation.destination {
                bail!("carry_over points at the destination collection");
            }
        }

        let catalog = &self.catalog;
        for (field, value) in [
            ("client_id", &catalog.client_id),
            ("client_secret", &catalog.client_secret),
            ("refresh_token", &catalog.refresh_token),
        ] {
            if value.trim().is_empty() {
                bail!("catalog.{field} is missing (set it in the config file or the environment)");
            }
        }

        Ok(())
    }
}

// ------------------------------------------------------------
// Configuration loader
// ------------------------------------------------------------
//
// Reads a JSON configuration file from disk, layers the
// environment on top and validates the result.
//
// A missing file is not an error: the built-in defaults are
// used and everything else must come from the environment.
//
pub fn load_config(path: &str) -> anyhow::Result<Config> {
    let mut cfg: Config = if Path::new(path).exists() {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path}"))?;
        serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config file {path}"))?
    } else {
        log::info!("Config file {path} not found, reading configuration from the environment");
        Config::default()
    };

    cfg.apply_env_overrides(|var| std::env::var(var).ok())?;
    cfg.validate()?;
    Ok(cfg)
}
