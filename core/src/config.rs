//! Configuration for the entity client.

use std::env;

/// Environment variable holding the API base URL.
pub const API_URL_VAR: &str = "ENTITY_SYNC_API_URL";

/// Environment variable overriding the collection path segment.
pub const RESOURCE_VAR: &str = "ENTITY_SYNC_RESOURCE";

const DEFAULT_RESOURCE: &str = "categories";

/// Where the entity collection lives on the remote API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash (e.g. `https://api.example.com`).
    pub base_url: String,
    /// Collection path segment appended to the base URL.
    pub resource: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            resource: DEFAULT_RESOURCE.to_string(),
        }
    }

    /// Sets the collection path segment. Surrounding slashes are dropped.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        let resource: String = resource.into();
        self.resource = resource.trim_matches('/').to_string();
        self
    }

    /// Reads `ENTITY_SYNC_API_URL` and, if set, `ENTITY_SYNC_RESOURCE`.
    ///
    /// Returns `None` when the base URL is not configured.
    pub fn from_env() -> Option<Self> {
        let base_url = env::var(API_URL_VAR).ok().filter(|v| !v.is_empty())?;
        let config = Self::new(base_url);
        Some(match env::var(RESOURCE_VAR) {
            Ok(resource) if !resource.is_empty() => config.with_resource(resource),
            _ => config,
        })
    }
}
