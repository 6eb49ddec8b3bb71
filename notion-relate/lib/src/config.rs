//! Configuration for the Notion client and for a linking run.

use std::env;
use std::time::Duration;

use crate::error::RelateError;

/// Default Notion REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.notion.com/v1";

/// API version sent in the `Notion-Version` header.
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";

/// Largest page size the query endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`NotionClient`](crate::NotionClient).
#[derive(Clone)]
pub struct NotionConfig {
    /// Integration token sent as a bearer credential
    pub token: String,
    /// API base URL, without trailing slash
    pub base_url: String,
    /// Value of the `Notion-Version` header
    pub notion_version: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Records requested per query page (1-100)
    pub page_size: u32,
}

impl NotionConfig {
    /// Create configuration for the public Notion API.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_API_URL.to_string(),
            notion_version: DEFAULT_NOTION_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `NOTION_TOKEN` (required): integration token
    /// - `NOTION_API_URL` (optional): alternate API base URL
    ///
    /// ## Errors
    ///
    /// Returns [`RelateError::Config`] if `NOTION_TOKEN` is unset or empty.
    pub fn from_env() -> Result<Self, RelateError> {
        let token = env::var("NOTION_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RelateError::Config("NOTION_TOKEN is not set".to_string()))?;

        let mut config = Self::new(token);
        if let Ok(url) = env::var("NOTION_API_URL")
            && !url.trim().is_empty()
        {
            config = config.with_base_url(url);
        }
        Ok(config)
    }

    /// Point the client at a different endpoint (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the query page size, clamped to what the API accepts.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }
}

impl std::fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionConfig")
            .field("base_url", &self.base_url)
            .field("notion_version", &self.notion_version)
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

/// What to link and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOptions {
    /// Database whose records receive the relation
    pub base_database: String,
    /// Database the relation points into
    pub aux_database: String,
    /// Property in the base database holding the match value
    pub match_property: String,
    /// Property in the auxiliary database holding the match value
    pub aux_match_property: String,
    /// Relation property in the base database to write
    pub link_property: String,
    /// Count the changes but issue no updates
    pub dry_run: bool,
    /// Leave records that already have a relation untouched
    pub skip_existing: bool,
    /// Stop after this many base records have been processed
    pub max_records: Option<usize>,
}

impl LinkOptions {
    /// Check that every property and database name is present.
    ///
    /// ## Errors
    ///
    /// Returns [`RelateError::Config`] naming the first blank field.
    pub fn validate(&self) -> Result<(), RelateError> {
        let fields = [
            ("base database", &self.base_database),
            ("auxiliary database", &self.aux_database),
            ("match property", &self.match_property),
            ("auxiliary match property", &self.aux_match_property),
            ("link property", &self.link_property),
        ];
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(RelateError::Config(format!("{label} must not be empty")));
            }
        }
        Ok(())
    }
}
