//! Notion REST client.
//!
//! Implements [`RecordStore`] over two endpoints:
//!
//! - `POST /databases/{id}/query` for cursor-paginated reads
//! - `PATCH /pages/{id}` for relation writes
//!
//! Requests are issued one at a time and never retried; any failure is
//! returned to the caller.

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{Span, debug, instrument, warn};

use crate::config::NotionConfig;
use crate::error::RelateError;
use crate::store::RecordStore;
use crate::types::{QueryPage, RelationRef};

/// Error body returned by the Notion API.
#[derive(Debug, Deserialize)]
struct NotionErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// HTTP client for the Notion API.
#[derive(Clone)]
pub struct NotionClient {
    config: NotionConfig,
    client: Client,
}

impl NotionClient {
    /// Build a client from configuration.
    ///
    /// ## Errors
    ///
    /// Returns [`RelateError::Config`] if the token or version cannot be
    /// used as a header, or [`RelateError::Http`] if the HTTP client cannot
    /// be constructed.
    pub fn new(config: NotionConfig) -> Result<Self, RelateError> {
        if config.token.trim().is_empty() {
            return Err(RelateError::Config("token must not be empty".to_string()));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::try_from(format!("Bearer {}", config.token))
            .map_err(|e| RelateError::Config(format!("invalid token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            "Notion-Version",
            HeaderValue::try_from(config.notion_version.as_str())
                .map_err(|e| RelateError::Config(format!("invalid Notion-Version: {e}")))?,
        );

        let client = Client::builder()
            .user_agent(concat!("notion-relate/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { config, client })
    }

    /// Turn a non-success response into [`RelateError::Api`].
    async fn api_error(response: reqwest::Response) -> RelateError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        let (code, message) = match serde_json::from_str::<NotionErrorBody>(&text) {
            Ok(body) if !body.message.is_empty() => (body.code, body.message),
            _ => (String::new(), text),
        };
        warn!(status, code = %code, %message, "API returned error");
        RelateError::Api {
            status,
            code,
            message,
        }
    }

    fn record_status(response: &Result<reqwest::Response, reqwest::Error>) {
        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                Span::current().record("http.status_code", status);
                debug!(http.status_code = status, "Received API response");
            }
            Err(e) => warn!(error = %e, "Request failed"),
        }
    }
}

impl std::fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

/// Body of a database query request.
fn query_body(page_size: u32, start_cursor: Option<&str>) -> Value {
    let mut body = Map::new();
    body.insert("page_size".to_string(), json!(page_size));
    if let Some(cursor) = start_cursor {
        body.insert("start_cursor".to_string(), json!(cursor));
    }
    Value::Object(body)
}

/// Body of a page update replacing one relation property.
fn relation_update_body(property: &str, targets: &[RelationRef]) -> Value {
    json!({ "properties": { property: { "relation": targets } } })
}

impl RecordStore for NotionClient {
    #[instrument(
        name = "notion.query_database",
        skip_all,
        fields(
            database = %database_id,
            cursor = start_cursor.unwrap_or("-"),
            http.status_code = tracing::field::Empty,
            otel.kind = "client"
        )
    )]
    async fn query_database(
        &self,
        database_id: &str,
        start_cursor: Option<&str>,
    ) -> Result<QueryPage, RelateError> {
        let url = format!("{}/databases/{}/query", self.config.base_url, database_id);

        let response = self
            .client
            .post(&url)
            .json(&query_body(self.config.page_size, start_cursor))
            .send()
            .await;
        Self::record_status(&response);
        let response = response?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| RelateError::Parse(e.to_string()))
    }

    #[instrument(
        name = "notion.update_relation",
        skip_all,
        fields(
            page = %page_id,
            property = %property,
            targets = targets.len(),
            http.status_code = tracing::field::Empty,
            otel.kind = "client"
        )
    )]
    async fn update_relation(
        &self,
        page_id: &str,
        property: &str,
        targets: &[RelationRef],
    ) -> Result<(), RelateError> {
        let url = format!("{}/pages/{}", self.config.base_url, page_id);

        let response = self
            .client
            .patch(&url)
            .json(&relation_update_body(property, targets))
            .send()
            .await;
        Self::record_status(&response);
        let response = response?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }
}
