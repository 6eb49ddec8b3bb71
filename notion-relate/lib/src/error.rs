//! Error types for the relate library.

use thiserror::Error;

/// Fatal errors raised while talking to the Notion API.
///
/// Any of these aborts a run; there is no retry.
#[derive(Debug, Error)]
pub enum RelateError {
    /// HTTP transport failed (connection, timeout, body decoding).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error (status {status}, {code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Notion error code (e.g. `object_not_found`)
        code: String,
        /// Error message from the API
        message: String,
    },

    /// A response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// A single record's property could not be read.
///
/// These are recoverable: the offending record is logged and skipped.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// A `title` or `rich_text` property holds no text spans.
    #[error("property '{property}' has an empty {kind} sequence")]
    EmptySequence {
        /// Property name
        property: String,
        /// Property kind (`title` or `rich_text`)
        kind: &'static str,
    },

    /// The first text span has no `plain_text` field.
    #[error("property '{property}' has a text span without plain_text")]
    MissingPlainText {
        /// Property name
        property: String,
    },

    /// The property payload does not have the shape its `type` announces.
    #[error("property '{property}' is malformed: {source}")]
    Malformed {
        /// Property name
        property: String,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },
}
