//! Link records across two Notion databases by a shared property value.
//!
//! A run has two sequential phases:
//!
//! 1. **Index** - every record of the auxiliary database is read and indexed
//!    by the value of its match property ([`build_index`]).
//! 2. **Link** - every record of the base database is read, its match value
//!    looked up in the index, and its relation property replaced with the
//!    matching auxiliary identifiers ([`Linker`]).
//!
//! ## Core Types
//!
//! - [`Record`] / [`PropertyValue`] - database records and their decoded properties
//! - [`MatchIndex`] - match value to auxiliary record identifiers
//! - [`LinkOptions`] - which databases and properties to link, and how
//! - [`LinkEvent`] / [`LinkObserver`] - per-record progress reporting
//! - [`LinkReport`] - totals for a run
//!
//! ## Backends
//!
//! - [`RecordStore`] - trait for anything that can page and update records
//! - [`NotionClient`] - the Notion REST implementation
//!
//! ## Examples
//!
//! ```rust,no_run
//! use notion_relate_lib::{LinkOptions, NoopObserver, NotionClient, NotionConfig, link_databases};
//!
//! # async fn example() -> Result<(), notion_relate_lib::RelateError> {
//! let client = NotionClient::new(NotionConfig::from_env()?)?;
//! let options = LinkOptions {
//!     base_database: "base-db".to_string(),
//!     aux_database: "aux-db".to_string(),
//!     match_property: "Code".to_string(),
//!     aux_match_property: "Name".to_string(),
//!     link_property: "Parent".to_string(),
//!     dry_run: true,
//!     ..Default::default()
//! };
//!
//! let report = link_databases(&client, &options, &mut NoopObserver).await?;
//! println!("{} changes", report.change_count);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod index;
mod linker;
mod store;
mod types;

pub use client::NotionClient;
pub use config::{DEFAULT_API_URL, DEFAULT_NOTION_VERSION, LinkOptions, MAX_PAGE_SIZE, NotionConfig};
pub use error::{ExtractionError, RelateError};
pub use index::{MatchIndex, build_index};
pub use linker::{LinkEvent, LinkObserver, LinkReport, Linker, NoopObserver};
pub use store::{Pages, RecordStore};
pub use types::{PropertyValue, QueryPage, Record, RelationRef, TextSpan};

use tracing::info;

/// Index the auxiliary database, then link the base database against it.
///
/// ## Errors
///
/// Returns [`RelateError::Config`] for incomplete options, or the first API
/// failure from either phase.
pub async fn link_databases<S, O>(
    store: &S,
    options: &LinkOptions,
    observer: &mut O,
) -> Result<LinkReport, RelateError>
where
    S: RecordStore,
    O: LinkObserver + ?Sized,
{
    options.validate()?;

    let index = build_index(store, &options.aux_database, &options.aux_match_property).await?;
    info!(values = index.len(), "Index phase complete");

    Linker::new(store, options).run(&index, observer).await
}
