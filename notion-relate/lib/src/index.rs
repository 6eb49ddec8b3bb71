//! Match-value index over the auxiliary database.

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use crate::error::RelateError;
use crate::store::{Pages, RecordStore};
use crate::types::Record;

/// Maps a match value to the identifiers of every record carrying it.
///
/// Identifiers under a key keep the order in which records were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchIndex {
    entries: HashMap<String, Vec<String>>,
}

impl MatchIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record identifier under a match value.
    pub fn insert(&mut self, value: impl Into<String>, record_id: impl Into<String>) {
        self.entries
            .entry(value.into())
            .or_default()
            .push(record_id.into());
    }

    /// Record identifiers for a match value, empty when unknown.
    pub fn get(&self, value: &str) -> &[String] {
        self.entries.get(value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct match values.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no record has been indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of indexed record identifiers.
    pub fn record_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Add one record, extracting its value from `property`.
    ///
    /// Returns `false` when the record was left out, either because it has
    /// no usable value or because its property could not be read.
    pub fn index_record(&mut self, record: &Record, property: &str) -> bool {
        match record.match_value(property) {
            Ok(Some(value)) => {
                self.insert(value, record.id.clone());
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Error processing page properties");
                false
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for MatchIndex
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (value, id) in iter {
            index.insert(value, id);
        }
        index
    }
}

/// Read every record of `database_id` and index it by `property`.
///
/// ## Errors
///
/// Any API failure while paging is returned as-is; unreadable properties
/// only skip their record.
#[instrument(name = "build_index", skip_all, fields(database = %database_id, property = %property))]
pub async fn build_index<S: RecordStore>(
    store: &S,
    database_id: &str,
    property: &str,
) -> Result<MatchIndex, RelateError> {
    let mut index = MatchIndex::new();
    let mut scanned = 0usize;

    let mut pages = Pages::new(store, database_id);
    while let Some(page) = pages.next_page().await? {
        for record in &page.results {
            scanned += 1;
            if !index.index_record(record, property) {
                debug!(record_id = %record.id, "Record left out of index");
            }
        }
    }

    info!(
        scanned,
        pages = pages.fetched(),
        values = index.len(),
        records = index.record_count(),
        "Auxiliary index built"
    );
    Ok(index)
}
