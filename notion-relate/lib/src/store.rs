//! The record store seam and cursor pagination over it.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::RelateError;
use crate::types::{QueryPage, RelationRef};

/// Backend holding the databases being linked.
///
/// [`NotionClient`](crate::NotionClient) is the production implementation.
///
/// ## Native Async Traits
///
/// Methods return `impl Future + Send`, so implementors can simply write
/// `async fn`.
pub trait RecordStore: Send + Sync {
    /// Fetch one page of a database, starting at `start_cursor`.
    ///
    /// ## Errors
    ///
    /// Returns [`RelateError`] when the backend call fails.
    fn query_database(
        &self,
        database_id: &str,
        start_cursor: Option<&str>,
    ) -> impl Future<Output = Result<QueryPage, RelateError>> + Send;

    /// Replace the relation held by `property` on `page_id` with `targets`.
    ///
    /// ## Errors
    ///
    /// Returns [`RelateError`] when the backend call fails.
    fn update_relation(
        &self,
        page_id: &str,
        property: &str,
        targets: &[RelationRef],
    ) -> impl Future<Output = Result<(), RelateError>> + Send;
}

/// Walks a database page by page following `next_cursor`.
///
/// ## Examples
///
/// ```rust,ignore
/// let mut pages = Pages::new(&client, "database-id");
/// while let Some(page) = pages.next_page().await? {
///     for record in &page.results { /* ... */ }
/// }
/// ```
pub struct Pages<'a, S> {
    store: &'a S,
    database_id: &'a str,
    cursor: Option<String>,
    exhausted: bool,
    fetched: usize,
}

impl<'a, S: RecordStore> Pages<'a, S> {
    /// Start at the first page of `database_id`.
    pub fn new(store: &'a S, database_id: &'a str) -> Self {
        Self {
            store,
            database_id,
            cursor: None,
            exhausted: false,
            fetched: 0,
        }
    }

    /// Fetch the next page, or `None` once the database is exhausted.
    ///
    /// A page claiming `has_more` without a `next_cursor` ends the walk.
    ///
    /// ## Errors
    ///
    /// Propagates the store's error for the failing page.
    pub async fn next_page(&mut self) -> Result<Option<QueryPage>, RelateError> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .query_database(self.database_id, self.cursor.as_deref())
            .await?;
        self.fetched += 1;

        debug!(
            database = %self.database_id,
            page = self.fetched,
            records = page.results.len(),
            has_more = page.has_more,
            "Fetched page"
        );

        match (page.has_more, &page.next_cursor) {
            (true, Some(cursor)) => self.cursor = Some(cursor.clone()),
            (true, None) => {
                warn!(database = %self.database_id, "has_more set without next_cursor; stopping");
                self.exhausted = true;
            }
            (false, _) => self.exhausted = true,
        }

        Ok(Some(page))
    }

    /// Pages fetched so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }
}

#[cfg(test)]
pub(crate) use memory::MemoryStore;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::RecordStore;
    use crate::error::RelateError;
    use crate::types::{QueryPage, Record, RelationRef};

    /// In-memory store paging by offset cursors.
    pub(crate) struct MemoryStore {
        databases: Mutex<HashMap<String, Vec<Record>>>,
        page_size: usize,
        queries: AtomicUsize,
        updates: Mutex<Vec<(String, String, Vec<String>)>>,
    }

    impl Default for MemoryStore {
        fn default() -> Self {
            Self::with_page_size(100)
        }
    }

    impl MemoryStore {
        pub(crate) fn with_page_size(page_size: usize) -> Self {
            Self {
                databases: Mutex::new(HashMap::new()),
                page_size,
                queries: AtomicUsize::new(0),
                updates: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn with_database(self, id: &str, records: Vec<Record>) -> Self {
            self.databases
                .lock()
                .unwrap()
                .insert(id.to_string(), records);
            self
        }

        pub(crate) fn query_count(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }

        /// `(page_id, property, target ids)` for every update, in call order.
        pub(crate) fn updates(&self) -> Vec<(String, String, Vec<String>)> {
            self.updates.lock().unwrap().clone()
        }

        pub(crate) fn clear_updates(&self) {
            self.updates.lock().unwrap().clear();
        }
    }

    impl RecordStore for MemoryStore {
        async fn query_database(
            &self,
            database_id: &str,
            start_cursor: Option<&str>,
        ) -> Result<QueryPage, RelateError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let databases = self.databases.lock().unwrap();
            let records = databases.get(database_id).ok_or_else(|| RelateError::Api {
                status: 404,
                code: "object_not_found".to_string(),
                message: format!("Could not find database with ID: {database_id}"),
            })?;

            let start: usize = start_cursor.map_or(0, |c| c.parse().unwrap());
            let end = (start + self.page_size).min(records.len());
            let has_more = end < records.len();
            Ok(QueryPage {
                results: records[start..end].to_vec(),
                has_more,
                next_cursor: has_more.then(|| end.to_string()),
            })
        }

        async fn update_relation(
            &self,
            page_id: &str,
            property: &str,
            targets: &[RelationRef],
        ) -> Result<(), RelateError> {
            let ids: Vec<String> = targets.iter().map(|t| t.id.clone()).collect();
            let mut databases = self.databases.lock().unwrap();
            for record in databases.values_mut().flatten() {
                if record.id == page_id {
                    record.properties.insert(
                        property.to_string(),
                        json!({ "type": "relation", "relation": targets }),
                    );
                }
            }
            self.updates
                .lock()
                .unwrap()
                .push((page_id.to_string(), property.to_string(), ids));
            Ok(())
        }
    }
}
