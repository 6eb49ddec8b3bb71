//! Relation linking over the base database.
//!
//! The [`Linker`] walks the base database page by page, looks each record's
//! match value up in a [`MatchIndex`], and replaces the link property with
//! the matched auxiliary identifiers. Every per-record decision is reported
//! to a [`LinkObserver`] as a [`LinkEvent`].
//!
//! ## Decision Table
//!
//! | candidates | existing relation | skip  | outcome  |
//! |------------|-------------------|-------|----------|
//! | non-empty  | empty             | any   | write    |
//! | non-empty  | non-empty         | false | write    |
//! | any        | non-empty         | true  | skip     |
//! | empty      | any               | false | no match |
//! | empty      | empty             | true  | no match |

use tracing::{debug, info, instrument, warn};

use crate::config::LinkOptions;
use crate::error::RelateError;
use crate::index::MatchIndex;
use crate::store::{Pages, RecordStore};
use crate::types::{Record, RelationRef};

/// Outcome for a single base record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The relation was (or, in a dry run, would have been) replaced.
    Linked {
        /// Base record identifier
        record_id: String,
        /// Auxiliary identifiers written to the relation
        targets: Vec<String>,
        /// No update was issued
        dry_run: bool,
    },
    /// The record already had a relation and skipping was requested.
    Skipped {
        /// Base record identifier
        record_id: String,
        /// Identifiers already present
        existing: Vec<String>,
    },
    /// Nothing to link: no match value, or no auxiliary record carries it.
    Unmatched {
        /// Base record identifier
        record_id: String,
        /// The match value, `None` when the record had none
        value: Option<String>,
    },
    /// The match property could not be read; the record was not processed.
    Failed {
        /// Base record identifier
        record_id: String,
        /// Rendered extraction error
        error: String,
    },
}

/// Receives per-record progress from a [`Linker`] run.
pub trait LinkObserver {
    /// Called once per base record, in scan order.
    fn on_event(&mut self, event: &LinkEvent);

    /// Called once after the last record.
    fn on_finish(&mut self, _report: &LinkReport) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LinkObserver for NoopObserver {
    fn on_event(&mut self, _event: &LinkEvent) {}
}

/// Collects every event, in order.
impl LinkObserver for Vec<LinkEvent> {
    fn on_event(&mut self, event: &LinkEvent) {
        self.push(event.clone());
    }
}

/// Totals for a linking run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Records counted against `max_records`
    pub processed: usize,
    /// Records whose relation was (or would have been) written
    pub linked: usize,
    /// Records left alone because they already had a relation
    pub skipped: usize,
    /// Records with no match value or no candidates
    pub unmatched: usize,
    /// Records whose match property could not be read
    pub failed: usize,
    /// Sum of written candidate counts across linked records
    pub change_count: usize,
}

/// Writes relations on the base database from a prebuilt index.
pub struct Linker<'a, S> {
    store: &'a S,
    options: &'a LinkOptions,
}

impl<'a, S: RecordStore> Linker<'a, S> {
    /// Create a linker for `options` backed by `store`.
    pub fn new(store: &'a S, options: &'a LinkOptions) -> Self {
        Self { store, options }
    }

    fn cap_reached(&self, processed: usize) -> bool {
        self.options.max_records.is_some_and(|max| processed >= max)
    }

    /// Scan the base database and link every matching record.
    ///
    /// ## Errors
    ///
    /// The first query or update failure aborts the run.
    #[instrument(
        name = "link",
        skip_all,
        fields(
            database = %self.options.base_database,
            link = %self.options.link_property,
            dry_run = self.options.dry_run,
            skip = self.options.skip_existing
        )
    )]
    pub async fn run<O: LinkObserver + ?Sized>(
        &self,
        index: &MatchIndex,
        observer: &mut O,
    ) -> Result<LinkReport, RelateError> {
        let mut report = LinkReport::default();
        let mut pages = Pages::new(self.store, &self.options.base_database);

        'pages: while !self.cap_reached(report.processed) {
            let Some(page) = pages.next_page().await? else {
                break;
            };
            for record in &page.results {
                if self.cap_reached(report.processed) {
                    debug!(processed = report.processed, "Record cap reached");
                    break 'pages;
                }
                let event = self.link_record(record, index, &mut report).await?;
                observer.on_event(&event);
            }
        }

        info!(
            processed = report.processed,
            linked = report.linked,
            skipped = report.skipped,
            unmatched = report.unmatched,
            failed = report.failed,
            changes = report.change_count,
            "Linking finished"
        );
        observer.on_finish(&report);
        Ok(report)
    }

    async fn link_record(
        &self,
        record: &Record,
        index: &MatchIndex,
        report: &mut LinkReport,
    ) -> Result<LinkEvent, RelateError> {
        let options = self.options;

        let value = match record.match_value(&options.match_property) {
            Ok(value) => value,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Error processing match property");
                report.failed += 1;
                return Ok(LinkEvent::Failed {
                    record_id: record.id.clone(),
                    error: e.to_string(),
                });
            }
        };
        report.processed += 1;

        let Some(value) = value else {
            report.unmatched += 1;
            return Ok(LinkEvent::Unmatched {
                record_id: record.id.clone(),
                value: None,
            });
        };

        let candidates = index.get(&value);
        let existing = record.relation_ids(&options.link_property);

        if !candidates.is_empty() && (existing.is_empty() || !options.skip_existing) {
            let targets: Vec<RelationRef> = candidates
                .iter()
                .map(|id| RelationRef { id: id.clone() })
                .collect();
            report.linked += 1;
            report.change_count += targets.len();

            if options.dry_run {
                debug!(record_id = %record.id, targets = targets.len(), "Dry run: update not sent");
            } else {
                self.store
                    .update_relation(&record.id, &options.link_property, &targets)
                    .await?;
            }

            Ok(LinkEvent::Linked {
                record_id: record.id.clone(),
                targets: candidates.to_vec(),
                dry_run: options.dry_run,
            })
        } else if !existing.is_empty() && options.skip_existing {
            report.skipped += 1;
            Ok(LinkEvent::Skipped {
                record_id: record.id.clone(),
                existing,
            })
        } else {
            report.unmatched += 1;
            Ok(LinkEvent::Unmatched {
                record_id: record.id.clone(),
                value: Some(value),
            })
        }
    }
}
