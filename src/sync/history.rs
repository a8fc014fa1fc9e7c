use std::collections::HashSet;

use serde::Serialize;

use crate::api::HistoryEntry;
use crate::logging;
use crate::model::history::HistoryRecord;
use crate::model::MalformedRecordError;
use crate::store::{self, MarketStore, PersistenceError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryReconciliation {
    pub inserted: usize,
    pub skipped: usize,
    pub malformed: usize,
}

/// Inserts the days not stored yet. Stored days are never rewritten, even when the remote
/// figures changed since.
pub fn reconcile_history(
    store: &MarketStore,
    region_id: i32,
    item_id: i32,
    entries: &[Result<HistoryEntry, MalformedRecordError>],
) -> Result<HistoryReconciliation, PersistenceError> {
    store.transaction(|tx| {
        let mut summary = HistoryReconciliation::default();
        let mut seen = HashSet::new();
        let mut to_insert = vec![];
        for entry in entries {
            let parsed = match entry {
                Ok(entry) => HistoryRecord::parse(region_id, item_id, entry),
                Err(e) => Err(e.clone()),
            };
            let record = match parsed {
                Ok(record) => record,
                Err(e) => {
                    logging::warning!("Skipping history entry: {}", e);
                    summary.malformed += 1;
                    continue;
                }
            };
            if !seen.insert(record.date) {
                summary.skipped += 1;
                continue;
            }
            match store::history::find(tx, item_id, region_id, record.date)? {
                Some(_) => summary.skipped += 1,
                None => to_insert.push(record),
            }
        }
        summary.inserted = to_insert.len();
        store::history::insert_all(tx, &to_insert)?;
        Ok(summary)
    })
}
