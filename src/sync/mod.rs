use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use futures_util::{stream, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::api::MarketRequester;
use crate::cache::{FetchCache, FetchKey};
use crate::dates::Clock;
use crate::logging;
use crate::model::FetchKind;
use crate::store::{MarketStore, PersistenceError};

use self::aggregation::{AggregationError, SalesVolumes};
use self::history::{reconcile_history, HistoryReconciliation};
use self::orders::{reconcile_orders, OrderReconciliation};

pub mod aggregation;
pub mod history;
pub mod orders;

pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_PERSISTENCE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Number of items worked on at the same time.
    pub concurrency: usize,
    pub persistence_timeout: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            persistence_timeout: DEFAULT_PERSISTENCE_TIMEOUT,
        }
    }
}

/// Records written by a run, whatever the item.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub malformed: usize,
}

impl RecordCounts {
    fn add(&mut self, other: RecordCounts) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
        self.malformed += other.malformed;
    }
}

impl From<OrderReconciliation> for RecordCounts {
    fn from(value: OrderReconciliation) -> Self {
        Self {
            inserted: value.inserted,
            updated: value.updated,
            unchanged: value.unchanged,
            malformed: value.malformed,
            ..Default::default()
        }
    }
}

impl From<HistoryReconciliation> for RecordCounts {
    fn from(value: HistoryReconciliation) -> Self {
        Self {
            inserted: value.inserted,
            skipped: value.skipped,
            malformed: value.malformed,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureStage {
    Remote,
    Persistence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub item_id: i32,
    pub stage: FailureStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub kind: FetchKind,
    pub region_id: i32,
    /// Items for which the remote was called.
    pub attempted: usize,
    pub skipped_by_cache: Vec<i32>,
    pub succeeded: Vec<i32>,
    pub failed: Vec<FailedItem>,
    /// Items left alone because the run was cancelled before reaching them.
    pub not_dispatched: Vec<i32>,
    #[serde(flatten)]
    pub records: RecordCounts,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunReport {
    fn new(kind: FetchKind, region_id: i32) -> Self {
        Self {
            kind,
            region_id,
            attempted: 0,
            skipped_by_cache: vec![],
            succeeded: vec![],
            failed: vec![],
            not_dispatched: vec![],
            records: RecordCounts::default(),
            elapsed: Duration::ZERO,
        }
    }

    fn register(&mut self, item_id: i32, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::NotDispatched => self.not_dispatched.push(item_id),
            ItemOutcome::SkippedByCache => self.skipped_by_cache.push(item_id),
            ItemOutcome::Succeeded(counts) => {
                self.attempted += 1;
                self.records.add(counts);
                self.succeeded.push(item_id);
            }
            ItemOutcome::Failed { stage, reason } => {
                self.attempted += 1;
                self.failed.push(FailedItem {
                    item_id,
                    stage,
                    reason,
                });
            }
        }
    }

    fn sort(&mut self) {
        self.skipped_by_cache.sort_unstable();
        self.succeeded.sort_unstable();
        self.failed.sort_by_key(|f| f.item_id);
        self.not_dispatched.sort_unstable();
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_dispatched.is_empty()
    }
}

#[derive(Debug)]
enum ItemOutcome {
    NotDispatched,
    SkippedByCache,
    Succeeded(RecordCounts),
    Failed { stage: FailureStage, reason: String },
}

/// Drives remote fetches and reconciliations over an item universe.
///
/// Items are independent from each other: a failing item is reported and the run goes on.
/// Up to `concurrency` items are in flight at once; the fetch cache is the only state they
/// share.
pub struct MarketSynchronizer {
    requester: Arc<dyn MarketRequester>,
    store: MarketStore,
    cache: Arc<FetchCache>,
    clock: Arc<dyn Clock>,
    options: SyncOptions,
    cancellation: CancellationToken,
    progress: Option<ProgressBar>,
}

impl MarketSynchronizer {
    pub fn new(
        requester: Arc<dyn MarketRequester>,
        store: MarketStore,
        cache: Arc<FetchCache>,
        clock: Arc<dyn Clock>,
        options: SyncOptions,
    ) -> Self {
        Self {
            requester,
            store,
            cache,
            clock,
            options,
            cancellation: CancellationToken::new(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Cancelling the returned token stops dispatching new items. Items already in flight
    /// finish or time out.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn store(&self) -> &MarketStore {
        &self.store
    }

    pub async fn sync_orders(&self, region_id: i32, item_ids: &[i32]) -> RunReport {
        self.run(FetchKind::Orders, region_id, item_ids).await
    }

    pub async fn sync_history(&self, region_id: i32, item_ids: &[i32]) -> RunReport {
        self.run(FetchKind::History, region_id, item_ids).await
    }

    pub async fn sales_volumes(
        &self,
        region_id: i32,
        item_id: i32,
        as_of: NaiveDate,
    ) -> Result<SalesVolumes, AggregationError> {
        let store = self.store.clone();
        let task = tokio::task::spawn_blocking(move || {
            aggregation::sales_volumes(&store, item_id, region_id, as_of)
        });
        match task.await {
            Ok(volumes) => volumes,
            Err(source) => Err(PersistenceError::Task { source }.into()),
        }
    }

    async fn run(&self, kind: FetchKind, region_id: i32, item_ids: &[i32]) -> RunReport {
        let started = Instant::now();
        let mut seen = HashSet::new();
        let universe: Vec<i32> = item_ids
            .iter()
            .copied()
            .filter(|item_id| seen.insert(*item_id))
            .collect();
        logging::info!(
            "Synchronizing {} of {} items in region '{}'",
            kind,
            universe.len(),
            region_id
        );
        if let Some(progress) = &self.progress {
            progress.set_length(universe.len() as u64);
        }

        let outcomes: Vec<(i32, ItemOutcome)> = stream::iter(universe)
            .map(|item_id| async move {
                let outcome = self.sync_item(kind, region_id, item_id).await;
                if let Some(progress) = &self.progress {
                    progress.inc(1);
                }
                (item_id, outcome)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut report = RunReport::new(kind, region_id);
        for (item_id, outcome) in outcomes {
            report.register(item_id, outcome);
        }
        report.sort();
        report.elapsed = started.elapsed();
        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }
        logging::info!(
            "Synchronized {} in region '{}': {} succeeded, {} failed, {} skipped by cache",
            kind,
            region_id,
            report.succeeded.len(),
            report.failed.len(),
            report.skipped_by_cache.len()
        );
        report
    }

    async fn sync_item(&self, kind: FetchKind, region_id: i32, item_id: i32) -> ItemOutcome {
        if self.cancellation.is_cancelled() {
            return ItemOutcome::NotDispatched;
        }
        let key = FetchKey::new(kind, region_id, item_id);
        let now = self.clock.now();
        if !self.cache.should_fetch(&key, now).await {
            return ItemOutcome::SkippedByCache;
        }

        let persisted = match kind {
            FetchKind::Orders => {
                let snapshot = match self.requester.get_live_orders(region_id, item_id).await {
                    Ok(snapshot) => snapshot,
                    Err(e) => return remote_failure(e),
                };
                let fetched = snapshot.len();
                self.persist(move |store| reconcile_orders(store, region_id, &snapshot, now))
                    .await
                    .map(|summary| {
                        logging::info!(
                            "Fetched and stored {} orders of item '{}' in region '{}'",
                            fetched,
                            item_id,
                            region_id
                        );
                        RecordCounts::from(summary)
                    })
            }
            FetchKind::History => {
                let entries = match self.requester.get_daily_history(region_id, item_id).await {
                    Ok(entries) => entries,
                    Err(e) => return remote_failure(e),
                };
                self.persist(move |store| reconcile_history(store, region_id, item_id, &entries))
                    .await
                    .map(|summary| {
                        logging::info!(
                            "Fetched and stored history of item '{}' in region '{}'",
                            item_id,
                            region_id
                        );
                        RecordCounts::from(summary)
                    })
            }
        };

        match persisted {
            Ok(counts) => {
                self.cache.record_fetch(key, now).await;
                ItemOutcome::Succeeded(counts)
            }
            Err(e) => {
                logging::warning!(
                    "Could not store {} of item '{}' in region '{}': {}",
                    kind,
                    item_id,
                    region_id,
                    e
                );
                ItemOutcome::Failed {
                    stage: FailureStage::Persistence,
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn persist<T: Send + 'static>(
        &self,
        operation: impl FnOnce(&MarketStore) -> Result<T, PersistenceError> + Send + 'static,
    ) -> Result<T, PersistenceError> {
        let store = self.store.clone();
        let task = tokio::task::spawn_blocking(move || operation(&store));
        match tokio::time::timeout(self.options.persistence_timeout, task).await {
            Err(_) => Err(PersistenceError::Timeout {
                timeout: self.options.persistence_timeout,
            }),
            Ok(Err(source)) => Err(PersistenceError::Task { source }),
            Ok(Ok(result)) => result,
        }
    }
}

fn remote_failure(e: crate::api::RemoteFetchError) -> ItemOutcome {
    logging::warning!("{}", e);
    ItemOutcome::Failed {
        stage: FailureStage::Remote,
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::api::mocks::MockRequester;
    use crate::api::{HistoryEntry, OrderSnapshot};
    use crate::cache::mocks::MemoryFetchCacheStore;
    use crate::dates::FixedClock;
    use crate::store;

    use super::*;

    const REGION: i32 = 10000002;

    fn order(order_id: i64, item_id: i32, volume_remain: i32) -> OrderSnapshot {
        OrderSnapshot {
            order_id,
            type_id: item_id,
            price: 100.0,
            volume_remain,
            volume_total: 10,
            is_buy_order: false,
            issued: "2024-04-30T08:15:00Z".to_string(),
        }
    }

    fn history(date: &str, volume: i64) -> HistoryEntry {
        HistoryEntry {
            date: date.to_string(),
            volume,
            average: 10.0,
        }
    }

    struct Setup {
        requester: Arc<MockRequester>,
        clock: Arc<FixedClock>,
        cache: Arc<FetchCache>,
        synchronizer: MarketSynchronizer,
    }

    async fn setup(requester: MockRequester, concurrency: usize) -> Setup {
        setup_with(
            requester,
            SyncOptions {
                concurrency,
                ..Default::default()
            },
        )
        .await
    }

    async fn setup_with(requester: MockRequester, options: SyncOptions) -> Setup {
        let requester = Arc::new(requester);
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        let cache = FetchCache::load(
            Box::<MemoryFetchCacheStore>::default(),
            chrono::Duration::seconds(300),
        )
        .await;
        let cache = Arc::new(cache);
        let synchronizer = MarketSynchronizer::new(
            requester.clone(),
            MarketStore::open_in_memory().unwrap(),
            cache.clone(),
            clock.clone(),
            options,
        );
        Setup {
            requester,
            clock,
            cache,
            synchronizer,
        }
    }

    async fn last_fetch(s: &Setup, item_id: i32) -> Option<chrono::DateTime<Utc>> {
        s.cache
            .last_fetch(&FetchKey::new(FetchKind::Orders, REGION, item_id))
            .await
    }

    #[tokio::test]
    async fn test_failing_item_is_isolated() {
        let requester = MockRequester::builder()
            .insert_order(REGION, order(1, 100, 5))
            .insert_order(REGION, order(2, 100, 3))
            .insert_order(REGION, order(3, 300, 7))
            .failing_item(REGION, 200)
            .build();
        let s = setup(requester, 1).await;

        let report = s.synchronizer.sync_orders(REGION, &[100, 200, 300]).await;
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, vec![100, 300]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].item_id, 200);
        assert_eq!(report.failed[0].stage, FailureStage::Remote);
        assert_eq!(report.records.inserted, 3);

        let store = s.synchronizer.store();
        let item_100 = store
            .read(|conn| store::orders::for_item(conn, REGION, 100))
            .unwrap();
        assert_eq!(
            item_100
                .iter()
                .map(|o| (o.order_id, o.volume_remaining))
                .collect::<Vec<_>>(),
            vec![(1, 5), (2, 3)]
        );
        let item_300 = store
            .read(|conn| store::orders::for_item(conn, REGION, 300))
            .unwrap();
        assert_eq!(item_300.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_item_is_retried_next_run() {
        let requester = MockRequester::builder().failing_item(REGION, 200).build();
        let s = setup(requester, 2).await;

        s.synchronizer.sync_orders(REGION, &[100, 200]).await;
        let report = s.synchronizer.sync_orders(REGION, &[100, 200]).await;
        // 100 was recorded in the cache, 200 was not
        assert_eq!(report.skipped_by_cache, vec![100]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.attempted, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_is_isolated_and_retried() {
        let requester = MockRequester::builder()
            .insert_order(REGION, order(1, 100, 5))
            .insert_order(REGION, order(2, 200, 3))
            .build();
        let s = setup(requester, 2).await;
        s.synchronizer
            .store()
            .read(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_item_200 BEFORE INSERT ON market_orders
                     WHEN NEW.type_id = 200
                     BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;",
                )
                .map_err(store::query_error("create trigger"))
            })
            .unwrap();

        let report = s.synchronizer.sync_orders(REGION, &[100, 200]).await;
        assert_eq!(report.succeeded, vec![100]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].item_id, 200);
        assert_eq!(report.failed[0].stage, FailureStage::Persistence);
        assert!(report.failed[0].reason.contains("disk I/O error"));
        assert_eq!(report.records.inserted, 1);
        assert!(last_fetch(&s, 100).await.is_some());
        assert_eq!(last_fetch(&s, 200).await, None);
        let stored = s
            .synchronizer
            .store()
            .read(|conn| store::orders::for_item(conn, REGION, 200))
            .unwrap();
        assert!(stored.is_empty());

        s.synchronizer
            .store()
            .read(|conn| {
                conn.execute_batch("DROP TRIGGER reject_item_200")
                    .map_err(store::query_error("drop trigger"))
            })
            .unwrap();
        let retry = s.synchronizer.sync_orders(REGION, &[100, 200]).await;
        assert_eq!(retry.skipped_by_cache, vec![100]);
        assert_eq!(retry.succeeded, vec![200]);
        assert_eq!(retry.records.inserted, 1);
    }

    #[tokio::test]
    async fn test_storage_timeout_fails_item() {
        let requester = MockRequester::builder()
            .insert_order(REGION, order(1, 100, 5))
            .build();
        let s = setup_with(
            requester,
            SyncOptions {
                concurrency: 1,
                persistence_timeout: Duration::from_millis(100),
            },
        )
        .await;

        // Another writer holds the connection for longer than the timeout.
        let store = s.synchronizer.store().clone();
        let (locked, wait_locked) = std::sync::mpsc::channel();
        let writer = std::thread::spawn(move || {
            store
                .read(|_| {
                    locked.send(()).unwrap();
                    std::thread::sleep(Duration::from_millis(600));
                    Ok(())
                })
                .unwrap();
        });
        wait_locked.recv().unwrap();

        let report = s.synchronizer.sync_orders(REGION, &[100]).await;
        assert!(report.succeeded.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].stage, FailureStage::Persistence);
        assert!(report.failed[0].reason.contains("did not complete"));
        assert_eq!(last_fetch(&s, 100).await, None);
        writer.join().unwrap();
    }

    #[tokio::test]
    async fn test_cache_gates_until_cooldown_elapsed() {
        let requester = MockRequester::builder()
            .insert_order(REGION, order(1, 100, 5))
            .build();
        let s = setup(requester, 4).await;

        let first = s.synchronizer.sync_orders(REGION, &[100]).await;
        assert_eq!(first.succeeded, vec![100]);

        s.clock.advance(chrono::Duration::seconds(120));
        let second = s.synchronizer.sync_orders(REGION, &[100]).await;
        assert_eq!(second.skipped_by_cache, vec![100]);
        assert_eq!(second.attempted, 0);

        s.clock.advance(chrono::Duration::seconds(180));
        s.requester
            .replace_orders(REGION, 100, vec![order(1, 100, 2), order(4, 100, 1)]);
        let third = s.synchronizer.sync_orders(REGION, &[100]).await;
        assert_eq!(third.succeeded, vec![100]);
        assert_eq!(third.records.updated, 1);
        assert_eq!(third.records.inserted, 1);

        let orders_calls = s
            .requester
            .calls()
            .into_iter()
            .filter(|(kind, _, _)| *kind == FetchKind::Orders)
            .count();
        assert_eq!(orders_calls, 2);
    }

    #[tokio::test]
    async fn test_history_and_orders_do_not_share_cooldown() {
        let requester = MockRequester::builder()
            .insert_order(REGION, order(1, 100, 5))
            .insert_history_entry(REGION, 100, history("2024-04-30", 12))
            .build();
        let s = setup(requester, 4).await;

        s.synchronizer.sync_orders(REGION, &[100]).await;
        let report = s.synchronizer.sync_history(REGION, &[100]).await;
        assert_eq!(report.succeeded, vec![100]);
        assert_eq!(report.records.inserted, 1);
    }

    #[tokio::test]
    async fn test_history_then_volumes() {
        let requester = MockRequester::builder()
            .insert_history_entry(REGION, 100, history("2024-04-28", 10))
            .insert_history_entry(REGION, 100, history("2024-04-29", 20))
            .insert_history_entry(REGION, 100, history("2024-04-30", 0))
            .insert_history_entry(REGION, 100, history("2024-05-01", 30))
            .build();
        let s = setup(requester, 4).await;

        let report = s.synchronizer.sync_history(REGION, &[100]).await;
        assert_eq!(report.records.inserted, 4);

        let volumes = s
            .synchronizer
            .sales_volumes(REGION, 100, s.clock.today())
            .await
            .unwrap();
        assert_eq!(volumes.average_30_days, 2.0);
        assert_eq!(volumes.average_60_days, 1.0);
    }

    #[tokio::test]
    async fn test_cancelled_run_dispatches_nothing() {
        let requester = MockRequester::builder().build();
        let s = setup(requester, 1).await;

        s.synchronizer.cancellation().cancel();
        let report = s.synchronizer.sync_orders(REGION, &[100, 200]).await;
        assert_eq!(report.not_dispatched, vec![100, 200]);
        assert_eq!(report.attempted, 0);
        assert!(s.requester.calls().is_empty());
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_duplicated_items_are_synced_once() {
        let requester = MockRequester::builder().build();
        let s = setup(requester, 4).await;

        let report = s.synchronizer.sync_orders(REGION, &[100, 100, 200]).await;
        assert_eq!(report.succeeded, vec![100, 200]);
        assert_eq!(s.requester.calls().len(), 2);
        assert!(report.is_complete());
    }
}
