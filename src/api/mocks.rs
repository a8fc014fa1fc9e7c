use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::*;

#[derive(Default)]
pub struct MockRequesterBuilder {
    orders: HashMap<(i32, i32), Vec<OrderSnapshot>>,
    history: HashMap<(i32, i32), Vec<HistoryEntry>>,
    failing: HashSet<(i32, i32)>,
}

impl MockRequesterBuilder {
    pub fn insert_order(mut self, region_id: i32, value: OrderSnapshot) -> Self {
        self.orders
            .entry((region_id, value.type_id))
            .or_default()
            .push(value);
        self
    }

    pub fn insert_history_entry(
        mut self,
        region_id: i32,
        item_id: i32,
        value: HistoryEntry,
    ) -> Self {
        self.history
            .entry((region_id, item_id))
            .or_default()
            .push(value);
        self
    }

    /// Every request for this item answers with a 503.
    pub fn failing_item(mut self, region_id: i32, item_id: i32) -> Self {
        self.failing.insert((region_id, item_id));
        self
    }

    pub fn build(self) -> MockRequester {
        MockRequester {
            orders: Mutex::new(self.orders),
            history: self.history,
            failing: self.failing,
            calls: Mutex::new(vec![]),
        }
    }
}

pub struct MockRequester {
    orders: Mutex<HashMap<(i32, i32), Vec<OrderSnapshot>>>,
    history: HashMap<(i32, i32), Vec<HistoryEntry>>,
    failing: HashSet<(i32, i32)>,
    calls: Mutex<Vec<(FetchKind, i32, i32)>>,
}

impl MockRequester {
    pub fn builder() -> MockRequesterBuilder {
        MockRequesterBuilder::default()
    }

    pub fn calls(&self) -> Vec<(FetchKind, i32, i32)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn replace_orders(&self, region_id: i32, item_id: i32, orders: Vec<OrderSnapshot>) {
        self.orders
            .lock()
            .unwrap()
            .insert((region_id, item_id), orders);
    }

    fn check(&self, kind: FetchKind, region_id: i32, item_id: i32) -> Result<(), RemoteFetchError> {
        self.calls.lock().unwrap().push((kind, region_id, item_id));
        if self.failing.contains(&(region_id, item_id)) {
            return Err(RemoteFetchError {
                kind,
                region_id,
                item_id,
                failure: RemoteFailure::Status {
                    status: 503,
                    body: "service unavailable".to_string(),
                },
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MarketRequester for MockRequester {
    async fn get_live_orders(
        &self,
        region_id: i32,
        item_id: i32,
    ) -> Result<Listing<OrderSnapshot>, RemoteFetchError> {
        self.check(FetchKind::Orders, region_id, item_id)?;
        let orders = self.orders.lock().unwrap();
        Ok(orders
            .get(&(region_id, item_id))
            .map(|orders| orders.iter().cloned().map(Ok).collect())
            .unwrap_or_default())
    }

    async fn get_daily_history(
        &self,
        region_id: i32,
        item_id: i32,
    ) -> Result<Listing<HistoryEntry>, RemoteFetchError> {
        self.check(FetchKind::History, region_id, item_id)?;
        Ok(self
            .history
            .get(&(region_id, item_id))
            .map(|entries| entries.iter().cloned().map(Ok).collect())
            .unwrap_or_default())
    }
}
