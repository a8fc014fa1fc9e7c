use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::OrderSnapshot;
use crate::logging;
use crate::model::orders::{LiveOrder, ObservedOrder, OrderField};
use crate::model::MalformedRecordError;
use crate::store::{self, MarketStore, PersistenceError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderReconciliation {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub malformed: usize,
}

#[derive(Debug)]
enum OrderOutcome {
    New(LiveOrder),
    Changed(LiveOrder, Vec<OrderField>),
    Unchanged,
    Malformed(MalformedRecordError),
}

/// Reconciles a snapshot of the order book with the stored live orders.
///
/// New orders are inserted, orders with at least one changed field are rewritten, the others
/// are left untouched. Malformed observations are skipped. Everything commits in a single
/// transaction: on error nothing from this snapshot is kept.
pub fn reconcile_orders(
    store: &MarketStore,
    region_id: i32,
    snapshot: &[Result<OrderSnapshot, MalformedRecordError>],
    now: DateTime<Utc>,
) -> Result<OrderReconciliation, PersistenceError> {
    let snapshot = deduplicate(snapshot);
    store.transaction(|tx| {
        let mut outcomes = Vec::with_capacity(snapshot.len());
        for observation in &snapshot {
            outcomes.push(classify(tx, region_id, observation, now)?);
        }

        let mut summary = OrderReconciliation::default();
        let mut to_insert = vec![];
        for outcome in outcomes {
            match outcome {
                OrderOutcome::New(order) => {
                    summary.inserted += 1;
                    to_insert.push(order);
                }
                OrderOutcome::Changed(order, fields) => {
                    logging::trace!(
                        "Order '{}' changed: {}",
                        order.order_id,
                        fields
                            .iter()
                            .map(|f| f.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                    store::orders::update(tx, &order)?;
                    summary.updated += 1;
                }
                OrderOutcome::Unchanged => summary.unchanged += 1,
                OrderOutcome::Malformed(e) => {
                    logging::warning!("Skipping order: {}", e);
                    summary.malformed += 1;
                }
            }
        }
        store::orders::insert_all(tx, &to_insert)?;
        Ok(summary)
    })
}

fn classify(
    conn: &rusqlite::Connection,
    region_id: i32,
    observation: &Result<OrderSnapshot, MalformedRecordError>,
    now: DateTime<Utc>,
) -> Result<OrderOutcome, PersistenceError> {
    let parsed = match observation {
        Ok(snapshot) => ObservedOrder::parse(snapshot),
        Err(e) => Err(e.clone()),
    };
    let observed = match parsed {
        Ok(observed) => observed,
        Err(e) => return Ok(OrderOutcome::Malformed(e)),
    };
    let outcome = match store::orders::find(conn, observed.order_id)? {
        None => OrderOutcome::New(LiveOrder::observed(region_id, &observed, now)),
        Some(mut existing) => {
            let changed = existing.changed_fields(&observed);
            if changed.is_empty() {
                OrderOutcome::Unchanged
            } else {
                existing.refresh(&observed, now);
                OrderOutcome::Changed(existing, changed)
            }
        }
    };
    Ok(outcome)
}

/// A paginated snapshot may list an order twice; the last observation wins.
fn deduplicate(
    snapshot: &[Result<OrderSnapshot, MalformedRecordError>],
) -> Vec<Result<OrderSnapshot, MalformedRecordError>> {
    let mut positions: HashMap<i64, usize> = HashMap::new();
    let mut unique = Vec::with_capacity(snapshot.len());
    for observation in snapshot {
        let order_id = match observation {
            Ok(order) => order.order_id,
            Err(_) => {
                unique.push(observation.clone());
                continue;
            }
        };
        match positions.get(&order_id) {
            Some(position) => {
                logging::debug!("Order '{}' observed twice", order_id);
                unique[*position] = observation.clone();
            }
            None => {
                positions.insert(order_id, unique.len());
                unique.push(observation.clone());
            }
        }
    }
    unique
}
