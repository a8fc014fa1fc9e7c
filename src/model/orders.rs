use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::api::OrderSnapshot;

use super::MalformedRecordError;

pub static ISSUED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Order as observed in a remote snapshot, once validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedOrder {
    pub order_id: i64,
    pub item_id: i32,
    pub price: f64,
    pub volume_remaining: i32,
    pub volume_total: i32,
    pub is_buy_order: bool,
    pub issued_at: DateTime<Utc>,
}

impl ObservedOrder {
    pub fn parse(snapshot: &OrderSnapshot) -> Result<Self, MalformedRecordError> {
        let issued_at = NaiveDateTime::parse_from_str(&snapshot.issued, ISSUED_FORMAT)
            .map_err(|source| MalformedRecordError::InvalidIssueDate {
                order_id: snapshot.order_id,
                issued: snapshot.issued.clone(),
                source,
            })?
            .and_utc();

        let invalid = |reason: String| MalformedRecordError::InvalidOrder {
            order_id: snapshot.order_id,
            reason,
        };
        if !snapshot.price.is_finite() || snapshot.price < 0.0 {
            return Err(invalid(format!("price {} is not valid", snapshot.price)));
        }
        if snapshot.volume_total <= 0 {
            return Err(invalid(format!(
                "total volume {} should be positive",
                snapshot.volume_total
            )));
        }
        if snapshot.volume_remain < 0 || snapshot.volume_remain > snapshot.volume_total {
            return Err(invalid(format!(
                "remaining volume {} is outside of [0;{}]",
                snapshot.volume_remain, snapshot.volume_total
            )));
        }

        Ok(Self {
            order_id: snapshot.order_id,
            item_id: snapshot.type_id,
            price: snapshot.price,
            volume_remaining: snapshot.volume_remain,
            volume_total: snapshot.volume_total,
            is_buy_order: snapshot.is_buy_order,
            issued_at,
        })
    }
}

/// Mutable part of a live order, compared on every re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum OrderField {
    Price,
    VolumeRemaining,
    VolumeTotal,
    IsBuyOrder,
    IssuedAt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveOrder {
    pub order_id: i64,
    pub item_id: i32,
    pub region_id: i32,
    pub price: f64,
    pub volume_remaining: i32,
    pub volume_total: i32,
    pub is_buy_order: bool,
    pub issued_at: DateTime<Utc>,
    pub last_synced_at: DateTime<Utc>,
}

impl LiveOrder {
    pub fn observed(region_id: i32, observed: &ObservedOrder, now: DateTime<Utc>) -> Self {
        Self {
            order_id: observed.order_id,
            item_id: observed.item_id,
            region_id,
            price: observed.price,
            volume_remaining: observed.volume_remaining,
            volume_total: observed.volume_total,
            is_buy_order: observed.is_buy_order,
            issued_at: observed.issued_at,
            last_synced_at: now,
        }
    }

    pub fn changed_fields(&self, observed: &ObservedOrder) -> Vec<OrderField> {
        let mut changed = vec![];
        if self.price != observed.price {
            changed.push(OrderField::Price);
        }
        if self.volume_remaining != observed.volume_remaining {
            changed.push(OrderField::VolumeRemaining);
        }
        if self.volume_total != observed.volume_total {
            changed.push(OrderField::VolumeTotal);
        }
        if self.is_buy_order != observed.is_buy_order {
            changed.push(OrderField::IsBuyOrder);
        }
        if self.issued_at != observed.issued_at {
            changed.push(OrderField::IssuedAt);
        }
        changed
    }

    /// Overwrites every mutable field. Identity (`order_id`, `item_id`, `region_id`) is kept.
    pub fn refresh(&mut self, observed: &ObservedOrder, now: DateTime<Utc>) {
        self.price = observed.price;
        self.volume_remaining = observed.volume_remaining;
        self.volume_total = observed.volume_total;
        self.is_buy_order = observed.is_buy_order;
        self.issued_at = observed.issued_at;
        self.last_synced_at = now;
    }
}
