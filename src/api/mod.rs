use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{FetchKind, MalformedRecordError};

pub mod esi;

#[cfg(test)]
pub mod mocks;

/// One entry of `GET /markets/{region_id}/orders/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order_id: i64,
    pub type_id: i32,
    pub price: f64,
    pub volume_remain: i32,
    pub volume_total: i32,
    pub is_buy_order: bool,
    pub issued: String,
}

/// One entry of `GET /markets/{region_id}/history/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    pub volume: i64,
    pub average: f64,
}

/// Elements of a remote listing, each decoded on its own: one badly shaped element does not
/// hide its siblings.
pub type Listing<T> = Vec<Result<T, MalformedRecordError>>;

#[derive(Debug, Error)]
#[error("Could not fetch {kind} of item '{item_id}' in region '{region_id}': {failure}")]
pub struct RemoteFetchError {
    pub kind: FetchKind,
    pub region_id: i32,
    pub item_id: i32,
    #[source]
    pub failure: RemoteFailure,
}

impl RemoteFetchError {
    pub fn status(&self) -> Option<u16> {
        match &self.failure {
            RemoteFailure::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteFailure {
    #[error("request timed out: {source}")]
    Timeout { source: reqwest::Error },
    #[error("request failed: {source}")]
    Transport { source: reqwest::Error },
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not decode response: {source}")]
    Decode { source: reqwest::Error },
    #[error("invalid request URL: {source}")]
    InvalidUrl { source: url::ParseError },
}

impl RemoteFailure {
    fn from_transport(source: reqwest::Error) -> Self {
        if source.is_timeout() {
            RemoteFailure::Timeout { source }
        } else {
            RemoteFailure::Transport { source }
        }
    }
}

#[async_trait]
pub trait MarketRequester: Send + Sync {
    async fn get_live_orders(
        &self,
        region_id: i32,
        item_id: i32,
    ) -> Result<Listing<OrderSnapshot>, RemoteFetchError>;

    async fn get_daily_history(
        &self,
        region_id: i32,
        item_id: i32,
    ) -> Result<Listing<HistoryEntry>, RemoteFetchError>;
}
