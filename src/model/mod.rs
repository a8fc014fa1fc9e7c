use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod history;
pub mod orders;

/// Kind of remote data a synchronization run deals with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FetchKind {
    Orders,
    History,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum MalformedRecordError {
    #[error("{record} could not be decoded: {reason}")]
    Undecodable { record: String, reason: String },
    #[error("order '{order_id}' has an invalid issue date '{issued}': {source}")]
    InvalidIssueDate {
        order_id: i64,
        issued: String,
        source: chrono::ParseError,
    },
    #[error("order '{order_id}' is invalid: {reason}")]
    InvalidOrder { order_id: i64, reason: String },
    #[error("history entry of item '{item_id}' has an invalid date '{date}': {source}")]
    InvalidHistoryDate {
        item_id: i32,
        date: String,
        source: chrono::ParseError,
    },
    #[error("history entry of item '{item_id}' for {date} is invalid: {reason}")]
    InvalidHistoryEntry {
        item_id: i32,
        date: NaiveDate,
        reason: String,
    },
}
