use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::logging;
use crate::model::{FetchKind, MalformedRecordError};

use super::{
    HistoryEntry, Listing, MarketRequester, OrderSnapshot, RemoteFailure, RemoteFetchError,
};

pub static DEFAULT_BASE_URL: &str = "https://esi.evetech.net/latest/";

static PAGES_HEADER: &str = "x-pages";

#[derive(Debug, Error)]
pub enum EsiClientInitError {
    #[error("invalid ESI base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("could not build HTTP client: {source}")]
    HttpClient { source: reqwest::Error },
}

/// Read-only client of the public market endpoints.
///
/// Every request is bounded by the configured timeout and never retried here:
/// a failed item is simply fetched again on the next run.
pub struct EsiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl EsiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EsiClientInitError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url =
            Url::parse(&normalized).map_err(|source| EsiClientInitError::InvalidBaseUrl {
                url: normalized.clone(),
                source,
            })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("eve-market-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| EsiClientInitError::HttpClient { source })?;
        logging::trace!("ESI base URL: {}", base_url);
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, region_id: i32, kind: FetchKind) -> Result<Url, RemoteFailure> {
        let path = format!("markets/{}/{}/", region_id, kind);
        self.base_url
            .join(&path)
            .map_err(|source| RemoteFailure::InvalidUrl { source })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<(T, HeaderMap), RemoteFailure> {
        logging::trace!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(RemoteFailure::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteFailure::Status {
                status: status.as_u16(),
                body,
            });
        }
        let headers = response.headers().clone();
        let content = response.json::<T>().await.map_err(|source| {
            if source.is_timeout() {
                RemoteFailure::Timeout { source }
            } else {
                RemoteFailure::Decode { source }
            }
        })?;
        Ok((content, headers))
    }

    async fn fetch_orders(
        &self,
        region_id: i32,
        item_id: i32,
    ) -> Result<Listing<OrderSnapshot>, RemoteFailure> {
        let url = self.endpoint(region_id, FetchKind::Orders)?;
        let base_query = [
            ("type_id", item_id.to_string()),
            ("order_type", "all".to_string()),
        ];

        let (mut orders, headers): (Vec<Value>, _) = self.get(url.clone(), &base_query).await?;
        let pages = page_count(&headers);
        for page in 2..=pages {
            logging::trace!(
                "Loading orders page {}/{} of item '{}' in region '{}'",
                page,
                pages,
                item_id,
                region_id
            );
            let mut query = base_query.to_vec();
            query.push(("page", page.to_string()));
            let (page_orders, _): (Vec<Value>, _) = self.get(url.clone(), &query).await?;
            orders.extend(page_orders);
        }
        Ok(decode_listing(FetchKind::Orders, orders))
    }
}

fn decode_listing<T: DeserializeOwned>(kind: FetchKind, values: Vec<Value>) -> Listing<T> {
    values
        .into_iter()
        .enumerate()
        .map(|(position, value)| {
            let record = record_name(kind, position, &value);
            serde_json::from_value(value).map_err(|e| {
                logging::debug!("Could not decode {}: {}", record, e);
                MalformedRecordError::Undecodable {
                    record,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

fn record_name(kind: FetchKind, position: usize, value: &Value) -> String {
    match kind {
        FetchKind::Orders => match value.get("order_id").and_then(Value::as_i64) {
            Some(order_id) => format!("order '{}'", order_id),
            None => format!("order #{}", position),
        },
        FetchKind::History => match value.get("date").and_then(Value::as_str) {
            Some(date) => format!("history entry of {}", date),
            None => format!("history entry #{}", position),
        },
    }
}

fn page_count(headers: &HeaderMap) -> u32 {
    headers
        .get(PAGES_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

#[async_trait]
impl MarketRequester for EsiClient {
    async fn get_live_orders(
        &self,
        region_id: i32,
        item_id: i32,
    ) -> Result<Listing<OrderSnapshot>, RemoteFetchError> {
        logging::debug!(
            "Loading orders of item '{}' in region '{}'",
            item_id,
            region_id
        );
        self.fetch_orders(region_id, item_id)
            .await
            .map_err(|failure| RemoteFetchError {
                kind: FetchKind::Orders,
                region_id,
                item_id,
                failure,
            })
    }

    async fn get_daily_history(
        &self,
        region_id: i32,
        item_id: i32,
    ) -> Result<Listing<HistoryEntry>, RemoteFetchError> {
        logging::debug!(
            "Loading history of item '{}' in region '{}'",
            item_id,
            region_id
        );
        let to_error = |failure| RemoteFetchError {
            kind: FetchKind::History,
            region_id,
            item_id,
            failure,
        };
        let url = self
            .endpoint(region_id, FetchKind::History)
            .map_err(to_error)?;
        let (history, _): (Vec<Value>, _) = self
            .get(url, &[("type_id", item_id.to_string())])
            .await
            .map_err(to_error)?;
        Ok(decode_listing(FetchKind::History, history))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_endpoint_paths() {
        let client = EsiClient::new("http://localhost:1234/api", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client
                .endpoint(10000002, FetchKind::Orders)
                .unwrap()
                .as_str(),
            "http://localhost:1234/api/markets/10000002/orders/"
        );
        assert_eq!(
            client
                .endpoint(10000002, FetchKind::History)
                .unwrap()
                .as_str(),
            "http://localhost:1234/api/markets/10000002/history/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            EsiClient::new("not a url", Duration::from_secs(1)),
            Err(EsiClientInitError::InvalidBaseUrl { .. })
        ));
    }

    fn undecodable<T>(element: &Result<T, MalformedRecordError>) -> Option<&str> {
        match element {
            Err(MalformedRecordError::Undecodable { record, .. }) => Some(record),
            _ => None,
        }
    }

    #[test]
    fn test_decode_listing_keeps_siblings_of_bad_element() {
        let values: Vec<Value> = serde_json::from_str(
            r#"[
                {"date": "2024-04-28", "volume": 10, "average": 4.5},
                {"date": "2024-04-29", "volume": 1.5, "average": 4.5},
                {"volume": 12, "average": 4.6},
                {"date": "2024-04-30", "volume": 12, "average": 4.6}
            ]"#,
        )
        .unwrap();
        let listing: Listing<HistoryEntry> = decode_listing(FetchKind::History, values);
        assert_eq!(listing.len(), 4);
        assert_eq!(listing[0].as_ref().unwrap().volume, 10);
        assert_eq!(
            undecodable(&listing[1]),
            Some("history entry of 2024-04-29")
        );
        assert_eq!(undecodable(&listing[2]), Some("history entry #2"));
        assert_eq!(listing[3].as_ref().unwrap().date, "2024-04-30");
    }

    #[test]
    fn test_page_count() {
        let mut headers = HeaderMap::new();
        assert_eq!(page_count(&headers), 1);
        headers.insert(PAGES_HEADER, HeaderValue::from_static("3"));
        assert_eq!(page_count(&headers), 3);
        headers.insert(PAGES_HEADER, HeaderValue::from_static("zero"));
        assert_eq!(page_count(&headers), 1);
        headers.insert(PAGES_HEADER, HeaderValue::from_static("0"));
        assert_eq!(page_count(&headers), 1);
    }
}
