use std::fs;
use std::time::Duration;

use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use super::paths::get_responses_root;

pub const REGION: i32 = 10000002;

/// Tritanium: two pages of orders and three days of history.
pub const PAGINATED_ITEM: i32 = 34;
/// Pyerite: remote always answers 500.
pub const FAILING_ITEM: i32 = 35;
/// Mexallon: no order, no history.
pub const EMPTY_ITEM: i32 = 36;
/// Isogen: answers with a body which is not JSON.
pub const UNDECODABLE_ITEM: i32 = 37;
/// Nocxium: answers after a long delay.
pub const SLOW_ITEM: i32 = 38;
/// Zydrine: one order with a null price, one history day without volume.
pub const MALFORMED_ITEM: i32 = 39;

pub async fn create() -> MockServer {
    let server = MockServer::start().await;

    register_orders_handlers(&server).await;
    register_history_handlers(&server).await;
    register_failure_handlers(&server).await;

    server
}

fn response(name: &str) -> String {
    fs::read_to_string(get_responses_root().join("markets").join(name)).unwrap()
}

fn orders_path() -> String {
    format!("/markets/{}/orders/", REGION)
}

fn history_path() -> String {
    format!("/markets/{}/history/", REGION)
}

pub async fn register_orders_handlers(server: &MockServer) {
    // Mounted first: the page 2 request also matches the unpaged mock below.
    Mock::given(method("GET"))
        .and(path(orders_path()))
        .and(query_param("type_id", PAGINATED_ITEM.to_string()))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Pages", "2")
                .set_body_string(response("orders_34_page2.json")),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(orders_path()))
        .and(query_param("type_id", PAGINATED_ITEM.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Pages", "2")
                .set_body_string(response("orders_34_page1.json")),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(orders_path()))
        .and(query_param("type_id", MALFORMED_ITEM.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Pages", "1")
                .set_body_string(response("orders_39.json")),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(orders_path()))
        .and(query_param("type_id", EMPTY_ITEM.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Pages", "1")
                .set_body_string("[]"),
        )
        .mount(server)
        .await;
}

pub async fn register_history_handlers(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(history_path()))
        .and(query_param("type_id", PAGINATED_ITEM.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("history_34.json")))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(history_path()))
        .and(query_param("type_id", MALFORMED_ITEM.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(response("history_39.json")))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(history_path()))
        .and(query_param("type_id", EMPTY_ITEM.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(server)
        .await;
}

pub async fn register_failure_handlers(server: &MockServer) {
    Mock::given(method("GET"))
        .and(query_param("type_id", FAILING_ITEM.to_string()))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("type_id", UNDECODABLE_ITEM.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("type_id", SLOW_ITEM.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(server)
        .await;
}
