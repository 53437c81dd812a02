//! Tests of the reqwest transport against a local HTTP server.

mod common;

use std::time::Duration;

use common::*;
use serde_json::json;
use snowflake_restful::{
    Endpoint, RequestId, RestfulClient, RestfulError, ACCEPT_SNOWFLAKE, QUERY_REQUEST_PATH,
    SESSION_REQUEST_PATH, TOKEN_REQUEST_PATH,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth(token: &str) -> String {
    format!("Snowflake Token=\"{token}\"")
}

async fn client_for(server: &MockServer) -> RestfulClient {
    RestfulClient::new(Endpoint::parse(&server.uri()).unwrap(), initial_tokens())
}

#[tokio::test]
async fn test_query_sends_headers_and_request_id() {
    let server = MockServer::start().await;
    let request_id = RequestId::new();

    Mock::given(method("POST"))
        .and(path(QUERY_REQUEST_PATH))
        .and(query_param("requestId", request_id.to_string()))
        .and(header("Authorization", auth(SESSION_TOKEN).as_str()))
        .and(header("Accept", ACCEPT_SNOWFLAKE))
        .and(body_json(json!({"sqlText": "select 1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client
        .execute(request_id, r#"{"sqlText": "select 1"}"#, None, &test_config())
        .await
        .unwrap();
    assert!(response.success);
}

#[tokio::test]
async fn test_renewal_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(QUERY_REQUEST_PATH))
        .and(header("Authorization", auth(SESSION_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_expired_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REQUEST_PATH))
        .and(header("Authorization", auth(MASTER_TOKEN).as_str()))
        .and(body_json(json!({"oldSessionToken": SESSION_TOKEN, "requestType": "RENEW"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(renewal_body(1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(QUERY_REQUEST_PATH))
        .and(header("Authorization", auth(&session_token(1)).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let request_id = RequestId::new();
    client
        .execute(request_id, "{}", None, &test_config())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let ids: Vec<String> = requests
        .iter()
        .filter(|request| request.url.path() == QUERY_REQUEST_PATH)
        .filter_map(|request| {
            request
                .url
                .query_pairs()
                .find(|(key, _)| key == "requestId")
                .map(|(_, value)| value.into_owned())
        })
        .collect();
    assert_eq!(ids, vec![request_id.to_string(), request_id.to_string()]);
}

#[tokio::test]
async fn test_empty_ok_body_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERY_REQUEST_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .execute(RequestId::new(), "{}", None, &test_config())
        .await
        .unwrap_err();
    assert!(matches!(err, RestfulError::Transport { .. }));
}

#[tokio::test]
async fn test_empty_ok_body_on_close_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SESSION_REQUEST_PATH))
        .and(query_param("delete", "true"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.close(None).await.unwrap_err();
    assert!(matches!(err, RestfulError::Transient { .. }));
}

#[tokio::test]
async fn test_service_unavailable_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERY_REQUEST_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .execute(RequestId::new(), "{}", None, &test_config())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.is_retriable());
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERY_REQUEST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .execute(
            RequestId::new(),
            "{}",
            Some(Duration::from_millis(100)),
            &test_config(),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_poll_uses_get_on_result_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUERY_REQUEST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "code": "333334",
            "data": {"queryId": "01c4", "getResultUrl": "/queries/01c4/result"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/queries/01c4/result"))
        .and(header("Authorization", auth(SESSION_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "code": "0",
            "data": {"queryId": "01c4", "rowset": [["1"]]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client
        .execute(RequestId::new(), "{}", None, &test_config())
        .await
        .unwrap();
    assert_eq!(response.data.unwrap()["rowset"], json!([["1"]]));
}
