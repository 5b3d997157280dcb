//! Integration tests using wiremock to simulate HTTP servers.

use futures_util::StreamExt;
use reqtry::{
    ApiOptions, Client, Error, FileUpload, QueryParams, RequestMetadata, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

#[derive(Debug, Serialize)]
struct NewItem {
    name: String,
    nickname: Option<String>,
}

#[derive(Debug, Serialize)]
struct Search {
    #[serde(rename = "type")]
    kind: String,
    price: u32,
    tags: Vec<String>,
    cursor: Option<String>,
}

fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .delay(Duration::from_millis(10))
        .build()
        .unwrap()
}

fn test_data() -> TestData {
    TestData {
        id: 1,
        name: "Test".to_string(),
    }
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let response = client.get::<TestData>("/test").await.unwrap();

    assert_eq!(response.data, test_data());
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 1);
    assert!(!response.was_retried());
    assert_eq!(response.raw_body, r#"{"id":1,"name":"Test"}"#);
}

#[tokio::test]
async fn test_result_path_selects_subtree() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/activity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "ok",
            "Result": { "id": 1, "name": "Test" }
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let metadata = RequestMetadata::get("activity").with_result_path("result");
    let response = client.call::<(), TestData>(metadata, None).await.unwrap();

    assert_eq!(response.data, test_data());
}

#[tokio::test]
async fn test_missing_result_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": null })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let metadata = RequestMetadata::get("x").with_result_path("data.items");
    let result = client.call::<(), Vec<u32>>(metadata, None).await;

    match result {
        Err(Error::DeserializationFailed {
            message,
            raw_response,
        }) => {
            assert!(message.contains("'data' is null"));
            assert_eq!(raw_response, r#"{"data":null}"#);
        }
        _ => panic!("Expected DeserializationFailed"),
    }
}

#[tokio::test]
async fn test_query_rendered_into_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/activity"))
        .and(query_param("type", "education"))
        .and(query_param("price", "0"))
        .and(query_param("tags", "a,b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(format!("{}/api/", mock_server.uri()))
        .unwrap()
        .build()
        .unwrap();

    let search = Search {
        kind: "education".to_string(),
        price: 0,
        tags: vec!["a".to_string(), "b".to_string()],
        cursor: None,
    };
    let metadata = RequestMetadata::get("activity").with_query(&search).unwrap();
    let response = client.call::<(), TestData>(metadata, None).await.unwrap();

    assert_eq!(response.data.id, 1);
}

#[tokio::test]
async fn test_query_params_builder() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .and(query_param("active", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<u32>::new()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let params = QueryParams::new().with("page", 2).with("active", true).with("empty", "");
    let metadata = RequestMetadata::get("items").with_query(&params).unwrap();
    let response = client.call::<(), Vec<u32>>(metadata, None).await.unwrap();

    assert!(response.data.is_empty());
}

#[tokio::test]
async fn test_post_strips_null_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(body_json(serde_json::json!({ "name": "New" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let body = NewItem {
        name: "New".to_string(),
        nickname: None,
    };
    let response = client
        .post::<NewItem, TestData>("items", &body)
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 201);
}

#[tokio::test]
async fn test_put_and_delete() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/items/1"))
        .and(body_json(serde_json::json!({ "id": 1, "name": "Test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/items/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "deleted": true })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let updated = client
        .put::<TestData, TestData>("items/1", &test_data())
        .await
        .unwrap();
    assert_eq!(updated.data, test_data());

    let deleted = client
        .delete::<serde_json::Value>("items/1")
        .await
        .unwrap();
    assert_eq!(deleted.data["deleted"], true);
}

#[tokio::test]
async fn test_execute_accepts_empty_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client
        .execute::<()>(RequestMetadata::post("ping"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get::<TestData>("secret").await;

    match result {
        Err(e @ Error::Unauthorized { .. }) => {
            assert!(e.is_unauthorized());
            assert_eq!(e.to_string(), "Unauthorized: 401 token expired");
        }
        _ => panic!("Expected Unauthorized"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_count(3)
        .delay(Duration::from_millis(10))
        .build()
        .unwrap();

    let result = client.get::<TestData>("secret").await;
    assert!(matches!(result, Err(Error::Unauthorized { .. })));
}

#[tokio::test]
async fn test_declared_error_on_success_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "errorMessage": "quota exceeded" })),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get::<TestData>("usage").await;

    match result {
        Err(Error::RequestFailed {
            status, message, ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(message, "200 quota exceeded");
        }
        _ => panic!("Expected RequestFailed"),
    }
}

#[tokio::test]
async fn test_http_error_keeps_raw_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get::<TestData>("missing").await;

    match result {
        Err(e) => {
            assert_eq!(e.status().map(|s| s.as_u16()), Some(404));
            assert_eq!(e.raw_response(), Some("Not found"));
            assert_eq!(e.to_string(), "404 Not found");
        }
        Ok(_) => panic!("Expected error"),
    }
}

#[tokio::test]
async fn test_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.get::<TestData>("broken").await;

    match result {
        Err(Error::DeserializationFailed { raw_response, .. }) => {
            assert_eq!(raw_response, "invalid json");
        }
        _ => panic!("Expected DeserializationFailed"),
    }
}

#[tokio::test]
async fn test_deserialization_error_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("nope"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_count(3)
        .delay(Duration::from_millis(10))
        .build()
        .unwrap();

    let result = client.get::<TestData>("broken").await;
    match result {
        Err(Error::DeserializationFailed { raw_response, .. }) => {
            assert_eq!(raw_response, "nope");
        }
        _ => panic!("Expected DeserializationFailed"),
    }
}

#[tokio::test]
async fn test_retries_until_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_count(3)
        .delay(Duration::from_millis(10))
        .build()
        .unwrap();

    let result = client.get::<TestData>("flaky").await;

    match result {
        Err(Error::RequestFailed { status, .. }) => assert_eq!(status.as_u16(), 500),
        _ => panic!("Expected RequestFailed"),
    }
}

#[tokio::test]
async fn test_retry_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_count(3)
        .delay(Duration::from_millis(10))
        .build()
        .unwrap();

    let response = client.get::<TestData>("flaky").await.unwrap();

    assert_eq!(response.data, test_data());
    assert_eq!(response.attempts, 3);
    assert!(response.was_retried());
    assert!(response.latency >= Duration::from_millis(20));
}

#[tokio::test]
async fn test_per_request_retry_policy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let metadata = RequestMetadata::get("x").with_retry_policy(RetryPolicy::new(2));
    let result = client.call::<(), TestData>(metadata, None).await;

    assert!(matches!(result, Err(Error::RequestFailed { .. })));
}

#[tokio::test]
async fn test_on_error_observer_receives_final_error() {
    let mock_server = MockServer::start().await;

    Mock::given(path("/x"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let observed = Arc::new(AtomicUsize::new(0));
    let observed_clone = Arc::clone(&observed);

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_count(2)
        .delay(Duration::from_millis(10))
        .on_error(move |error| {
            assert_eq!(error.status().map(|s| s.as_u16()), Some(500));
            observed_clone.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let result = client.get::<TestData>("x").await;
    assert!(matches!(result, Err(Error::Empty)));
    assert_eq!(observed.load(Ordering::SeqCst), 1);

    client
        .execute::<()>(RequestMetadata::post("x"), None)
        .await
        .unwrap();
    assert_eq!(observed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_silent_exhaustion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let options = ApiOptions {
        api_url: mock_server.uri(),
        retry_count: 1,
        error_on_fail: false,
        ..ApiOptions::default()
    };
    let client = Client::new(options);

    let typed = client.get::<TestData>("x").await;
    assert!(matches!(typed, Err(Error::Empty)));

    client
        .execute::<()>(RequestMetadata::get("x"), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_basic_auth_wins_over_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Basic dXNlcjpwdw=="))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .bearer_token("ignored")
        .basic_auth("user", "pw")
        .build()
        .unwrap();

    client.get::<TestData>("me").await.unwrap();
}

#[tokio::test]
async fn test_api_key_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("x-api-key", "k1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .api_key("X-Api-Key", "k1")
        .build()
        .unwrap();

    client.get::<TestData>("me").await.unwrap();
}

#[tokio::test]
async fn test_bearer_and_hooks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer t0k"))
        .and(header("user-agent", "reqtry-tests"))
        .and(header("x-correlation-id", "42"))
        .and(header("x-trace", "on"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .bearer_token("t0k")
        .default_header("User-Agent", "reqtry-tests")
        .unwrap()
        .configure_request(|request| request.header("X-Correlation-Id", "42"))
        .build()
        .unwrap();

    let metadata = RequestMetadata::get("me").with_header("X-Trace", "on").unwrap();
    client.call::<(), TestData>(metadata, None).await.unwrap();
}

#[tokio::test]
async fn test_cookies_sent_to_base_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .and(header("cookie", "session=abc"))
        .and(header("x-api-key", "k1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(format!("{}/api/v1", mock_server.uri()))
        .unwrap()
        .api_key("X-Api-Key", "k1")
        .cookie("session", "abc")
        .build()
        .unwrap();

    let response = client.get::<TestData>("me").await.unwrap();
    assert_eq!(response.data, test_data());
}

#[tokio::test]
async fn test_multipart_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains("name=\"document\"; filename=\"report.csv\""))
        .and(body_string_contains("a,b\n1,2"))
        .and(body_string_contains("name=\"year\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 7 })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("report.csv");
    std::fs::write(&file, "a,b\n1,2").unwrap();

    let client = client_for(&mock_server);
    let upload = FileUpload::new(&file)
        .with_field_name("document")
        .with_parameter("year", "2024");

    let response = client
        .upload::<serde_json::Value>(RequestMetadata::post("upload"), &upload)
        .await
        .unwrap();
    assert_eq!(response.data["id"], 7);
}

#[tokio::test]
async fn test_upload_missing_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let client = client_for(&mock_server);
    let upload = FileUpload::new(dir.path().join("absent.bin"));

    let result = client
        .upload_execute(RequestMetadata::post("upload"), &upload)
        .await;
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_stream_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(200).set_body_string("line one\nline two\n"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut stream = client
        .stream::<()>(RequestMetadata::get("export"), None)
        .await
        .unwrap();

    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(String::from_utf8(body).unwrap(), "line one\nline two\n");
}

#[tokio::test]
async fn test_stream_checks_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let result = client.stream::<()>(RequestMetadata::get("export"), None).await;

    match result {
        Err(e) => assert_eq!(e.to_string(), "404 Not Found"),
        Ok(_) => panic!("Expected error"),
    }
}

#[tokio::test]
async fn test_relative_path_without_base_url() {
    let client = Client::builder().build().unwrap();

    let result = client.get::<TestData>("activity").await;
    assert!(matches!(result, Err(Error::ConfigurationError(_))));
}

#[tokio::test]
async fn test_absolute_path_ignores_base_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/direct"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder().build().unwrap();
    let response = client
        .get::<TestData>(format!("{}/direct", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(response.data, test_data());
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_count(2)
        .delay(Duration::from_millis(10))
        .build()
        .unwrap();

    let (bad, good) = tokio::join!(
        client.get::<TestData>("bad"),
        client.get::<TestData>("good")
    );

    assert!(matches!(bad, Err(Error::RequestFailed { .. })));
    assert_eq!(good.unwrap().attempts, 1);
}

#[tokio::test]
async fn test_configure_switches_base_url() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&first)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(test_data()))
        .expect(1)
        .mount(&second)
        .await;

    let client = client_for(&first);
    client.get::<TestData>("x").await.unwrap();

    client.configure(ApiOptions::new(second.uri()));
    client.get::<TestData>("x").await.unwrap();
}

#[tokio::test]
async fn test_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(test_data())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    let result = client.get::<TestData>("slow").await;
    assert!(matches!(result, Err(Error::Timeout)));
}

#[tokio::test]
async fn test_cancellation_stops_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(test_data())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .retry_count(5)
        .build()
        .unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let metadata = RequestMetadata::get("slow").with_cancellation(token);
    let result = client.call::<(), TestData>(metadata, None).await;
    assert!(matches!(result, Err(Error::Cancelled)));
}
