//! End-to-end tests against a local mock server.

use std::time::Duration;

use mockito::Matcher;

use mgmt_rest::{Config, RestClient, RestError};

/// Routes dispatch/retry tracing into the test harness output.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn client_for(server: &mockito::ServerGuard) -> RestClient {
    init_tracing();
    let mut config = Config::new(server.url());
    config.api_path = Some("mgmt".to_string());
    RestClient::new(config).unwrap()
}

#[tokio::test]
async fn get_resource_instance_renders_hierarchy() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/mgmt/tm/ltm/pool/~Common~pool1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"pool1"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let response = client
        .get()
        .resource_category("tm")
        .manager_name("ltm")
        .resource("pool")
        .resource_instance(&["/Common/pool1"])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.content_type, "application/json");
    assert_eq!(&response.body[..], br#"{"name":"pool1"}"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn basic_auth_header_is_injected() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/mgmt/tm/sys/version")
        .match_header("authorization", "Basic YWRtaW46c2VjcmV0")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let mut config = Config::new(server.url());
    config.api_path = Some("mgmt".to_string());
    config.username = Some("admin".to_string());
    config.password = Some("secret".to_string());
    let client = RestClient::new(config).unwrap();

    client
        .get()
        .resource_category("tm")
        .manager_name("sys")
        .resource("version")
        .raw()
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn bearer_token_uses_vendor_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/mgmt/tm/sys/version")
        .match_header("x-device-auth-token", "tok-123")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let mut config = Config::new(server.url());
    config.api_path = Some("mgmt".to_string());
    config.bearer_token = Some("tok-123".to_string());
    let client = RestClient::new(config).unwrap();

    client
        .get()
        .resource_category("tm")
        .manager_name("sys")
        .resource("version")
        .raw()
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn caller_supplied_token_wins_over_configured() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/mgmt/tm/sys/version")
        .match_header("x-device-auth-token", "caller-tok")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let mut config = Config::new(server.url());
    config.api_path = Some("mgmt".to_string());
    config.bearer_token = Some("configured-tok".to_string());
    let client = RestClient::new(config).unwrap();

    client
        .get()
        .resource_category("tm")
        .manager_name("sys")
        .resource("version")
        .set_header("X-Device-Auth-Token", &["caller-tok"])
        .raw()
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn structured_error_body_is_decoded() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/mgmt/tm/ltm/pool/~Common~missing")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":404,"message":"not found"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .get()
        .resource_category("tm")
        .manager_name("ltm")
        .resource("pool")
        .resource_instance(&["/Common/missing"])
        .send()
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "not found (code: 404)");
    assert!(matches!(err, RestError::Device(_)));
}

#[tokio::test]
async fn unstructured_failure_yields_status_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/mgmt/tm/ltm/pool")
        .with_status(404)
        .with_header("content-type", "text/html")
        .with_body("<html>gone</html>")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .get()
        .resource_category("tm")
        .manager_name("ltm")
        .resource("pool")
        .send()
        .await
        .unwrap_err();

    match err {
        RestError::Status { status, text } => {
            assert_eq!(status, 404);
            assert_eq!(text, "Not Found");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn raw_skips_structured_decoding() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/mgmt/tm/ltm/pool")
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":409,"message":"conflict"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .get()
        .resource_category("tm")
        .manager_name("ltm")
        .resource("pool")
        .raw()
        .await
        .unwrap_err();

    // raw() never decodes the envelope, even when one is present.
    match err {
        RestError::Status { status, text } => {
            assert_eq!(status, 409);
            assert_eq!(text, "Conflict");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn status_226_is_success_227_is_not() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/mgmt/im-used")
        .with_status(226)
        .with_body("ok")
        .create_async()
        .await;
    server
        .mock("GET", "/mgmt/not-success")
        .with_status(227)
        .with_body("nope")
        .create_async()
        .await;

    let client = client_for(&server);
    let body = client.get().suffix(&["im-used"]).raw().await.unwrap();
    assert_eq!(&body[..], b"ok");

    let err = client.get().suffix(&["not-success"]).raw().await.unwrap_err();
    assert!(matches!(err, RestError::Status { status: 227, .. }));
}

#[tokio::test]
async fn post_sends_caller_encoded_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/mgmt/tm/ltm/pool")
        .match_header("content-type", "application/json")
        .match_body(r#"{"name":"pool1","partition":"Common"}"#)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"pool1"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let payload = br#"{"name":"pool1","partition":"Common"}"#.to_vec();
    client
        .post()
        .resource_category("tm")
        .manager_name("ltm")
        .resource("pool")
        .body(payload)
        .send()
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn timeout_is_sent_as_query_parameter() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/mgmt/tm/sys/clock")
        .match_query(Matcher::UrlEncoded("timeout".into(), "30s".into()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = client_for(&server);
    client
        .get()
        .resource_category("tm")
        .manager_name("sys")
        .resource("clock")
        .timeout(Duration::from_secs(30))
        .raw()
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn opt_in_retry_reissues_retryable_status() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/mgmt/flaky")
        .with_status(503)
        .with_body("busy")
        .expect(2)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .get()
        .suffix(&["flaky"])
        .retries(1)
        .raw()
        .await
        .unwrap_err();

    assert!(matches!(err, RestError::Status { status: 503, .. }));
    mock.assert_async().await;
}

#[tokio::test]
async fn retries_default_off() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/mgmt/flaky")
        .with_status(503)
        .with_body("busy")
        .expect(1)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.get().suffix(&["flaky"]).raw().await.unwrap_err();
    assert!(err.is_retryable());
    mock.assert_async().await;
}
