#![allow(clippy::unwrap_used)]
// Integration tests for `CloudClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxgate_api::{CloudClient, DeploymentVariant, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CloudClient) {
    let server = MockServer::start().await;
    let client = client_with_timeout(&server, Duration::from_secs(10));
    (server, client)
}

fn client_with_timeout(server: &MockServer, timeout: Duration) -> CloudClient {
    let config = TransportConfig { timeout };
    CloudClient::with_bases(&config, server.uri(), format!("{}/web/app", server.uri())).unwrap()
}

/// The mock server's authority (`host:port`), the form the vendor's
/// `rest_server` bootstrap hands out.
fn authority(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_owned()
}

// ── Bootstrap / sign-in tests ───────────────────────────────────────

#[tokio::test]
async fn test_resolve_rest_host() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest_server"))
        .and(header("api-version", "6.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 0,
            "datas": { "rest_server_https": "single.ecloud.akuvox.com:8443" }
        })))
        .mount(&server)
        .await;

    let host = client.resolve_rest_host().await.unwrap();

    assert_eq!(host, "single.ecloud.akuvox.com:8443");
    assert_eq!(client.session().host, "single.ecloud.akuvox.com:8443");
}

#[tokio::test]
async fn test_resolve_rest_host_missing_address_is_api_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/rest_server"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "result": 0, "datas": {} })),
        )
        .mount(&server)
        .await;

    let result = client.resolve_rest_host().await;

    assert!(
        matches!(result, Err(voxgate_api::Error::Api { .. })),
        "expected Api error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_request_sms_code_posts_the_plain_number() {
    let (server, client) = setup().await;
    client.update_session(|s| s.host = authority(&server));

    Mock::given(method("POST"))
        .and(path("/send_mobile_checkcode"))
        .and(header("x-auth-token", ""))
        .and(body_string_contains("AreaCode=61"))
        .and(body_string_contains("MobileNumber=0123456"))
        .and(body_string_contains("Type=0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 0 })))
        .mount(&server)
        .await;

    assert!(client.request_sms_code("61", "0123456").await.unwrap());
}

#[tokio::test]
async fn test_verify_sms_code_obfuscates_the_phone_number() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/sms_login"))
        .and(query_param("phone", "3456789"))
        .and(query_param("code", "8642"))
        .and(query_param("area_code", "61"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 0,
            "datas": {
                "auth_token": "AUTH-1",
                "token": "TOK-1",
                "rtmp_server": "59.110.15.8:1935"
            }
        })))
        .mount(&server)
        .await;

    client.verify_sms_code("0123456", "61", "8642").await.unwrap();

    let session = client.session();
    assert_eq!(session.auth_token, "AUTH-1");
    assert_eq!(session.token, "TOK-1");
    assert_eq!(session.rtsp_relay_ip, "59.110.15.8");
    assert_eq!(session.phone_number, "0123456");
}

#[tokio::test]
async fn test_servers_list_refreshes_only_returned_fields() {
    let (server, client) = setup().await;
    client.update_session(|s| {
        s.auth_token = "AUTH-1".into();
        s.token = "TOK-1".into();
        s.phone_number = "0123456".into();
    });

    Mock::given(method("POST"))
        .and(path("/servers_list"))
        .and(header("x-auth-token", "TOK-1"))
        .and(body_partial_json(json!({
            "user": "3456789",
            "passwd": "AUTH-1",
            "auth_token": "AUTH-1",
            "token": "TOK-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 0,
            "datas": { "token": "TOK-2", "rtmp_server": "10.0.0.9:1935" }
        })))
        .mount(&server)
        .await;

    client.fetch_servers_list().await.unwrap();

    let session = client.session();
    assert_eq!(session.token, "TOK-2");
    assert_eq!(session.rtsp_relay_ip, "10.0.0.9");
    // Absent in the response, so the prior value survives.
    assert_eq!(session.auth_token, "AUTH-1");
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.resolve_rest_host().await;

    match result {
        Err(err) => assert!(err.is_auth_expired(), "expected auth error, got: {err:?}"),
        Ok(host) => panic!("expected Authentication error, got host {host}"),
    }
}

// ── Device / relay tests ────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_userconf_decodes_devices() {
    let (server, client) = setup().await;
    client.update_session(|s| {
        s.host = authority(&server);
        s.token = "TOK-1".into();
    });

    Mock::given(method("GET"))
        .and(path("/userconf"))
        .and(query_param("token", "TOK-1"))
        .and(header("x-auth-token", "TOK-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": 0,
            "datas": {
                "app_conf": { "project_name": " Sunrise Lofts " },
                "dev_list": [{
                    "location": "Front Gate",
                    "rtsp_pwd": "s3cret",
                    "mac": "0C110504AA21",
                    "relay": [{ "relay_id": "1", "door_name": "Gate" }]
                }]
            }
        })))
        .mount(&server)
        .await;

    let conf = client.fetch_userconf().await.unwrap();

    assert_eq!(conf.app_conf.unwrap().project_name, " Sunrise Lofts ");
    assert_eq!(conf.dev_list.len(), 1);
    assert_eq!(conf.dev_list[0].relay[0].relay_id, "1");
}

#[tokio::test]
async fn test_open_door_posts_mac_and_relay() {
    let (server, client) = setup().await;
    client.update_session(|s| {
        s.host = authority(&server);
        s.token = "TOK-1".into();
    });

    Mock::given(method("POST"))
        .and(path("/opendoor"))
        .and(query_param("token", "TOK-1"))
        .and(body_string_contains("mac=0C110504AA21"))
        .and(body_string_contains("relay=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": 0 })))
        .mount(&server)
        .await;

    assert!(client.open_door("Gate", "0C110504AA21", "1").await.unwrap());
}

#[tokio::test]
async fn test_open_door_reports_vendor_rejection() {
    let (server, client) = setup().await;
    client.update_session(|s| {
        s.host = authority(&server);
        s.token = "TOK-1".into();
    });

    Mock::given(method("POST"))
        .and(path("/opendoor"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "result": -1, "message": "relay busy" })),
        )
        .mount(&server)
        .await;

    assert!(!client.open_door("Gate", "0C110504AA21", "1").await.unwrap());
}

// ── Activities API tests ────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_temp_keys_unwraps_rows() {
    let (server, client) = setup().await;
    client.update_session(|s| s.token = "TOK-1".into());

    Mock::given(method("GET"))
        .and(path("/web/app/community/tempKey/getPersonalTempKeyList"))
        .and(header("x-auth-token", "TOK-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "rows": [{
                "ID": 41,
                "Description": "Dog walker",
                "TmpKey": "339944",
                "Expired": 0,
                "QrCodeUrl": "/qrcode/41.png"
            }] }
        })))
        .mount(&server)
        .await;

    let keys = client.fetch_temp_keys().await.unwrap();

    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].id, "41");
    assert_eq!(keys[0].description, "Dog walker");
    assert!(!keys[0].expired);
}

#[tokio::test]
async fn test_door_log_empty_response_toggles_variant_and_retries() {
    let (server, client) = setup().await;
    client.update_session(|s| s.token = "TOK-1".into());

    // Community answers with the vendor's "nothing for you" status.
    Mock::given(method("GET"))
        .and(path("/web/app/community/log/getDoorLog"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "code": 102, "message": "empty" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/web/app/single/log/getDoorLog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": [{ "CaptureTime": "1700000001", "Initiator": "App User", "PicUrl": "" }]
        })))
        .mount(&server)
        .await;

    let rows = client.fetch_door_log().await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].capture_time, "1700000001");
    assert_eq!(client.deployment_variant(), DeploymentVariant::Single);
}

#[tokio::test]
async fn test_door_log_timeout_falls_back_to_single_variant() {
    let server = MockServer::start().await;
    let client = client_with_timeout(&server, Duration::from_millis(200));
    client.update_session(|s| s.token = "TOK-1".into());

    Mock::given(method("GET"))
        .and(path("/web/app/community/log/getDoorLog"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(1500))
                .set_body_json(json!({ "code": 0, "data": [] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/web/app/single/log/getDoorLog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": [{ "CaptureTime": "1700000002" }]
        })))
        .mount(&server)
        .await;

    let rows = client.fetch_door_log().await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(client.deployment_variant(), DeploymentVariant::Single);
}

#[tokio::test]
async fn test_single_variant_timeout_fails_without_retry() {
    let server = MockServer::start().await;
    let client = client_with_timeout(&server, Duration::from_millis(200));
    client.update_session(|s| {
        s.token = "TOK-1".into();
        s.deployment_variant = DeploymentVariant::Single;
    });

    Mock::given(method("GET"))
        .and(path("/web/app/single/log/getDoorLog"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(1500))
                .set_body_json(json!({ "code": 0, "data": [] })),
        )
        .mount(&server)
        .await;
    // No fallback in this direction: the community endpoint must stay cold.
    Mock::given(method("GET"))
        .and(path("/web/app/community/log/getDoorLog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "data": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.fetch_door_log().await;

    match result {
        Err(err) => assert!(err.is_communication(), "expected timeout, got: {err:?}"),
        Ok(rows) => panic!("expected timeout error, got {} rows", rows.len()),
    }
    // The variant resets so the next round starts from the default again.
    assert_eq!(client.deployment_variant(), DeploymentVariant::Community);
}

#[tokio::test]
async fn test_unparsable_body_is_swallowed_as_empty() {
    let (server, client) = setup().await;
    client.update_session(|s| s.token = "TOK-1".into());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let rows = client.fetch_door_log().await.unwrap();

    assert!(rows.is_empty());
}
