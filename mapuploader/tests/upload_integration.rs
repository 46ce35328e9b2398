use std::io::Write;
use std::path::PathBuf;

use predicates::prelude::*;
use reqwest::Url;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mapuploader::cli::{run, Cli, Commands};
use mapuploader::mapbox::MapboxClient;
use mapuploader::staging::S3Connector;
use mapuploader_core::contract::{CredentialBroker, ProcessingTrigger, StoreConnector};
use mapuploader_core::{Account, CredentialSet, PipelineError};

const BUCKET: &str = "tilestream-tilesets-production";
const KEY: &str = "7f/_pending/q1w2e3/alice";
const STAGING_URL: &str =
    "https://tilestream-tilesets-production.s3.amazonaws.com/7f/_pending/q1w2e3/alice";

fn credentials_body() -> serde_json::Value {
    json!({
        "accessKeyId": "ASIAALICE",
        "bucket": BUCKET,
        "key": KEY,
        "secretAccessKey": "alice-secret",
        "sessionToken": "alice-session",
        "url": STAGING_URL
    })
}

fn upload_job_body() -> serde_json::Value {
    json!({
        "complete": false,
        "tileset": "alice.roads",
        "error": null,
        "id": "cjv0pmbmu0ytr2wmfdqvcxxyd",
        "name": "roads",
        "modified": "2026-10-14T12:00:00.000Z",
        "created": "2026-10-14T12:00:00.000Z",
        "owner": "alice",
        "progress": 0
    })
}

fn mapbox_client(server: &MockServer) -> MapboxClient {
    MapboxClient::new(Url::parse(&server.uri()).unwrap()).expect("client builds")
}

fn alice() -> Account {
    Account::new("k1", "alice")
}

fn geojson_file(contents: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roads.geojson");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(contents)
        .unwrap();
    (dir, path)
}

#[tokio::test]
async fn credentials_are_decoded_exactly_as_received() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/v1/alice/credentials"))
        .and(query_param("access_token", "k1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(credentials_body()))
        .expect(1)
        .mount(&server)
        .await;

    let creds = mapbox_client(&server)
        .fetch_credentials(&alice())
        .await
        .expect("credentials should decode");

    assert_eq!(
        creds,
        CredentialSet {
            access_key_id: "ASIAALICE".into(),
            bucket: BUCKET.into(),
            key: KEY.into(),
            secret_access_key: "alice-secret".into(),
            session_token: "alice-session".into(),
            url: STAGING_URL.into(),
        }
    );
}

#[tokio::test]
async fn credentials_server_error_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/v1/alice/credentials"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = mapbox_client(&server)
        .fetch_credentials(&alice())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::CredentialFetch(_)), "got {err:?}");
    assert!(!err.to_string().contains("k1"), "token leaked into error: {err}");
}

#[tokio::test]
async fn malformed_credentials_are_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uploads/v1/alice/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"accessKeyId\": "))
        .mount(&server)
        .await;

    let err = mapbox_client(&server)
        .fetch_credentials(&alice())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::CredentialDecode(_)), "got {err:?}");
}

#[tokio::test]
async fn trigger_posts_exact_payload_with_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/uploads/v1/alice"))
        .and(query_param("access_token", "k1"))
        .and(header("content-type", "application/json"))
        .and(header("cache-control", "no-cache"))
        .and(body_json(json!({
            "url": STAGING_URL,
            "tileset": "alice.roads",
            "name": "roads"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(upload_job_body()))
        .expect(1)
        .mount(&server)
        .await;

    let response = mapbox_client(&server)
        .start_processing(&alice(), STAGING_URL, "roads")
        .await
        .expect("trigger should succeed");

    assert_eq!(response.status, 201);
    let job = response.job.expect("job record decoded");
    assert_eq!(job.id.as_deref(), Some("cjv0pmbmu0ytr2wmfdqvcxxyd"));
    assert_eq!(job.tileset.as_deref(), Some("alice.roads"));
    assert!(response
        .headers
        .iter()
        .any(|(name, value)| name == "content-type" && value.contains("json")));
}

#[tokio::test]
async fn trigger_rejection_is_a_trigger_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/uploads/v1/alice"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"message": "Invalid tileset name"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = mapbox_client(&server)
        .start_processing(&alice(), STAGING_URL, "roads")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::TriggerRequest(_)), "got {err:?}");
    let rendered = err.to_string();
    assert!(rendered.contains("422"), "got: {rendered}");
    assert!(rendered.contains("Invalid tileset name"), "got: {rendered}");
}

#[tokio::test]
async fn s3_store_receives_the_file_bytes() {
    let s3 = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("/{BUCKET}/{KEY}")))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"abc\""))
        .expect(1)
        .mount(&s3)
        .await;

    let creds: CredentialSet = serde_json::from_value(credentials_body()).unwrap();
    let store = S3Connector::new(Some(s3.uri()))
        .connect(&creds)
        .expect("store builds");
    let contents = br#"{"type":"FeatureCollection","features":[{"type":"Feature"}]}"#.to_vec();
    store
        .put_object(BUCKET, KEY, contents.clone())
        .await
        .expect("put succeeds");

    let received = s3.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].body, contents);
    let auth = received[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(auth.contains("Credential=ASIAALICE/"), "signed with temporary key: {auth}");
    assert_eq!(
        received[0]
            .headers
            .get("x-amz-security-token")
            .and_then(|v| v.to_str().ok()),
        Some("alice-session")
    );
}

#[tokio::test]
async fn s3_store_denial_is_reported() {
    let s3 = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
        ))
        .expect(1)
        .mount(&s3)
        .await;

    let creds: CredentialSet = serde_json::from_value(credentials_body()).unwrap();
    let store = S3Connector::new(Some(s3.uri())).connect(&creds).unwrap();
    let err = store.put_object(BUCKET, KEY, b"{}".to_vec()).await.unwrap_err();
    assert!(err.to_string().contains("AccessDenied"), "got: {err}");
}

fn alice_cli(api: &MockServer, s3: &MockServer, file: PathBuf) -> Cli {
    Cli {
        mapbox_key: Some("k1".into()),
        mapbox_user: Some("alice".into()),
        api_url: Some(api.uri()),
        staging_endpoint: Some(s3.uri()),
        command: Commands::Upload {
            file: Some(file),
            name: Some("roads".into()),
        },
    }
}

#[tokio::test]
async fn end_to_end_upload_of_roads_for_alice() {
    let api = MockServer::start().await;
    let s3 = MockServer::start().await;
    let (_dir, file) = geojson_file(b"0123456789");

    Mock::given(method("GET"))
        .and(path("/uploads/v1/alice/credentials"))
        .and(query_param("access_token", "k1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(credentials_body()))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/{BUCKET}/{KEY}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&s3)
        .await;
    Mock::given(method("POST"))
        .and(path("/uploads/v1/alice"))
        .and(query_param("access_token", "k1"))
        .and(body_json(json!({
            "url": STAGING_URL,
            "tileset": "alice.roads",
            "name": "roads"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(upload_job_body()))
        .expect(1)
        .mount(&api)
        .await;

    let report = run(alice_cli(&api, &s3, file)).await.expect("upload succeeds");

    assert_eq!(report.tileset_id, "alice.roads");
    assert_eq!(report.staged.size, 10);
    let puts = s3.received_requests().await.unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].body, b"0123456789".to_vec());
}

#[tokio::test]
async fn credentials_500_stops_the_pipeline() {
    let api = MockServer::start().await;
    let s3 = MockServer::start().await;
    let (_dir, file) = geojson_file(b"0123456789");

    Mock::given(method("GET"))
        .and(path("/uploads/v1/alice/credentials"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&api)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&s3)
        .await;

    let err = run(alice_cli(&api, &s3, file)).await.unwrap_err();
    let pipeline_err = err
        .downcast_ref::<PipelineError>()
        .expect("pipeline error in chain");
    assert!(matches!(pipeline_err, PipelineError::CredentialFetch(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn binary_exits_zero_after_full_hand_off() {
    let api = MockServer::start().await;
    let s3 = MockServer::start().await;
    let (dir, file) = geojson_file(b"0123456789");

    Mock::given(method("GET"))
        .and(path("/uploads/v1/alice/credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(credentials_body()))
        .mount(&api)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&s3)
        .await;
    Mock::given(method("POST"))
        .and(path("/uploads/v1/alice"))
        .respond_with(ResponseTemplate::new(201).set_body_json(upload_job_body()))
        .mount(&api)
        .await;

    let api_uri = api.uri();
    let s3_uri = s3.uri();
    let workdir = dir.path().to_path_buf();
    let assert = tokio::task::spawn_blocking(move || {
        assert_cmd::Command::cargo_bin("mapuploader")
            .expect("Binary exists")
            .current_dir(workdir)
            .env_remove("MAPBOX_KEY")
            .env("MAPBOX_API_URL", api_uri)
            .env("MAPBOX_STAGING_ENDPOINT", s3_uri)
            .args(["-k", "k1", "-u", "alice", "upload"])
            .arg(file)
            .args(["--name", "roads"])
            .assert()
    })
    .await
    .unwrap();

    assert.success().stdout(
        predicates::str::contains("alice.roads")
            .and(predicates::str::contains("cjv0pmbmu0ytr2wmfdqvcxxyd")),
    );
}
