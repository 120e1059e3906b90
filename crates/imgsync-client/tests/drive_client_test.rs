//! Contract tests for HttpSourceStore against a mocked Drive v3 style API.

use imgsync_client::{HttpSourceStore, SourceConfig};
use imgsync_core::{FailureClass, SourceStore};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

fn store(server: &MockServer) -> HttpSourceStore {
    HttpSourceStore::new(SourceConfig {
        api_base: format!("{}/drive/v3", server.uri()).parse().unwrap(),
        access_token: Zeroizing::new("token-123".into()),
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn list_folders_follows_page_tokens_and_sorts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{ "id": "f1", "name": "Alps" }]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", "Bearer token-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [{ "id": "f2", "name": "Coast" }],
            "nextPageToken": "t2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folders = store(&server).list_folders("root-1").await.unwrap();
    let names: Vec<_> = folders.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Alps", "Coast"]);
}

#[tokio::test]
async fn list_folders_filters_on_parent_and_folder_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            "'root-1' in parents and mimeType = 'application/vnd.google-apps.folder' and trashed = false",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let folders = store(&server).list_folders("root-1").await.unwrap();
    assert!(folders.is_empty());
}

#[tokio::test]
async fn list_images_drops_non_image_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [
                {
                    "id": "a",
                    "name": "beach.jpg",
                    "mimeType": "image/jpeg",
                    "modifiedTime": "2026-09-01T10:00:00Z",
                    "description": "Beach at dawn"
                },
                { "id": "b", "name": "notes.pdf", "mimeType": "application/pdf" },
                { "id": "c", "name": "pier.png", "mimeType": "image/png" }
            ]
        })))
        .mount(&server)
        .await;

    let files = store(&server).list_images("folder-1").await.unwrap();
    let ids: Vec<_> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["a", "c"]);
    assert_eq!(files[0].alt_text(), "Beach at dawn");
    assert!(files[0].modified_time.is_some());
    assert_eq!(files[1].alt_text(), "pier");
}

#[tokio::test]
async fn download_returns_raw_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/a"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = store(&server).download("a").await.unwrap();
    assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
}

#[tokio::test]
async fn expired_token_is_authentication_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = store(&server).list_folders("root-1").await.unwrap_err();
    assert_eq!(err.class(), FailureClass::Authentication);
}

#[tokio::test]
async fn missing_file_is_fatal_not_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = store(&server).download("gone").await.unwrap_err();
    assert_eq!(err.class(), FailureClass::Fatal);
}
