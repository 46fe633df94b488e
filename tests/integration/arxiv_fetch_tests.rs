/*!
 * Integration tests for metadata and source retrieval against a local server
 */

use std::collections::HashMap;
use std::fs;
use papertrans::app_config::ArxivConfig;
use papertrans::arxiv::{ArxivClient, extract_arxiv_id};
use papertrans::errors::FetchError;
use crate::common::{self, Route, TestServer};

fn client_for(server: &TestServer) -> ArxivClient {
    ArxivClient::new(ArxivConfig {
        api_endpoint: format!("{}/api/query", server.base_url),
        source_endpoint: format!("{}/src", server.base_url),
        timeout_secs: 10,
    })
}

#[tokio::test]
async fn test_fetch_metadata_shouldParseFeed() {
    let mut routes = HashMap::new();
    routes.insert(
        "/api/query".to_string(),
        Route::ok(common::atom_feed("2401.01234", "A Study of Things", "We study things.")),
    );
    let server = TestServer::start(routes).await.unwrap();
    let id = extract_arxiv_id("2401.01234").unwrap();

    let metadata = client_for(&server).fetch_metadata(&id).await.unwrap();

    assert_eq!(metadata.title, "A Study of Things");
    assert_eq!(metadata.abstract_text, "We study things.");
}

#[tokio::test]
async fn test_fetch_metadata_withUnknownId_shouldReportNotFound() {
    let mut routes = HashMap::new();
    routes.insert("/api/query".to_string(), Route::ok(common::atom_error_feed()));
    let server = TestServer::start(routes).await.unwrap();
    let id = extract_arxiv_id("2401.99999").unwrap();

    let result = client_for(&server).fetch_metadata(&id).await;

    assert!(matches!(result, Err(FetchError::EntryNotFound(_))));
}

#[tokio::test]
async fn test_fetch_metadata_withServerError_shouldReportStatus() {
    let mut routes = HashMap::new();
    routes.insert("/api/query".to_string(), Route::status(503));
    let server = TestServer::start(routes).await.unwrap();
    let id = extract_arxiv_id("2401.01234").unwrap();

    let result = client_for(&server).fetch_metadata(&id).await;

    assert!(matches!(result, Err(FetchError::Http { status: 503, .. })));
}

#[tokio::test]
async fn test_download_source_shouldWriteArchiveBytes() {
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let mut routes = HashMap::new();
    routes.insert("/src/hep-th/9901001".to_string(), Route::ok(payload.clone()));
    let server = TestServer::start(routes).await.unwrap();
    let id = extract_arxiv_id("hep-th/9901001").unwrap();
    let downloads = common::create_temp_dir().unwrap();

    let archive = client_for(&server).download_source(&id, downloads.path()).await.unwrap();

    assert_eq!(archive, downloads.path().join("hep-th_9901001.tar.gz"));
    assert_eq!(fs::read(&archive).unwrap(), payload);
}

#[tokio::test]
async fn test_download_source_withMissingSource_shouldReportStatus() {
    let server = TestServer::start(HashMap::new()).await.unwrap();
    let id = extract_arxiv_id("2401.01234").unwrap();
    let downloads = common::create_temp_dir().unwrap();

    let result = client_for(&server).download_source(&id, downloads.path()).await;

    assert!(matches!(result, Err(FetchError::Http { status: 404, .. })));
}
