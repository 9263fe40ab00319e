//! Integration tests for the in-memory object store and the blob walkthrough

use azlearn::adapters::storage::{MemoryObjectStore, ObjectStore};
use azlearn::config::StorageConfig;
use azlearn::core::blobs::{BlobWorkflow, MESSAGE_TEXT};
use azlearn::domain::{BlobHttpHeaders, BlobMessage, ErrorKind};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::test]
async fn test_upload_conflict_then_overwrite() {
    let store = MemoryObjectStore::new();
    assert!(store.ensure_container("learn-azure-storage").await.unwrap());
    assert!(!store.ensure_container("learn-azure-storage").await.unwrap());

    store
        .upload("learn-azure-storage", "k", b"first".to_vec(), false)
        .await
        .unwrap();

    let err = store
        .upload("learn-azure-storage", "k", b"second".to_vec(), false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Conflict));
    assert_eq!(
        store.download("learn-azure-storage", "k").await.unwrap(),
        b"first".to_vec()
    );

    store
        .upload("learn-azure-storage", "k", b"second".to_vec(), true)
        .await
        .unwrap();
    assert_eq!(
        store.download("learn-azure-storage", "k").await.unwrap(),
        b"second".to_vec()
    );
}

#[tokio::test]
async fn test_upload_resets_headers_and_metadata() {
    let store = MemoryObjectStore::new();
    store.ensure_container("c01").await.unwrap();
    store.upload("c01", "k", b"{}".to_vec(), false).await.unwrap();

    let headers = BlobHttpHeaders {
        content_type: Some("text/plain".to_string()),
        ..Default::default()
    };
    store.set_headers("c01", "k", &headers).await.unwrap();
    let mut metadata = azlearn::domain::BlobMetadata::new();
    metadata.insert("docType".to_string(), "text".to_string());
    store.set_metadata("c01", "k", &metadata).await.unwrap();

    store.upload("c01", "k", b"{}".to_vec(), true).await.unwrap();
    let properties = store.get_properties("c01", "k").await.unwrap();
    assert!(properties.headers.content_type.is_none());
    assert!(properties.metadata.is_empty());
}

#[tokio::test]
async fn test_missing_blob_is_not_found() {
    let store = MemoryObjectStore::new();
    store.ensure_container("c01").await.unwrap();
    assert!(!store.exists("c01", "nope").await.unwrap());
    assert!(store.download("c01", "nope").await.unwrap_err().is_not_found());
    assert!(store.get_properties("c01", "nope").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_walkthrough_twice() {
    let store = Arc::new(MemoryObjectStore::new());
    let config = StorageConfig::default();
    let (_tx, rx) = watch::channel(false);

    let first = BlobWorkflow::new(store.clone(), &config, true, rx.clone())
        .run()
        .await
        .unwrap();
    assert!(first.container_created);
    assert!(first.previous_content.is_none());
    assert!(first.conflict_observed);
    assert!(first.overwritten);

    let properties = first.final_properties.unwrap();
    assert_eq!(properties.headers.content_type.as_deref(), Some("text/plain"));
    assert_eq!(properties.headers.content_language.as_deref(), Some("en-us"));
    assert_eq!(properties.metadata.len(), 3);

    let second = BlobWorkflow::new(store.clone(), &config, true, rx)
        .run()
        .await
        .unwrap();
    assert!(!second.container_created);
    let previous: BlobMessage = serde_json::from_str(&second.previous_content.unwrap()).unwrap();
    assert_eq!(previous.text, MESSAGE_TEXT);

    let stored = store
        .download(&config.container_name, &config.blob_name)
        .await
        .unwrap();
    let message: BlobMessage = serde_json::from_slice(&stored).unwrap();
    assert_eq!(message.text, MESSAGE_TEXT);
}

#[tokio::test]
async fn test_unconfirmed_walkthrough_skips() {
    let store = Arc::new(MemoryObjectStore::new());
    let config = StorageConfig::default();
    let (_tx, rx) = watch::channel(false);

    let summary = BlobWorkflow::new(store.clone(), &config, false, rx)
        .run()
        .await
        .unwrap();
    assert!(summary.skipped);
    // Nothing was created, so the container lookup fails
    assert!(store
        .exists(&config.container_name, &config.blob_name)
        .await
        .unwrap_err()
        .is_not_found());
}
