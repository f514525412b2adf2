use super::*;

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn missing_blob_loads_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let blob = storage.load_blob("auth-storage").await.expect("load");
    assert!(blob.is_none());
}

#[tokio::test]
async fn store_blob_overwrites_previous_value() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .store_blob("auth-storage", r#"{"isAuthenticated":false}"#)
        .await
        .expect("first write");
    storage
        .store_blob("auth-storage", r#"{"isAuthenticated":true}"#)
        .await
        .expect("second write");

    let blob = storage
        .load_stored_blob("auth-storage")
        .await
        .expect("load")
        .expect("blob present");
    assert_eq!(blob.value, r#"{"isAuthenticated":true}"#);
    assert_eq!(blob.namespace, "auth-storage");
    assert_eq!(
        storage.list_namespaces().await.expect("namespaces"),
        vec!["auth-storage".to_string()]
    );
}

#[tokio::test]
async fn delete_blob_reports_presence() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.store_blob("ui", "{}").await.expect("write");

    assert!(storage.delete_blob("ui").await.expect("first delete"));
    assert!(!storage.delete_blob("ui").await.expect("second delete"));
    assert!(storage.load_blob("ui").await.expect("load").is_none());
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("skillmatrix_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("storage.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn blobs_survive_reopen() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("skillmatrix_storage_reopen_{suffix}"));
    let db_path = temp_root.join("client.sqlite3");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage
            .store_blob("auth-storage", "persisted")
            .await
            .expect("write");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    assert_eq!(
        reopened.load_blob("auth-storage").await.expect("load"),
        Some("persisted".to_string())
    );
    reopened.pool().close().await;

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn in_memory_urls_have_no_parent_directory() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert!(sqlite_path("sqlite://file:shared?mode=memory&cache=shared").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/client.sqlite3?mode=rwc"),
        Some(PathBuf::from("./data/client.sqlite3"))
    );
}
