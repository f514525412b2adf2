use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Durable key-value blob storage keyed by a fixed namespace string.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn load_blob(&self, namespace: &str) -> Result<Option<String>>;
    async fn store_blob(&self, namespace: &str, value: &str) -> Result<()>;
    /// Returns `true` when a blob was present.
    async fn delete_blob(&self, namespace: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub namespace: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // Every in-memory connection is its own database.
        let max_connections = if is_in_memory(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;

        let storage = Self { pool };
        storage.ensure_blob_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_blob_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_blobs (
                namespace  TEXT PRIMARY KEY NOT NULL,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure kv_blobs table exists")?;
        Ok(())
    }

    pub async fn load_stored_blob(&self, namespace: &str) -> Result<Option<StoredBlob>> {
        let row = sqlx::query("SELECT namespace, value, updated_at FROM kv_blobs WHERE namespace = ?1")
            .bind(namespace)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load blob '{namespace}'"))?;

        row.map(|row| -> Result<StoredBlob> {
            let updated_at: String = row.try_get("updated_at")?;
            let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                .with_context(|| format!("corrupt updated_at for blob '{namespace}'"))?
                .with_timezone(&Utc);
            Ok(StoredBlob {
                namespace: row.try_get("namespace")?,
                value: row.try_get("value")?,
                updated_at,
            })
        })
        .transpose()
    }

    pub async fn list_namespaces(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT namespace FROM kv_blobs ORDER BY namespace")
            .fetch_all(&self.pool)
            .await
            .context("failed to list blob namespaces")?;
        rows.into_iter()
            .map(|row| row.try_get::<String, _>("namespace").map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl BlobStore for Storage {
    async fn load_blob(&self, namespace: &str) -> Result<Option<String>> {
        Ok(self.load_stored_blob(namespace).await?.map(|blob| blob.value))
    }

    async fn store_blob(&self, namespace: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_blobs (namespace, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(namespace) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(namespace)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store blob '{namespace}'"))?;
        Ok(())
    }

    async fn delete_blob(&self, namespace: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM kv_blobs WHERE namespace = ?1")
            .bind(namespace)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete blob '{namespace}'"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_in_memory(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
