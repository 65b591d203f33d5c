use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use tracing::instrument;

use crate::error::StoreError;
use crate::mapping::MappingSpec;
use crate::source::SourceDescriptor;

// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Where configured sources live. The fetcher only ever reads them.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Every stored source, oldest first
    async fn find_all(&self) -> Result<Vec<SourceDescriptor>, StoreError>;

    /// Persist a new source and return it with its assigned id
    async fn save(&self, source: SourceDescriptor) -> Result<SourceDescriptor, StoreError>;
}

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: i64,
    name: String,
    url: String,
    auth_method: String,
    request_method: String,
    request_body: String,
    custom_headers: Json<HashMap<String, String>>,
    data_path: String,
    paths: Json<MappingSpec>,
}

impl TryFrom<SourceRow> for SourceDescriptor {
    type Error = StoreError;

    fn try_from(row: SourceRow) -> Result<Self, Self::Error> {
        let request_method = row.request_method.parse().map_err(|e: String| {
            StoreError::Database(sqlx::Error::Decode(e.into()))
        })?;

        Ok(SourceDescriptor {
            id: Some(row.id),
            name: row.name,
            url: row.url,
            auth_method: row.auth_method,
            request_method,
            request_body: row.request_body,
            custom_headers: row.custom_headers.0,
            data_path: row.data_path,
            mapping: row.paths.0,
        })
    }
}

pub struct PgSourceStore {
    pool: PgPool,
}

impl PgSourceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SourceStore for PgSourceStore {
    #[instrument(skip_all)]
    async fn find_all(&self) -> Result<Vec<SourceDescriptor>, StoreError> {
        let rows: Vec<SourceRow> = sqlx::query_as(
            r#"
            SELECT id, name, url, auth_method, request_method, request_body,
                   custom_headers, data_path, paths
            FROM device_sources
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SourceDescriptor::try_from).collect()
    }

    #[instrument(skip_all, fields(source = %source.name))]
    async fn save(&self, source: SourceDescriptor) -> Result<SourceDescriptor, StoreError> {
        let row: SourceRow = sqlx::query_as(
            r#"
            INSERT INTO device_sources
                (name, url, auth_method, request_method, request_body,
                 custom_headers, data_path, paths)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, name, url, auth_method, request_method, request_body,
                      custom_headers, data_path, paths
            "#,
        )
        .bind(&source.name)
        .bind(&source.url)
        .bind(&source.auth_method)
        .bind(source.request_method.to_string())
        .bind(&source.request_body)
        .bind(Json(&source.custom_headers))
        .bind(&source.data_path)
        .bind(Json(&source.mapping))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::DuplicateName(source.name.clone())
            }
            _ => StoreError::Database(e),
        })?;

        SourceDescriptor::try_from(row)
    }
}

/// Process-local store with the same contract as the Postgres one.
#[derive(Default)]
pub struct MemorySourceStore {
    sources: Mutex<Vec<SourceDescriptor>>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SourceDescriptor>> {
        match self.sources.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn find_all(&self) -> Result<Vec<SourceDescriptor>, StoreError> {
        Ok(self.lock().clone())
    }

    async fn save(&self, mut source: SourceDescriptor) -> Result<SourceDescriptor, StoreError> {
        let mut sources = self.lock();
        if sources.iter().any(|s| s.name == source.name) {
            return Err(StoreError::DuplicateName(source.name));
        }

        let next_id = sources.iter().filter_map(|s| s.id).max().unwrap_or(0) + 1;
        source.id = Some(next_id);
        sources.push(source.clone());
        Ok(source)
    }
}
