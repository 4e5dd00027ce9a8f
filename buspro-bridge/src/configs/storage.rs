use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::configs::schema::SchemaManager;
use crate::configs::settings::Database;
use crate::errors::StorageError;
use crate::models::AccessoryContext;

/// Durable accessory state, keyed by accessory id
#[async_trait]
pub trait AccessoryStore: Send + Sync {
    async fn load(&self, id: &Uuid) -> Result<Option<AccessoryContext>, StorageError>;

    async fn save(&self, id: &Uuid, context: &AccessoryContext) -> Result<(), StorageError>;
}

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(
        url: &str,
        clean_start: bool,
        schema_manager: SchemaManager,
    ) -> Result<Self, StorageError> {
        // every connection to an in-memory database opens a separate database
        let max_connections = if url.contains(":memory:") { 1 } else { 10 };

        let pool = SqlitePoolOptions::new()
            .min_connections(1) // in memory db might drop connection when 0
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Self::create_schema(&pool, &schema_manager, clean_start).await?;

        Ok(Self { pool })
    }

    /// Opens the configured database
    pub async fn from_settings(database: &Database) -> Result<Option<Self>, StorageError> {
        match &database.url {
            Some(url) => Ok(Some(
                Self::new(url, database.clean_start, SchemaManager::default()).await?,
            )),
            None => Ok(None),
        }
    }

    async fn create_schema(
        pool: &SqlitePool,
        schema: &SchemaManager,
        clean_start: bool,
    ) -> Result<(), sqlx::Error> {
        if clean_start {
            sqlx::query(&schema.dispose_schema().join("\n"))
                .execute(pool)
                .await?;

            tracing::warn!("perform a clean boot: clean and recreate schema");
        }

        sqlx::query(&schema.create_schema().join("\n"))
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl AccessoryStore for Storage {
    async fn load(&self, id: &Uuid) -> Result<Option<AccessoryContext>, StorageError> {
        let context: Option<(String,)> =
            sqlx::query_as("SELECT context FROM accessories WHERE id = $1;")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match context {
            Some((context,)) => Ok(Some(serde_json::from_str(&context)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, id: &Uuid, context: &AccessoryContext) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO accessories (id, context, updated_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE
                    SET context = excluded.context, updated_at = excluded.updated_at;
            "#,
        )
        .bind(id.to_string())
        .bind(serde_json::to_string(context)?)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Keeps accessory state for the lifetime of the process only
#[derive(Default)]
pub struct MemoryStore {
    contexts: Mutex<HashMap<Uuid, AccessoryContext>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<AccessoryContext> {
        self.contexts
            .lock()
            .ok()
            .and_then(|contexts| contexts.get(id).cloned())
    }

    pub fn insert(&self, id: Uuid, context: AccessoryContext) {
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.insert(id, context);
        }
    }
}

#[async_trait]
impl AccessoryStore for MemoryStore {
    async fn load(&self, id: &Uuid) -> Result<Option<AccessoryContext>, StorageError> {
        Ok(self.get(id))
    }

    async fn save(&self, id: &Uuid, context: &AccessoryContext) -> Result<(), StorageError> {
        self.insert(*id, context.clone());
        Ok(())
    }
}
