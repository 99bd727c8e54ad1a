use crate::models::LinkRecord;
use crate::storage::{LinkKey, LinkStore, StorageError, StorageResult, LINK_COLUMNS};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Build the pool without opening a connection until the first query.
    pub fn new_lazy(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(database_url)?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl LinkStore for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id TEXT PRIMARY KEY,
                handle TEXT NOT NULL,
                slug TEXT,
                app TEXT,
                app_route TEXT,
                app_id TEXT,
                url TEXT,
                android_scheme TEXT,
                apple_scheme TEXT,
                team_id TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_handle_slug ON links(handle, slug)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_links_handle_app ON links(handle, app, app_route, app_id)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn find_link(&self, key: &LinkKey) -> Result<Option<LinkRecord>> {
        let (predicate, binds) = key.where_clause(|i| format!("${i}"));
        let sql = format!("SELECT {LINK_COLUMNS} FROM links WHERE {predicate} LIMIT 1");

        let mut query = sqlx::query_as::<_, LinkRecord>(&sql);
        for value in binds {
            query = query.bind(value);
        }

        let link = query.fetch_optional(self.pool.as_ref()).await?;
        Ok(link)
    }

    async fn insert(&self, link: &LinkRecord) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO links (id, handle, slug, app, app_route, app_id, url, android_scheme, apple_scheme, team_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&link.id)
        .bind(&link.handle)
        .bind(&link.slug)
        .bind(&link.app)
        .bind(&link.app_route)
        .bind(&link.app_id)
        .bind(&link.url)
        .bind(&link.android_scheme)
        .bind(&link.apple_scheme)
        .bind(&link.team_id)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        Ok(())
    }
}
