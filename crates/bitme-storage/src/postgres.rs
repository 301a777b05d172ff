use crate::error::{map_connection_error, map_read_error, map_write_error};
use crate::pool::{PoolConfig, StorePool};
use crate::schema;
use async_trait::async_trait;
use bitme_core::{
    LookupKey, MissPolicy, ResolveQuery, Result, StorageError, UrlRecord, UrlStore, VisitSource,
    VisitSourceStream,
};
use futures::StreamExt;
use jiff::Timestamp;
use tracing::{debug, trace, warn};

/// Postgres implementation of the storage engine.
///
/// A short URL is spread over four tables: `urlbase` maps it to its target,
/// `adminurl` indexes it by admin URL, `urldata` holds the aggregate counter
/// and `urlusedata` one counter per source. Multi-statement writes run in a
/// single transaction; reads take a pooled connection per statement.
#[derive(Debug, Clone)]
pub struct PgUrlStore {
    pool: StorePool,
}

impl PgUrlStore {
    /// Creates a store on top of an open pool.
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }

    /// Opens a pool with the given configuration and wraps it.
    pub async fn connect(config: &PoolConfig) -> Result<Self> {
        let pool = StorePool::open(config).await?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &StorePool {
        &self.pool
    }

    /// Creates the `bitme` schema and its tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(schema::SCHEMA_DDL)
            .execute(self.pool.pg_pool())
            .await
            .map_err(map_write_error)?;
        debug!("schema ensured");
        Ok(())
    }

    /// Closes the pool. Idempotent.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn rolled_back(short_url: &str, err: sqlx::Error) -> StorageError {
    let err = map_write_error(err);
    warn!(short_url, error = %err, "write failed, rolling back");
    err
}

fn on_miss(policy: MissPolicy, what: &str, key: &str) -> Result<()> {
    match policy {
        MissPolicy::FailFast => Err(StorageError::NotFound(format!("{what} '{key}'"))),
        MissPolicy::Tolerant => {
            trace!(key, what, "no matching row, keeping zero value");
            Ok(())
        }
    }
}

fn require(value: &str, name: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StorageError::InvalidArgument(format!(
            "{name} cannot be empty"
        )));
    }
    Ok(())
}

#[async_trait]
impl UrlStore for PgUrlStore {
    async fn register(
        &self,
        full_url: &str,
        short_url: &str,
        admin_url: &str,
    ) -> Result<UrlRecord> {
        require(short_url, "short url")?;
        require(admin_url, "admin url")?;

        let registered_at = Timestamp::now();
        let mut tx = self
            .pool
            .pg_pool()
            .begin()
            .await
            .map_err(map_connection_error)?;

        // An early return drops `tx`, which rolls back whatever was inserted.
        schema::insert_base(&mut *tx, short_url, full_url)
            .await
            .map_err(|e| rolled_back(short_url, e))?;
        schema::insert_admin(&mut *tx, admin_url, short_url)
            .await
            .map_err(|e| rolled_back(short_url, e))?;
        schema::insert_usage(&mut *tx, short_url, registered_at)
            .await
            .map_err(|e| rolled_back(short_url, e))?;

        tx.commit().await.map_err(map_write_error)?;

        debug!(short_url, "short url registered");
        Ok(UrlRecord::registered(
            full_url,
            short_url,
            admin_url,
            registered_at,
        ))
    }

    async fn resolve(&self, query: &ResolveQuery) -> Result<UrlRecord> {
        query.validate()?;
        let pool = self.pool.pg_pool();
        let mut record = UrlRecord::default();

        record.short_url = match &query.key {
            LookupKey::Short(short_url) => short_url.clone(),
            LookupKey::Admin(admin_url) => {
                record.admin_url = admin_url.clone();
                match schema::select_short_url_by_admin(pool, admin_url)
                    .await
                    .map_err(map_read_error)?
                {
                    Some(short_url) => short_url,
                    None => {
                        on_miss(query.miss_policy, "admin url", admin_url)?;
                        String::new()
                    }
                }
            }
        };

        match schema::select_full_url(pool, &record.short_url)
            .await
            .map_err(map_read_error)?
        {
            Some(full_url) => record.full_url = full_url,
            None => on_miss(query.miss_policy, "short url", &record.short_url)?,
        }

        match schema::select_usage(pool, &record.short_url)
            .await
            .map_err(map_read_error)?
        {
            Some(usage) => {
                record.total_uses = usage.total_uses;
                record.last_used = Some(usage.last_used);
            }
            None => on_miss(query.miss_policy, "usage of", &record.short_url)?,
        }

        if let Some(source_id) = &query.source_id {
            // A source that never visited has simply used the URL zero times.
            record.source_uses = schema::select_source_uses(pool, source_id, &record.short_url)
                .await
                .map_err(map_read_error)?
                .unwrap_or(0);
            record.source_id = Some(source_id.clone());
        }

        trace!(
            short_url = %record.short_url,
            total_uses = record.total_uses,
            "short url resolved"
        );
        Ok(record)
    }

    async fn record_visit(
        &self,
        short_url: &str,
        source_id: &str,
        last_used: Timestamp,
    ) -> Result<UrlRecord> {
        require(short_url, "short url")?;
        require(source_id, "source id")?;

        let mut tx = self
            .pool
            .pg_pool()
            .begin()
            .await
            .map_err(map_connection_error)?;

        let source_uses = schema::upsert_source_usage(&mut *tx, source_id, short_url, last_used)
            .await
            .map_err(|e| rolled_back(short_url, e))?;

        let visited = schema::increment_usage(&mut *tx, short_url, last_used)
            .await
            .map_err(|e| rolled_back(short_url, e))?;
        let Some(visited) = visited else {
            tx.rollback().await.map_err(map_write_error)?;
            warn!(short_url, source_id, "visit to unregistered short url rolled back");
            return Err(StorageError::unregistered(short_url));
        };

        tx.commit().await.map_err(map_write_error)?;

        debug!(
            short_url,
            source_id,
            source_uses,
            total_uses = visited.usage.total_uses,
            "visit recorded"
        );
        Ok(UrlRecord {
            full_url: visited.full_url,
            short_url: short_url.to_owned(),
            admin_url: String::new(),
            total_uses: visited.usage.total_uses,
            source_id: Some(source_id.to_owned()),
            source_uses,
            last_used: Some(visited.usage.last_used),
        })
    }

    fn list_visit_sources<'a>(&'a self, short_url: &'a str) -> VisitSourceStream<'a> {
        schema::source_usage_rows(self.pool.pg_pool(), short_url.to_owned())
            .map(|row| {
                row.map(|row| VisitSource::new(row.source_id, row.uses))
                    .map_err(map_read_error)
            })
            .boxed()
    }
}
