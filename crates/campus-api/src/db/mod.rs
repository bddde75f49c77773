//! # Database Persistence Layer
//!
//! PostgreSQL implementation of [`Persistence`] via SQLx.
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, resources
//! and review records are stored in PostgreSQL. When absent, the API runs on
//! [`crate::persistence::MemoryPersistence`] (suitable for development and
//! testing).
//!
//! Guarded writes use one transaction per call: the `UPDATE ... WHERE id = $1`
//! compares every column against the caller's snapshot, its row lock
//! serializes competing transitions, and the review insert commits with it.

pub mod resources;
pub mod reviews;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use campus_core::{Phone, ResourceId};
use campus_state::{Resource, ResourceStatus, ReviewRecord};

use crate::persistence::{GuardOutcome, Persistence, PersistenceError};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(database_url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             State will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Classify a SQLx error for the lifecycle layer.
pub(crate) fn map_sqlx(err: sqlx::Error) -> PersistenceError {
    match &err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PersistenceError::Unavailable(err.to_string())
        }
        _ => PersistenceError::Backend(err.to_string()),
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// PostgreSQL-backed persistence.
#[derive(Debug, Clone)]
pub struct PgPersistence {
    pool: PgPool,
}

impl PgPersistence {
    /// Wrap an initialized pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Persistence for PgPersistence {
    async fn insert_resource(&self, resource: &Resource) -> Result<(), PersistenceError> {
        let inserted = resources::insert(&self.pool, resource)
            .await
            .map_err(map_sqlx)?;
        if inserted {
            return Ok(());
        }
        let retired = reviews::exists(&self.pool, resource.id().as_str())
            .await
            .map_err(map_sqlx)?;
        if retired {
            Err(PersistenceError::Retired(resource.id().clone()))
        } else {
            Err(PersistenceError::Duplicate(resource.id().clone()))
        }
    }

    async fn get_resource(&self, id: &ResourceId) -> Result<Option<Resource>, PersistenceError> {
        resources::get_by_id(&self.pool, id.as_str())
            .await
            .map_err(map_sqlx)?
            .map(resources::ResourceRow::into_resource)
            .transpose()
    }

    async fn update_with_guard(
        &self,
        expected: &Resource,
        next: &Resource,
        review: Option<&ReviewRecord>,
    ) -> Result<GuardOutcome, PersistenceError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let updated = resources::update_guarded(&mut *tx, expected, next)
            .await
            .map_err(map_sqlx)?;
        if !updated {
            let found = resources::status_of(&mut *tx, next.id().as_str())
                .await
                .map_err(map_sqlx)?;
            tx.rollback().await.map_err(map_sqlx)?;
            return match found {
                None => Ok(GuardOutcome::Missing),
                Some(name) => ResourceStatus::from_name(&name)
                    .map(GuardOutcome::Stale)
                    .ok_or_else(|| PersistenceError::Corrupt(format!("unknown status '{name}'"))),
            };
        }

        if let Some(record) = review {
            reviews::insert(&mut *tx, record).await.map_err(map_sqlx)?;
        }
        tx.commit().await.map_err(map_sqlx)?;
        Ok(GuardOutcome::Applied)
    }

    async fn delete_resource(&self, id: &ResourceId) -> Result<bool, PersistenceError> {
        resources::delete(&self.pool, id.as_str())
            .await
            .map_err(map_sqlx)
    }

    async fn list_by_publisher(
        &self,
        publisher: &Phone,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Resource>, PersistenceError> {
        resources::list_by_publisher(&self.pool, publisher.as_str(), to_i64(limit), to_i64(offset))
            .await
            .map_err(map_sqlx)?
            .into_iter()
            .map(resources::ResourceRow::into_resource)
            .collect()
    }

    async fn count_by_publisher(&self, publisher: &Phone) -> Result<u64, PersistenceError> {
        let n = resources::count_by_publisher(&self.pool, publisher.as_str())
            .await
            .map_err(map_sqlx)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn list_by_status(
        &self,
        status: ResourceStatus,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Resource>, PersistenceError> {
        resources::list_by_status(&self.pool, status.as_str(), to_i64(limit), to_i64(offset))
            .await
            .map_err(map_sqlx)?
            .into_iter()
            .map(resources::ResourceRow::into_resource)
            .collect()
    }

    async fn count_by_status(&self, status: ResourceStatus) -> Result<u64, PersistenceError> {
        let n = resources::count_by_status(&self.pool, status.as_str())
            .await
            .map_err(map_sqlx)?;
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn review_history(
        &self,
        id: &ResourceId,
    ) -> Result<Vec<ReviewRecord>, PersistenceError> {
        reviews::history(&self.pool, id.as_str())
            .await
            .map_err(map_sqlx)?
            .into_iter()
            .map(reviews::ReviewRow::into_record)
            .collect()
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx)
    }
}
