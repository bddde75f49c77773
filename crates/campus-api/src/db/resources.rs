//! Resource persistence operations.
//!
//! All functions operate on the `resources` table. State machine
//! constraints are enforced by `campus-state`; SQL only enforces the guard
//! (every column equal to the expected snapshot), id retirement, and the
//! review-field check constraint.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use campus_core::{Phone, ResourceId, Timestamp};
use campus_state::{Resource, ResourceParts, ResourceStatus, ReviewStamp};

use crate::persistence::PersistenceError;

const COLUMNS: &str = "id, publisher_phone, resource_name, description, category, status, \
                       reviewer_phone, review_comment, reviewed_at, created_at, updated_at";

/// Insert a new resource. Returns `false` if the id is already taken or
/// has retained review history.
pub async fn insert(pool: &PgPool, r: &Resource) -> Result<bool, sqlx::Error> {
    let review = r.review();
    let result = sqlx::query(
        "INSERT INTO resources (id, publisher_phone, resource_name, description, category, status,
                                reviewer_phone, review_comment, reviewed_at, created_at, updated_at)
         SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11
         WHERE NOT EXISTS (SELECT 1 FROM review_records WHERE resource_id = $1)
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(r.id().as_str())
    .bind(r.publisher_phone().as_str())
    .bind(r.resource_name())
    .bind(r.description())
    .bind(r.category())
    .bind(r.status().as_str())
    .bind(review.map(|s| s.reviewer_phone.as_str()))
    .bind(review.and_then(|s| s.review_comment.as_deref()))
    .bind(review.map(|s| *s.reviewed_at.as_datetime()))
    .bind(*r.created_at().as_datetime())
    .bind(*r.updated_at().as_datetime())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrite the mutable columns if the stored row still equals
/// `expected`. Returns whether a row was updated.
pub async fn update_guarded<'e>(
    executor: impl PgExecutor<'e>,
    expected: &Resource,
    next: &Resource,
) -> Result<bool, sqlx::Error> {
    let review = next.review();
    let seen = expected.review();
    let result = sqlx::query(
        "UPDATE resources
         SET resource_name = $3, description = $4, category = $5, status = $6,
             reviewer_phone = $7, review_comment = $8, reviewed_at = $9, updated_at = $10
         WHERE id = $1 AND status = $2
           AND publisher_phone = $11 AND resource_name = $12 AND description = $13
           AND category IS NOT DISTINCT FROM $14
           AND reviewer_phone IS NOT DISTINCT FROM $15
           AND review_comment IS NOT DISTINCT FROM $16
           AND reviewed_at IS NOT DISTINCT FROM $17
           AND created_at = $18 AND updated_at = $19",
    )
    .bind(next.id().as_str())
    .bind(expected.status().as_str())
    .bind(next.resource_name())
    .bind(next.description())
    .bind(next.category())
    .bind(next.status().as_str())
    .bind(review.map(|s| s.reviewer_phone.as_str()))
    .bind(review.and_then(|s| s.review_comment.as_deref()))
    .bind(review.map(|s| *s.reviewed_at.as_datetime()))
    .bind(*next.updated_at().as_datetime())
    .bind(expected.publisher_phone().as_str())
    .bind(expected.resource_name())
    .bind(expected.description())
    .bind(expected.category())
    .bind(seen.map(|s| s.reviewer_phone.as_str()))
    .bind(seen.and_then(|s| s.review_comment.as_deref()))
    .bind(seen.map(|s| *s.reviewed_at.as_datetime()))
    .bind(*expected.created_at().as_datetime())
    .bind(*expected.updated_at().as_datetime())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Current status of a resource, if it exists.
pub async fn status_of<'e>(
    executor: impl PgExecutor<'e>,
    id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT status FROM resources WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Fetch a resource by id.
pub async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<ResourceRow>, sqlx::Error> {
    sqlx::query_as::<_, ResourceRow>(&format!("SELECT {COLUMNS} FROM resources WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Delete a resource. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM resources WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// List a publisher's resources, newest first.
pub async fn list_by_publisher(
    pool: &PgPool,
    publisher: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<ResourceRow>, sqlx::Error> {
    sqlx::query_as::<_, ResourceRow>(&format!(
        "SELECT {COLUMNS} FROM resources WHERE publisher_phone = $1
         ORDER BY created_at DESC, id COLLATE \"C\" ASC LIMIT $2 OFFSET $3"
    ))
    .bind(publisher)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Count a publisher's resources.
pub async fn count_by_publisher(pool: &PgPool, publisher: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE publisher_phone = $1")
        .bind(publisher)
        .fetch_one(pool)
        .await
}

/// List resources in one status, oldest first.
pub async fn list_by_status(
    pool: &PgPool,
    status: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<ResourceRow>, sqlx::Error> {
    sqlx::query_as::<_, ResourceRow>(&format!(
        "SELECT {COLUMNS} FROM resources WHERE status = $1
         ORDER BY created_at ASC, id COLLATE \"C\" ASC LIMIT $2 OFFSET $3"
    ))
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

/// Count resources in one status.
pub async fn count_by_status(pool: &PgPool, status: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await
}

/// Internal row type for SQLx mapping.
#[derive(Debug, sqlx::FromRow)]
pub struct ResourceRow {
    id: String,
    publisher_phone: String,
    resource_name: String,
    description: String,
    category: Option<String>,
    status: String,
    reviewer_phone: Option<String>,
    review_comment: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ResourceRow {
    /// Rebuild the domain value, rejecting rows that violate its invariants.
    pub fn into_resource(self) -> Result<Resource, PersistenceError> {
        let corrupt = |what: String| PersistenceError::Corrupt(format!("resource {}: {what}", self.id));

        let id = ResourceId::new(self.id.clone()).map_err(|e| corrupt(e.to_string()))?;
        let publisher_phone =
            Phone::new(self.publisher_phone.clone()).map_err(|e| corrupt(e.to_string()))?;
        let status = ResourceStatus::from_name(&self.status)
            .ok_or_else(|| corrupt(format!("unknown status '{}'", self.status)))?;

        let review = match (self.reviewer_phone.clone(), self.reviewed_at) {
            (Some(phone), Some(at)) => Some(ReviewStamp {
                reviewer_phone: Phone::new(phone).map_err(|e| corrupt(e.to_string()))?,
                review_comment: self.review_comment.clone(),
                reviewed_at: Timestamp::from_datetime(at),
            }),
            (None, None) => None,
            _ => return Err(corrupt("partial review fields".to_string())),
        };

        Resource::from_parts(ResourceParts {
            id,
            publisher_phone,
            resource_name: self.resource_name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            status,
            review,
            created_at: Timestamp::from_datetime(self.created_at),
            updated_at: Timestamp::from_datetime(self.updated_at),
        })
        .map_err(|e| corrupt(e.to_string()))
    }
}
