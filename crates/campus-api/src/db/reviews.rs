//! Review ledger persistence.
//!
//! Rows are only ever inserted. The `(resource_id, sequence)` primary key
//! rejects a second record in the same slot.

use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};

use campus_core::{Phone, ResourceId, Timestamp};
use campus_state::{ResourceStatus, ReviewDecision, ReviewRecord};

use crate::persistence::PersistenceError;

/// Append one review record.
pub async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    record: &ReviewRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO review_records (resource_id, sequence, decision, reviewer_phone, comment,
                                     reviewed_at, from_status, to_status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(record.resource_id.as_str())
    .bind(i32::try_from(record.sequence).unwrap_or(i32::MAX))
    .bind(record.decision.as_str())
    .bind(record.reviewer_phone.as_str())
    .bind(record.comment.as_deref())
    .bind(*record.reviewed_at.as_datetime())
    .bind(record.from_status.as_str())
    .bind(record.to_status.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

/// Whether any record exists for `resource_id`.
pub async fn exists(pool: &PgPool, resource_id: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM review_records WHERE resource_id = $1)")
        .bind(resource_id)
        .fetch_one(pool)
        .await
}

/// All records for a resource, in sequence order.
pub async fn history(pool: &PgPool, resource_id: &str) -> Result<Vec<ReviewRow>, sqlx::Error> {
    sqlx::query_as::<_, ReviewRow>(
        "SELECT resource_id, sequence, decision, reviewer_phone, comment,
                reviewed_at, from_status, to_status
         FROM review_records WHERE resource_id = $1 ORDER BY sequence ASC",
    )
    .bind(resource_id)
    .fetch_all(pool)
    .await
}

/// Internal row type for SQLx mapping.
#[derive(Debug, sqlx::FromRow)]
pub struct ReviewRow {
    resource_id: String,
    sequence: i32,
    decision: String,
    reviewer_phone: String,
    comment: Option<String>,
    reviewed_at: DateTime<Utc>,
    from_status: String,
    to_status: String,
}

impl ReviewRow {
    pub fn into_record(self) -> Result<ReviewRecord, PersistenceError> {
        let corrupt = |what: String| {
            PersistenceError::Corrupt(format!(
                "review {}#{}: {what}",
                self.resource_id, self.sequence
            ))
        };
        let status = |name: &str| {
            ResourceStatus::from_name(name).ok_or_else(|| corrupt(format!("unknown status '{name}'")))
        };

        Ok(ReviewRecord {
            resource_id: ResourceId::new(self.resource_id.clone())
                .map_err(|e| corrupt(e.to_string()))?,
            sequence: u32::try_from(self.sequence)
                .map_err(|_| corrupt("negative sequence".to_string()))?,
            decision: ReviewDecision::from_name(&self.decision)
                .ok_or_else(|| corrupt(format!("unknown decision '{}'", self.decision)))?,
            reviewer_phone: Phone::new(self.reviewer_phone.clone())
                .map_err(|e| corrupt(e.to_string()))?,
            comment: self.comment.clone(),
            reviewed_at: Timestamp::from_datetime(self.reviewed_at),
            from_status: status(&self.from_status)?,
            to_status: status(&self.to_status)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(decision: &str, sequence: i32) -> ReviewRow {
        ReviewRow {
            resource_id: "R1".into(),
            sequence,
            decision: decision.into(),
            reviewer_phone: "13900000000".into(),
            comment: Some("ok".into()),
            reviewed_at: Utc::now(),
            from_status: "pending".into(),
            to_status: "published".into(),
        }
    }

    #[test]
    fn rows_map_to_records() {
        let record = row("approve", 1).into_record().unwrap();
        assert_eq!(record.sequence, 1);
        assert_eq!(record.decision, ReviewDecision::Approve);
        assert_eq!(record.to_status, ResourceStatus::Published);
    }

    #[test]
    fn bad_rows_are_corrupt() {
        assert!(matches!(
            row("maybe", 1).into_record(),
            Err(PersistenceError::Corrupt(_))
        ));
        assert!(matches!(
            row("approve", -1).into_record(),
            Err(PersistenceError::Corrupt(_))
        ));
    }
}
