use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use super::LeaveRepository;
use crate::database::{
    models::{CoveringStaff, LeaveRequest, LeaveRequestInput, LeaveStatus},
    types::LeaveRequestRow,
    utils::sql,
};

const LEAVE_COLUMNS: &str = "id, staff_id, leave_type, start_date, end_date, reason, \
    is_emergency, status, approver_id, decided_at, rejection_reason, cancelled_by, \
    cancellation_reason, covering_staff, created_at, updated_at";

#[derive(Clone)]
pub struct PgLeaveRepository {
    pool: PgPool,
}

impl PgLeaveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveRepository for PgLeaveRepository {
    async fn create_if_no_overlap(
        &self,
        staff_id: Uuid,
        input: &LeaveRequestInput,
    ) -> Result<Option<LeaveRequest>> {
        let mut tx = self.pool.begin().await?;

        // Serializes submissions per staff member until commit
        sqlx::query(&sql("SELECT pg_advisory_xact_lock(hashtext(?::text))"))
            .bind(staff_id.to_string())
            .execute(&mut *tx)
            .await?;

        let clash = sqlx::query_scalar::<_, bool>(&sql(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM leave_requests
                WHERE staff_id = ?
                    AND status IN ('pending', 'approved')
                    AND start_date <= ?
                    AND end_date >= ?
            )
            "#,
        ))
        .bind(staff_id)
        .bind(input.end_date)
        .bind(input.start_date)
        .fetch_one(&mut *tx)
        .await?;

        if clash {
            tx.rollback().await?;
            return Ok(None);
        }

        let now = Utc::now();
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql(&format!(
            r#"
            INSERT INTO
                leave_requests (
                    id,
                    staff_id,
                    leave_type,
                    start_date,
                    end_date,
                    reason,
                    is_emergency,
                    status,
                    covering_staff,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, '[]'::jsonb, ?, ?)
            RETURNING {LEAVE_COLUMNS}
            "#
        )))
        .bind(Uuid::new_v4())
        .bind(staff_id)
        .bind(input.leave_type)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.reason)
        .bind(input.is_emergency)
        .bind(LeaveStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(row.into()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeaveRequest>> {
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql(&format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_overlapping(
        &self,
        staff_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        status: LeaveStatus,
    ) -> Result<Vec<LeaveRequest>> {
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql(&format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            WHERE staff_id = ? AND status = ? AND start_date <= ? AND end_date >= ?
            ORDER BY start_date
            "#
        )))
        .bind(staff_id)
        .bind(status)
        .bind(end)
        .bind(start)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list(
        &self,
        staff_id: Option<Uuid>,
        status: Option<LeaveStatus>,
    ) -> Result<Vec<LeaveRequest>> {
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&sql(&format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            WHERE (?::uuid IS NULL OR staff_id = ?)
                AND (?::text IS NULL OR status = ?)
            ORDER BY created_at DESC
            "#
        )))
        .bind(staff_id)
        .bind(staff_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_status(
        &self,
        request: &LeaveRequest,
        expected: LeaveStatus,
    ) -> Result<Option<LeaveRequest>> {
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql(&format!(
            r#"
            UPDATE leave_requests
            SET
                status = ?,
                approver_id = ?,
                decided_at = ?,
                rejection_reason = ?,
                cancelled_by = ?,
                cancellation_reason = ?,
                updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING {LEAVE_COLUMNS}
            "#
        )))
        .bind(request.status)
        .bind(request.approver_id)
        .bind(request.decided_at)
        .bind(&request.rejection_reason)
        .bind(request.cancelled_by)
        .bind(&request.cancellation_reason)
        .bind(request.updated_at)
        .bind(request.id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn add_cover(&self, id: Uuid, entry: &CoveringStaff) -> Result<Option<LeaveRequest>> {
        let entries = Json(vec![entry.clone()]);
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql(&format!(
            r#"
            UPDATE leave_requests
            SET covering_staff = covering_staff || ?::jsonb, updated_at = ?
            WHERE id = ? AND NOT covering_staff @> ?::jsonb
            RETURNING {LEAVE_COLUMNS}
            "#
        )))
        .bind(&entries)
        .bind(Utc::now())
        .bind(id)
        .bind(&entries)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row.into())),
            // Entry already recorded, or no such request
            None => self.find_by_id(id).await,
        }
    }
}
