use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::OvertimeRepository;
use crate::database::{
    models::{Overtime, OvertimeInput, OvertimeStatus},
    utils::sql,
};

const OVERTIME_COLUMNS: &str = "id, doctor_id, shift_id, overtime_date, hours, reason, status, \
    decided_by, decision_comment, decided_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgOvertimeRepository {
    pool: PgPool,
}

impl PgOvertimeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OvertimeRepository for PgOvertimeRepository {
    async fn create(&self, doctor_id: Uuid, input: &OvertimeInput) -> Result<Overtime> {
        let now = Utc::now();
        let overtime = sqlx::query_as::<_, Overtime>(&sql(&format!(
            r#"
            INSERT INTO
                overtime_requests (
                    id,
                    doctor_id,
                    shift_id,
                    overtime_date,
                    hours,
                    reason,
                    status,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {OVERTIME_COLUMNS}
            "#
        )))
        .bind(Uuid::new_v4())
        .bind(doctor_id)
        .bind(input.shift_id)
        .bind(input.date)
        .bind(input.hours)
        .bind(&input.reason)
        .bind(OvertimeStatus::Pending)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(overtime)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Overtime>> {
        let overtime = sqlx::query_as::<_, Overtime>(&sql(&format!(
            "SELECT {OVERTIME_COLUMNS} FROM overtime_requests WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(overtime)
    }

    async fn list(
        &self,
        doctor_id: Option<Uuid>,
        status: Option<OvertimeStatus>,
    ) -> Result<Vec<Overtime>> {
        let requests = sqlx::query_as::<_, Overtime>(&sql(&format!(
            r#"
            SELECT {OVERTIME_COLUMNS}
            FROM overtime_requests
            WHERE (?::uuid IS NULL OR doctor_id = ?)
                AND (?::text IS NULL OR status = ?)
            ORDER BY created_at DESC
            "#
        )))
        .bind(doctor_id)
        .bind(doctor_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn update_status(
        &self,
        overtime: &Overtime,
        expected: OvertimeStatus,
    ) -> Result<Option<Overtime>> {
        let updated = sqlx::query_as::<_, Overtime>(&sql(&format!(
            r#"
            UPDATE overtime_requests
            SET status = ?, decided_by = ?, decision_comment = ?, decided_at = ?, updated_at = ?
            WHERE id = ? AND status = ?
            RETURNING {OVERTIME_COLUMNS}
            "#
        )))
        .bind(overtime.status)
        .bind(overtime.decided_by)
        .bind(&overtime.decision_comment)
        .bind(overtime.decided_at)
        .bind(overtime.updated_at)
        .bind(overtime.id)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }
}
