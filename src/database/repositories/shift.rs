use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::ShiftRepository;
use crate::database::{
    models::{Shift, ShiftDefinition},
    types::{ShiftRow, weekday_columns},
    utils::sql,
};

const SHIFT_COLUMNS: &str = "id, staff_id, title, start_time, end_time, days_of_week, \
    max_patients_per_hour, slot_duration, department, break_start, break_end, is_active, \
    created_at, updated_at";

#[derive(Clone)]
pub struct PgShiftRepository {
    pool: PgPool,
}

impl PgShiftRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShiftRepository for PgShiftRepository {
    async fn create(&self, staff_id: Uuid, definition: &ShiftDefinition) -> Result<Shift> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, ShiftRow>(&sql(&format!(
            r#"
            INSERT INTO
                shifts (
                    id,
                    staff_id,
                    title,
                    start_time,
                    end_time,
                    days_of_week,
                    max_patients_per_hour,
                    slot_duration,
                    department,
                    break_start,
                    break_end,
                    is_active,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, TRUE, ?, ?)
            RETURNING {SHIFT_COLUMNS}
            "#
        )))
        .bind(Uuid::new_v4())
        .bind(staff_id)
        .bind(&definition.title)
        .bind(definition.start_time)
        .bind(definition.end_time)
        .bind(weekday_columns(&definition.days_of_week))
        .bind(definition.max_patients_per_hour)
        .bind(definition.slot_duration)
        .bind(&definition.department)
        .bind(definition.break_window.map(|window| window.start))
        .bind(definition.break_window.map(|window| window.end))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Shift>> {
        let row = sqlx::query_as::<_, ShiftRow>(&sql(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_staff(&self, staff_id: Uuid) -> Result<Vec<Shift>> {
        let rows = sqlx::query_as::<_, ShiftRow>(&sql(&format!(
            r#"
            SELECT {SHIFT_COLUMNS}
            FROM shifts
            WHERE staff_id = ? AND is_active
            ORDER BY start_time, created_at
            "#
        )))
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_active(&self) -> Result<Vec<Shift>> {
        let rows = sqlx::query_as::<_, ShiftRow>(&sql(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE is_active ORDER BY start_time, created_at"
        )))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: Uuid, definition: &ShiftDefinition) -> Result<Option<Shift>> {
        let row = sqlx::query_as::<_, ShiftRow>(&sql(&format!(
            r#"
            UPDATE shifts
            SET
                title = ?,
                start_time = ?,
                end_time = ?,
                days_of_week = ?,
                max_patients_per_hour = ?,
                slot_duration = ?,
                department = ?,
                break_start = ?,
                break_end = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING {SHIFT_COLUMNS}
            "#
        )))
        .bind(&definition.title)
        .bind(definition.start_time)
        .bind(definition.end_time)
        .bind(weekday_columns(&definition.days_of_week))
        .bind(definition.max_patients_per_hour)
        .bind(definition.slot_duration)
        .bind(&definition.department)
        .bind(definition.break_window.map(|window| window.start))
        .bind(definition.break_window.map(|window| window.end))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn deactivate(&self, id: Uuid) -> Result<Option<Shift>> {
        let row = sqlx::query_as::<_, ShiftRow>(&sql(&format!(
            r#"
            UPDATE shifts
            SET is_active = FALSE, updated_at = ?
            WHERE id = ?
            RETURNING {SHIFT_COLUMNS}
            "#
        )))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
