use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{BlockOutcome, DateOutcome, GeneratedSlots, SlotRepository};
use crate::database::{
    models::{DateSet, NewTimeSlot, TimeSlot},
    utils::sql,
};

const SLOT_COLUMNS: &str = "id, shift_id, doctor_id, slot_date, start_time, end_time, \
    max_patients, booked_count, is_available, is_blocked, block_reason, appointment_ids, \
    is_overtime, created_at, updated_at";

#[derive(Clone)]
pub struct PgSlotRepository {
    pool: PgPool,
}

impl PgSlotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts drafts, ignoring windows that already exist.
    async fn insert_drafts(
        tx: &mut Transaction<'_, Postgres>,
        drafts: Vec<NewTimeSlot>,
    ) -> Result<Vec<TimeSlot>> {
        let now = Utc::now();
        let mut inserted = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let slot = sqlx::query_as::<_, TimeSlot>(&sql(&format!(
                r#"
                INSERT INTO
                    time_slots (
                        id,
                        shift_id,
                        doctor_id,
                        slot_date,
                        start_time,
                        end_time,
                        max_patients,
                        is_overtime,
                        created_at,
                        updated_at
                    )
                VALUES
                    (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (shift_id, slot_date, start_time) DO NOTHING
                RETURNING {SLOT_COLUMNS}
                "#
            )))
            .bind(Uuid::new_v4())
            .bind(draft.shift_id)
            .bind(draft.doctor_id)
            .bind(draft.slot_date)
            .bind(draft.start_time)
            .bind(draft.end_time)
            .bind(draft.max_patients)
            .bind(draft.is_overtime)
            .bind(now)
            .bind(now)
            .fetch_optional(&mut **tx)
            .await?;

            inserted.extend(slot);
        }
        Ok(inserted)
    }
}

#[async_trait]
impl SlotRepository for PgSlotRepository {
    async fn insert_generated(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
        drafts: Vec<NewTimeSlot>,
    ) -> Result<GeneratedSlots> {
        let mut tx = self.pool.begin().await?;

        // Concurrent generators serialize on the marker row; only the first inserts
        let claimed = sqlx::query(&sql(
            r#"
            INSERT INTO slot_generations (shift_id, slot_date, generated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (shift_id, slot_date) DO NOTHING
            "#,
        ))
        .bind(shift_id)
        .bind(date)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if claimed {
            Self::insert_drafts(&mut tx, drafts).await?;
        }
        tx.commit().await?;

        let slots = self.find_by_shift_and_date(shift_id, date).await?;
        Ok(GeneratedSlots {
            slots,
            created: claimed,
        })
    }

    async fn append(&self, drafts: Vec<NewTimeSlot>) -> Result<Vec<TimeSlot>> {
        let mut tx = self.pool.begin().await?;
        let inserted = Self::insert_drafts(&mut tx, drafts).await?;
        tx.commit().await?;
        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TimeSlot>> {
        let slot = sqlx::query_as::<_, TimeSlot>(&sql(&format!(
            "SELECT {SLOT_COLUMNS} FROM time_slots WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(slot)
    }

    async fn find_by_shift_and_date(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>> {
        let slots = sqlx::query_as::<_, TimeSlot>(&sql(&format!(
            r#"
            SELECT {SLOT_COLUMNS}
            FROM time_slots
            WHERE shift_id = ? AND slot_date = ?
            ORDER BY start_time
            "#
        )))
        .bind(shift_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(slots)
    }

    async fn find_by_doctor_and_date(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>> {
        let slots = sqlx::query_as::<_, TimeSlot>(&sql(&format!(
            r#"
            SELECT {SLOT_COLUMNS}
            FROM time_slots
            WHERE doctor_id = ? AND slot_date = ?
            ORDER BY start_time, shift_id
            "#
        )))
        .bind(doctor_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(slots)
    }

    async fn book(&self, slot_id: Uuid, appointment_id: Uuid) -> Result<Option<TimeSlot>> {
        let slot = sqlx::query_as::<_, TimeSlot>(&sql(&format!(
            r#"
            UPDATE time_slots
            SET
                booked_count = booked_count + 1,
                appointment_ids = array_append(appointment_ids, ?),
                is_available = booked_count + 1 < max_patients,
                updated_at = ?
            WHERE id = ?
                AND NOT is_blocked
                AND is_available
                AND booked_count < max_patients
                AND NOT (appointment_ids @> ARRAY[?]::uuid[])
            RETURNING {SLOT_COLUMNS}
            "#
        )))
        .bind(appointment_id)
        .bind(Utc::now())
        .bind(slot_id)
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(slot)
    }

    async fn cancel_booking(
        &self,
        slot_id: Uuid,
        appointment_id: Uuid,
    ) -> Result<Option<TimeSlot>> {
        let released = sqlx::query_as::<_, TimeSlot>(&sql(&format!(
            r#"
            UPDATE time_slots
            SET
                booked_count = GREATEST(booked_count - 1, 0),
                appointment_ids = array_remove(appointment_ids, ?),
                is_available = NOT is_blocked AND GREATEST(booked_count - 1, 0) < max_patients,
                updated_at = ?
            WHERE id = ? AND appointment_ids @> ARRAY[?]::uuid[]
            RETURNING {SLOT_COLUMNS}
            "#
        )))
        .bind(appointment_id)
        .bind(Utc::now())
        .bind(slot_id)
        .bind(appointment_id)
        .fetch_optional(&self.pool)
        .await?;

        match released {
            Some(slot) => Ok(Some(slot)),
            None => self.find_by_id(slot_id).await,
        }
    }

    async fn set_block(&self, slot_id: Uuid, reason: Option<String>) -> Result<Option<TimeSlot>> {
        let slot = sqlx::query_as::<_, TimeSlot>(&sql(&format!(
            r#"
            UPDATE time_slots
            SET
                is_blocked = ?,
                block_reason = ?,
                is_available = NOT ? AND booked_count < max_patients,
                updated_at = ?
            WHERE id = ?
            RETURNING {SLOT_COLUMNS}
            "#
        )))
        .bind(reason.is_some())
        .bind(&reason)
        .bind(reason.is_some())
        .bind(Utc::now())
        .bind(slot_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(slot)
    }

    async fn block_range(
        &self,
        doctor_id: Uuid,
        dates: &DateSet,
        reason: &str,
        include_booked: bool,
    ) -> Result<Vec<BlockOutcome>> {
        let mut outcomes = Vec::with_capacity(dates.len());
        for date in dates {
            let blocked = sqlx::query(&sql(
                r#"
                UPDATE time_slots
                SET is_blocked = TRUE, block_reason = ?, is_available = FALSE, updated_at = ?
                WHERE doctor_id = ?
                    AND slot_date = ?
                    AND (? OR booked_count = 0)
                    AND NOT is_blocked
                "#,
            ))
            .bind(reason)
            .bind(Utc::now())
            .bind(doctor_id)
            .bind(date)
            .bind(include_booked)
            .execute(&self.pool)
            .await?
            .rows_affected();

            let skipped_booked = if include_booked {
                Vec::new()
            } else {
                sqlx::query_scalar::<_, Uuid>(&sql(
                    r#"
                    SELECT id
                    FROM time_slots
                    WHERE doctor_id = ? AND slot_date = ? AND booked_count > 0 AND NOT is_blocked
                    ORDER BY id
                    "#,
                ))
                .bind(doctor_id)
                .bind(date)
                .fetch_all(&self.pool)
                .await?
            };

            outcomes.push(BlockOutcome {
                date,
                blocked,
                skipped_booked,
            });
        }
        Ok(outcomes)
    }

    async fn unblock_range(
        &self,
        doctor_id: Uuid,
        dates: &DateSet,
        reason: &str,
    ) -> Result<Vec<DateOutcome>> {
        let mut outcomes = Vec::with_capacity(dates.len());
        for date in dates {
            let affected = sqlx::query(&sql(
                r#"
                UPDATE time_slots
                SET
                    is_blocked = FALSE,
                    block_reason = NULL,
                    is_available = booked_count < max_patients,
                    updated_at = ?
                WHERE doctor_id = ? AND slot_date = ? AND is_blocked AND block_reason = ?
                "#,
            ))
            .bind(Utc::now())
            .bind(doctor_id)
            .bind(date)
            .bind(reason)
            .execute(&self.pool)
            .await?
            .rows_affected();

            outcomes.push(DateOutcome { date, affected });
        }
        Ok(outcomes)
    }

    async fn release_blocks(
        &self,
        shift_id: Uuid,
        date: NaiveDate,
        owner: Uuid,
        reason: &str,
    ) -> Result<u64> {
        let affected = sqlx::query(&sql(
            r#"
            UPDATE time_slots
            SET
                is_blocked = FALSE,
                block_reason = NULL,
                is_available = booked_count < max_patients,
                updated_at = ?
            WHERE shift_id = ? AND slot_date = ? AND doctor_id = ?
                AND is_blocked AND block_reason = ?
            "#,
        ))
        .bind(Utc::now())
        .bind(shift_id)
        .bind(date)
        .bind(owner)
        .bind(reason)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }

    async fn reassign_range(
        &self,
        shift_id: Uuid,
        dates: &[NaiveDate],
        from: Uuid,
        to: Uuid,
    ) -> Result<Vec<DateOutcome>> {
        let mut outcomes = Vec::with_capacity(dates.len());
        for &date in dates {
            let affected = sqlx::query(&sql(
                r#"
                UPDATE time_slots
                SET doctor_id = ?, updated_at = ?
                WHERE shift_id = ? AND slot_date = ? AND doctor_id = ?
                "#,
            ))
            .bind(to)
            .bind(Utc::now())
            .bind(shift_id)
            .bind(date)
            .bind(from)
            .execute(&self.pool)
            .await?
            .rows_affected();

            outcomes.push(DateOutcome { date, affected });
        }
        Ok(outcomes)
    }

    async fn block_from_date(
        &self,
        shift_id: Uuid,
        from: NaiveDate,
        reason: &str,
    ) -> Result<u64> {
        let affected = sqlx::query(&sql(
            r#"
            UPDATE time_slots
            SET is_blocked = TRUE, block_reason = ?, is_available = FALSE, updated_at = ?
            WHERE shift_id = ? AND slot_date >= ?
            "#,
        ))
        .bind(reason)
        .bind(Utc::now())
        .bind(shift_id)
        .bind(from)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected)
    }
}
