use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::SwapRepository;
use crate::database::{
    models::{DateSet, PartnerDecision, ShiftSwap, ShiftSwapInput, SwapStatus},
    types::{ShiftSwapRow, date_set_columns},
    utils::sql,
};

const SWAP_COLUMNS: &str = "id, requester_id, partner_id, original_shift_id, requested_shift_id, \
    swap_type, swap_date, start_date, end_date, partner_decision, status, reason, \
    partner_responded_at, decided_by, decision_comment, decided_at, created_at, updated_at";

#[derive(Clone)]
pub struct PgSwapRepository {
    pool: PgPool,
}

impl PgSwapRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SwapRepository for PgSwapRepository {
    async fn create(
        &self,
        requester_id: Uuid,
        input: &ShiftSwapInput,
        dates: &DateSet,
    ) -> Result<ShiftSwap> {
        let now = Utc::now();
        let (swap_date, start_date, end_date) = date_set_columns(dates);
        let row = sqlx::query_as::<_, ShiftSwapRow>(&sql(&format!(
            r#"
            INSERT INTO
                shift_swaps (
                    id,
                    requester_id,
                    partner_id,
                    original_shift_id,
                    requested_shift_id,
                    swap_type,
                    swap_date,
                    start_date,
                    end_date,
                    partner_decision,
                    status,
                    reason,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {SWAP_COLUMNS}
            "#
        )))
        .bind(Uuid::new_v4())
        .bind(requester_id)
        .bind(input.partner_id)
        .bind(input.original_shift_id)
        .bind(input.effective_requested_shift())
        .bind(input.swap_type)
        .bind(swap_date)
        .bind(start_date)
        .bind(end_date)
        .bind(PartnerDecision::Pending)
        .bind(SwapStatus::Pending)
        .bind(&input.reason)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ShiftSwap>> {
        let row = sqlx::query_as::<_, ShiftSwapRow>(&sql(&format!(
            "SELECT {SWAP_COLUMNS} FROM shift_swaps WHERE id = ?"
        )))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn list(
        &self,
        staff_id: Option<Uuid>,
        status: Option<SwapStatus>,
    ) -> Result<Vec<ShiftSwap>> {
        let rows = sqlx::query_as::<_, ShiftSwapRow>(&sql(&format!(
            r#"
            SELECT {SWAP_COLUMNS}
            FROM shift_swaps
            WHERE (?::uuid IS NULL OR requester_id = ? OR partner_id = ?)
                AND (?::text IS NULL OR status = ?)
            ORDER BY created_at DESC
            "#
        )))
        .bind(staff_id)
        .bind(staff_id)
        .bind(staff_id)
        .bind(status)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_state(
        &self,
        swap: &ShiftSwap,
        expected_partner: PartnerDecision,
        expected_status: SwapStatus,
    ) -> Result<Option<ShiftSwap>> {
        let row = sqlx::query_as::<_, ShiftSwapRow>(&sql(&format!(
            r#"
            UPDATE shift_swaps
            SET
                partner_decision = ?,
                status = ?,
                partner_responded_at = ?,
                decided_by = ?,
                decision_comment = ?,
                decided_at = ?,
                updated_at = ?
            WHERE id = ? AND partner_decision = ? AND status = ?
            RETURNING {SWAP_COLUMNS}
            "#
        )))
        .bind(swap.partner_decision)
        .bind(swap.status)
        .bind(swap.partner_responded_at)
        .bind(swap.decided_by)
        .bind(&swap.decision_comment)
        .bind(swap.decided_at)
        .bind(swap.updated_at)
        .bind(swap.id)
        .bind(expected_partner)
        .bind(expected_status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}
