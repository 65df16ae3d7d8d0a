use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::StaffDirectory;
use crate::database::{
    models::{Role, StaffProfile},
    utils::sql,
};

/// Read-mostly view of the clinic's staff table. Profiles are owned by the
/// external directory and mirrored here through `upsert`.
#[derive(Clone)]
pub struct PgStaffDirectory {
    pool: PgPool,
}

impl PgStaffDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffDirectory for PgStaffDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StaffProfile>> {
        let profile = sqlx::query_as::<_, StaffProfile>(&sql(
            "SELECT id, name, role, department, specialization FROM staff WHERE id = ?",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn list_admins(&self) -> Result<Vec<StaffProfile>> {
        let admins = sqlx::query_as::<_, StaffProfile>(&sql(
            r#"
            SELECT id, name, role, department, specialization
            FROM staff
            WHERE role = ?
            ORDER BY name
            "#,
        ))
        .bind(Role::Admin)
        .fetch_all(&self.pool)
        .await?;

        Ok(admins)
    }

    async fn upsert(&self, profile: &StaffProfile) -> Result<StaffProfile> {
        let stored = sqlx::query_as::<_, StaffProfile>(&sql(
            r#"
            INSERT INTO staff (id, name, role, department, specialization)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE
            SET
                name = EXCLUDED.name,
                role = EXCLUDED.role,
                department = EXCLUDED.department,
                specialization = EXCLUDED.specialization
            RETURNING id, name, role, department, specialization
            "#,
        ))
        .bind(profile.id)
        .bind(&profile.name)
        .bind(profile.role)
        .bind(&profile.department)
        .bind(&profile.specialization)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }
}
