// src/db/history_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::crm::{CadenceLog, ContactAttempt},
};

// Histórico de contato do lead: tentativas manuais e passos de cadência.
// Linhas puras de auditoria, sem filhos próprios.
#[derive(Clone)]
pub struct HistoryRepository {
    pool: PgPool,
}

impl HistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_attempts_by_lead(
        &self,
        lead_id: Uuid,
    ) -> Result<Vec<ContactAttempt>, AppError> {
        let attempts = sqlx::query_as::<_, ContactAttempt>(
            "SELECT * FROM contact_attempts WHERE lead_id = $1 ORDER BY attempted_at ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(attempts)
    }

    pub async fn list_logs_by_lead(&self, lead_id: Uuid) -> Result<Vec<CadenceLog>, AppError> {
        let logs = sqlx::query_as::<_, CadenceLog>(
            "SELECT * FROM cadence_logs WHERE lead_id = $1 ORDER BY logged_at ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }

    pub async fn delete_attempts_by_lead_ids<'e, E>(
        &self,
        executor: E,
        lead_ids: &[Uuid],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM contact_attempts WHERE lead_id = ANY($1)")
            .bind(lead_ids)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_logs_by_lead_ids<'e, E>(
        &self,
        executor: E,
        lead_ids: &[Uuid],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM cadence_logs WHERE lead_id = ANY($1)")
            .bind(lead_ids)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
