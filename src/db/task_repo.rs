// src/db/task_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::crm::Task};

#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_lead(&self, lead_id: Uuid) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE lead_id = $1 ORDER BY due_date ASC NULLS LAST",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tasks)
    }

    /// Remove as tarefas de um conjunto de leads.
    /// O banco não tem cascade: este é o primeiro passo da cascata manual.
    pub async fn delete_by_lead_ids<'e, E>(
        &self,
        executor: E,
        lead_ids: &[Uuid],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE lead_id = ANY($1)")
            .bind(lead_ids)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
