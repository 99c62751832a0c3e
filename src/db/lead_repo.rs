// src/db/lead_repo.rs

use serde_json::Value;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::crm::{Lead, NewImportedLead},
};

// Par (lead, unidade) usado para aplicar a política de acesso sobre um
// conjunto de ids antes de deletar
#[derive(Debug, sqlx::FromRow)]
pub struct LeadUnit {
    pub id: Uuid,
    pub unit_id: Uuid,
}

// Linha mínima da varredura legada de proveniência (leads importados antes
// da coluna import_batch_id existir)
#[derive(Debug, sqlx::FromRow)]
pub struct LegacyImportRow {
    pub id: Uuid,
    pub unit_id: Uuid,
    pub metadata: Option<Value>,
}

#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Busca um lead pela chave de proveniência externa.
    /// Inclui leads na lixeira (soft-delete): a unicidade de
    /// origin_id_importado vale para todos, então a deduplicação também.
    pub async fn find_by_origin_id(&self, origin_id: &str) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE origin_id_importado = $1",
        )
        .bind(origin_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lead)
    }

    /// Cria um lead vindo da importação, carimbando a proveniência dos dois
    /// jeitos: coluna tipada (indexada, fonte da verdade) e
    /// metadata.createdByImportId (compatibilidade com o front antigo).
    pub async fn insert_imported(&self, new: &NewImportedLead) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (
                name, phone, email, status,
                origin_id_importado, unit_id, metadata, import_batch_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(new.status)
        .bind(&new.origin_id_importado)
        .bind(new.unit_id)
        .bind(&new.metadata)
        .bind(&new.import_batch_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Corrida entre importadores: o perdedor vê a violação de
            // unicidade e o serviço converte em "skipped"
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict(format!(
                        "origin_id_importado '{}' já existe.",
                        new.origin_id_importado
                    ));
                }
            }
            e.into()
        })?;

        Ok(lead)
    }

    /// Lista os leads ativos (fora da lixeira) visíveis no escopo dado.
    /// `unit_scope = None` significa visão global.
    pub async fn list_visible(&self, unit_scope: Option<Uuid>) -> Result<Vec<Lead>, AppError> {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE deleted_at IS NULL
              AND ($1::uuid IS NULL OR unit_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(unit_scope)
        .fetch_all(&self.pool)
        .await?;

        Ok(leads)
    }

    /// Resolve a unidade de cada lead do conjunto, para a política de acesso
    pub async fn find_units_for_ids<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
    ) -> Result<Vec<LeadUnit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, LeadUnit>(
            "SELECT id, unit_id FROM leads WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Membros de um lote de importação via coluna indexada.
    /// `unit_scope = None` significa visão global.
    pub async fn find_ids_by_import_batch<'e, E>(
        &self,
        executor: E,
        import_id: &str,
        unit_scope: Option<Uuid>,
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM leads
            WHERE import_batch_id = $1
              AND ($2::uuid IS NULL OR unit_id = $2)
            "#,
        )
        .bind(import_id)
        .bind(unit_scope)
        .fetch_all(executor)
        .await?;

        Ok(ids)
    }

    /// Leads importados antes da coluna tipada existir: a proveniência só
    /// está dentro do metadata e precisa ser resolvida em runtime.
    pub async fn find_legacy_import_rows<'e, E>(
        &self,
        executor: E,
    ) -> Result<Vec<LegacyImportRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, LegacyImportRow>(
            r#"
            SELECT id, unit_id, metadata FROM leads
            WHERE import_batch_id IS NULL AND metadata IS NOT NULL
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Remoção definitiva (hard delete). Ignora o marcador de soft-delete.
    pub async fn delete_by_ids<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM leads WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
