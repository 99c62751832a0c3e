// src/models/import.rs

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Relatório de uma rodada de importação.
///
/// `skipped` inclui tanto duplicatas encontradas no banco quanto inserções
/// perdidas para um importador concorrente; `mismatched` é um subconjunto
/// diagnóstico de `skipped` (lead já existe mas com status diferente do
/// esperado — reportado, nunca corrigido).
#[derive(Debug, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub created: u32,
    pub skipped: u32,
    pub mismatched: u32,
    pub invalid: u32,
    pub created_ids: Vec<Uuid>,
}

// Contagem por tabela do bulk delete, na ordem em que a cascata roda
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct BulkDeleteSummary {
    pub leads: u64,
    pub tasks: u64,
    pub attempts: u64,
    pub logs: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkDeleteResponse {
    pub success: bool,
    pub message: String,
    pub details: BulkDeleteSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UndoImportResponse {
    pub success: bool,
    pub deleted: u64,
}
