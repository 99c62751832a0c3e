// src/handlers/crm.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        crm::{Lead, LeadHistory},
        import::{BulkDeleteResponse, ImportReport, UndoImportResponse},
    },
};

// =============================================================================
//  ÁREA 1: CONSULTA DE LEADS
// =============================================================================

// GET /api/crm/leads
#[utoipa::path(
    get,
    path = "/api/crm/leads",
    tag = "CRM",
    responses(
        (status = 200, description = "Leads visíveis no escopo do ator", body = Vec<Lead>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state.lead_service.list_leads(&user).await?;

    Ok((StatusCode::OK, Json(leads)))
}

// GET /api/crm/leads/{id}/history
#[utoipa::path(
    get,
    path = "/api/crm/leads/{id}/history",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead com tarefas, tentativas e cadência", body = LeadHistory),
        (status = 404, description = "Lead inexistente ou fora do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead_history(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let history = app_state.lead_service.lead_history(id, &user).await?;

    Ok((StatusCode::OK, Json(history)))
}

// =============================================================================
//  ÁREA 2: CICLO DE VIDA EM MASSA
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeletePayload {
    #[validate(length(min = 1, message = "Nenhum lead selecionado."))]
    #[schema(example = json!(["550e8400-e29b-41d4-a716-446655440000"]))]
    pub lead_ids: Vec<Uuid>,
}

// POST /api/crm/leads/bulk-delete
#[utoipa::path(
    post,
    path = "/api/crm/leads/bulk-delete",
    tag = "CRM",
    request_body = BulkDeletePayload,
    responses(
        (status = 200, description = "Cascata executada", body = BulkDeleteResponse),
        (status = 400, description = "Nenhum lead selecionado")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_delete(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<BulkDeletePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let details = app_state
        .lead_service
        .bulk_delete(&app_state.db_pool, &payload.lead_ids, &user)
        .await?;

    Ok((
        StatusCode::OK,
        Json(BulkDeleteResponse {
            success: true,
            message: format!("{} leads excluídos com sucesso.", details.leads),
            details,
        }),
    ))
}

// =============================================================================
//  ÁREA 3: IMPORTAÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportBulkPayload {
    // Linhas da planilha já parseadas pelo colaborador externo
    // (coluna -> valor, na ordem original das colunas)
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Map<String, Value>>,

    #[validate(length(min = 1, message = "Import ID obrigatório."))]
    #[schema(example = "batch42")]
    pub import_id: String,

    // Unidade destino; para cargos restritos a unidade do ator prevalece
    pub unit_id: Option<Uuid>,
}

// POST /api/crm/leads/import/bulk
#[utoipa::path(
    post,
    path = "/api/crm/leads/import/bulk",
    tag = "CRM",
    request_body = ImportBulkPayload,
    responses(
        (status = 201, description = "Lote processado", body = ImportReport),
        (status = 400, description = "Lote sem importId ou sem unidade resolvível")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_bulk(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ImportBulkPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let unit_id = app_state
        .import_service
        .resolve_batch_unit(&user, payload.unit_id)?;

    let report = app_state
        .import_service
        .import_batch(&payload.rows, &payload.import_id, unit_id)
        .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

// POST /api/crm/leads/import/undo/{import_id}
#[utoipa::path(
    post,
    path = "/api/crm/leads/import/undo/{import_id}",
    tag = "CRM",
    params(("import_id" = String, Path, description = "Identificador do lote a desfazer")),
    responses(
        (status = 200, description = "Lote desfeito", body = UndoImportResponse),
        (status = 400, description = "Import ID ausente")
    ),
    security(("api_jwt" = []))
)]
pub async fn undo_import(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(import_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = app_state
        .lead_service
        .undo_import(&app_state.db_pool, &import_id, &user)
        .await?;

    Ok((StatusCode::OK, Json(UndoImportResponse { success: true, deleted })))
}
