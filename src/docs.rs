// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- CRM ---
        handlers::crm::list_leads,
        handlers::crm::get_lead_history,
        handlers::crm::bulk_delete,
        handlers::crm::import_bulk,
        handlers::crm::undo_import,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- CRM ---
            models::crm::LeadStatus,
            models::crm::TaskStatus,
            models::crm::Lead,
            models::crm::Task,
            models::crm::ContactAttempt,
            models::crm::CadenceLog,
            models::crm::LeadHistory,

            // --- Importação / massa ---
            models::import::ImportReport,
            models::import::BulkDeleteSummary,
            models::import::BulkDeleteResponse,
            models::import::UndoImportResponse,

            // --- Payloads ---
            handlers::crm::BulkDeletePayload,
            handlers::crm::ImportBulkPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "CRM", description = "Funil de Leads, Importação e Operações em Massa")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
