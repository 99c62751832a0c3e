// src/models/crm.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Status do lead no funil, gravado como TEXT no banco
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Connecting,
    Scheduled,
    NoShow,
    Negotiation,
    Won,
    Closed,
    Archived,
    Lost,
}

impl LeadStatus {
    /// Estados terminais: depois deles não se espera mais nenhuma ação pendente.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LeadStatus::Won | LeadStatus::Closed | LeadStatus::Archived | LeadStatus::Lost
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

// --- LEAD (O Pai) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,

    pub status: LeadStatus,

    // Chave de proveniência externa (planilha de origem). Única globalmente.
    pub origin_id_importado: Option<String>,

    pub unit_id: Uuid,

    // Documento livre. Leads importados antigos carregam createdByImportId
    // aqui dentro; os novos usam a coluna tipada abaixo.
    pub metadata: Option<Value>,
    pub import_batch_id: Option<String>,

    // Marcador de soft-delete do fluxo normal. As operações em massa
    // ignoram este campo e removem direto.
    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Dados mínimos para a criação de um lead vindo da importação
#[derive(Debug, Clone)]
pub struct NewImportedLead {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: LeadStatus,
    pub origin_id_importado: String,
    pub unit_id: Uuid,
    pub import_batch_id: String,
    pub metadata: Value,
}

// --- FILHOS (histórico do lead) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactAttempt {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub attempt_number: i32,
    pub result: String,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CadenceLog {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub cadence_type: String,
    pub step_name: String,
    pub logged_at: DateTime<Utc>,
}

// Visão completa de um lead com seu histórico de filhos
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadHistory {
    pub lead: Lead,
    pub tasks: Vec<Task>,
    pub attempts: Vec<ContactAttempt>,
    pub logs: Vec<CadenceLog>,
}

// --- PROVENIÊNCIA ---

/// Extrai o `createdByImportId` de um metadata legado.
///
/// O campo pode vir como objeto JSON ou como string contendo JSON
/// serializado (herança do armazenamento antigo em TEXT). Qualquer forma
/// que não parseie é tratada como "sem proveniência", nunca como erro.
pub fn batch_id_from_metadata(metadata: &Value) -> Option<String> {
    let obj = match metadata {
        Value::Object(map) => Some(map.clone()),
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|v| v.as_object().cloned()),
        _ => None,
    }?;

    obj.get("createdByImportId")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metadata_em_forma_de_objeto() {
        let meta = json!({ "createdByImportId": "batch42", "outra": 1 });
        assert_eq!(batch_id_from_metadata(&meta), Some("batch42".to_string()));
    }

    #[test]
    fn metadata_em_forma_de_string_serializada() {
        let meta = json!("{\"createdByImportId\":\"batch42\"}");
        assert_eq!(batch_id_from_metadata(&meta), Some("batch42".to_string()));
    }

    #[test]
    fn metadata_sem_proveniencia() {
        assert_eq!(batch_id_from_metadata(&json!({ "origem": "manual" })), None);
        assert_eq!(batch_id_from_metadata(&json!(null)), None);
        assert_eq!(batch_id_from_metadata(&json!(42)), None);
    }

    #[test]
    fn metadata_string_invalida_e_ignorada() {
        // String que não é JSON válido: excluída, não é erro
        assert_eq!(batch_id_from_metadata(&json!("{{{nada a ver")), None);
        // JSON válido mas que não é objeto
        assert_eq!(batch_id_from_metadata(&json!("[1,2,3]")), None);
    }

    #[test]
    fn status_terminais() {
        assert!(LeadStatus::Won.is_terminal());
        assert!(LeadStatus::Closed.is_terminal());
        assert!(LeadStatus::Archived.is_terminal());
        assert!(LeadStatus::Lost.is_terminal());
        assert!(!LeadStatus::New.is_terminal());
        assert!(!LeadStatus::Negotiation.is_terminal());
    }
}
