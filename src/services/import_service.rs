// src/services/import_service.rs
//
// Reconciliador de importação: consome linhas já parseadas de uma planilha
// (mapa coluna -> valor) e cria apenas os leads cuja chave externa ainda não
// existe. A idempotência vem da unicidade de origin_id_importado; a
// proveniência (import_batch_id) permite desfazer o lote depois.

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::LeadRepository,
    middleware::policy::AccessPolicy,
    models::{
        auth::User,
        crm::{LeadStatus, NewImportedLead},
        import::ImportReport,
    },
};

/// Decisão tomada para uma linha antes de tocar no banco
#[derive(Debug, PartialEq)]
struct RowPlan {
    external_id: String,
    status: LeadStatus,
    name: String,
    phone: Option<String>,
    email: Option<String>,
}

fn value_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() { None } else { Some(text) }
}

/// Resolve a coluna do id externo: primeira chave cujo nome contém "id" e
/// não contém "status"; se nenhuma servir, a primeira coluna da linha.
fn resolve_external_id(row: &Map<String, Value>) -> Option<String> {
    let id_key = row.keys().find(|k| {
        let lower = k.to_lowercase();
        lower.contains("id") && !lower.contains("status")
    });

    match id_key {
        Some(key) => row.get(key).and_then(value_to_text),
        None => row.values().next().and_then(value_to_text),
    }
}

/// Resolve a coluna de etapa: match exato com "Etapa do lead" (cabeçalho da
/// planilha de origem), senão qualquer coluna com "etapa"/"stage" no nome.
fn resolve_stage(row: &Map<String, Value>) -> Option<String> {
    let exact = row
        .iter()
        .find(|(k, _)| k.trim() == "Etapa do lead")
        .map(|(_, v)| v);

    let value = exact.or_else(|| {
        row.iter()
            .find(|(k, _)| {
                let lower = k.to_lowercase();
                lower.contains("etapa") || lower.contains("stage")
            })
            .map(|(_, v)| v)
    })?;

    value_to_text(value)
}

/// Tabela fixa etapa -> status. Qualquer etapa desconhecida vira 'new'.
fn map_stage(raw_stage: &str) -> LeadStatus {
    let s = raw_stage.trim().to_lowercase();

    if s.contains("novo") || s.contains("new") || s.contains("entrada") {
        LeadStatus::New
    } else if s.contains("conectando")
        || s.contains("ligação")
        || s.contains("tentativa")
        || s.contains("conexão")
    {
        LeadStatus::Connecting
    } else if s.contains("agenda") || s.contains("entrevista") {
        LeadStatus::Scheduled
    } else if s.contains("negociação") {
        LeadStatus::Negotiation
    } else if s.contains("bolo") || s.contains("no-show") {
        LeadStatus::NoShow
    } else if s.contains("won") || s.contains("matriculado") {
        LeadStatus::Won
    } else if s.contains("closed") || s.contains("perdido") || s.contains("encerrado") {
        LeadStatus::Closed
    } else {
        LeadStatus::New
    }
}

fn resolve_name(row: &Map<String, Value>) -> Option<String> {
    row.iter()
        .find(|(k, _)| {
            let lower = k.to_lowercase();
            (lower.contains("lead") && lower.contains("título")) || lower == "nome"
        })
        .and_then(|(_, v)| value_to_text(v))
}

fn resolve_phone(row: &Map<String, Value>) -> Option<String> {
    row.iter()
        .find(|(k, _)| {
            let lower = k.to_lowercase();
            lower.contains("contato") || lower.contains("fone")
        })
        .and_then(|(_, v)| value_to_text(v))
}

fn resolve_email(row: &Map<String, Value>) -> Option<String> {
    row.iter()
        .find(|(k, _)| k.to_lowercase().contains("mail"))
        .and_then(|(_, v)| value_to_text(v))
}

/// Monta o plano de uma linha. `None` = linha malformada (sem id externo
/// resolvível): contada como inválida, nunca fatal para o lote.
fn plan_row(row: &Map<String, Value>) -> Option<RowPlan> {
    let external_id = resolve_external_id(row)?;
    let status = resolve_stage(row)
        .map(|stage| map_stage(&stage))
        .unwrap_or(LeadStatus::New);

    Some(RowPlan {
        external_id,
        status,
        name: resolve_name(row).unwrap_or_else(|| "Lead Importado".to_string()),
        phone: resolve_phone(row),
        email: resolve_email(row),
    })
}

/// Define a unidade destino do lote. Para cargos restritos a unidade do
/// ator sempre vence; para globais vale a pedida (ou a própria, se houver).
fn resolve_batch_unit(
    policy: &AccessPolicy,
    actor: &User,
    requested_unit: Option<Uuid>,
) -> Result<Uuid, AppError> {
    let unit = if policy.is_global_role(actor.role_id) {
        requested_unit.or(actor.unit_id)
    } else {
        actor.unit_id
    };

    unit.ok_or_else(|| {
        AppError::BadRequest("Unidade destino da importação não definida.".to_string())
    })
}

#[derive(Clone)]
pub struct ImportService {
    lead_repo: LeadRepository,
    policy: AccessPolicy,
}

impl ImportService {
    pub fn new(lead_repo: LeadRepository, policy: AccessPolicy) -> Self {
        Self { lead_repo, policy }
    }

    pub fn resolve_batch_unit(
        &self,
        actor: &User,
        requested_unit: Option<Uuid>,
    ) -> Result<Uuid, AppError> {
        resolve_batch_unit(&self.policy, actor, requested_unit)
    }

    /// Executa o lote. Cada linha é independente: duplicata vira "skipped",
    /// linha malformada vira "invalid", e só erro de banco inesperado aborta.
    /// Importação nunca atualiza campos de negócio de leads existentes.
    pub async fn import_batch(
        &self,
        rows: &[Map<String, Value>],
        import_id: &str,
        unit_id: Uuid,
    ) -> Result<ImportReport, AppError> {
        if import_id.trim().is_empty() {
            return Err(AppError::BadRequest("Import ID obrigatório.".to_string()));
        }

        let mut report = ImportReport::default();

        for row in rows {
            let Some(plan) = plan_row(row) else {
                report.invalid += 1;
                continue;
            };

            if let Some(existing) = self.lead_repo.find_by_origin_id(&plan.external_id).await? {
                // Duplicata: nunca cria, nunca corrige. Divergência de status
                // é só diagnóstico.
                report.skipped += 1;
                if existing.status != plan.status {
                    report.mismatched += 1;
                    tracing::warn!(
                        origin_id = %plan.external_id,
                        esperado = ?plan.status,
                        encontrado = ?existing.status,
                        ja_terminal = existing.status.is_terminal(),
                        "Lead importado com status divergente da planilha"
                    );
                }
                continue;
            }

            let new_lead = NewImportedLead {
                name: plan.name,
                phone: plan.phone,
                email: plan.email,
                status: plan.status,
                origin_id_importado: plan.external_id,
                unit_id,
                import_batch_id: import_id.to_string(),
                metadata: json!({ "createdByImportId": import_id }),
            };

            match self.lead_repo.insert_imported(&new_lead).await {
                Ok(lead) => {
                    report.created += 1;
                    report.created_ids.push(lead.id);
                }
                // Perdemos a corrida para um importador concorrente com a
                // mesma chave externa: conta como duplicata, o lote segue
                Err(AppError::Conflict(_)) => report.skipped += 1,
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            import_id,
            created = report.created,
            skipped = report.skipped,
            mismatched = report.mismatched,
            invalid = report.invalid,
            "Importação concluída"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::policy::{ROLE_DIRECTOR, ROLE_MASTER};
    use chrono::Utc;

    fn linha(json: Value) -> Map<String, Value> {
        json.as_object().cloned().expect("fixture deve ser objeto")
    }

    #[test]
    fn id_externo_prefere_coluna_com_id_sem_status() {
        let row = linha(json!({
            "Status ID": "nao-e-este",
            "ID": "A1",
            "Etapa do lead": "Conexão"
        }));
        assert_eq!(resolve_external_id(&row), Some("A1".to_string()));
    }

    #[test]
    fn id_externo_cai_na_primeira_coluna() {
        let row = linha(json!({ "Código": "X9", "Nome": "Maria" }));
        assert_eq!(resolve_external_id(&row), Some("X9".to_string()));
    }

    #[test]
    fn id_externo_numerico_vira_texto() {
        let row = linha(json!({ "ID": 42 }));
        assert_eq!(resolve_external_id(&row), Some("42".to_string()));
    }

    #[test]
    fn id_externo_em_branco_invalida_a_linha() {
        let row = linha(json!({ "ID": "   ", "Etapa do lead": "Novo" }));
        assert_eq!(plan_row(&row), None);
        assert_eq!(plan_row(&Map::new()), None);
    }

    #[test]
    fn tabela_de_etapas() {
        assert_eq!(map_stage("Novo Lead"), LeadStatus::New);
        assert_eq!(map_stage("Entrada"), LeadStatus::New);
        assert_eq!(map_stage("Conexão"), LeadStatus::Connecting);
        assert_eq!(map_stage("3ª tentativa"), LeadStatus::Connecting);
        assert_eq!(map_stage("Entrevista agendada"), LeadStatus::Scheduled);
        assert_eq!(map_stage("Negociação"), LeadStatus::Negotiation);
        assert_eq!(map_stage("Bolo"), LeadStatus::NoShow);
        assert_eq!(map_stage("Matriculado"), LeadStatus::Won);
        assert_eq!(map_stage("Perdido"), LeadStatus::Closed);
        // Etapa desconhecida cai em 'new'
        assert_eq!(map_stage("qualquer coisa"), LeadStatus::New);
    }

    #[test]
    fn etapa_com_espacos_e_normalizada() {
        let row = linha(json!({ "ID": "A1", "Etapa do lead": "  Conexão  " }));
        let plan = plan_row(&row).unwrap();
        assert_eq!(plan.status, LeadStatus::Connecting);
    }

    #[test]
    fn linha_sem_etapa_vira_new() {
        let row = linha(json!({ "ID": "A1" }));
        let plan = plan_row(&row).unwrap();
        assert_eq!(plan.status, LeadStatus::New);
    }

    #[test]
    fn colunas_de_contato() {
        let row = linha(json!({
            "ID": "A1",
            "Lead título": "Maria da Silva",
            "Contato do lead": "61999990000",
            "E-mail": "maria@email.com"
        }));
        let plan = plan_row(&row).unwrap();
        assert_eq!(plan.name, "Maria da Silva");
        assert_eq!(plan.phone, Some("61999990000".to_string()));
        assert_eq!(plan.email, Some("maria@email.com".to_string()));
    }

    #[test]
    fn nome_ausente_recebe_padrao() {
        let row = linha(json!({ "ID": "A1" }));
        let plan = plan_row(&row).unwrap();
        assert_eq!(plan.name, "Lead Importado");
        assert_eq!(plan.phone, None);
    }

    // --- resolução da unidade destino ---
    // Lógica pura, como plan_row: nenhum teste daqui precisa de pool

    fn usuario(role_id: i32, unit_id: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Teste".to_string(),
            email: "teste@voxflow.com".to_string(),
            hashed_password: "irrelevante".to_string(),
            role_id,
            unit_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unidade_do_ator_vence_para_cargo_restrito() {
        let propria = Uuid::new_v4();
        let pedida = Uuid::new_v4();
        let consultor = usuario(41, Some(propria));

        assert_eq!(
            resolve_batch_unit(&AccessPolicy, &consultor, Some(pedida)).unwrap(),
            propria
        );
    }

    #[test]
    fn global_usa_a_unidade_pedida() {
        let pedida = Uuid::new_v4();
        let master = usuario(ROLE_MASTER, None);

        assert_eq!(
            resolve_batch_unit(&AccessPolicy, &master, Some(pedida)).unwrap(),
            pedida
        );
    }

    #[test]
    fn global_sem_pedido_usa_a_propria_unidade() {
        let propria = Uuid::new_v4();
        let diretor = usuario(ROLE_DIRECTOR, Some(propria));

        assert_eq!(
            resolve_batch_unit(&AccessPolicy, &diretor, None).unwrap(),
            propria
        );
    }

    #[test]
    fn lote_sem_unidade_resolvivel_e_rejeitado() {
        let master = usuario(ROLE_MASTER, None);
        let sem_unidade = usuario(41, None);

        assert!(matches!(
            resolve_batch_unit(&AccessPolicy, &master, None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_batch_unit(&AccessPolicy, &sem_unidade, Some(Uuid::new_v4())),
            Err(AppError::BadRequest(_))
        ));
    }
}
