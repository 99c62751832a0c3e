// src/services/lead_service.rs
//
// Ciclo de vida em massa dos leads: cascata de remoção definitiva
// (filhos -> pai, tudo em uma transação) e desfazer de um lote de
// importação reconstruído pela proveniência.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{lead_repo::LegacyImportRow, HistoryRepository, LeadRepository, TaskRepository},
    middleware::policy::{AccessPolicy, UnitScope},
    models::{
        auth::User,
        crm::{batch_id_from_metadata, Lead, LeadHistory},
        import::BulkDeleteSummary,
    },
};

/// Valida a seleção antes de qualquer toque no banco
fn ensure_leads_selected(lead_ids: &[Uuid]) -> Result<(), AppError> {
    if lead_ids.is_empty() {
        return Err(AppError::BadRequest("Nenhum lead selecionado.".to_string()));
    }
    Ok(())
}

fn ensure_import_id(import_id: &str) -> Result<(), AppError> {
    if import_id.trim().is_empty() {
        return Err(AppError::BadRequest("Import ID obrigatório.".to_string()));
    }
    Ok(())
}

/// Filtra as linhas legadas: proveniência dentro do metadata + política de
/// acesso. Metadata que não parseia é excluído, nunca derruba a varredura.
/// Une o resultado indexado com o do fallback legado. Um lote pré-migração
/// pode ter metade de cada lado: linhas com metadata-objeto ganharam a
/// coluna tipada no backfill, linhas com metadata-string não.
fn merge_batch_members(indexed: Vec<Uuid>, legacy: Vec<Uuid>) -> Vec<Uuid> {
    let mut ids = indexed;
    for id in legacy {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

fn legacy_batch_members(
    rows: &[LegacyImportRow],
    import_id: &str,
    actor: &User,
    policy: &AccessPolicy,
) -> Vec<Uuid> {
    rows.iter()
        .filter(|row| policy.can_access_unit(actor, row.unit_id))
        .filter(|row| {
            row.metadata
                .as_ref()
                .and_then(batch_id_from_metadata)
                .is_some_and(|batch| batch == import_id)
        })
        .map(|row| row.id)
        .collect()
}

#[derive(Clone)]
pub struct LeadService {
    lead_repo: LeadRepository,
    task_repo: TaskRepository,
    history_repo: HistoryRepository,
    policy: AccessPolicy,
}

impl LeadService {
    pub fn new(
        lead_repo: LeadRepository,
        task_repo: TaskRepository,
        history_repo: HistoryRepository,
        policy: AccessPolicy,
    ) -> Self {
        Self { lead_repo, task_repo, history_repo, policy }
    }

    pub async fn list_leads(&self, actor: &User) -> Result<Vec<Lead>, AppError> {
        match self.policy.unit_scope(actor) {
            UnitScope::Global => self.lead_repo.list_visible(None).await,
            UnitScope::Unit(unit) => self.lead_repo.list_visible(Some(unit)).await,
            UnitScope::Nothing => Ok(Vec::new()),
        }
    }

    /// Lead + filhos, para a tela de detalhe.
    /// Fora do escopo do ator responde como inexistente.
    pub async fn lead_history(&self, lead_id: Uuid, actor: &User) -> Result<LeadHistory, AppError> {
        let lead = self
            .lead_repo
            .find_by_id(lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Lead não encontrado.".to_string()))?;

        if !self.policy.can_access_unit(actor, lead.unit_id) {
            return Err(AppError::NotFound("Lead não encontrado.".to_string()));
        }

        let tasks = self.task_repo.list_by_lead(lead.id).await?;
        let attempts = self.history_repo.list_attempts_by_lead(lead.id).await?;
        let logs = self.history_repo.list_logs_by_lead(lead.id).await?;

        Ok(LeadHistory { lead, tasks, attempts, logs })
    }

    /// Remove um conjunto de leads e todos os dependentes.
    ///
    /// A ordem é obrigatória (o banco não tem cascade): Tasks ->
    /// ContactAttempts -> CadenceLogs -> Leads. Os quatro deletes rodam na
    /// mesma transação: falha em qualquer passo desfaz tudo.
    pub async fn bulk_delete(
        &self,
        pool: &PgPool,
        lead_ids: &[Uuid],
        actor: &User,
    ) -> Result<BulkDeleteSummary, AppError> {
        ensure_leads_selected(lead_ids)?;

        let mut tx = pool.begin().await?;

        // Restringe o conjunto ao escopo do ator. Ids fora do escopo são
        // descartados em silêncio (efeito zero), não viram erro.
        let found = self.lead_repo.find_units_for_ids(&mut *tx, lead_ids).await?;
        let allowed: Vec<Uuid> = found
            .iter()
            .filter(|row| self.policy.can_access_unit(actor, row.unit_id))
            .map(|row| row.id)
            .collect();

        if allowed.is_empty() {
            // Nada a fazer: a transação cai no rollback ao sair do escopo
            return Ok(BulkDeleteSummary::default());
        }

        let tasks = self.task_repo.delete_by_lead_ids(&mut *tx, &allowed).await?;
        let attempts = self
            .history_repo
            .delete_attempts_by_lead_ids(&mut *tx, &allowed)
            .await?;
        let logs = self
            .history_repo
            .delete_logs_by_lead_ids(&mut *tx, &allowed)
            .await?;
        let leads = self.lead_repo.delete_by_ids(&mut *tx, &allowed).await?;

        tx.commit().await?;

        tracing::info!(leads, tasks, attempts, logs, "Exclusão em massa concluída");

        Ok(BulkDeleteSummary { leads, tasks, attempts, logs })
    }

    /// Desfaz um lote de importação: remove as tarefas e os leads criados
    /// sob o importId, reconstruindo o conjunto pela proveniência.
    ///
    /// ContactAttempts e CadenceLogs não são tocados: leads recém-importados
    /// ainda não têm histórico de contato. Se algum dia cadência rodar antes
    /// do undo, sobrarão órfãos (ver DESIGN.md).
    pub async fn undo_import(
        &self,
        pool: &PgPool,
        import_id: &str,
        actor: &User,
    ) -> Result<u64, AppError> {
        ensure_import_id(import_id)?;

        let scope = match self.policy.unit_scope(actor) {
            UnitScope::Global => None,
            UnitScope::Unit(unit) => Some(unit),
            UnitScope::Nothing => return Ok(0),
        };

        let mut tx = pool.begin().await?;

        // Caminho principal: coluna tipada e indexada
        let indexed = self
            .lead_repo
            .find_ids_by_import_batch(&mut *tx, import_id, scope)
            .await?;

        // Fallback legado: leads sem a coluna preenchida, com a proveniência
        // só dentro do metadata. Sempre unido ao resultado indexado, porque
        // os dois caminhos podem cobrir partes diferentes do mesmo lote.
        let legacy_rows = self.lead_repo.find_legacy_import_rows(&mut *tx).await?;
        let legacy = legacy_batch_members(&legacy_rows, import_id, actor, &self.policy);
        let ids = merge_batch_members(indexed, legacy);

        if ids.is_empty() {
            return Ok(0);
        }

        self.task_repo.delete_by_lead_ids(&mut *tx, &ids).await?;
        // rows_affected em vez de ids.len(): um lead que sumiu entre a
        // varredura e o delete conta como efeito zero, não como erro
        let deleted = self.lead_repo.delete_by_ids(&mut *tx, &ids).await?;

        tx.commit().await?;

        tracing::info!(import_id, deleted, "Importação desfeita");

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

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
    fn selecao_vazia_e_rejeitada_antes_do_banco() {
        assert!(matches!(
            ensure_leads_selected(&[]),
            Err(AppError::BadRequest(_))
        ));
        assert!(ensure_leads_selected(&[Uuid::new_v4()]).is_ok());
    }

    #[test]
    fn import_id_em_branco_e_rejeitado() {
        assert!(matches!(ensure_import_id(""), Err(AppError::BadRequest(_))));
        assert!(matches!(ensure_import_id("   "), Err(AppError::BadRequest(_))));
        assert!(ensure_import_id("batch42").is_ok());
    }

    #[test]
    fn fallback_legado_reconstroi_exatamente_o_lote() {
        let unidade = Uuid::new_v4();
        let do_lote = LegacyImportRow {
            id: Uuid::new_v4(),
            unit_id: unidade,
            metadata: Some(json!({ "createdByImportId": "batch42" })),
        };
        let de_outro_lote = LegacyImportRow {
            id: Uuid::new_v4(),
            unit_id: unidade,
            metadata: Some(json!({ "createdByImportId": "batch99" })),
        };
        let manual = LegacyImportRow {
            id: Uuid::new_v4(),
            unit_id: unidade,
            metadata: Some(json!({ "origem": "manual" })),
        };
        let rows = vec![do_lote, de_outro_lote, manual];

        let master = usuario(crate::middleware::policy::ROLE_MASTER, None);
        let ids = legacy_batch_members(&rows, "batch42", &master, &AccessPolicy);
        assert_eq!(ids, vec![rows[0].id]);
    }

    #[test]
    fn fallback_legado_respeita_o_escopo_de_unidade() {
        let unidade_5 = Uuid::new_v4();
        let unidade_7 = Uuid::new_v4();
        let rows = vec![
            LegacyImportRow {
                id: Uuid::new_v4(),
                unit_id: unidade_5,
                metadata: Some(json!({ "createdByImportId": "batch42" })),
            },
            LegacyImportRow {
                id: Uuid::new_v4(),
                unit_id: unidade_7,
                metadata: Some(json!({ "createdByImportId": "batch42" })),
            },
        ];

        let consultor = usuario(41, Some(unidade_5));
        let ids = legacy_batch_members(&rows, "batch42", &consultor, &AccessPolicy);
        assert_eq!(ids, vec![rows[0].id]);

        let master = usuario(crate::middleware::policy::ROLE_MASTER, None);
        let todos = legacy_batch_members(&rows, "batch42", &master, &AccessPolicy);
        assert_eq!(todos.len(), 2);
    }

    #[test]
    fn metadata_serializado_como_string_tambem_e_reconhecido() {
        let rows = vec![LegacyImportRow {
            id: Uuid::new_v4(),
            unit_id: Uuid::new_v4(),
            metadata: Some(json!("{\"createdByImportId\":\"batch42\"}")),
        }];

        let master = usuario(crate::middleware::policy::ROLE_MASTER, None);
        let ids = legacy_batch_members(&rows, "batch42", &master, &AccessPolicy);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn lote_misto_une_coluna_indexada_com_fallback_legado() {
        // Lote pré-migração: as linhas com metadata-objeto ganharam a coluna
        // no backfill, as com metadata-string não. O undo precisa das duas.
        let unidade = Uuid::new_v4();
        let indexado = Uuid::new_v4();
        let legado = LegacyImportRow {
            id: Uuid::new_v4(),
            unit_id: unidade,
            metadata: Some(json!("{\"createdByImportId\":\"batch42\"}")),
        };

        let id_legado = legado.id;

        let master = usuario(crate::middleware::policy::ROLE_MASTER, None);
        let do_fallback = legacy_batch_members(&[legado], "batch42", &master, &AccessPolicy);
        let ids = merge_batch_members(vec![indexado], do_fallback);
        assert_eq!(ids, vec![indexado, id_legado]);
    }

    #[test]
    fn uniao_dos_caminhos_nao_duplica_ids() {
        let repetido = Uuid::new_v4();
        let so_legado = Uuid::new_v4();
        let ids = merge_batch_members(vec![repetido], vec![repetido, so_legado]);
        assert_eq!(ids, vec![repetido, so_legado]);
    }

    #[test]
    fn metadata_que_nao_parseia_e_excluido_sem_erro() {
        let rows = vec![
            LegacyImportRow {
                id: Uuid::new_v4(),
                unit_id: Uuid::new_v4(),
                metadata: Some(json!("{{{lixo")),
            },
            LegacyImportRow {
                id: Uuid::new_v4(),
                unit_id: Uuid::new_v4(),
                metadata: None,
            },
        ];

        let master = usuario(crate::middleware::policy::ROLE_MASTER, None);
        assert!(legacy_batch_members(&rows, "batch42", &master, &AccessPolicy).is_empty());
    }
}
