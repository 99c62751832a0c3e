// src/middleware/policy.rs

use uuid::Uuid;

use crate::models::auth::User;

// IDs oficiais dos cargos (níveis numéricos)
pub const ROLE_MASTER: i32 = 1;
pub const ROLE_DIRECTOR: i32 = 10;

/// Escopo de unidade de um ator para consultas em massa
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitScope {
    /// Cargo global: enxerga todas as unidades
    Global,
    /// Cargo restrito: enxerga apenas a própria unidade
    Unit(Uuid),
    /// Cargo restrito sem unidade atribuída: não enxerga nada
    Nothing,
}

/// Política de acesso única consumida pelas duas operações em massa.
/// Centraliza o que antes era comparação numérica espalhada pelos handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    /// Cargos que atuam sobre qualquer unidade
    pub fn is_global_role(&self, role_id: i32) -> bool {
        matches!(role_id, ROLE_MASTER | ROLE_DIRECTOR)
    }

    /// O ator pode agir sobre linhas desta unidade?
    pub fn can_access_unit(&self, actor: &User, unit_id: Uuid) -> bool {
        self.is_global_role(actor.role_id) || actor.unit_id == Some(unit_id)
    }

    /// Traduz o ator em um escopo de consulta
    pub fn unit_scope(&self, actor: &User) -> UnitScope {
        if self.is_global_role(actor.role_id) {
            return UnitScope::Global;
        }
        match actor.unit_id {
            Some(unit) => UnitScope::Unit(unit),
            None => UnitScope::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

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
    fn cargos_globais() {
        let policy = AccessPolicy;
        assert!(policy.is_global_role(ROLE_MASTER));
        assert!(policy.is_global_role(ROLE_DIRECTOR));
        assert!(!policy.is_global_role(30));
        assert!(!policy.is_global_role(41));
    }

    #[test]
    fn global_acessa_qualquer_unidade() {
        let policy = AccessPolicy;
        let master = usuario(ROLE_MASTER, None);
        assert!(policy.can_access_unit(&master, Uuid::new_v4()));
        assert_eq!(policy.unit_scope(&master), UnitScope::Global);
    }

    #[test]
    fn restrito_so_acessa_a_propria_unidade() {
        let policy = AccessPolicy;
        let unidade = Uuid::new_v4();
        let consultor = usuario(41, Some(unidade));

        assert!(policy.can_access_unit(&consultor, unidade));
        assert!(!policy.can_access_unit(&consultor, Uuid::new_v4()));
        assert_eq!(policy.unit_scope(&consultor), UnitScope::Unit(unidade));
    }

    #[test]
    fn restrito_sem_unidade_nao_acessa_nada() {
        let policy = AccessPolicy;
        let orfao = usuario(30, None);

        assert!(!policy.can_access_unit(&orfao, Uuid::new_v4()));
        assert_eq!(policy.unit_scope(&orfao), UnitScope::Nothing);
    }
}
