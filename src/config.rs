// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{HistoryRepository, LeadRepository, TaskRepository, UserRepository},
    middleware::policy::AccessPolicy,
    services::{auth::AuthService, import_service::ImportService, lead_service::LeadService},
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub import_service: ImportService,
    pub lead_service: LeadService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let user_repo = UserRepository::new(db_pool.clone());
        let lead_repo = LeadRepository::new(db_pool.clone());
        let task_repo = TaskRepository::new(db_pool.clone());
        let history_repo = HistoryRepository::new(db_pool.clone());

        let policy = AccessPolicy;
        let auth_service = AuthService::new(user_repo, jwt_secret);
        let import_service = ImportService::new(lead_repo.clone(), policy);
        let lead_service = LeadService::new(lead_repo, task_repo, history_repo, policy);

        Ok(Self {
            db_pool,
            auth_service,
            import_service,
            lead_service,
        })
    }
}
