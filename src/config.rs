// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, time::Duration};

use crate::{
    common::i18n::I18nStore,
    db::{ClientRepository, ProductRepository, ProspectRepository, UserRepository},
    models::client::ExpiryThresholds,
    services::{
        auth::AuthService, CatalogService, ClientService, CommissionService, ImportService,
        ProspectService,
    },
};

// Configuração lida do ambiente (.env)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub request_timeout: Duration,
    pub thresholds: ExpiryThresholds,
    // Primeiro admin, criado só com a tabela de usuários vazia
    pub bootstrap_admin: Option<(String, String)>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let thresholds = ExpiryThresholds {
            critical_days: env_or("EXPIRY_CRITICAL_DAYS", 30)?,
            warning_days: env_or("EXPIRY_WARNING_DAYS", 90)?,
        };
        if thresholds.critical_days > thresholds.warning_days {
            anyhow::bail!("EXPIRY_CRITICAL_DAYS não pode ser maior que EXPIRY_WARNING_DAYS");
        }

        let bootstrap_admin = match (
            env::var("BOOTSTRAP_ADMIN_USERNAME").ok(),
            env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
        ) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(env_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            request_timeout: Duration::from_secs(env_or("REQUEST_TIMEOUT_SECS", 30)?),
            thresholds,
            bootstrap_admin,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: &'static I18nStore,
    pub config: AppConfig,

    pub auth_service: AuthService,
    pub client_service: ClientService,
    pub commission_service: CommissionService,
    pub catalog_service: CatalogService,
    pub prospect_service: ProspectService,
    pub import_service: ImportService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, config: AppConfig) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let prospect_repo = ProspectRepository::new(db_pool.clone());

        Self {
            auth_service: AuthService::new(user_repo, client_repo.clone(), config.jwt_secret.clone()),
            client_service: ClientService::new(client_repo.clone(), config.thresholds),
            commission_service: CommissionService::new(product_repo.clone()),
            catalog_service: CatalogService::new(product_repo),
            prospect_service: ProspectService::new(prospect_repo, client_repo.clone()),
            import_service: ImportService::new(client_repo),
            i18n_store: I18nStore::shared(),
            db_pool,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_variable_uses_default() {
        let v: u32 = env_or("CRM_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(v, 7);
    }
}
