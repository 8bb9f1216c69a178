//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

// Importações principais
use crate::config::{AppConfig, AppState};

#[tokio::main]
async fn main() {
    // Inicializa o logger (RUST_LOG sobrescreve o padrão)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("crm_backend=info,tower_http=info")),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let config = AppConfig::from_env().expect("Configuração inválida.");
    let app_state = AppState::new(config)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    if let Some((username, password)) = app_state.config.bootstrap_admin.clone() {
        match app_state
            .auth_service
            .bootstrap_admin(&app_state.db_pool, &username, &password)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::debug!("Usuários já existem; admin inicial ignorado"),
            Err(e) => tracing::error!("🔥 Falha ao criar admin inicial: {}", e),
        }
    }

    let bind_addr = app_state.config.bind_addr.clone();
    let app = routes::app(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", bind_addr);
    axum::serve(listener, app)
        .await
        .expect("Erro no servidor Axum");
}
