// src/common/db_utils.rs

use std::time::Duration;

use sqlx::{pool::PoolConnection, Postgres};

use crate::common::error::AppError;
use crate::config::AppState;

const RETRY_DELAY: Duration = Duration::from_millis(200);

// ---
// Helper de conexão: uma por requisição
// ---
/// Adquire uma conexão da pool, tentando de novo uma única vez em falhas transitórias.
pub(crate) async fn acquire_connection(app_state: &AppState) -> Result<PoolConnection<Postgres>, AppError> {
    match app_state.db_pool.acquire().await {
        Ok(conn) => Ok(conn),
        Err(e) if is_transient(&e) => {
            tracing::warn!("Falha transitória ao obter conexão ({}); tentando de novo", e);
            tokio::time::sleep(RETRY_DELAY).await;
            // O operador '?' converte sqlx::Error -> AppError::DatabaseError
            Ok(app_state.db_pool.acquire().await?)
        }
        Err(e) => Err(e.into()),
    }
}

fn is_transient(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pool_and_io_errors_are_retried() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::Io(std::io::Error::other("reset"))));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::PoolClosed));
    }
}
