// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Role, UserAuth},
};

const USER_COLUMNS: &str = "id, username, password_hash, role, vendor_id, created_at";

// O repositório de usuários, responsável por todas as interações com a tabela 'users_auth'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo login (case-insensitive)
    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserAuth>, AppError> {
        let maybe_user = sqlx::query_as::<_, UserAuth>(&format!(
            "SELECT {USER_COLUMNS} FROM users_auth WHERE LOWER(username) = LOWER($1)"
        ))
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(maybe_user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAuth>, AppError> {
        let maybe_user = sqlx::query_as::<_, UserAuth>(&format!(
            "SELECT {USER_COLUMNS} FROM users_auth WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(maybe_user)
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<UserAuth>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users = sqlx::query_as::<_, UserAuth>(&format!(
            "SELECT {USER_COLUMNS} FROM users_auth ORDER BY username ASC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(users)
    }

    pub async fn count<'e, E>(&self, executor: E) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users_auth")
            .fetch_one(executor)
            .await?;
        Ok(total)
    }

    // Cria um novo usuário; login duplicado vira Conflict
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        username: &str,
        password_hash: &str,
        role: Role,
        vendor_id: Option<Uuid>,
    ) -> Result<UserAuth, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, UserAuth>(&format!(
            r#"
            INSERT INTO users_auth (username, password_hash, role, vendor_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username.trim())
        .bind(password_hash)
        .bind(role)
        .bind(vendor_id)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O usuário '{}' já existe.", username)))?;

        Ok(user)
    }
}
