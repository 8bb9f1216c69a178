// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Mapeia o CREATE TYPE user_role do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Supervisor,
    Vendor,
}

// Linha da tabela users_auth
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserAuth {
    pub id: Uuid,
    #[schema(example = "maria.vendas")]
    pub username: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub role: Role,
    pub vendor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Quem está fazendo a requisição, extraído do JWT pelo middleware.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
    pub vendor_id: Option<Uuid>,
}

impl Principal {
    /// Vendedores só enxergam a própria carteira; admin e supervisor enxergam tudo.
    pub fn vendor_scope(&self) -> Option<Uuid> {
        match self.role {
            Role::Vendor => Some(self.vendor_id.unwrap_or_else(Uuid::nil)),
            Role::Admin | Role::Supervisor => None,
        }
    }

    /// Um registro com dono só pode ser tocado pelo próprio vendedor (ou por admin/supervisor).
    pub fn can_touch(&self, owner_vendor_id: Option<Uuid>) -> bool {
        match (self.vendor_scope(), owner_vendor_id) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(mine), Some(owner)) => mine == owner,
        }
    }
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(length(min = 3, message = "invalid_username"))]
    #[schema(example = "admin")]
    pub username: String,
    #[validate(length(min = 6, message = "password_too_short"))]
    #[schema(example = "secret123")]
    pub password: String,
}

// Criação de usuário (somente admin)
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 3, message = "invalid_username"))]
    pub username: String,
    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,
    pub role: Role,
    pub vendor_id: Option<Uuid>,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub role: Role,
    pub vendor_id: Option<Uuid>,
    pub exp: usize, // Expiration time
    pub iat: usize, // Issued At
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role, vendor_id: Option<Uuid>) -> Principal {
        Principal { user_id: Uuid::new_v4(), role, vendor_id }
    }

    #[test]
    fn vendor_touches_own_or_unassigned_records_only() {
        let mine = Uuid::new_v4();
        let vendor = principal(Role::Vendor, Some(mine));

        assert!(vendor.can_touch(Some(mine)));
        assert!(vendor.can_touch(None));
        assert!(!vendor.can_touch(Some(Uuid::new_v4())));
    }

    #[test]
    fn vendor_without_link_sees_no_owned_records() {
        let orphan = principal(Role::Vendor, None);
        assert_eq!(orphan.vendor_scope(), Some(Uuid::nil()));
        assert!(!orphan.can_touch(Some(Uuid::new_v4())));
    }

    #[test]
    fn supervisors_are_unscoped() {
        let sup = principal(Role::Supervisor, None);
        assert_eq!(sup.vendor_scope(), None);
        assert!(sup.can_touch(Some(Uuid::new_v4())));
    }
}
