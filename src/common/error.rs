// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validação de regra de negócio em um campo específico (ex: range_max < range_min)
    #[error("Campo inválido: {field} ({code})")]
    InvalidField { field: &'static str, code: &'static str },

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    // Nenhuma faixa cobre o valor e o produto não tem porcentagem de fallback
    #[error("Comissão não resolvida para o produto {product_id} com valor {value}")]
    Unresolved { product_id: Uuid, value: Decimal },

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Atalho para erros de campo gerados pelos services.
    pub fn field(field: &'static str, code: &'static str) -> Self {
        AppError::InvalidField { field, code }
    }

    /// Converte violação de unicidade do Postgres em `Conflict`; o resto vira `DatabaseError`.
    pub fn from_unique(e: sqlx::Error, what: impl Into<String>) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::Conflict(what.into());
            }
        }
        AppError::DatabaseError(e)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unresolved { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Chave da mensagem no catálogo de traduções
    fn message_key(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => "validation_failed",
            AppError::NotFound(_) => "not_found",
            AppError::Unresolved { .. } => "commission_unresolved",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden => "forbidden",
            _ => "internal_error",
        }
    }

    /// Traduz o erro de domínio para a resposta HTTP no idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        let message = store.translate(&locale.0, self.message_key());

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let codes = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), codes);
                }
                Some(json!(details))
            }
            AppError::InvalidField { field, code } => {
                let mut details = serde_json::Map::new();
                details.insert(field.to_string(), json!([code]));
                Some(Value::Object(details))
            }
            AppError::NotFound(resource) => Some(json!({ "resource": resource })),
            AppError::Unresolved { product_id, value } => {
                Some(json!({ "productId": product_id, "value": value }))
            }
            AppError::Conflict(reason) => Some(json!({ "reason": reason })),
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => {
                // O detalhe fica só no log, nunca na resposta
                tracing::error!("Erro Interno do Servidor: {}", self);
                None
            }
            _ => None,
        };

        ApiError { status, error: message, details }
    }
}

// Resposta de erro já traduzida, pronta para o cliente.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Para extratores que rejeitam antes de conhecermos o idioma (usa o padrão).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::shared()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn es() -> Locale {
        Locale("es".to_string())
    }

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(AppError::NotFound("Cliente").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::field("range_max", "range_inverted").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Unresolved { product_id: Uuid::nil(), value: Decimal::ONE }.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::Conflict("versão".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unresolved_carries_product_and_value_in_details() {
        let product_id = Uuid::new_v4();
        let api = AppError::Unresolved { product_id, value: Decimal::from(12) }
            .to_api_error(&es(), I18nStore::shared());

        let details = api.details.expect("details");
        assert_eq!(details["productId"], json!(product_id));
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn internal_errors_hide_details() {
        let api = AppError::InternalServerError(anyhow::anyhow!("senha do banco: 123"))
            .to_api_error(&es(), I18nStore::shared());
        assert!(api.details.is_none());
        assert!(!api.error.contains("123"));
    }

    #[test]
    fn field_errors_are_keyed_by_field() {
        let api = AppError::field("value", "fractional_quantity").to_api_error(&es(), I18nStore::shared());
        assert_eq!(api.details, Some(json!({ "value": ["fractional_quantity"] })));
    }
}
