// src/middleware/rbac.rs

use axum::{
    extract::{FromRequestParts, FromRef},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::auth::{Principal, Role},
};

/// 1. O Trait que define quais papéis passam pelo portão
pub trait RoleDef: Send + Sync + 'static {
    fn allowed() -> &'static [Role];
}

/// 2. O Extractor (Guardião)
pub struct RequireRole<T>(pub Principal, pub PhantomData<T>);

// 3. Implementação do FromRequestParts

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_request_parts(parts, state).await.unwrap_or_default();

        // A. Extrai o usuário colocado pelo auth_guard
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale, app_state.i18n_store))?;

        // B. Confere o papel
        if !T::allowed().contains(&principal.role) {
            tracing::warn!(
                "Usuário {} ({:?}) barrado; papéis aceitos: {:?}",
                principal.user_id,
                principal.role,
                T::allowed()
            );
            return Err(AppError::Forbidden.to_api_error(&locale, app_state.i18n_store));
        }

        Ok(RequireRole(principal, PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PORTÕES (TIPOS)
// ---

pub struct AdminOnly;
impl RoleDef for AdminOnly {
    fn allowed() -> &'static [Role] { &[Role::Admin] }
}

// Importação e manutenção do catálogo
pub struct Managers;
impl RoleDef for Managers {
    fn allowed() -> &'static [Role] { &[Role::Admin, Role::Supervisor] }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendors_are_not_managers() {
        assert!(Managers::allowed().contains(&Role::Supervisor));
        assert!(!Managers::allowed().contains(&Role::Vendor));
        assert_eq!(AdminOnly::allowed(), &[Role::Admin]);
    }
}
