// src/handlers/imports.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::{
        db_utils::acquire_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{Managers, RequireRole},
    },
    models::import::{ImportPayload, ImportReport, SimulationReport},
};

// POST /api/imports
#[utoipa::path(
    post,
    path = "/api/imports",
    tag = "Imports",
    request_body = ImportPayload,
    responses(
        (status = 200, description = "Linhas gravadas; erros por linha no relatório", body = ImportReport),
        (status = 400, description = "Arquivo vazio"),
        (status = 403, description = "Somente admin ou supervisor")
    ),
    security(("api_jwt" = []))
)]
pub async fn import_rows(
    State(app_state): State<AppState>,
    locale: Locale,
    RequireRole(principal, _): RequireRole<Managers>,
    Json(payload): Json<ImportPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.data.is_empty() {
        return Err(AppError::field("data", "empty_import").to_api_error(&locale, app_state.i18n_store));
    }

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let report = app_state
        .import_service
        .import(&mut *conn, &payload.data)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    tracing::info!(
        "Importação de {}: {} linhas, {} criadas, {} atualizadas, {} com erro",
        principal.user_id,
        report.processed,
        report.created,
        report.updated,
        report.errors
    );
    Ok((StatusCode::OK, Json(report)))
}

// POST /api/imports/simulate
#[utoipa::path(
    post,
    path = "/api/imports/simulate",
    tag = "Imports",
    request_body = ImportPayload,
    responses(
        (status = 200, description = "Prévia: o que é novo e o que já existe", body = SimulationReport),
        (status = 400, description = "Arquivo vazio"),
        (status = 403, description = "Somente admin ou supervisor")
    ),
    security(("api_jwt" = []))
)]
pub async fn simulate_import(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<Managers>,
    Json(payload): Json<ImportPayload>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.data.is_empty() {
        return Err(AppError::field("data", "empty_import").to_api_error(&locale, app_state.i18n_store));
    }

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let report = app_state
        .import_service
        .simulate(&mut *conn, &payload.data)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
