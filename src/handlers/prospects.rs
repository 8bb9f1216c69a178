// src/handlers/prospects.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::acquire_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::prospect::{
        CompletionRequest, ProspectEvent, ProspectPayload, ProspectView, UpdateProspectPayload,
    },
};

// GET /api/prospects
#[utoipa::path(
    get,
    path = "/api/prospects",
    tag = "Prospects",
    responses(
        (status = 200, description = "Prospectos visíveis, próxima ligação primeiro", body = Vec<ProspectView>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_prospects(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let prospects: Vec<ProspectView> = app_state
        .prospect_service
        .list(&app_state.db_pool, &principal)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?
        .into_iter()
        .map(ProspectView::from)
        .collect();

    Ok((StatusCode::OK, Json(prospects)))
}

// POST /api/prospects
#[utoipa::path(
    post,
    path = "/api/prospects",
    tag = "Prospects",
    request_body = ProspectPayload,
    responses(
        (status = 201, description = "Prospecto criado (pendente)", body = ProspectView),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Cliente ou vendedor não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<ProspectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let prospect = app_state
        .prospect_service
        .create(&mut *conn, &principal, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ProspectView::from(prospect))))
}

// GET /api/prospects/{id}
#[utoipa::path(
    get,
    path = "/api/prospects/{id}",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospecto")),
    responses(
        (status = 200, description = "Prospecto", body = ProspectView),
        (status = 404, description = "Prospecto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let prospect = app_state
        .prospect_service
        .get(&app_state.db_pool, &principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ProspectView::from(prospect))))
}

// PUT /api/prospects/{id}
#[utoipa::path(
    put,
    path = "/api/prospects/{id}",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospecto")),
    request_body = UpdateProspectPayload,
    responses(
        (status = 200, description = "Prospecto atualizado", body = ProspectView),
        (status = 404, description = "Prospecto não encontrado"),
        (status = 409, description = "Versão desatualizada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProspectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let prospect = app_state
        .prospect_service
        .update(&mut *conn, &principal, id, payload.version, payload.fields.into())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ProspectView::from(prospect))))
}

// DELETE /api/prospects/{id}
#[utoipa::path(
    delete,
    path = "/api/prospects/{id}",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospecto")),
    responses(
        (status = 204, description = "Prospecto removido"),
        (status = 404, description = "Prospecto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    app_state
        .prospect_service
        .delete(&mut *conn, &principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/prospects/{id}/complete
#[utoipa::path(
    post,
    path = "/api/prospects/{id}/complete",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospecto")),
    request_body = CompletionRequest,
    responses(
        (status = 200, description = "Prospecto concluído (repetir com os mesmos dados não muda nada)", body = ProspectView),
        (status = 404, description = "Prospecto não encontrado"),
        (status = 409, description = "Prospecto cancelado")
    ),
    security(("api_jwt" = []))
)]
pub async fn complete_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompletionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let prospect = app_state
        .prospect_service
        .complete(&mut *conn, &principal, id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ProspectView::from(prospect))))
}

// POST /api/prospects/{id}/stop
#[utoipa::path(
    post,
    path = "/api/prospects/{id}/stop",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospecto")),
    responses(
        (status = 200, description = "Acompanhamento encerrado", body = ProspectView),
        (status = 404, description = "Prospecto não encontrado"),
        (status = 409, description = "Prospecto já concluído")
    ),
    security(("api_jwt" = []))
)]
pub async fn stop_prospect(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let prospect = app_state
        .prospect_service
        .stop(&mut *conn, &principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ProspectView::from(prospect))))
}

// GET /api/prospects/{id}/events
#[utoipa::path(
    get,
    path = "/api/prospects/{id}/events",
    tag = "Prospects",
    params(("id" = Uuid, Path, description = "ID do prospecto")),
    responses(
        (status = 200, description = "Histórico do ciclo de vida", body = Vec<ProspectEvent>),
        (status = 404, description = "Prospecto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_prospect_events(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let events = app_state
        .prospect_service
        .history(&app_state.db_pool, &principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(events)))
}
