// src/handlers/commissions.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{db_utils::acquire_connection, error::ApiError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{Managers, RequireRole},
    },
    models::product::{CommissionResolution, CommissionTier, TierCoverage, TierInput},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveCommissionPayload {
    pub product_id: Uuid,
    // Linhas vendidas (quantity) ou dólares (amount), conforme o produto
    #[schema(example = "4")]
    pub value: Decimal,
}

// POST /api/commissions/resolve
#[utoipa::path(
    post,
    path = "/api/commissions/resolve",
    tag = "Commissions",
    request_body = ResolveCommissionPayload,
    responses(
        (status = 200, description = "Comissão resolvida", body = CommissionResolution),
        (status = 400, description = "Valor negativo, fracionário ou com mais de 2 casas"),
        (status = 404, description = "Produto não encontrado"),
        (status = 422, description = "Nenhuma faixa cobre o valor e não há porcentagem")
    ),
    security(("api_jwt" = []))
)]
pub async fn resolve_commission(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Json(payload): Json<ResolveCommissionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let resolution = app_state
        .commission_service
        .resolve(&mut *conn, payload.product_id, payload.value)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(resolution)))
}

// GET /api/products/{id}/tiers
#[utoipa::path(
    get,
    path = "/api/products/{id}/tiers",
    tag = "Commissions",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Faixas ordenadas por rangeMin", body = Vec<CommissionTier>),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tiers(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let tiers = app_state
        .commission_service
        .list_tiers(&mut *conn, product_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(tiers)))
}

// POST /api/products/{id}/tiers
#[utoipa::path(
    post,
    path = "/api/products/{id}/tiers",
    tag = "Commissions",
    params(("id" = Uuid, Path, description = "ID do produto")),
    request_body = TierInput,
    responses(
        (status = 201, description = "Faixa criada", body = CommissionTier),
        (status = 400, description = "Faixa inválida"),
        (status = 409, description = "Sobrepõe outra faixa do produto")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tier(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<Managers>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<TierInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let tier = app_state
        .commission_service
        .create_tier(&mut *conn, product_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(tier)))
}

// PUT /api/products/{id}/tiers/{tier_id}
#[utoipa::path(
    put,
    path = "/api/products/{id}/tiers/{tier_id}",
    tag = "Commissions",
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("tier_id" = Uuid, Path, description = "ID da faixa")
    ),
    request_body = TierInput,
    responses(
        (status = 200, description = "Faixa atualizada", body = CommissionTier),
        (status = 404, description = "Produto ou faixa não encontrados"),
        (status = 409, description = "Sobrepõe outra faixa do produto")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_tier(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<Managers>,
    Path((product_id, tier_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TierInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let tier = app_state
        .commission_service
        .update_tier(&mut *conn, product_id, tier_id, payload)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(tier)))
}

// DELETE /api/products/{id}/tiers/{tier_id}
#[utoipa::path(
    delete,
    path = "/api/products/{id}/tiers/{tier_id}",
    tag = "Commissions",
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("tier_id" = Uuid, Path, description = "ID da faixa")
    ),
    responses(
        (status = 204, description = "Faixa removida"),
        (status = 404, description = "Faixa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_tier(
    State(app_state): State<AppState>,
    locale: Locale,
    _manager: RequireRole<Managers>,
    Path((product_id, tier_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    app_state
        .commission_service
        .delete_tier(&mut *conn, product_id, tier_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// GET /api/products/{id}/tiers/coverage
#[utoipa::path(
    get,
    path = "/api/products/{id}/tiers/coverage",
    tag = "Commissions",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Sobreposições e buracos das faixas", body = TierCoverage),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn tier_coverage(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let coverage = app_state
        .commission_service
        .coverage(&mut *conn, product_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(coverage)))
}
