// src/handlers/clients.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::acquire_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
    },
    models::client::{
        Ban, Client, ClientChanges, ClientContact, ClientSummary, Subscriber, SubscriberChanges, Vendor,
    },
};

// =============================================================================
//  ÁREA 1: RESUMO AGREGADO
// =============================================================================

// GET /api/clients/summaries
#[utoipa::path(
    get,
    path = "/api/clients/summaries",
    tag = "Clients",
    responses(
        (status = 200, description = "Resumo de todos os clientes ativos visíveis", body = Vec<ClientSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_summaries(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let summaries = app_state
        .client_service
        .list_summaries(&mut *conn, &principal)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summaries)))
}

// GET /api/clients/{id}/summary
#[utoipa::path(
    get,
    path = "/api/clients/{id}/summary",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Resumo do cliente", body = ClientSummary),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let summary = app_state
        .client_service
        .get_summary(&mut *conn, &principal, id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

// =============================================================================
//  ÁREA 2: VENDEDORES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVendorPayload {
    #[validate(length(min = 1, max = 120, message = "required"))]
    #[schema(example = "Hernán")]
    pub name: String,
}

// GET /api/vendors
#[utoipa::path(
    get,
    path = "/api/vendors",
    tag = "Vendors",
    responses((status = 200, description = "Vendedores", body = Vec<Vendor>)),
    security(("api_jwt" = []))
)]
pub async fn list_vendors(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let vendors = app_state
        .client_service
        .list_vendors()
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(vendors)))
}

// POST /api/vendors
#[utoipa::path(
    post,
    path = "/api/vendors",
    tag = "Vendors",
    request_body = CreateVendorPayload,
    responses(
        (status = 201, description = "Vendedor criado", body = Vendor),
        (status = 409, description = "Nome já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_vendor(
    State(app_state): State<AppState>,
    locale: Locale,
    _admin: RequireRole<AdminOnly>,
    Json(payload): Json<CreateVendorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let vendor = app_state
        .client_service
        .create_vendor(&app_state.db_pool, payload.name.trim())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(vendor)))
}

// =============================================================================
//  ÁREA 3: CLIENTES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Ferretería Los Pinos")]
    pub name: String,
    pub business_name: Option<String>,
    #[schema(example = "BD propia")]
    pub base: Option<String>,
    pub vendor_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub contact: ClientContact,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub base: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub is_active: Option<bool>,
    #[serde(flatten)]
    #[validate(nested)]
    pub contact: ClientContact,
}

impl From<UpdateClientPayload> for ClientChanges {
    fn from(p: UpdateClientPayload) -> Self {
        Self {
            name: p.name,
            business_name: p.business_name,
            base: p.base,
            vendor_id: p.vendor_id,
            is_active: p.is_active,
            contact: p.contact,
        }
    }
}

// GET /api/clients
#[utoipa::path(
    get,
    path = "/api/clients",
    tag = "Clients",
    responses((status = 200, description = "Clientes visíveis", body = Vec<Client>)),
    security(("api_jwt" = []))
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let clients = app_state
        .client_service
        .list_clients(&app_state.db_pool, &principal)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(clients)))
}

// POST /api/clients
#[utoipa::path(
    post,
    path = "/api/clients",
    tag = "Clients",
    request_body = CreateClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Client),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let client = app_state
        .client_service
        .create_client(
            &mut *conn,
            &principal,
            &payload.name,
            payload.business_name.as_deref(),
            payload.base.as_deref(),
            payload.vendor_id,
            payload.contact,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(client)))
}

// PUT /api/clients/{id}
#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = UpdateClientPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = Client),
        (status = 403, description = "Vendedor tentando passar o cliente a outro vendedor"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClientPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let client = app_state
        .client_service
        .update_client(&mut *conn, &principal, id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(client)))
}

// =============================================================================
//  ÁREA 4: BANs
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanFilter {
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBanPayload {
    pub client_id: Uuid,
    #[validate(length(min = 1, max = 30, message = "required"))]
    #[schema(example = "710234567")]
    pub ban_number: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

// GET /api/bans
#[utoipa::path(
    get,
    path = "/api/bans",
    tag = "Clients",
    params(("clientId" = Option<Uuid>, Query, description = "Filtra por cliente")),
    responses((status = 200, description = "BANs visíveis", body = Vec<Ban>)),
    security(("api_jwt" = []))
)]
pub async fn list_bans(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<BanFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let bans = app_state
        .client_service
        .list_bans(&app_state.db_pool, &principal, filter.client_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(bans)))
}

// POST /api/bans
#[utoipa::path(
    post,
    path = "/api/bans",
    tag = "Clients",
    request_body = CreateBanPayload,
    responses(
        (status = 201, description = "BAN criado", body = Ban),
        (status = 404, description = "Cliente não encontrado"),
        (status = 409, description = "Número de BAN já existe")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_ban(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateBanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let ban = app_state
        .client_service
        .create_ban(
            &mut *conn,
            &principal,
            payload.client_id,
            &payload.ban_number,
            payload.description.as_deref(),
            payload.is_active,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(ban)))
}

// =============================================================================
//  ÁREA 5: ASSINANTES
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberFilter {
    pub ban_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriberPayload {
    pub ban_id: Uuid,
    #[validate(length(min = 1, max = 20, message = "required"))]
    #[schema(example = "7875550101")]
    pub phone: String,
    pub service_type: Option<String>,
    #[schema(example = "45.99")]
    pub monthly_value: Option<Decimal>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub months: Option<i32>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub remaining_payments: Option<i32>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
}

// Campos ausentes ficam como estão
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriberPayload {
    #[validate(length(min = 1, max = 20, message = "required"))]
    pub phone: Option<String>,
    pub service_type: Option<String>,
    pub monthly_value: Option<Decimal>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub months: Option<i32>,
    #[validate(range(min = 0, message = "negative_value"))]
    pub remaining_payments: Option<i32>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
}

impl From<UpdateSubscriberPayload> for SubscriberChanges {
    fn from(p: UpdateSubscriberPayload) -> Self {
        Self {
            phone: p.phone.map(|s| s.trim().to_string()),
            service_type: p.service_type,
            monthly_value: p.monthly_value,
            months: p.months,
            remaining_payments: p.remaining_payments,
            notes: p.notes,
            is_active: p.is_active,
            contract_start_date: p.contract_start_date,
            contract_end_date: p.contract_end_date,
        }
    }
}

fn reject_negative_money(value: Option<Decimal>) -> Result<(), AppError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(AppError::field("monthlyValue", "negative_value")),
        _ => Ok(()),
    }
}

// GET /api/subscribers
#[utoipa::path(
    get,
    path = "/api/subscribers",
    tag = "Clients",
    params(("banId" = Option<Uuid>, Query, description = "Filtra por BAN")),
    responses((status = 200, description = "Assinantes visíveis", body = Vec<Subscriber>)),
    security(("api_jwt" = []))
)]
pub async fn list_subscribers(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Query(filter): Query<SubscriberFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let subscribers = app_state
        .client_service
        .list_subscribers(&app_state.db_pool, &principal, filter.ban_id)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(subscribers)))
}

// POST /api/subscribers
#[utoipa::path(
    post,
    path = "/api/subscribers",
    tag = "Clients",
    request_body = CreateSubscriberPayload,
    responses(
        (status = 201, description = "Assinante criado", body = Subscriber),
        (status = 404, description = "BAN não encontrado"),
        (status = 409, description = "Telefone já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_subscriber(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Json(payload): Json<CreateSubscriberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;
    reject_negative_money(payload.monthly_value).map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let fields = SubscriberChanges {
        phone: None,
        service_type: payload.service_type,
        monthly_value: payload.monthly_value,
        months: payload.months,
        remaining_payments: payload.remaining_payments,
        notes: payload.notes,
        is_active: payload.is_active,
        contract_start_date: payload.contract_start_date,
        contract_end_date: payload.contract_end_date,
    };

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let subscriber = app_state
        .client_service
        .create_subscriber(&mut *conn, &principal, payload.ban_id, &payload.phone, fields)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(subscriber)))
}

// PUT /api/subscribers/{id}
#[utoipa::path(
    put,
    path = "/api/subscribers/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do assinante")),
    request_body = UpdateSubscriberPayload,
    responses(
        (status = 200, description = "Assinante atualizado", body = Subscriber),
        (status = 400, description = "Fim do contrato antes do início"),
        (status = 404, description = "Assinante não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_subscriber(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, app_state.i18n_store))?;
    reject_negative_money(payload.monthly_value).map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let mut conn = acquire_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    let subscriber = app_state
        .client_service
        .update_subscriber(&mut *conn, &principal, id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(subscriber)))
}
