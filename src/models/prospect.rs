// src/models/prospect.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProspectState {
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpProspect {
    pub id: Uuid,
    #[schema(example = "Ferretería Los Pinos")]
    pub company_name: String,
    pub client_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,

    // Linhas de produto negociadas
    pub fijo_ren: Decimal,
    pub fijo_new: Decimal,
    pub movil_nueva: Decimal,
    pub movil_renovacion: Decimal,
    pub claro_tv: Decimal,
    pub cloud: Decimal,
    pub mpls: Decimal,
    pub total_amount: Decimal,

    pub notes: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub last_call_date: Option<NaiveDate>,
    pub next_call_date: Option<NaiveDate>,
    pub call_count: i32,

    pub is_active: bool,
    pub is_completed: bool,
    pub completed_date: Option<NaiveDate>,

    // Controle de concorrência otimista
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FollowUpProspect {
    pub fn state(&self) -> ProspectState {
        if self.is_completed {
            ProspectState::Completed
        } else if !self.is_active {
            ProspectState::Cancelled
        } else {
            ProspectState::Pending
        }
    }
}

/// Prospecto com o estado derivado, como sai na API.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProspectView {
    #[serde(flatten)]
    pub prospect: FollowUpProspect,
    pub state: ProspectState,
}

impl From<FollowUpProspect> for ProspectView {
    fn from(prospect: FollowUpProspect) -> Self {
        let state = prospect.state();
        Self { prospect, state }
    }
}

// Histórico do ciclo de vida
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProspectEventKind {
    Created,
    Updated,
    Completed,
    Stopped,
}

impl ProspectEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProspectEventKind::Created => "created",
            ProspectEventKind::Updated => "updated",
            ProspectEventKind::Completed => "completed",
            ProspectEventKind::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProspectEvent {
    pub id: Uuid,
    pub prospect_id: Uuid,
    #[schema(example = "completed")]
    pub kind: String,
    pub actor_user_id: Option<Uuid>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

// Campos editáveis (criação e edição compartilham o mesmo formato)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProspectFields {
    pub company_name: String,
    pub client_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub fijo_ren: Decimal,
    pub fijo_new: Decimal,
    pub movil_nueva: Decimal,
    pub movil_renovacion: Decimal,
    pub claro_tv: Decimal,
    pub cloud: Decimal,
    pub mpls: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub last_call_date: Option<NaiveDate>,
    pub next_call_date: Option<NaiveDate>,
    pub call_count: i32,
}

// Corpo de criação/edição vindo da API
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProspectPayload {
    #[validate(length(min = 1, max = 200, message = "required"))]
    #[schema(example = "Ferretería Los Pinos")]
    pub company_name: String,
    pub client_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    #[serde(default)]
    pub fijo_ren: Decimal,
    #[serde(default)]
    pub fijo_new: Decimal,
    #[serde(default)]
    pub movil_nueva: Decimal,
    #[serde(default)]
    pub movil_renovacion: Decimal,
    #[serde(default)]
    pub claro_tv: Decimal,
    #[serde(default)]
    pub cloud: Decimal,
    #[serde(default)]
    pub mpls: Decimal,
    #[serde(default)]
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub contact_phone: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub contact_email: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub last_call_date: Option<NaiveDate>,
    #[schema(value_type = Option<String>, format = Date)]
    pub next_call_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(range(min = 0, message = "negative_value"))]
    pub call_count: i32,
}

impl From<ProspectPayload> for ProspectFields {
    fn from(p: ProspectPayload) -> Self {
        Self {
            company_name: p.company_name.trim().to_string(),
            client_id: p.client_id,
            vendor_id: p.vendor_id,
            fijo_ren: p.fijo_ren,
            fijo_new: p.fijo_new,
            movil_nueva: p.movil_nueva,
            movil_renovacion: p.movil_renovacion,
            claro_tv: p.claro_tv,
            cloud: p.cloud,
            mpls: p.mpls,
            total_amount: p.total_amount,
            notes: p.notes,
            contact_phone: p.contact_phone,
            contact_email: p.contact_email,
            last_call_date: p.last_call_date,
            next_call_date: p.next_call_date,
            call_count: p.call_count,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProspectPayload {
    // Versão lida pelo cliente; se mudou no banco a edição é recusada
    #[schema(example = 1)]
    pub version: i32,
    #[serde(flatten)]
    #[validate(nested)]
    pub fields: ProspectPayload,
}

// Argumentos do markCompleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    #[schema(value_type = String, format = Date, example = "2025-03-10")]
    pub completed_date: NaiveDate,
    #[schema(example = "3")]
    pub movil_renovacion: Decimal,
    #[schema(example = "210.00")]
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FollowUpProspect {
        FollowUpProspect {
            id: Uuid::new_v4(),
            company_name: "Acme".into(),
            client_id: None,
            vendor_id: None,
            fijo_ren: Decimal::ZERO,
            fijo_new: Decimal::ZERO,
            movil_nueva: Decimal::ZERO,
            movil_renovacion: Decimal::ZERO,
            claro_tv: Decimal::ZERO,
            cloud: Decimal::ZERO,
            mpls: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            notes: None,
            contact_phone: None,
            contact_email: None,
            last_call_date: None,
            next_call_date: None,
            call_count: 0,
            is_active: true,
            is_completed: false,
            completed_date: None,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn completion_wins_over_inactive_flag() {
        let mut p = sample();
        assert_eq!(p.state(), ProspectState::Pending);

        p.is_active = false;
        assert_eq!(p.state(), ProspectState::Cancelled);

        p.is_completed = true;
        assert_eq!(p.state(), ProspectState::Completed);
    }
}
