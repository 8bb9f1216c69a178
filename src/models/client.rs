// src/models/client.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- VENDEDORES ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: Uuid,
    #[schema(example = "Hernán")]
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// --- CARTEIRA (Cliente -> BAN -> Assinante) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    #[schema(example = "Ferretería Los Pinos")]
    pub name: String,
    pub business_name: Option<String>,
    // Segmento de origem (ex: "BD propia")
    pub base: Option<String>,
    pub vendor_id: Option<Uuid>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub contact: ClientContact,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Ficha de contato do cliente; nenhum cálculo depende dela
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClientContact {
    pub contact_person: Option<String>,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub secondary_phone: Option<String>,
    pub mobile_phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
}

impl ClientContact {
    /// Apara espaços; texto vazio vira ausente.
    pub fn trimmed(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            contact_person: clean(self.contact_person),
            email: clean(self.email),
            phone: clean(self.phone),
            secondary_phone: clean(self.secondary_phone),
            mobile_phone: clean(self.mobile_phone),
            address: clean(self.address),
            city: clean(self.city),
            zip_code: clean(self.zip_code),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ban {
    pub id: Uuid,
    #[schema(example = "710234567")]
    pub ban_number: String,
    pub client_id: Uuid,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    #[schema(example = "7875550101")]
    pub phone: String,
    pub ban_id: Uuid,
    pub service_type: Option<String>,
    #[schema(example = "45.99")]
    pub monthly_value: Option<Decimal>,
    pub months: Option<i32>,
    pub remaining_payments: Option<i32>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- VENCIMENTO ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ExpiryStatus {
    Expired,
    Critical,
    Warning,
    Good,
    NoDate,
}

/// Limites (em dias) que separam crítico / aviso / ok.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryThresholds {
    pub critical_days: i64,
    pub warning_days: i64,
}

impl Default for ExpiryThresholds {
    fn default() -> Self {
        Self { critical_days: 30, warning_days: 90 }
    }
}

impl ExpiryThresholds {
    /// Dias até o fim do contrato e a classificação correspondente.
    pub fn classify(&self, contract_end_date: Option<NaiveDate>, today: NaiveDate) -> (Option<i64>, ExpiryStatus) {
        let Some(end) = contract_end_date else {
            return (None, ExpiryStatus::NoDate);
        };

        let days = (end - today).num_days();
        let status = if days < 0 {
            ExpiryStatus::Expired
        } else if days < self.critical_days {
            ExpiryStatus::Critical
        } else if days < self.warning_days {
            ExpiryStatus::Warning
        } else {
            ExpiryStatus::Good
        };

        (Some(days), status)
    }
}

// --- RESUMO POR CLIENTE (saída da agregação) ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub client_id: Uuid,
    pub client_name: String,
    pub business_name: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
    pub total_bans: i64,
    pub total_subscribers: i64,
    pub primary_ban_number: Option<String>,
    pub primary_subscriber_phone: Option<String>,
    pub primary_contract_end_date: Option<NaiveDate>,
    pub primary_subscriber_created_at: Option<DateTime<Utc>>,
    pub days_until_expiry: Option<i64>,
    pub status: ExpiryStatus,
    pub is_being_followed: bool,
    pub was_completed: bool,
    pub ban_numbers: Vec<String>,
    pub subscriber_phones: Vec<String>,
}

// Linhas cruas lidas pelo repositório para montar o resumo

#[derive(Debug, Clone, FromRow)]
pub struct ClientHeaderRow {
    pub id: Uuid,
    pub name: String,
    pub business_name: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub vendor_name: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BanRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub ban_number: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct SubscriberRow {
    pub ban_id: Uuid,
    pub phone: String,
    pub contract_end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProspectFlagRow {
    pub client_id: Uuid,
    pub is_active: bool,
    pub is_completed: bool,
}

// --- PAYLOADS ---

#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub base: Option<String>,
    pub vendor_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub contact: ClientContact,
}

// Também usado na criação (campos ausentes ficam NULL / padrão)
#[derive(Debug, Clone, Default)]
pub struct SubscriberChanges {
    pub phone: Option<String>,
    pub service_type: Option<String>,
    pub monthly_value: Option<Decimal>,
    pub months: Option<i32>,
    pub remaining_payments: Option<i32>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn yesterday_is_expired() {
        let t = ExpiryThresholds::default();
        let (days, status) = t.classify(Some(today() - Duration::days(1)), today());
        assert_eq!(days, Some(-1));
        assert_eq!(status, ExpiryStatus::Expired);
    }

    #[test]
    fn ten_days_out_is_critical_with_thirty_day_threshold() {
        let t = ExpiryThresholds { critical_days: 30, warning_days: 90 };
        assert_eq!(t.classify(Some(today() + Duration::days(10)), today()).1, ExpiryStatus::Critical);
    }

    #[test]
    fn boundaries_are_half_open() {
        let t = ExpiryThresholds { critical_days: 30, warning_days: 90 };
        let at = |d: i64| t.classify(Some(today() + Duration::days(d)), today()).1;

        assert_eq!(at(0), ExpiryStatus::Critical);
        assert_eq!(at(29), ExpiryStatus::Critical);
        assert_eq!(at(30), ExpiryStatus::Warning);
        assert_eq!(at(89), ExpiryStatus::Warning);
        assert_eq!(at(90), ExpiryStatus::Good);
    }

    #[test]
    fn missing_date_has_no_days() {
        assert_eq!(ExpiryThresholds::default().classify(None, today()), (None, ExpiryStatus::NoDate));
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&ExpiryStatus::NoDate).unwrap(), "\"no-date\"");
    }

    #[test]
    fn contact_card_reads_camel_case_and_drops_blanks() {
        let contact: ClientContact = serde_json::from_str(
            r#"{"contactPerson":"  Ana  ","zipCode":"00901","mobilePhone":"   ","city":"San Juan"}"#,
        )
        .unwrap();
        let contact = contact.trimmed();

        assert_eq!(contact.contact_person.as_deref(), Some("Ana"));
        assert_eq!(contact.zip_code.as_deref(), Some("00901"));
        assert_eq!(contact.mobile_phone, None);
        assert_eq!(contact.city.as_deref(), Some("San Juan"));
    }

    #[test]
    fn contact_email_must_be_valid() {
        let bad = ClientContact { email: Some("sem-arroba".into()), ..Default::default() };
        assert!(bad.validate().is_err());

        let good = ClientContact { email: Some("ana@pinos.pr".into()), ..Default::default() };
        assert!(good.validate().is_ok());
    }
}
