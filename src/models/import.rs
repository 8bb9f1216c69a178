// src/models/import.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// Células da planilha chegam como texto ou número; tudo vira Option<String>.
fn cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(if b { "1" } else { "0" }.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("célula inválida: {}", other))),
    }
}

// --- ENTRADA (formato do mapeamento de colunas da UI) ---

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ClientCells {
    #[serde(default, deserialize_with = "cell")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub business_name: Option<String>,
    // A UI manda o *nome* do vendedor nesta coluna
    #[serde(default, alias = "vendor_id", deserialize_with = "cell")]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BanCells {
    #[serde(default, deserialize_with = "cell")]
    pub ban_number: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubscriberCells {
    #[serde(default, alias = "subscriber_number", deserialize_with = "cell")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub service_type: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub monthly_value: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub months: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub remaining_payments: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub contract_start_date: Option<String>,
    #[serde(default, deserialize_with = "cell")]
    pub contract_end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ImportRow {
    #[serde(rename = "Clientes", default)]
    pub client: ClientCells,
    #[serde(rename = "BANs", default)]
    pub ban: BanCells,
    #[serde(rename = "Suscriptores", default)]
    pub subscriber: SubscriberCells,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportPayload {
    pub data: Vec<ImportRow>,
}

// --- LINHA NORMALIZADA ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRow {
    pub client_name: Option<String>,
    pub vendor_name: Option<String>,
    pub ban_number: Option<String>,
    pub ban_active: bool,
    pub phone: Option<String>,
    pub service_type: Option<String>,
    pub monthly_value: Option<Decimal>,
    pub months: Option<i32>,
    pub remaining_payments: Option<i32>,
    pub notes: Option<String>,
    pub subscriber_active: bool,
    pub contract_start_date: Option<NaiveDate>,
    pub contract_end_date: Option<NaiveDate>,
}

// --- RELATÓRIOS ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    // Posição 1-based na planilha
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub error_list: Vec<RowError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    New,
    Existing,
    // Célula vazia
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowDetail {
    pub client: Option<String>,
    pub client_status: KeyStatus,
    pub ban: Option<String>,
    pub ban_status: KeyStatus,
    pub phone: Option<String>,
    pub subscriber_status: KeyStatus,
    pub plan: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub new_clients: usize,
    pub existing_clients: usize,
    pub new_bans: usize,
    pub existing_bans: usize,
    pub new_subscribers: usize,
    pub existing_subscribers: usize,
    pub details: Vec<RowDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_cells_become_text() {
        let row: ImportRow = serde_json::from_value(json!({
            "Clientes": { "name": "Acme", "vendor_id": "Hernán" },
            "BANs": { "ban_number": 710234567 },
            "Suscriptores": { "phone": 7875550101u64, "monthly_value": 45.5, "status": null }
        }))
        .unwrap();

        assert_eq!(row.client.vendor.as_deref(), Some("Hernán"));
        assert_eq!(row.ban.ban_number.as_deref(), Some("710234567"));
        assert_eq!(row.subscriber.phone.as_deref(), Some("7875550101"));
        assert_eq!(row.subscriber.monthly_value.as_deref(), Some("45.5"));
        assert_eq!(row.subscriber.status, None);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let row: ImportRow = serde_json::from_value(json!({ "BANs": { "ban_number": "1" } })).unwrap();
        assert!(row.client.name.is_none());
        assert!(row.subscriber.phone.is_none());
    }

    #[test]
    fn nested_cells_are_rejected() {
        let res = serde_json::from_value::<ImportRow>(json!({ "Clientes": { "name": ["a"] } }));
        assert!(res.is_err());
    }
}
