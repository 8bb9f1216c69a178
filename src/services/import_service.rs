// src/services/import_service.rs

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{Acquire, Postgres, Transaction};

use crate::{
    common::error::AppError,
    db::ClientRepository,
    models::client::{ClientContact, SubscriberChanges},
    models::import::{
        ImportReport, ImportRow, KeyStatus, NormalizedRow, RowDetail, RowError, SimulationReport,
    },
};

// Segmento gravado em clientes criados pela importação
const IMPORT_BASE: &str = "BD propia";
const MAX_REPORTED_ERRORS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Created,
    Updated,
}

#[derive(Clone)]
pub struct ImportService {
    client_repo: ClientRepository,
}

impl ImportService {
    pub fn new(client_repo: ClientRepository) -> Self {
        Self { client_repo }
    }

    /// Grava todas as linhas numa transação; cada linha roda num SAVEPOINT próprio.
    pub async fn import<'e, E>(&self, executor: E, rows: &[ImportRow]) -> Result<ImportReport, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let mut report = ImportReport::default();

        for (index, row) in rows.iter().enumerate() {
            report.processed += 1;

            let mut savepoint = tx.begin().await?;
            match self.save_row(&mut savepoint, row).await {
                Ok(outcome) => {
                    savepoint.commit().await?;
                    match outcome {
                        RowOutcome::Created => report.created += 1,
                        RowOutcome::Updated => report.updated += 1,
                    }
                }
                Err(err) => {
                    savepoint.rollback().await?;
                    tracing::warn!("Importação: linha {} rejeitada: {}", index + 1, err);
                    report.errors += 1;
                    if report.error_list.len() < MAX_REPORTED_ERRORS {
                        report.error_list.push(RowError { row: index + 1, message: row_message(&err) });
                    }
                }
            }
        }

        tx.commit().await?;
        tracing::info!(
            "Importação concluída: {} linhas, {} novas, {} atualizadas, {} erros",
            report.processed,
            report.created,
            report.updated,
            report.errors
        );
        Ok(report)
    }

    async fn save_row(&self, tx: &mut Transaction<'_, Postgres>, row: &ImportRow) -> Result<RowOutcome, AppError> {
        let row = normalize_row(row)?;
        let name = row
            .client_name
            .as_deref()
            .ok_or(AppError::field("Clientes.name", "required"))?;

        // 1. Cliente
        let vendor_id = match row.vendor_name.as_deref() {
            Some(vendor) => self.client_repo.find_vendor_by_name(&mut **tx, vendor).await?,
            None => None,
        };

        let (client, outcome) = match self.client_repo.find_client_by_name(&mut **tx, name).await? {
            Some(existing) => {
                if let Some(vendor_id) = vendor_id {
                    self.client_repo.fill_client_vendor(&mut **tx, existing.id, vendor_id).await?;
                }
                (existing, RowOutcome::Updated)
            }
            None => {
                let created = self
                    .client_repo
                    .create_client(&mut **tx, name, Some(name), Some(IMPORT_BASE), vendor_id, &ClientContact::default())
                    .await?;
                (created, RowOutcome::Created)
            }
        };

        // 2. BAN
        let ban_id = match row.ban_number.as_deref() {
            Some(number) => match self.client_repo.find_ban_by_number(&mut **tx, number).await? {
                Some(ban) => {
                    self.client_repo
                        .rehome_ban(&mut **tx, ban.id, client.id, row.ban_active)
                        .await?;
                    Some(ban.id)
                }
                None => {
                    let ban = self
                        .client_repo
                        .create_ban(&mut **tx, number, client.id, None, row.ban_active)
                        .await?;
                    Some(ban.id)
                }
            },
            None => None,
        };

        // 3. Assinante
        if let Some(phone) = row.phone.as_deref() {
            let ban_id = ban_id.ok_or(AppError::field("BANs.ban_number", "required"))?;
            let changes = SubscriberChanges {
                phone: None,
                service_type: row.service_type.clone(),
                monthly_value: row.monthly_value,
                months: row.months,
                remaining_payments: row.remaining_payments,
                notes: row.notes.clone(),
                is_active: Some(row.subscriber_active),
                contract_start_date: row.contract_start_date,
                contract_end_date: row.contract_end_date,
            };

            match self.client_repo.find_subscriber_by_phone(&mut **tx, phone).await? {
                Some(existing) => {
                    self.client_repo
                        .update_subscriber(&mut **tx, existing.id, Some(ban_id), &changes)
                        .await?;
                }
                None => {
                    self.client_repo
                        .create_subscriber(&mut **tx, ban_id, phone, &changes)
                        .await?;
                }
            }
        }

        Ok(outcome)
    }

    /// Prévia sem gravar: o que seria novo e o que já existe.
    pub async fn simulate<'e, E>(&self, executor: E, rows: &[ImportRow]) -> Result<SimulationReport, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.client_repo.set_snapshot_read_only(&mut *tx).await?;

        let clients = self.client_repo.existing_client_keys(&mut *tx).await?;
        let bans = self.client_repo.existing_ban_numbers(&mut *tx).await?;
        let phones = self.client_repo.existing_phones(&mut *tx).await?;
        tx.commit().await?;

        Ok(simulate_rows(rows, clients, bans, phones))
    }
}

// =============================================================================
//  SIMULAÇÃO (pura)
// =============================================================================

pub fn simulate_rows(
    rows: &[ImportRow],
    mut clients: HashSet<String>,
    mut bans: HashSet<String>,
    mut phones: HashSet<String>,
) -> SimulationReport {
    let mut report = SimulationReport::default();

    // Chave nova entra no conjunto para não contar duplicadas do mesmo arquivo
    fn classify(key: Option<&str>, seen: &mut HashSet<String>, new: &mut usize, existing: &mut usize) -> KeyStatus {
        match key {
            None => KeyStatus::Absent,
            Some(k) if seen.contains(k) => {
                *existing += 1;
                KeyStatus::Existing
            }
            Some(k) => {
                seen.insert(k.to_string());
                *new += 1;
                KeyStatus::New
            }
        }
    }

    for row in rows {
        let client_name = clean_text(row.client.name.as_deref()).or_else(|| clean_text(row.client.business_name.as_deref()));
        let client_key = client_name.as_ref().map(|n| n.to_lowercase());
        let ban = clean_text(row.ban.ban_number.as_deref());
        let phone = normalize_phone(row.subscriber.phone.as_deref());

        let client_status = classify(
            client_key.as_deref(),
            &mut clients,
            &mut report.new_clients,
            &mut report.existing_clients,
        );
        let ban_status = classify(ban.as_deref(), &mut bans, &mut report.new_bans, &mut report.existing_bans);
        let subscriber_status = classify(
            phone.as_deref(),
            &mut phones,
            &mut report.new_subscribers,
            &mut report.existing_subscribers,
        );

        report.details.push(RowDetail {
            client: client_name,
            client_status,
            ban,
            ban_status,
            phone,
            subscriber_status,
            plan: clean_text(row.subscriber.service_type.as_deref()),
            price: parse_money(row.subscriber.monthly_value.as_deref()).ok().flatten(),
        });
    }

    report
}

// =============================================================================
//  NORMALIZAÇÃO DE CÉLULAS
// =============================================================================

pub fn normalize_row(row: &ImportRow) -> Result<NormalizedRow, AppError> {
    let sub = &row.subscriber;

    let contract_start_date = parse_date(sub.contract_start_date.as_deref(), "Suscriptores.contract_start_date")?;
    let contract_end_date = parse_date(sub.contract_end_date.as_deref(), "Suscriptores.contract_end_date")?;
    if let (Some(start), Some(end)) = (contract_start_date, contract_end_date) {
        if end < start {
            return Err(AppError::field("Suscriptores.contract_end_date", "ends_before_start"));
        }
    }

    Ok(NormalizedRow {
        client_name: clean_text(row.client.name.as_deref()).or_else(|| clean_text(row.client.business_name.as_deref())),
        vendor_name: clean_text(row.client.vendor.as_deref()),
        ban_number: clean_text(row.ban.ban_number.as_deref()),
        ban_active: parse_status(row.ban.status.as_deref()),
        phone: normalize_phone(sub.phone.as_deref()),
        service_type: clean_text(sub.service_type.as_deref()),
        monthly_value: parse_money(sub.monthly_value.as_deref())
            .map_err(|_| AppError::field("Suscriptores.monthly_value", "invalid_number"))?,
        months: parse_int(sub.months.as_deref())
            .map_err(|_| AppError::field("Suscriptores.months", "invalid_number"))?,
        remaining_payments: parse_int(sub.remaining_payments.as_deref())
            .map_err(|_| AppError::field("Suscriptores.remaining_payments", "invalid_number"))?,
        notes: clean_text(sub.notes.as_deref()),
        subscriber_active: parse_status(sub.status.as_deref()),
        contract_start_date,
        contract_end_date,
    })
}

/// Apara as pontas e colapsa espaços internos; vazio vira None.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    let joined = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

pub fn normalize_phone(raw: Option<&str>) -> Option<String> {
    let digits: String = raw?.chars().filter(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

// "$1,234.50" -> 1234.50
pub fn parse_money(raw: Option<&str>) -> Result<Option<Decimal>, rust_decimal::Error> {
    let Some(raw) = raw else { return Ok(None) };
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    let value: Decimal = cleaned.parse()?;
    Ok(Some(value.round_dp(2)))
}

pub fn parse_int(raw: Option<&str>) -> Result<Option<i32>, std::num::ParseIntError> {
    let Some(raw) = raw else { return Ok(None) };
    // "12.0" vindo do Excel conta como 12
    let integral = raw.split('.').next().unwrap_or_default();
    let digits: String = integral.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Ok(None);
    }
    digits.parse().map(Some)
}

/// Vazio conta como ativo, igual ao padrão da planilha.
pub fn parse_status(raw: Option<&str>) -> bool {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(s) => matches!(s.to_lowercase().as_str(), "activo" | "active" | "1"),
    }
}

/// Aceita YYYY-MM-DD, DD/MM/YYYY e número serial do Excel.
pub fn parse_date(raw: Option<&str>, field: &'static str) -> Result<Option<NaiveDate>, AppError> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    // "2025-03-10T00:00:00.000Z" também chega de alguns exports
    let iso = s.get(..10).unwrap_or(s);
    if let Ok(date) = NaiveDate::parse_from_str(iso, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%d/%m/%Y") {
        return Ok(Some(date));
    }
    if let Ok(serial) = s.parse::<f64>() {
        if (1.0..=2_958_465.0).contains(&serial) {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).ok_or(AppError::field(field, "invalid_date"))?;
            let date = epoch + Duration::days(serial.trunc() as i64);
            if date.year() >= 1900 {
                return Ok(Some(date));
            }
        }
    }

    Err(AppError::field(field, "invalid_date"))
}

// Detalhe de infraestrutura fica só no log
fn row_message(err: &AppError) -> String {
    match err {
        AppError::DatabaseError(_)
        | AppError::InternalServerError(_)
        | AppError::BcryptError(_)
        | AppError::JwtError(_) => "Erro ao gravar a linha".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::import::{BanCells, ClientCells, SubscriberCells};

    fn row(client: &str, ban: &str, phone: &str) -> ImportRow {
        ImportRow {
            client: ClientCells { name: Some(client.into()), ..Default::default() },
            ban: BanCells { ban_number: Some(ban.into()), ..Default::default() },
            subscriber: SubscriberCells { phone: Some(phone.into()), ..Default::default() },
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn text_is_trimmed_and_collapsed() {
        assert_eq!(clean_text(Some("  Ferretería   Los  Pinos ")), Some("Ferretería Los Pinos".into()));
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn phones_keep_digits_only() {
        assert_eq!(normalize_phone(Some("(787) 555-0101")), Some("7875550101".into()));
        assert_eq!(normalize_phone(Some("n/a")), None);
    }

    #[test]
    fn money_and_integers_strip_noise() {
        assert_eq!(parse_money(Some("$1,234.50")).unwrap(), Some(Decimal::new(123_450, 2)));
        assert_eq!(parse_money(Some("")).unwrap(), None);
        assert!(parse_money(Some("1.2.3")).is_err());
        assert_eq!(parse_int(Some("24 meses")).unwrap(), Some(24));
        assert_eq!(parse_int(Some("12.0")).unwrap(), Some(12));
        assert_eq!(parse_int(Some("-")).unwrap(), None);
    }

    #[test]
    fn status_defaults_to_active() {
        assert!(parse_status(None));
        assert!(parse_status(Some("")));
        assert!(parse_status(Some("Activo")));
        assert!(parse_status(Some("ACTIVE")));
        assert!(parse_status(Some("1")));
        assert!(!parse_status(Some("cancelado")));
        assert!(!parse_status(Some("0")));
    }

    #[test]
    fn dates_accept_three_formats() {
        let f = "contract_end_date";
        assert_eq!(parse_date(Some("2025-03-10"), f).unwrap(), Some(date(2025, 3, 10)));
        assert_eq!(parse_date(Some("2025-03-10T00:00:00.000Z"), f).unwrap(), Some(date(2025, 3, 10)));
        assert_eq!(parse_date(Some("10/03/2025"), f).unwrap(), Some(date(2025, 3, 10)));
        // 45726 = 2025-03-10 no calendário do Excel
        assert_eq!(parse_date(Some("45726"), f).unwrap(), Some(date(2025, 3, 10)));
        assert_eq!(parse_date(Some(" "), f).unwrap(), None);
        assert!(parse_date(Some("31/02/2025"), f).is_err());
        assert!(parse_date(Some("amanhã"), f).is_err());
    }

    #[test]
    fn row_normalization_reports_the_bad_cell() {
        let mut r = row("Acme", "1", "787");
        r.subscriber.months = Some("99999999999".into());
        let err = normalize_row(&r).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "Suscriptores.months", .. }));
    }

    #[test]
    fn business_name_backs_up_missing_client_name() {
        let mut r = row("", "1", "787");
        r.client.business_name = Some("Acme Corp".into());
        assert_eq!(normalize_row(&r).unwrap().client_name.as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn inverted_contract_dates_fail_the_row() {
        let mut r = row("Acme", "1", "787");
        r.subscriber.contract_start_date = Some("2025-05-01".into());
        r.subscriber.contract_end_date = Some("2025-01-01".into());
        assert!(normalize_row(&r).is_err());
    }

    #[test]
    fn simulation_counts_duplicates_in_file_once() {
        let existing_clients = HashSet::from(["acme".to_string()]);
        let existing_bans = HashSet::from(["100".to_string()]);
        let rows = vec![
            row("ACME ", "100", "787-555-0001"),
            row("Nuevo Cliente", "200", "787-555-0002"),
            row("nuevo  cliente", "200", "787-555-0002"),
        ];

        let report = simulate_rows(&rows, existing_clients, existing_bans, HashSet::new());

        assert_eq!((report.new_clients, report.existing_clients), (1, 2));
        assert_eq!((report.new_bans, report.existing_bans), (1, 2));
        assert_eq!((report.new_subscribers, report.existing_subscribers), (2, 1));
        assert_eq!(report.details[1].client_status, KeyStatus::New);
        assert_eq!(report.details[2].subscriber_status, KeyStatus::Existing);
        assert_eq!(report.details[0].phone.as_deref(), Some("7875550001"));
    }

    #[test]
    fn empty_cells_are_absent_in_simulation() {
        let rows = vec![ImportRow::default()];
        let report = simulate_rows(&rows, HashSet::new(), HashSet::new(), HashSet::new());
        assert_eq!(report.details[0].client_status, KeyStatus::Absent);
        assert_eq!(report.new_clients, 0);
    }

    #[test]
    fn row_errors_do_not_leak_database_text() {
        let db = AppError::DatabaseError(sqlx::Error::Protocol("relation \"bans\" violates constraint bans_pkey".into()));
        let message = row_message(&db);
        assert_eq!(message, "Erro ao gravar a linha");
        assert!(!message.contains("bans_pkey"));

        let field = AppError::field("BANs.ban_number", "required");
        assert_eq!(row_message(&field), field.to_string());
    }
}
