// src/services/client_service.rs

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ClientRepository,
    models::auth::Principal,
    models::client::{
        Ban, BanRow, Client, ClientChanges, ClientContact, ClientHeaderRow, ClientSummary, ExpiryThresholds,
        ProspectFlagRow, Subscriber, SubscriberChanges, SubscriberRow, Vendor,
    },
};

#[derive(Clone)]
pub struct ClientService {
    repo: ClientRepository,
    thresholds: ExpiryThresholds,
}

impl ClientService {
    pub fn new(repo: ClientRepository, thresholds: ExpiryThresholds) -> Self {
        Self { repo, thresholds }
    }

    // =========================================================================
    //  1. RESUMO AGREGADO
    // =========================================================================

    pub async fn list_summaries<'e, E>(&self, executor: E, principal: &Principal) -> Result<Vec<ClientSummary>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        self.load_summaries(executor, principal, None).await
    }

    pub async fn get_summary<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        client_id: Uuid,
    ) -> Result<ClientSummary, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        self.load_summaries(executor, principal, Some(client_id))
            .await?
            .into_iter()
            .next()
            .ok_or(AppError::NotFound("Cliente"))
    }

    async fn load_summaries<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        client_id: Option<Uuid>,
    ) -> Result<Vec<ClientSummary>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        // Uma foto consistente das quatro leituras
        let mut tx = executor.begin().await?;
        self.repo.set_snapshot_read_only(&mut *tx).await?;

        let headers = self
            .repo
            .summary_headers(&mut *tx, principal.vendor_scope(), client_id)
            .await?;

        if headers.is_empty() {
            tx.commit().await?;
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let bans = self.repo.summary_bans(&mut *tx, &ids).await?;
        let subscribers = self.repo.summary_subscribers(&mut *tx, &ids).await?;
        let flags = self.repo.summary_prospect_flags(&mut *tx, &ids).await?;
        tx.commit().await?;

        let today = Utc::now().date_naive();
        Ok(build_summaries(headers, &bans, &subscribers, &flags, today, self.thresholds))
    }

    // =========================================================================
    //  2. VENDEDORES
    // =========================================================================

    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, AppError> {
        self.repo.list_vendors().await
    }

    pub async fn create_vendor<'e, E>(&self, executor: E, name: &str) -> Result<Vendor, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.create_vendor(executor, name).await
    }

    // =========================================================================
    //  3. CLIENTES
    // =========================================================================

    pub async fn list_clients<'e, E>(&self, executor: E, principal: &Principal) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_clients(executor, principal.vendor_scope()).await
    }

    pub async fn create_client<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        name: &str,
        business_name: Option<&str>,
        base: Option<&str>,
        vendor_id: Option<Uuid>,
        contact: ClientContact,
    ) -> Result<Client, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // Vendedor sempre cria na própria carteira
        let owner = match principal.vendor_scope() {
            Some(_) => principal.vendor_id,
            None => vendor_id,
        };
        self.ensure_vendor(&mut tx, owner).await?;

        let client = self
            .repo
            .create_client(&mut *tx, name.trim(), business_name.map(str::trim), base, owner, &contact.trimmed())
            .await?;

        tx.commit().await?;
        Ok(client)
    }

    pub async fn update_client<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        mut changes: ClientChanges,
    ) -> Result<Client, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_client(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        if !principal.can_touch(current.vendor_id) {
            return Err(AppError::NotFound("Cliente"));
        }
        if principal.vendor_scope().is_some() && changes.vendor_id.is_some_and(|v| Some(v) != principal.vendor_id) {
            return Err(AppError::Forbidden);
        }
        self.ensure_vendor(&mut tx, changes.vendor_id).await?;

        changes.name = changes.name.map(|n| n.trim().to_string());
        changes.contact = changes.contact.trimmed();
        let client = self
            .repo
            .update_client(&mut *tx, id, &changes)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        tx.commit().await?;
        Ok(client)
    }

    async fn ensure_vendor(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        vendor_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(vendor_id) = vendor_id {
            self.repo
                .find_vendor(&mut **tx, vendor_id)
                .await?
                .ok_or(AppError::NotFound("Vendedor"))?;
        }
        Ok(())
    }

    // Cliente visível para o usuário, ou NotFound
    async fn visible_client(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        principal: &Principal,
        client_id: Uuid,
    ) -> Result<Client, AppError> {
        let client = self
            .repo
            .find_client(&mut **tx, client_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        if !principal.can_touch(client.vendor_id) {
            return Err(AppError::NotFound("Cliente"));
        }
        Ok(client)
    }

    // =========================================================================
    //  4. BANs
    // =========================================================================

    pub async fn list_bans<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        client_id: Option<Uuid>,
    ) -> Result<Vec<Ban>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_bans(executor, principal.vendor_scope(), client_id).await
    }

    pub async fn create_ban<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        client_id: Uuid,
        ban_number: &str,
        description: Option<&str>,
        is_active: bool,
    ) -> Result<Ban, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.visible_client(&mut tx, principal, client_id).await?;

        let ban = self
            .repo
            .create_ban(&mut *tx, ban_number.trim(), client_id, description, is_active)
            .await?;

        tx.commit().await?;
        Ok(ban)
    }

    // =========================================================================
    //  5. ASSINANTES
    // =========================================================================

    pub async fn list_subscribers<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        ban_id: Option<Uuid>,
    ) -> Result<Vec<Subscriber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_subscribers(executor, principal.vendor_scope(), ban_id).await
    }

    pub async fn create_subscriber<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        ban_id: Uuid,
        phone: &str,
        fields: SubscriberChanges,
    ) -> Result<Subscriber, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        check_contract_dates(fields.contract_start_date, fields.contract_end_date)?;
        let mut tx = executor.begin().await?;

        let ban = self
            .repo
            .find_ban(&mut *tx, ban_id)
            .await?
            .ok_or(AppError::NotFound("BAN"))?;
        self.visible_client(&mut tx, principal, ban.client_id).await?;

        let subscriber = self
            .repo
            .create_subscriber(&mut *tx, ban.id, phone.trim(), &fields)
            .await?;

        tx.commit().await?;
        Ok(subscriber)
    }

    pub async fn update_subscriber<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        changes: SubscriberChanges,
    ) -> Result<Subscriber, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_subscriber(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Assinante"))?;
        let ban = self
            .repo
            .find_ban(&mut *tx, current.ban_id)
            .await?
            .ok_or(AppError::NotFound("BAN"))?;
        self.visible_client(&mut tx, principal, ban.client_id).await?;

        check_contract_dates(
            changes.contract_start_date.or(current.contract_start_date),
            changes.contract_end_date.or(current.contract_end_date),
        )?;

        let subscriber = self
            .repo
            .update_subscriber(&mut *tx, id, None, &changes)
            .await?
            .ok_or(AppError::NotFound("Assinante"))?;

        tx.commit().await?;
        Ok(subscriber)
    }
}

fn check_contract_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), AppError> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(AppError::field("contractEndDate", "ends_before_start")),
        _ => Ok(()),
    }
}

// =============================================================================
//  DOBRA PURA DAS LINHAS (testável sem banco)
// =============================================================================

/// Monta um resumo por cabeçalho, na ordem recebida.
pub fn build_summaries(
    headers: Vec<ClientHeaderRow>,
    bans: &[BanRow],
    subscribers: &[SubscriberRow],
    flags: &[ProspectFlagRow],
    today: NaiveDate,
    thresholds: ExpiryThresholds,
) -> Vec<ClientSummary> {
    let ban_by_id: HashMap<Uuid, &BanRow> = bans.iter().map(|b| (b.id, b)).collect();

    let mut bans_by_client: HashMap<Uuid, Vec<&BanRow>> = HashMap::new();
    for ban in bans {
        bans_by_client.entry(ban.client_id).or_default().push(ban);
    }

    let mut subs_by_client: HashMap<Uuid, Vec<&SubscriberRow>> = HashMap::new();
    for sub in subscribers {
        if let Some(ban) = ban_by_id.get(&sub.ban_id) {
            subs_by_client.entry(ban.client_id).or_default().push(sub);
        }
    }

    // (tem prospecto em andamento, tem prospecto concluído)
    let mut flags_by_client: HashMap<Uuid, (bool, bool)> = HashMap::new();
    for flag in flags {
        let entry = flags_by_client.entry(flag.client_id).or_default();
        entry.0 |= flag.is_active && !flag.is_completed;
        entry.1 |= flag.is_completed;
    }

    headers
        .into_iter()
        .map(|header| {
            let client_bans = bans_by_client.remove(&header.id).unwrap_or_default();
            let client_subs = subs_by_client.remove(&header.id).unwrap_or_default();
            let (following, completed) = flags_by_client.get(&header.id).copied().unwrap_or_default();

            let primary = pick_primary_subscriber(&client_subs);
            let primary_ban_number = match primary {
                Some(sub) => ban_by_id.get(&sub.ban_id).map(|b| b.ban_number.clone()),
                None => client_bans.iter().map(|b| &b.ban_number).min().cloned(),
            };
            let end_date = primary.and_then(|s| s.contract_end_date);
            let (days_until_expiry, status) = thresholds.classify(end_date, today);

            let mut ban_numbers: Vec<String> = client_bans.iter().map(|b| b.ban_number.clone()).collect();
            ban_numbers.sort();
            let mut subscriber_phones: Vec<String> = client_subs.iter().map(|s| s.phone.clone()).collect();
            subscriber_phones.sort();

            ClientSummary {
                client_id: header.id,
                client_name: header.name,
                business_name: header.business_name,
                vendor_id: header.vendor_id,
                vendor_name: header.vendor_name,
                total_bans: client_bans.len() as i64,
                total_subscribers: client_subs.len() as i64,
                primary_ban_number,
                primary_subscriber_phone: primary.map(|s| s.phone.clone()),
                primary_contract_end_date: end_date,
                primary_subscriber_created_at: primary.map(|s| s.created_at),
                days_until_expiry,
                status,
                is_being_followed: following,
                was_completed: !following && completed,
                ban_numbers,
                subscriber_phones,
            }
        })
        .collect()
}

/// Vencimento mais próximo; sem nenhuma data, o assinante mais recente.
pub fn pick_primary_subscriber<'a>(subscribers: &[&'a SubscriberRow]) -> Option<&'a SubscriberRow> {
    let soonest = subscribers
        .iter()
        .copied()
        .filter(|s| s.contract_end_date.is_some())
        .min_by(|a, b| {
            a.contract_end_date
                .cmp(&b.contract_end_date)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.phone.cmp(&b.phone))
        });

    soonest.or_else(|| {
        subscribers.iter().copied().min_by(|a, b| match b.created_at.cmp(&a.created_at) {
            Ordering::Equal => a.phone.cmp(&b.phone),
            newer_first => newer_first,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::client::ExpiryStatus;
    use chrono::{DateTime, Duration, TimeZone};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap()
    }

    fn header(name: &str) -> ClientHeaderRow {
        ClientHeaderRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            business_name: None,
            vendor_id: None,
            vendor_name: None,
        }
    }

    fn ban(client: &ClientHeaderRow, number: &str) -> BanRow {
        BanRow { id: Uuid::new_v4(), client_id: client.id, ban_number: number.to_string() }
    }

    fn sub(ban: &BanRow, phone: &str, end: Option<NaiveDate>, created: DateTime<Utc>) -> SubscriberRow {
        SubscriberRow { ban_id: ban.id, phone: phone.to_string(), contract_end_date: end, created_at: created }
    }

    #[test]
    fn dated_subscriber_beats_undated_and_drives_status() {
        let client = header("Acme");
        let ban_a = ban(&client, "200");
        let ban_b = ban(&client, "100");
        let subs = vec![
            sub(&ban_a, "7870000001", None, at(5)),
            sub(&ban_b, "7870000002", Some(today() + Duration::days(5)), at(1)),
        ];

        let out = build_summaries(vec![client], &[ban_a, ban_b], &subs, &[], today(), ExpiryThresholds::default());
        let summary = &out[0];

        assert_eq!(summary.total_bans, 2);
        assert_eq!(summary.total_subscribers, 2);
        assert_eq!(summary.primary_subscriber_phone.as_deref(), Some("7870000002"));
        assert_eq!(summary.primary_ban_number.as_deref(), Some("100"));
        assert_eq!(summary.days_until_expiry, Some(5));
        assert_eq!(summary.status, ExpiryStatus::Critical);
        assert_eq!(summary.ban_numbers, vec!["100", "200"]);
    }

    #[test]
    fn soonest_date_ties_break_on_creation_then_phone() {
        let client = header("Acme");
        let b = ban(&client, "1");
        let end = Some(today() + Duration::days(40));
        let subs = vec![
            sub(&b, "3", end, at(2)),
            sub(&b, "2", end, at(1)),
            sub(&b, "1", end, at(1)),
        ];
        let refs: Vec<&SubscriberRow> = subs.iter().collect();

        assert_eq!(pick_primary_subscriber(&refs).map(|s| s.phone.as_str()), Some("1"));
    }

    #[test]
    fn without_dates_the_newest_subscriber_is_primary() {
        let client = header("Acme");
        let b = ban(&client, "1");
        let subs = vec![sub(&b, "old", None, at(1)), sub(&b, "new-b", None, at(9)), sub(&b, "new-a", None, at(9))];
        let refs: Vec<&SubscriberRow> = subs.iter().collect();

        assert_eq!(pick_primary_subscriber(&refs).map(|s| s.phone.as_str()), Some("new-a"));

        let out = build_summaries(vec![client], &[b], &subs, &[], today(), ExpiryThresholds::default());
        assert_eq!(out[0].status, ExpiryStatus::NoDate);
        assert_eq!(out[0].days_until_expiry, None);
    }

    #[test]
    fn bans_without_subscribers_use_smallest_ban_number() {
        let client = header("Acme");
        let bans = vec![ban(&client, "900"), ban(&client, "150")];

        let out = build_summaries(vec![client], &bans, &[], &[], today(), ExpiryThresholds::default());
        assert_eq!(out[0].primary_ban_number.as_deref(), Some("150"));
        assert_eq!(out[0].primary_subscriber_phone, None);
        assert_eq!(out[0].total_subscribers, 0);
    }

    #[test]
    fn empty_client_still_gets_a_row() {
        let out = build_summaries(vec![header("Solo")], &[], &[], &[], today(), ExpiryThresholds::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].total_bans, 0);
        assert_eq!(out[0].status, ExpiryStatus::NoDate);
    }

    #[test]
    fn counts_do_not_leak_between_clients() {
        let a = header("A");
        let b = header("B");
        let ban_a = ban(&a, "1");
        let ban_b = ban(&b, "2");
        let subs = vec![sub(&ban_a, "10", None, at(1)), sub(&ban_a, "11", None, at(1)), sub(&ban_b, "20", None, at(1))];

        let out = build_summaries(vec![a, b], &[ban_a, ban_b], &subs, &[], today(), ExpiryThresholds::default());
        assert_eq!((out[0].total_bans, out[0].total_subscribers), (1, 2));
        assert_eq!((out[1].total_bans, out[1].total_subscribers), (1, 1));
        assert_eq!(out[1].subscriber_phones, vec!["20"]);
    }

    #[test]
    fn follow_flags_prefer_active_over_completed() {
        let a = header("A");
        let b = header("B");
        let flags = vec![
            ProspectFlagRow { client_id: a.id, is_active: true, is_completed: false },
            ProspectFlagRow { client_id: a.id, is_active: true, is_completed: true },
            ProspectFlagRow { client_id: b.id, is_active: true, is_completed: true },
        ];

        let out = build_summaries(vec![a, b], &[], &[], &flags, today(), ExpiryThresholds::default());
        assert!(out[0].is_being_followed);
        assert!(!out[0].was_completed);
        assert!(!out[1].is_being_followed);
        assert!(out[1].was_completed);
    }
}
