// src/db/client_repo.rs

use std::collections::HashSet;

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::client::{
        Ban, BanRow, Client, ClientChanges, ClientContact, ClientHeaderRow, ProspectFlagRow, Subscriber,
        SubscriberChanges, SubscriberRow, Vendor,
    },
};

const CLIENT_COLUMNS: &str = r#"
    id, name, business_name, base, vendor_id, contact_person, email, phone, secondary_phone,
    mobile_phone, address, city, zip_code, is_active, created_at, updated_at
"#;
const BAN_COLUMNS: &str = "id, ban_number, client_id, description, is_active, created_at, updated_at";
const SUBSCRIBER_COLUMNS: &str = r#"
    id, phone, ban_id, service_type, monthly_value, months, remaining_payments, notes,
    is_active, contract_start_date, contract_end_date, created_at, updated_at
"#;

// Filtro de carteira: $n NULL = sem escopo; senão só o vendedor ou clientes sem dono
const VENDOR_SCOPE: &str = "($1::uuid IS NULL OR c.vendor_id = $1 OR c.vendor_id IS NULL)";

#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  VENDEDORES
    // =========================================================================

    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, AppError> {
        let vendors = sqlx::query_as::<_, Vendor>(
            "SELECT id, name, is_active, created_at FROM vendors ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(vendors)
    }

    pub async fn find_vendor<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Vendor>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let vendor = sqlx::query_as::<_, Vendor>(
            "SELECT id, name, is_active, created_at FROM vendors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(vendor)
    }

    /// Usado pela importação: a planilha traz o nome, não o id.
    pub async fn find_vendor_by_name<'e, E>(&self, executor: E, name: &str) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM vendors WHERE LOWER(TRIM(name)) = LOWER(TRIM($1)) ORDER BY created_at LIMIT 1",
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(id)
    }

    pub async fn create_vendor<'e, E>(&self, executor: E, name: &str) -> Result<Vendor, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let vendor = sqlx::query_as::<_, Vendor>(
            "INSERT INTO vendors (name) VALUES ($1) RETURNING id, name, is_active, created_at",
        )
        .bind(name.trim())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O vendedor '{}' já existe.", name)))?;

        Ok(vendor)
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn list_clients<'e, E>(&self, executor: E, scope: Option<Uuid>) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients c WHERE {VENDOR_SCOPE} ORDER BY c.name ASC"
        ))
        .bind(scope)
        .fetch_all(executor)
        .await?;

        Ok(clients)
    }

    pub async fn find_client<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(client)
    }

    /// Casamento da importação: nome OU razão social, ignorando caixa e espaços das pontas.
    pub async fn find_client_by_name<'e, E>(&self, executor: E, name: &str) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS} FROM clients
            WHERE LOWER(TRIM(name)) = LOWER(TRIM($1))
               OR LOWER(TRIM(business_name)) = LOWER(TRIM($1))
            ORDER BY created_at ASC
            LIMIT 1
            "#
        ))
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(client)
    }

    pub async fn create_client<'e, E>(
        &self,
        executor: E,
        name: &str,
        business_name: Option<&str>,
        base: Option<&str>,
        vendor_id: Option<Uuid>,
        contact: &ClientContact,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (
                name, business_name, base, vendor_id, contact_person, email, phone,
                secondary_phone, mobile_phone, address, city, zip_code
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(business_name)
        .bind(base)
        .bind(vendor_id)
        .bind(contact.contact_person.as_deref())
        .bind(contact.email.as_deref())
        .bind(contact.phone.as_deref())
        .bind(contact.secondary_phone.as_deref())
        .bind(contact.mobile_phone.as_deref())
        .bind(contact.address.as_deref())
        .bind(contact.city.as_deref())
        .bind(contact.zip_code.as_deref())
        .fetch_one(executor)
        .await?;

        Ok(client)
    }

    // Campos ausentes mantêm o valor gravado
    pub async fn update_client<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        changes: &ClientChanges,
    ) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients SET
                name = COALESCE($2, name),
                business_name = COALESCE($3, business_name),
                base = COALESCE($4, base),
                vendor_id = COALESCE($5, vendor_id),
                is_active = COALESCE($6, is_active),
                contact_person = COALESCE($7, contact_person),
                email = COALESCE($8, email),
                phone = COALESCE($9, phone),
                secondary_phone = COALESCE($10, secondary_phone),
                mobile_phone = COALESCE($11, mobile_phone),
                address = COALESCE($12, address),
                city = COALESCE($13, city),
                zip_code = COALESCE($14, zip_code),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.business_name.as_deref())
        .bind(changes.base.as_deref())
        .bind(changes.vendor_id)
        .bind(changes.is_active)
        .bind(changes.contact.contact_person.as_deref())
        .bind(changes.contact.email.as_deref())
        .bind(changes.contact.phone.as_deref())
        .bind(changes.contact.secondary_phone.as_deref())
        .bind(changes.contact.mobile_phone.as_deref())
        .bind(changes.contact.address.as_deref())
        .bind(changes.contact.city.as_deref())
        .bind(changes.contact.zip_code.as_deref())
        .fetch_optional(executor)
        .await?;

        Ok(client)
    }

    /// Preenche o vendedor só se o cliente ainda não tiver um.
    pub async fn fill_client_vendor<'e, E>(&self, executor: E, id: Uuid, vendor_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE clients SET vendor_id = COALESCE(vendor_id, $2), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(vendor_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    // =========================================================================
    //  LINHAS PARA O RESUMO (lidas dentro da mesma transação REPEATABLE READ)
    // =========================================================================

    // Precisa ser o primeiro comando da transação
    pub async fn set_snapshot_read_only<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(executor)
            .await?;
        Ok(())
    }

    /// `client_id = None` lista os clientes ativos; `Some` busca um só (ativo ou não).
    pub async fn summary_headers<'e, E>(
        &self,
        executor: E,
        scope: Option<Uuid>,
        client_id: Option<Uuid>,
    ) -> Result<Vec<ClientHeaderRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ClientHeaderRow>(&format!(
            r#"
            SELECT c.id, c.name, c.business_name, c.vendor_id, v.name AS vendor_name
            FROM clients c
            LEFT JOIN vendors v ON v.id = c.vendor_id
            WHERE {VENDOR_SCOPE}
              AND (($2::uuid IS NULL AND c.is_active) OR c.id = $2)
            ORDER BY c.name ASC, c.id ASC
            "#
        ))
        .bind(scope)
        .bind(client_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn summary_bans<'e, E>(&self, executor: E, client_ids: &[Uuid]) -> Result<Vec<BanRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, BanRow>(
            "SELECT id, client_id, ban_number FROM bans WHERE client_id = ANY($1)",
        )
        .bind(client_ids)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn summary_subscribers<'e, E>(
        &self,
        executor: E,
        client_ids: &[Uuid],
    ) -> Result<Vec<SubscriberRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT s.ban_id, s.phone, s.contract_end_date, s.created_at
            FROM subscribers s
            INNER JOIN bans b ON b.id = s.ban_id
            WHERE b.client_id = ANY($1)
            "#,
        )
        .bind(client_ids)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    pub async fn summary_prospect_flags<'e, E>(
        &self,
        executor: E,
        client_ids: &[Uuid],
    ) -> Result<Vec<ProspectFlagRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ProspectFlagRow>(
            r#"
            SELECT client_id, is_active, is_completed
            FROM follow_up_prospects
            WHERE client_id = ANY($1)
            "#,
        )
        .bind(client_ids)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    // =========================================================================
    //  BANs
    // =========================================================================

    pub async fn list_bans<'e, E>(
        &self,
        executor: E,
        scope: Option<Uuid>,
        client_id: Option<Uuid>,
    ) -> Result<Vec<Ban>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bans = sqlx::query_as::<_, Ban>(
            r#"
            SELECT b.id, b.ban_number, b.client_id, b.description, b.is_active, b.created_at, b.updated_at
            FROM bans b
            INNER JOIN clients c ON c.id = b.client_id
            WHERE ($1::uuid IS NULL OR c.vendor_id = $1 OR c.vendor_id IS NULL)
              AND ($2::uuid IS NULL OR b.client_id = $2)
            ORDER BY b.ban_number ASC
            "#,
        )
        .bind(scope)
        .bind(client_id)
        .fetch_all(executor)
        .await?;

        Ok(bans)
    }

    pub async fn find_ban<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Ban>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ban = sqlx::query_as::<_, Ban>(&format!("SELECT {BAN_COLUMNS} FROM bans WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(ban)
    }

    pub async fn find_ban_by_number<'e, E>(&self, executor: E, ban_number: &str) -> Result<Option<Ban>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ban = sqlx::query_as::<_, Ban>(&format!(
            "SELECT {BAN_COLUMNS} FROM bans WHERE ban_number = $1"
        ))
        .bind(ban_number)
        .fetch_optional(executor)
        .await?;

        Ok(ban)
    }

    pub async fn create_ban<'e, E>(
        &self,
        executor: E,
        ban_number: &str,
        client_id: Uuid,
        description: Option<&str>,
        is_active: bool,
    ) -> Result<Ban, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ban = sqlx::query_as::<_, Ban>(&format!(
            r#"
            INSERT INTO bans (ban_number, client_id, description, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING {BAN_COLUMNS}
            "#
        ))
        .bind(ban_number)
        .bind(client_id)
        .bind(description)
        .bind(is_active)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O BAN '{}' já existe.", ban_number)))?;

        Ok(ban)
    }

    /// Move o BAN para o cliente da linha importada e atualiza o status.
    pub async fn rehome_ban<'e, E>(&self, executor: E, id: Uuid, client_id: Uuid, is_active: bool) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE bans SET client_id = $2, is_active = $3, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(client_id)
            .bind(is_active)
            .execute(executor)
            .await?;

        Ok(())
    }

    // =========================================================================
    //  ASSINANTES
    // =========================================================================

    pub async fn list_subscribers<'e, E>(
        &self,
        executor: E,
        scope: Option<Uuid>,
        ban_id: Option<Uuid>,
    ) -> Result<Vec<Subscriber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscribers = sqlx::query_as::<_, Subscriber>(
            r#"
            SELECT s.id, s.phone, s.ban_id, s.service_type, s.monthly_value, s.months,
                   s.remaining_payments, s.notes, s.is_active, s.contract_start_date,
                   s.contract_end_date, s.created_at, s.updated_at
            FROM subscribers s
            INNER JOIN bans b ON b.id = s.ban_id
            INNER JOIN clients c ON c.id = b.client_id
            WHERE ($1::uuid IS NULL OR c.vendor_id = $1 OR c.vendor_id IS NULL)
              AND ($2::uuid IS NULL OR s.ban_id = $2)
            ORDER BY s.phone ASC
            "#,
        )
        .bind(scope)
        .bind(ban_id)
        .fetch_all(executor)
        .await?;

        Ok(subscribers)
    }

    pub async fn find_subscriber<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Subscriber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriber = sqlx::query_as::<_, Subscriber>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(subscriber)
    }

    pub async fn find_subscriber_by_phone<'e, E>(
        &self,
        executor: E,
        phone: &str,
    ) -> Result<Option<Subscriber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriber = sqlx::query_as::<_, Subscriber>(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE phone = $1"
        ))
        .bind(phone)
        .fetch_optional(executor)
        .await?;

        Ok(subscriber)
    }

    pub async fn create_subscriber<'e, E>(
        &self,
        executor: E,
        ban_id: Uuid,
        phone: &str,
        fields: &SubscriberChanges,
    ) -> Result<Subscriber, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriber = sqlx::query_as::<_, Subscriber>(&format!(
            r#"
            INSERT INTO subscribers (
                ban_id, phone, service_type, monthly_value, months, remaining_payments,
                notes, is_active, contract_start_date, contract_end_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, TRUE), $9, $10)
            RETURNING {SUBSCRIBER_COLUMNS}
            "#
        ))
        .bind(ban_id)
        .bind(phone)
        .bind(fields.service_type.as_deref())
        .bind(fields.monthly_value)
        .bind(fields.months)
        .bind(fields.remaining_payments)
        .bind(fields.notes.as_deref())
        .bind(fields.is_active)
        .bind(fields.contract_start_date)
        .bind(fields.contract_end_date)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("A linha '{}' já existe.", phone)))?;

        Ok(subscriber)
    }

    // `ban_id = None` mantém o BAN atual
    pub async fn update_subscriber<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        ban_id: Option<Uuid>,
        changes: &SubscriberChanges,
    ) -> Result<Option<Subscriber>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let subscriber = sqlx::query_as::<_, Subscriber>(&format!(
            r#"
            UPDATE subscribers SET
                ban_id = COALESCE($2, ban_id),
                phone = COALESCE($3, phone),
                service_type = COALESCE($4, service_type),
                monthly_value = COALESCE($5, monthly_value),
                months = COALESCE($6, months),
                remaining_payments = COALESCE($7, remaining_payments),
                notes = COALESCE($8, notes),
                is_active = COALESCE($9, is_active),
                contract_start_date = COALESCE($10, contract_start_date),
                contract_end_date = COALESCE($11, contract_end_date),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBSCRIBER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(ban_id)
        .bind(changes.phone.as_deref())
        .bind(changes.service_type.as_deref())
        .bind(changes.monthly_value)
        .bind(changes.months)
        .bind(changes.remaining_payments)
        .bind(changes.notes.as_deref())
        .bind(changes.is_active)
        .bind(changes.contract_start_date)
        .bind(changes.contract_end_date)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, "Telefone já cadastrado em outra linha."))?;

        Ok(subscriber)
    }

    // =========================================================================
    //  CHAVES EXISTENTES (simulação de importação)
    // =========================================================================

    pub async fn existing_client_keys<'e, E>(&self, executor: E) -> Result<HashSet<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let keys: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT LOWER(TRIM(name)) FROM clients
            UNION
            SELECT LOWER(TRIM(business_name)) FROM clients WHERE business_name IS NOT NULL
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(keys.into_iter().collect())
    }

    pub async fn existing_ban_numbers<'e, E>(&self, executor: E) -> Result<HashSet<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let keys: Vec<String> = sqlx::query_scalar("SELECT ban_number FROM bans")
            .fetch_all(executor)
            .await?;

        Ok(keys.into_iter().collect())
    }

    pub async fn existing_phones<'e, E>(&self, executor: E) -> Result<HashSet<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let keys: Vec<String> = sqlx::query_scalar("SELECT phone FROM subscribers")
            .fetch_all(executor)
            .await?;

        Ok(keys.into_iter().collect())
    }
}
