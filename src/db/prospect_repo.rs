// src/db/prospect_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::prospect::{CompletionRequest, FollowUpProspect, ProspectEvent, ProspectEventKind, ProspectFields},
};

const PROSPECT_COLUMNS: &str = r#"
    id, company_name, client_id, vendor_id,
    fijo_ren, fijo_new, movil_nueva, movil_renovacion, claro_tv, cloud, mpls, total_amount,
    notes, contact_phone, contact_email, last_call_date, next_call_date, call_count,
    is_active, is_completed, completed_date, version, created_at, updated_at
"#;

#[derive(Clone)]
pub struct ProspectRepository {
    pool: PgPool,
}

impl ProspectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Vendedores só enxergam os próprios prospectos (`scope = Some(vendor_id)`).
    pub async fn list<'e, E>(&self, executor: E, scope: Option<Uuid>) -> Result<Vec<FollowUpProspect>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prospects = sqlx::query_as::<_, FollowUpProspect>(&format!(
            r#"
            SELECT {PROSPECT_COLUMNS} FROM follow_up_prospects
            WHERE ($1::uuid IS NULL OR vendor_id = $1)
            ORDER BY next_call_date ASC NULLS LAST, created_at DESC
            "#
        ))
        .bind(scope)
        .fetch_all(executor)
        .await?;

        Ok(prospects)
    }

    pub async fn find<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<FollowUpProspect>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prospect = sqlx::query_as::<_, FollowUpProspect>(&format!(
            "SELECT {PROSPECT_COLUMNS} FROM follow_up_prospects WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(prospect)
    }

    // Trava a linha até o fim da transação
    pub async fn find_for_update<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<FollowUpProspect>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prospect = sqlx::query_as::<_, FollowUpProspect>(&format!(
            "SELECT {PROSPECT_COLUMNS} FROM follow_up_prospects WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(prospect)
    }

    pub async fn create<'e, E>(&self, executor: E, fields: &ProspectFields) -> Result<FollowUpProspect, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prospect = sqlx::query_as::<_, FollowUpProspect>(&format!(
            r#"
            INSERT INTO follow_up_prospects (
                company_name, client_id, vendor_id,
                fijo_ren, fijo_new, movil_nueva, movil_renovacion, claro_tv, cloud, mpls, total_amount,
                notes, contact_phone, contact_email, last_call_date, next_call_date, call_count
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(&fields.company_name)
        .bind(fields.client_id)
        .bind(fields.vendor_id)
        .bind(fields.fijo_ren)
        .bind(fields.fijo_new)
        .bind(fields.movil_nueva)
        .bind(fields.movil_renovacion)
        .bind(fields.claro_tv)
        .bind(fields.cloud)
        .bind(fields.mpls)
        .bind(fields.total_amount)
        .bind(fields.notes.as_deref())
        .bind(fields.contact_phone.as_deref())
        .bind(fields.contact_email.as_deref())
        .bind(fields.last_call_date)
        .bind(fields.next_call_date)
        .bind(fields.call_count)
        .fetch_one(executor)
        .await?;

        Ok(prospect)
    }

    /// Compare-and-set pela versão: `None` quando outra escrita chegou antes.
    pub async fn update_fields<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        expected_version: i32,
        fields: &ProspectFields,
    ) -> Result<Option<FollowUpProspect>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prospect = sqlx::query_as::<_, FollowUpProspect>(&format!(
            r#"
            UPDATE follow_up_prospects SET
                company_name = $3, client_id = $4, vendor_id = $5,
                fijo_ren = $6, fijo_new = $7, movil_nueva = $8, movil_renovacion = $9,
                claro_tv = $10, cloud = $11, mpls = $12, total_amount = $13,
                notes = $14, contact_phone = $15, contact_email = $16,
                last_call_date = $17, next_call_date = $18, call_count = $19,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected_version)
        .bind(&fields.company_name)
        .bind(fields.client_id)
        .bind(fields.vendor_id)
        .bind(fields.fijo_ren)
        .bind(fields.fijo_new)
        .bind(fields.movil_nueva)
        .bind(fields.movil_renovacion)
        .bind(fields.claro_tv)
        .bind(fields.cloud)
        .bind(fields.mpls)
        .bind(fields.total_amount)
        .bind(fields.notes.as_deref())
        .bind(fields.contact_phone.as_deref())
        .bind(fields.contact_email.as_deref())
        .bind(fields.last_call_date)
        .bind(fields.next_call_date)
        .bind(fields.call_count)
        .fetch_optional(executor)
        .await?;

        Ok(prospect)
    }

    // Grava (ou corrige) os dados de conclusão
    pub async fn set_completion<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        completion: &CompletionRequest,
    ) -> Result<FollowUpProspect, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prospect = sqlx::query_as::<_, FollowUpProspect>(&format!(
            r#"
            UPDATE follow_up_prospects SET
                is_completed = TRUE,
                completed_date = $2,
                movil_renovacion = $3,
                total_amount = $4,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(completion.completed_date)
        .bind(completion.movil_renovacion)
        .bind(completion.total_amount)
        .fetch_one(executor)
        .await?;

        Ok(prospect)
    }

    pub async fn deactivate<'e, E>(&self, executor: E, id: Uuid) -> Result<FollowUpProspect, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prospect = sqlx::query_as::<_, FollowUpProspect>(&format!(
            r#"
            UPDATE follow_up_prospects SET
                is_active = FALSE,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PROSPECT_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(prospect)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM follow_up_prospects WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  HISTÓRICO
    // =========================================================================

    pub async fn append_event<'e, E>(
        &self,
        executor: E,
        prospect_id: Uuid,
        kind: ProspectEventKind,
        actor_user_id: Uuid,
        notes: Option<&str>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO prospect_events (prospect_id, kind, actor_user_id, notes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(prospect_id)
        .bind(kind.as_str())
        .bind(actor_user_id)
        .bind(notes)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn list_events(&self, prospect_id: Uuid) -> Result<Vec<ProspectEvent>, AppError> {
        let events = sqlx::query_as::<_, ProspectEvent>(
            r#"
            SELECT id, prospect_id, kind, actor_user_id, notes, occurred_at
            FROM prospect_events
            WHERE prospect_id = $1
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(prospect_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
