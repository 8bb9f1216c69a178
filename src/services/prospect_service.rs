// src/services/prospect_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    common::money::{check_money, check_quantity, max_amount},
    db::{ClientRepository, ProspectRepository},
    models::auth::{Principal, Role},
    models::prospect::{
        CompletionRequest, FollowUpProspect, ProspectEvent, ProspectEventKind, ProspectFields,
    },
};

/// O que um `complete` deve fazer com o prospecto atual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPlan {
    // Mesmos argumentos de uma conclusão anterior
    NoOp,
    // pending -> completed
    Transition,
    // Já concluído, argumentos diferentes: corrige sem novo evento "completed"
    Amend,
}

pub fn plan_completion(current: &FollowUpProspect, request: &CompletionRequest) -> Result<CompletionPlan, AppError> {
    if current.is_completed {
        let same = current.completed_date == Some(request.completed_date)
            && current.movil_renovacion == request.movil_renovacion
            && current.total_amount == request.total_amount;
        return Ok(if same { CompletionPlan::NoOp } else { CompletionPlan::Amend });
    }
    if !current.is_active {
        return Err(AppError::Conflict("Prospecto cancelado não pode ser concluído.".into()));
    }
    Ok(CompletionPlan::Transition)
}

fn validate_amounts(fields: &ProspectFields) -> Result<(), AppError> {
    let amounts = [
        ("fijoRen", fields.fijo_ren),
        ("fijoNew", fields.fijo_new),
        ("movilNueva", fields.movil_nueva),
        ("movilRenovacion", fields.movil_renovacion),
        ("claroTv", fields.claro_tv),
        ("cloud", fields.cloud),
        ("mpls", fields.mpls),
        ("totalAmount", fields.total_amount),
    ];
    for (field, value) in amounts {
        // Renovações móveis são contagem de linhas
        if field == "movilRenovacion" {
            check_quantity(value, max_amount(), field)?;
        } else {
            check_money(value, max_amount(), field)?;
        }
    }
    Ok(())
}

// Mesmo critério do cadastro: só valores que o banco guarda sem arredondar
fn validate_completion(request: &CompletionRequest) -> Result<(), AppError> {
    check_quantity(request.movil_renovacion, max_amount(), "movilRenovacion")?;
    check_money(request.total_amount, max_amount(), "totalAmount")
}

// Vendedor sempre grava como dono; sem vínculo de vendedor não cria nada
fn owner_for(principal: &Principal, requested: Option<Uuid>) -> Result<Option<Uuid>, AppError> {
    match principal.role {
        Role::Vendor => principal.vendor_id.map(Some).ok_or(AppError::Forbidden),
        Role::Admin | Role::Supervisor => Ok(requested),
    }
}

#[derive(Clone)]
pub struct ProspectService {
    repo: ProspectRepository,
    client_repo: ClientRepository,
}

impl ProspectService {
    pub fn new(repo: ProspectRepository, client_repo: ClientRepository) -> Self {
        Self { repo, client_repo }
    }

    pub async fn list<'e, E>(&self, executor: E, principal: &Principal) -> Result<Vec<FollowUpProspect>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list(executor, principal.vendor_scope()).await
    }

    pub async fn get<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<FollowUpProspect, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prospect = self.repo.find(executor, id).await?.ok_or(AppError::NotFound("Prospecto"))?;
        ensure_visible(principal, &prospect)?;
        Ok(prospect)
    }

    pub async fn history<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<Vec<ProspectEvent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.get(executor, principal, id).await?;
        self.repo.list_events(id).await
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        mut fields: ProspectFields,
    ) -> Result<FollowUpProspect, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        validate_amounts(&fields)?;
        fields.vendor_id = owner_for(principal, fields.vendor_id)?;

        let mut tx = executor.begin().await?;
        self.check_links(&mut tx, principal, &fields).await?;

        let prospect = self.repo.create(&mut *tx, &fields).await?;
        self.repo
            .append_event(&mut *tx, prospect.id, ProspectEventKind::Created, principal.user_id, None)
            .await?;

        tx.commit().await?;
        tracing::info!("Prospecto {} criado por {}", prospect.id, principal.user_id);
        Ok(prospect)
    }

    /// Edição com controle otimista: `version` precisa ser a atual.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        version: i32,
        mut fields: ProspectFields,
    ) -> Result<FollowUpProspect, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        validate_amounts(&fields)?;

        let mut tx = executor.begin().await?;
        let current = self.repo.find(&mut *tx, id).await?.ok_or(AppError::NotFound("Prospecto"))?;
        ensure_visible(principal, &current)?;

        fields.vendor_id = owner_for(principal, fields.vendor_id)?;
        self.check_links(&mut tx, principal, &fields).await?;

        let updated = self
            .repo
            .update_fields(&mut *tx, id, version, &fields)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "O prospecto foi alterado por outra pessoa (versão atual {}).",
                    current.version
                ))
            })?;
        self.repo
            .append_event(&mut *tx, id, ProspectEventKind::Updated, principal.user_id, None)
            .await?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn complete<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        request: CompletionRequest,
    ) -> Result<FollowUpProspect, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        validate_completion(&request)?;

        let mut tx = executor.begin().await?;
        let current = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Prospecto"))?;
        ensure_visible(principal, &current)?;

        let prospect = match plan_completion(&current, &request)? {
            CompletionPlan::NoOp => current,
            CompletionPlan::Transition => {
                let done = self.repo.set_completion(&mut *tx, id, &request).await?;
                self.repo
                    .append_event(&mut *tx, id, ProspectEventKind::Completed, principal.user_id, None)
                    .await?;
                tracing::info!("✅ Prospecto {} concluído em {}", id, request.completed_date);
                done
            }
            CompletionPlan::Amend => {
                let amended = self.repo.set_completion(&mut *tx, id, &request).await?;
                self.repo
                    .append_event(
                        &mut *tx,
                        id,
                        ProspectEventKind::Updated,
                        principal.user_id,
                        Some("dados de conclusão corrigidos"),
                    )
                    .await?;
                amended
            }
        };

        tx.commit().await?;
        Ok(prospect)
    }

    /// Para de acompanhar (pending -> cancelled). Repetir não muda nada.
    pub async fn stop<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<FollowUpProspect, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let current = self
            .repo
            .find_for_update(&mut *tx, id)
            .await?
            .ok_or(AppError::NotFound("Prospecto"))?;
        ensure_visible(principal, &current)?;

        if current.is_completed {
            return Err(AppError::Conflict("Prospecto já concluído.".into()));
        }
        if !current.is_active {
            tx.commit().await?;
            return Ok(current);
        }

        let stopped = self.repo.deactivate(&mut *tx, id).await?;
        self.repo
            .append_event(&mut *tx, id, ProspectEventKind::Stopped, principal.user_id, None)
            .await?;

        tx.commit().await?;
        Ok(stopped)
    }

    pub async fn delete<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<(), AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let current = self.repo.find(&mut *tx, id).await?.ok_or(AppError::NotFound("Prospecto"))?;
        ensure_visible(principal, &current)?;

        self.repo.delete(&mut *tx, id).await?;
        tx.commit().await?;
        tracing::info!("Prospecto {} removido por {}", id, principal.user_id);
        Ok(())
    }

    // Cliente vinculado precisa existir e, para vendedor, não pode ser de outro vendedor
    async fn check_links(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        principal: &Principal,
        fields: &ProspectFields,
    ) -> Result<(), AppError> {
        if let Some(vendor_id) = fields.vendor_id {
            self.client_repo
                .find_vendor(&mut **tx, vendor_id)
                .await?
                .ok_or(AppError::NotFound("Vendedor"))?;
        }
        if let Some(client_id) = fields.client_id {
            let client = self
                .client_repo
                .find_client(&mut **tx, client_id)
                .await?
                .ok_or(AppError::NotFound("Cliente"))?;
            if !principal.can_touch(client.vendor_id) {
                return Err(AppError::Forbidden);
            }
        }
        Ok(())
    }
}

// Vendedor só enxerga prospectos próprios
fn ensure_visible(principal: &Principal, prospect: &FollowUpProspect) -> Result<(), AppError> {
    match principal.vendor_scope() {
        Some(mine) if prospect.vendor_id != Some(mine) => Err(AppError::NotFound("Prospecto")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use chrono::{NaiveDate, Utc};

    fn pending() -> FollowUpProspect {
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

    fn request(day: u32, renewals: i64, total: i64) -> CompletionRequest {
        CompletionRequest {
            completed_date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            movil_renovacion: Decimal::from(renewals),
            total_amount: Decimal::from(total),
        }
    }

    // Aplica o plano como o repositório faria
    fn apply(mut p: FollowUpProspect, req: &CompletionRequest) -> FollowUpProspect {
        match plan_completion(&p, req).unwrap() {
            CompletionPlan::NoOp => p,
            CompletionPlan::Transition | CompletionPlan::Amend => {
                p.is_completed = true;
                p.completed_date = Some(req.completed_date);
                p.movil_renovacion = req.movil_renovacion;
                p.total_amount = req.total_amount;
                p.version += 1;
                p
            }
        }
    }

    #[test]
    fn pending_prospect_transitions() {
        assert_eq!(plan_completion(&pending(), &request(10, 3, 210)).unwrap(), CompletionPlan::Transition);
    }

    #[test]
    fn completing_twice_with_same_arguments_is_a_no_op() {
        let req = request(10, 3, 210);
        let once = apply(pending(), &req);
        let twice = apply(once.clone(), &req);

        assert_eq!(once, twice);
        assert_eq!(twice.version, 2);
        assert_eq!(plan_completion(&twice, &req).unwrap(), CompletionPlan::NoOp);
    }

    #[test]
    fn equal_decimals_with_different_scale_still_match() {
        let done = apply(pending(), &request(10, 3, 210));
        let same = CompletionRequest { total_amount: Decimal::new(21_000, 2), ..request(10, 3, 210) };
        assert_eq!(plan_completion(&done, &same).unwrap(), CompletionPlan::NoOp);
    }

    #[test]
    fn different_arguments_amend_a_completed_prospect() {
        let done = apply(pending(), &request(10, 3, 210));
        assert_eq!(plan_completion(&done, &request(11, 3, 210)).unwrap(), CompletionPlan::Amend);
        assert_eq!(plan_completion(&done, &request(10, 4, 210)).unwrap(), CompletionPlan::Amend);

        let amended = apply(done, &request(11, 3, 210));
        assert_eq!(amended.version, 3);
        assert_eq!(amended.completed_date, NaiveDate::from_ymd_opt(2025, 3, 11));
    }

    #[test]
    fn cancelled_prospect_cannot_be_completed() {
        let mut p = pending();
        p.is_active = false;
        assert!(matches!(plan_completion(&p, &request(10, 1, 1)), Err(AppError::Conflict(_))));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let fields = ProspectFields { cloud: Decimal::from(-5), ..Default::default() };
        assert!(matches!(validate_amounts(&fields), Err(AppError::InvalidField { field: "cloud", .. })));
    }

    #[test]
    fn completion_rejects_values_the_database_would_round() {
        let done = apply(pending(), &CompletionRequest { total_amount: Decimal::new(21_056, 2), ..request(10, 3, 0) });

        // 210.555 seria gravado como 210.56 e a próxima chamada viraria Amend
        let rounded = CompletionRequest { total_amount: Decimal::new(210_555, 3), ..request(10, 3, 0) };
        assert!(matches!(
            validate_completion(&rounded),
            Err(AppError::InvalidField { field: "totalAmount", code: "too_many_decimals" })
        ));

        let fractional = CompletionRequest { movil_renovacion: Decimal::new(25, 1), ..request(10, 3, 0) };
        assert!(matches!(
            validate_completion(&fractional),
            Err(AppError::InvalidField { field: "movilRenovacion", code: "fractional_quantity" })
        ));

        let exact = CompletionRequest { total_amount: Decimal::new(21_056, 2), ..request(10, 3, 0) };
        assert!(validate_completion(&exact).is_ok());
        assert_eq!(plan_completion(&done, &exact).unwrap(), CompletionPlan::NoOp);
    }

    #[test]
    fn amounts_must_fit_the_money_columns() {
        let huge = ProspectFields { total_amount: Decimal::from(100_000_000_000i64), ..Default::default() };
        assert!(matches!(
            validate_amounts(&huge),
            Err(AppError::InvalidField { field: "totalAmount", code: "value_too_large" })
        ));

        let precise = ProspectFields { mpls: Decimal::new(1_2345, 3), ..Default::default() };
        assert!(matches!(
            validate_amounts(&precise),
            Err(AppError::InvalidField { field: "mpls", code: "too_many_decimals" })
        ));

        let renewals = ProspectFields { movil_renovacion: Decimal::new(15, 1), ..Default::default() };
        assert!(matches!(
            validate_amounts(&renewals),
            Err(AppError::InvalidField { field: "movilRenovacion", code: "fractional_quantity" })
        ));

        let fine = ProspectFields { total_amount: Decimal::new(99_999, 2), movil_renovacion: Decimal::from(4), ..Default::default() };
        assert!(validate_amounts(&fine).is_ok());
    }

    #[test]
    fn unlinked_vendor_cannot_own_prospects() {
        let orphan = Principal { user_id: Uuid::new_v4(), role: Role::Vendor, vendor_id: None };
        assert!(matches!(owner_for(&orphan, None), Err(AppError::Forbidden)));

        let mine = Uuid::new_v4();
        let vendor = Principal { vendor_id: Some(mine), ..orphan.clone() };
        assert_eq!(owner_for(&vendor, Some(Uuid::new_v4())).unwrap(), Some(mine));

        let other = Uuid::new_v4();
        let admin = Principal { user_id: Uuid::new_v4(), role: Role::Admin, vendor_id: None };
        assert_eq!(owner_for(&admin, Some(other)).unwrap(), Some(other));
    }

    #[test]
    fn vendors_only_see_their_own_prospects() {
        let mine = Uuid::new_v4();
        let vendor = Principal { user_id: Uuid::new_v4(), role: Role::Vendor, vendor_id: Some(mine) };
        let admin = Principal { user_id: Uuid::new_v4(), role: Role::Admin, vendor_id: None };

        let mut p = pending();
        assert!(ensure_visible(&vendor, &p).is_err());
        assert!(ensure_visible(&admin, &p).is_ok());

        p.vendor_id = Some(mine);
        assert!(ensure_visible(&vendor, &p).is_ok());
    }
}
