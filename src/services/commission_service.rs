// src/services/commission_service.rs

use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{Acquire, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    common::money::{check_money, check_quantity, max_amount, max_tier_value},
    db::ProductRepository,
    models::product::{
        CommissionResolution, CommissionSource, CommissionTier, Product, TierBasis, TierCoverage,
        TierGap, TierInput, TierOverlap,
    },
};

#[derive(Clone)]
pub struct CommissionService {
    repo: ProductRepository,
}

impl CommissionService {
    pub fn new(repo: ProductRepository) -> Self {
        Self { repo }
    }

    // =========================================================================
    //  1. RESOLUÇÃO
    // =========================================================================

    pub async fn resolve<'e, E>(&self, executor: E, product_id: Uuid, value: Decimal) -> Result<CommissionResolution, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let product = self
            .repo
            .find_product(&mut *tx, product_id)
            .await?
            .ok_or(AppError::NotFound("Produto"))?;
        validate_value(product.tier_basis, value, "value")?;

        let tiers = self.repo.list_tiers(&mut *tx, product_id).await?;
        tx.commit().await?;

        select_commission(&product, &tiers, value)
    }

    // =========================================================================
    //  2. MANUTENÇÃO DAS FAIXAS
    // =========================================================================

    pub async fn list_tiers<'e, E>(&self, executor: E, product_id: Uuid) -> Result<Vec<CommissionTier>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.repo
            .find_product(&mut *tx, product_id)
            .await?
            .ok_or(AppError::NotFound("Produto"))?;
        let tiers = self.repo.list_tiers(&mut *tx, product_id).await?;
        tx.commit().await?;
        Ok(tiers)
    }

    pub async fn create_tier<'e, E>(&self, executor: E, product_id: Uuid, input: TierInput) -> Result<CommissionTier, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // FOR UPDATE serializa escritas concorrentes nas faixas do mesmo produto
        let product = self
            .repo
            .lock_product(&mut *tx, product_id)
            .await?
            .ok_or(AppError::NotFound("Produto"))?;
        validate_tier_input(product.tier_basis, &input)?;

        let existing = self.repo.list_tiers(&mut *tx, product_id).await?;
        reject_overlap(&existing, &input, None)?;

        let tier = self.repo.create_tier(&mut *tx, product_id, &input).await?;
        tx.commit().await?;

        tracing::info!("Faixa {} criada para o produto {}", tier.id, product_id);
        Ok(tier)
    }

    pub async fn update_tier<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        tier_id: Uuid,
        input: TierInput,
    ) -> Result<CommissionTier, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let product = self
            .repo
            .lock_product(&mut *tx, product_id)
            .await?
            .ok_or(AppError::NotFound("Produto"))?;
        validate_tier_input(product.tier_basis, &input)?;

        let existing = self.repo.list_tiers(&mut *tx, product_id).await?;
        if !existing.iter().any(|t| t.id == tier_id) {
            return Err(AppError::NotFound("Faixa"));
        }
        reject_overlap(&existing, &input, Some(tier_id))?;

        let tier = self
            .repo
            .update_tier(&mut *tx, product_id, tier_id, &input)
            .await?
            .ok_or(AppError::NotFound("Faixa"))?;

        tx.commit().await?;
        Ok(tier)
    }

    pub async fn delete_tier<'e, E>(&self, executor: E, product_id: Uuid, tier_id: Uuid) -> Result<(), AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        if !self.repo.delete_tier(&mut *tx, product_id, tier_id).await? {
            return Err(AppError::NotFound("Faixa"));
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn coverage<'e, E>(&self, executor: E, product_id: Uuid) -> Result<TierCoverage, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let product = self
            .repo
            .find_product(&mut *tx, product_id)
            .await?
            .ok_or(AppError::NotFound("Produto"))?;
        let tiers = self.repo.list_tiers(&mut *tx, product_id).await?;
        tx.commit().await?;

        Ok(analyze_coverage(product.id, product.tier_basis, &tiers))
    }
}

// =============================================================================
//  REGRAS PURAS
// =============================================================================

pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Quantidade é inteira; valor em dinheiro tem no máximo 2 casas. Ambos cabem em NUMERIC(14,2).
pub fn validate_value(basis: TierBasis, value: Decimal, field: &'static str) -> Result<(), AppError> {
    match basis {
        TierBasis::Quantity => check_quantity(value, max_tier_value(), field),
        TierBasis::Amount => check_money(value, max_tier_value(), field),
    }
}

pub fn validate_tier_input(basis: TierBasis, input: &TierInput) -> Result<(), AppError> {
    validate_value(basis, input.range_min, "rangeMin")?;
    if let Some(max) = input.range_max {
        validate_value(basis, max, "rangeMax")?;
        if max < input.range_min {
            return Err(AppError::field("rangeMax", "range_inverted"));
        }
    }
    check_money(input.commission_amount, max_amount(), "commissionAmount")
}

fn reject_overlap(existing: &[CommissionTier], input: &TierInput, ignore: Option<Uuid>) -> Result<(), AppError> {
    let clash = existing
        .iter()
        .filter(|t| Some(t.id) != ignore)
        .find(|t| t.overlaps(input.range_min, input.range_max));

    match clash {
        Some(tier) => Err(AppError::Conflict(format!(
            "A faixa sobrepõe a faixa {} ({} - {})",
            tier.id,
            tier.range_min,
            tier.range_max.map(|m| m.to_string()).unwrap_or_else(|| "∞".into())
        ))),
        None => Ok(()),
    }
}

/// Escolhe a faixa (ou a porcentagem) para o valor. Nunca devolve zero silencioso.
pub fn select_commission(product: &Product, tiers: &[CommissionTier], value: Decimal) -> Result<CommissionResolution, AppError> {
    let mut matching: Vec<&CommissionTier> = tiers.iter().filter(|t| t.contains(value)).collect();
    matching.sort_by(|a, b| a.range_min.cmp(&b.range_min).then(a.id.cmp(&b.id)));

    if matching.len() > 1 {
        tracing::warn!(
            "Produto {} tem {} faixas sobrepostas para o valor {}; usando a faixa {}",
            product.id,
            matching.len(),
            value,
            matching[0].id
        );
    }

    if let Some(tier) = matching.first() {
        return Ok(CommissionResolution {
            product_id: product.id,
            value,
            tier_matched: true,
            tier_id: Some(tier.id),
            source: CommissionSource::Tier,
            commission_amount: round_cents(tier.commission_amount),
        });
    }

    match product.commission_percentage {
        Some(pct) => Ok(CommissionResolution {
            product_id: product.id,
            value,
            tier_matched: false,
            tier_id: None,
            source: CommissionSource::Percentage,
            commission_amount: percentage_of(value, pct)?,
        }),
        None => Err(AppError::Unresolved { product_id: product.id, value }),
    }
}

fn percentage_of(value: Decimal, pct: Decimal) -> Result<Decimal, AppError> {
    value
        .checked_mul(pct)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .map(round_cents)
        .ok_or(AppError::field("value", "value_too_large"))
}

pub fn analyze_coverage(product_id: Uuid, basis: TierBasis, tiers: &[CommissionTier]) -> TierCoverage {
    let mut sorted: Vec<&CommissionTier> = tiers.iter().collect();
    sorted.sort_by(|a, b| a.range_min.cmp(&b.range_min).then(a.id.cmp(&b.id)));

    let mut overlaps = Vec::new();
    for (i, first) in sorted.iter().enumerate() {
        for second in &sorted[i + 1..] {
            if first.overlaps(second.range_min, second.range_max) {
                overlaps.push(TierOverlap { first_tier_id: first.id, second_tier_id: second.id });
            }
        }
    }

    let step = basis.step();
    let mut gaps = Vec::new();
    // Até onde as faixas já vistas cobrem (None = sem teto)
    let mut reach: Option<Option<Decimal>> = None;
    for tier in &sorted {
        if let Some(Some(end)) = reach {
            if tier.range_min > end + step {
                gaps.push(TierGap { from: end + step, to: tier.range_min - step });
            }
        }
        reach = match (reach, tier.range_max) {
            (None, max) => Some(max),
            (Some(None), _) | (_, None) => Some(None),
            (Some(Some(end)), Some(max)) => Some(Some(end.max(max))),
        };
    }

    let starts_at_zero = sorted.first().is_some_and(|t| t.range_min.is_zero());
    let unbounded = sorted.iter().any(|t| t.range_max.is_none());
    let is_partition = !sorted.is_empty() && starts_at_zero && unbounded && overlaps.is_empty() && gaps.is_empty();

    TierCoverage {
        product_id,
        tier_count: sorted.len(),
        starts_at_zero,
        unbounded,
        overlaps,
        gaps,
        is_partition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(pct: Option<Decimal>, basis: TierBasis) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Movil Renovación".into(),
            category_id: None,
            commission_percentage: pct,
            tier_basis: basis,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tier(product: &Product, min: i64, max: Option<i64>, amount: i64) -> CommissionTier {
        CommissionTier {
            id: Uuid::new_v4(),
            product_id: product.id,
            range_min: Decimal::from(min),
            range_max: max.map(Decimal::from),
            commission_amount: Decimal::from(amount),
            created_at: Utc::now(),
        }
    }

    fn partition(product: &Product) -> Vec<CommissionTier> {
        vec![
            tier(product, 0, Some(2), 50),
            tier(product, 3, Some(5), 75),
            tier(product, 6, None, 100),
        ]
    }

    #[test]
    fn value_inside_a_tier_pays_the_tier_amount() {
        let p = product(None, TierBasis::Quantity);
        let tiers = partition(&p);

        let two = select_commission(&p, &tiers, Decimal::from(2)).unwrap();
        assert!(two.tier_matched);
        assert_eq!(two.tier_id, Some(tiers[0].id));
        assert_eq!(two.commission_amount, Decimal::from(50));

        let ten = select_commission(&p, &tiers, Decimal::from(10)).unwrap();
        assert_eq!(ten.commission_amount, Decimal::from(100));
        assert_eq!(ten.source, CommissionSource::Tier);
    }

    #[test]
    fn each_value_of_a_partition_hits_exactly_one_tier() {
        let p = product(None, TierBasis::Quantity);
        let tiers = partition(&p);
        for v in 0..=20 {
            let hits = tiers.iter().filter(|t| t.contains(Decimal::from(v))).count();
            assert_eq!(hits, 1, "valor {v}");
        }
    }

    #[test]
    fn missing_tier_falls_back_to_percentage() {
        let p = product(Some(Decimal::from(10)), TierBasis::Amount);
        let res = select_commission(&p, &[], Decimal::new(12_345, 2)).unwrap();

        assert!(!res.tier_matched);
        assert_eq!(res.source, CommissionSource::Percentage);
        // 123.45 * 10% = 12.345 -> 12.35
        assert_eq!(res.commission_amount, Decimal::new(1235, 2));
    }

    #[test]
    fn no_tier_and_no_percentage_is_unresolved() {
        let p = product(None, TierBasis::Quantity);
        let tiers = vec![tier(&p, 0, Some(2), 50)];
        let err = select_commission(&p, &tiers, Decimal::from(3)).unwrap_err();
        assert!(matches!(err, AppError::Unresolved { .. }));
    }

    #[test]
    fn legacy_overlap_prefers_lowest_range_min() {
        let p = product(None, TierBasis::Quantity);
        let tiers = vec![tier(&p, 2, Some(10), 80), tier(&p, 0, Some(5), 40)];
        let res = select_commission(&p, &tiers, Decimal::from(4)).unwrap();
        assert_eq!(res.commission_amount, Decimal::from(40));
        assert_eq!(res.tier_id, Some(tiers[1].id));
    }

    #[test]
    fn value_precision_follows_tier_basis() {
        assert!(validate_value(TierBasis::Quantity, Decimal::from(3), "value").is_ok());
        assert!(validate_value(TierBasis::Quantity, Decimal::new(35, 1), "value").is_err());
        assert!(validate_value(TierBasis::Amount, Decimal::new(1999, 2), "value").is_ok());
        assert!(validate_value(TierBasis::Amount, Decimal::new(19_990, 3), "value").is_ok());
        assert!(validate_value(TierBasis::Amount, Decimal::new(19_999, 3), "value").is_err());
        assert!(validate_value(TierBasis::Amount, Decimal::from(-1), "value").is_err());
    }

    #[test]
    fn tier_input_rejects_inverted_range() {
        let input = TierInput {
            range_min: Decimal::from(5),
            range_max: Some(Decimal::from(3)),
            commission_amount: Decimal::from(10),
        };
        let err = validate_tier_input(TierBasis::Quantity, &input).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "rangeMax", .. }));
    }

    #[test]
    fn overlapping_write_is_a_conflict() {
        let p = product(None, TierBasis::Quantity);
        let tiers = partition(&p);
        let input = TierInput { range_min: Decimal::from(5), range_max: Some(Decimal::from(7)), commission_amount: Decimal::ONE };

        assert!(matches!(reject_overlap(&tiers, &input, None), Err(AppError::Conflict(_))));
        // Editar a própria faixa não conta como sobreposição consigo mesma
        let own = TierInput { range_min: Decimal::from(3), range_max: Some(Decimal::from(5)), commission_amount: Decimal::ONE };
        assert!(reject_overlap(&tiers, &own, Some(tiers[1].id)).is_ok());
    }

    #[test]
    fn coverage_of_declared_partition_is_clean() {
        let p = product(None, TierBasis::Quantity);
        let report = analyze_coverage(p.id, p.tier_basis, &partition(&p));

        assert_eq!(report.tier_count, 3);
        assert!(report.is_partition);
        assert!(report.gaps.is_empty());
        assert!(report.overlaps.is_empty());
    }

    #[test]
    fn coverage_reports_gaps_and_overlaps() {
        let p = product(None, TierBasis::Quantity);
        let tiers = vec![tier(&p, 0, Some(2), 50), tier(&p, 6, Some(9), 75), tier(&p, 8, None, 100)];
        let report = analyze_coverage(p.id, p.tier_basis, &tiers);

        assert_eq!(report.gaps, vec![TierGap { from: Decimal::from(3), to: Decimal::from(5) }]);
        assert_eq!(report.overlaps.len(), 1);
        assert_eq!(report.overlaps[0].first_tier_id, tiers[1].id);
        assert!(!report.is_partition);
    }

    #[test]
    fn amount_basis_uses_cent_steps() {
        let p = product(None, TierBasis::Amount);
        let tiers = vec![tier(&p, 0, Some(2), 50), tier(&p, 3, None, 75)];
        let report = analyze_coverage(p.id, p.tier_basis, &tiers);

        assert_eq!(report.gaps, vec![TierGap { from: Decimal::new(201, 2), to: Decimal::new(299, 2) }]);
    }

    #[test]
    fn values_beyond_the_tier_columns_are_rejected() {
        let huge = Decimal::from_i128_with_scale(10_i128.pow(28), 0);
        let err = validate_value(TierBasis::Amount, huge, "value").unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "value", code: "value_too_large" }));
        assert!(validate_value(TierBasis::Quantity, max_tier_value(), "value").is_err());
        assert!(validate_value(TierBasis::Amount, max_tier_value(), "value").is_ok());
    }

    #[test]
    fn percentage_overflow_is_an_error_not_a_panic() {
        let p = product(Some(Decimal::from(50)), TierBasis::Amount);
        let huge = Decimal::from_i128_with_scale(10_i128.pow(28), 0);
        let err = select_commission(&p, &[], huge).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { code: "value_too_large", .. }));
    }

    #[test]
    fn tier_bounds_and_amount_must_fit_their_columns() {
        let wide = TierInput {
            range_min: Decimal::ZERO,
            range_max: Some(Decimal::from(10_000_000_000_000i64)),
            commission_amount: Decimal::ONE,
        };
        let err = validate_tier_input(TierBasis::Quantity, &wide).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "rangeMax", code: "value_too_large" }));

        let rich = TierInput {
            range_min: Decimal::ZERO,
            range_max: None,
            commission_amount: Decimal::new(1_0001, 3),
        };
        let err = validate_tier_input(TierBasis::Quantity, &rich).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "commissionAmount", code: "too_many_decimals" }));
    }
}
