// src/models/product.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE tier_basis do banco.
// Quantity = linhas vendidas (inteiro), Amount = valor em dólares (centavos)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tier_basis", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TierBasis {
    Quantity,
    Amount,
}

impl TierBasis {
    /// Menor incremento possível do valor; define o que é "buraco" entre faixas.
    pub fn step(&self) -> Decimal {
        match self {
            TierBasis::Quantity => Decimal::ONE,
            TierBasis::Amount => Decimal::new(1, 2),
        }
    }
}

// --- CATÁLOGO ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    #[schema(example = "Móvil")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "#FF5733")]
    pub color_hex: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "Movil Renovación")]
    pub name: String,
    pub category_id: Option<Uuid>,
    #[schema(example = "10.00")]
    pub commission_percentage: Option<Decimal>,
    pub tier_basis: TierBasis,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionTier {
    pub id: Uuid,
    pub product_id: Uuid,
    #[schema(example = "0")]
    pub range_min: Decimal,
    // None = sem teto (∞)
    #[schema(example = "2")]
    pub range_max: Option<Decimal>,
    #[schema(example = "50.00")]
    pub commission_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl CommissionTier {
    pub fn contains(&self, value: Decimal) -> bool {
        self.range_min <= value && self.range_max.is_none_or(|max| value <= max)
    }

    pub fn overlaps(&self, range_min: Decimal, range_max: Option<Decimal>) -> bool {
        let starts_before_other_ends = range_max.is_none_or(|max| self.range_min <= max);
        let other_starts_before_end = self.range_max.is_none_or(|max| range_min <= max);
        starts_before_other_ends && other_starts_before_end
    }
}

// --- RESOLUÇÃO DE COMISSÃO ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommissionSource {
    Tier,
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionResolution {
    pub product_id: Uuid,
    pub value: Decimal,
    pub tier_matched: bool,
    pub tier_id: Option<Uuid>,
    pub source: CommissionSource,
    pub commission_amount: Decimal,
}

// --- COBERTURA DAS FAIXAS ---

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierOverlap {
    pub first_tier_id: Uuid,
    pub second_tier_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierGap {
    // Primeiro e último valor sem faixa
    pub from: Decimal,
    pub to: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierCoverage {
    pub product_id: Uuid,
    pub tier_count: usize,
    pub starts_at_zero: bool,
    pub unbounded: bool,
    pub overlaps: Vec<TierOverlap>,
    pub gaps: Vec<TierGap>,
    pub is_partition: bool,
}

// Dados de entrada de uma faixa, já desserializados
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TierInput {
    #[schema(example = "3")]
    pub range_min: Decimal,
    #[schema(example = "5")]
    pub range_max: Option<Decimal>,
    #[schema(example = "75.00")]
    pub commission_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(min: i64, max: Option<i64>) -> CommissionTier {
        CommissionTier {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            range_min: Decimal::from(min),
            range_max: max.map(Decimal::from),
            commission_amount: Decimal::from(10),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn bounds_are_inclusive() {
        let t = tier(3, Some(5));
        assert!(t.contains(Decimal::from(3)));
        assert!(t.contains(Decimal::from(5)));
        assert!(!t.contains(Decimal::from(6)));
        assert!(tier(6, None).contains(Decimal::from(1_000_000)));
    }

    #[test]
    fn overlap_detection_handles_open_ends() {
        let t = tier(3, Some(5));
        assert!(t.overlaps(Decimal::from(5), Some(Decimal::from(8))));
        assert!(!t.overlaps(Decimal::from(6), None));
        assert!(tier(6, None).overlaps(Decimal::from(100), Some(Decimal::from(200))));
        assert!(!tier(0, Some(2)).overlaps(Decimal::from(3), Some(Decimal::from(5))));
    }
}
