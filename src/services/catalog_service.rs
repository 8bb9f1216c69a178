// src/services/catalog_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ProductRepository,
    models::product::{Category, Product, TierBasis},
};

#[derive(Clone)]
pub struct CatalogService {
    repo: ProductRepository,
}

impl CatalogService {
    pub fn new(repo: ProductRepository) -> Self {
        Self { repo }
    }

    // --- CATEGORIAS ---

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.repo.list_categories().await
    }

    pub async fn create_category<'e, E>(
        &self,
        executor: E,
        name: &str,
        description: Option<&str>,
        color_hex: Option<&str>,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let color = color_hex.map(normalize_color).transpose()?;
        self.repo
            .create_category(executor, name.trim(), description, color.as_deref())
            .await
    }

    pub async fn update_category<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        color_hex: Option<&str>,
    ) -> Result<Category, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let color = color_hex.map(normalize_color).transpose()?;
        self.repo
            .update_category(executor, id, name.map(str::trim), description, color.as_deref())
            .await?
            .ok_or(AppError::NotFound("Categoria"))
    }

    // --- PRODUTOS ---

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.repo.list_products().await
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        name: &str,
        category_id: Option<Uuid>,
        commission_percentage: Option<Decimal>,
        tier_basis: Option<TierBasis>,
    ) -> Result<Product, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        validate_percentage(commission_percentage)?;

        let mut tx = executor.begin().await?;
        if let Some(category_id) = category_id {
            if !self.repo.category_exists(&mut *tx, category_id).await? {
                return Err(AppError::NotFound("Categoria"));
            }
        }

        let product = self
            .repo
            .create_product(
                &mut *tx,
                name.trim(),
                category_id,
                commission_percentage,
                tier_basis.unwrap_or(TierBasis::Quantity),
            )
            .await?;

        tx.commit().await?;
        Ok(product)
    }

    pub async fn update_product<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        category_id: Option<Uuid>,
        commission_percentage: Option<Decimal>,
        tier_basis: Option<TierBasis>,
        is_active: Option<bool>,
    ) -> Result<Product, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        validate_percentage(commission_percentage)?;

        let mut tx = executor.begin().await?;
        if let Some(category_id) = category_id {
            if !self.repo.category_exists(&mut *tx, category_id).await? {
                return Err(AppError::NotFound("Categoria"));
            }
        }

        let product = self
            .repo
            .update_product(
                &mut *tx,
                id,
                name.map(str::trim),
                category_id,
                commission_percentage,
                tier_basis,
                is_active,
            )
            .await?
            .ok_or(AppError::NotFound("Produto"))?;

        tx.commit().await?;
        Ok(product)
    }
}

/// Aceita "#rrggbb" ou "rrggbb"; grava sempre "#RRGGBB".
pub fn normalize_color(raw: &str) -> Result<String, AppError> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(format!("#{}", hex.to_ascii_uppercase()))
    } else {
        Err(AppError::field("colorHex", "invalid_color"))
    }
}

fn validate_percentage(pct: Option<Decimal>) -> Result<(), AppError> {
    match pct {
        Some(p) if p < Decimal::ZERO || p > Decimal::ONE_HUNDRED => {
            Err(AppError::field("commissionPercentage", "out_of_range"))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_normalized_to_upper_hex() {
        assert_eq!(normalize_color("#ff5733").unwrap(), "#FF5733");
        assert_eq!(normalize_color("00aaFF").unwrap(), "#00AAFF");
        assert!(normalize_color("#fff").is_err());
        assert!(normalize_color("#GG0000").is_err());
    }

    #[test]
    fn percentage_must_be_between_zero_and_hundred() {
        assert!(validate_percentage(None).is_ok());
        assert!(validate_percentage(Some(Decimal::ONE_HUNDRED)).is_ok());
        assert!(validate_percentage(Some(Decimal::new(1001, 1))).is_err());
        assert!(validate_percentage(Some(Decimal::from(-1))).is_err());
    }
}
