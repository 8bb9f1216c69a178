// src/db/product_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::product::{Category, CommissionTier, Product, TierBasis, TierInput},
};

const PRODUCT_COLUMNS: &str =
    "id, name, category_id, commission_percentage, tier_basis, is_active, created_at, updated_at";
const TIER_COLUMNS: &str = "id, product_id, range_min, range_max, commission_amount, created_at";

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CATEGORIAS
    // =========================================================================

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, color_hex, created_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
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
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, color_hex)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, color_hex, created_at
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(color_hex)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("A categoria '{}' já existe.", name)))?;

        Ok(category)
    }

    pub async fn update_category<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        color_hex: Option<&str>,
    ) -> Result<Option<Category>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                color_hex = COALESCE($4, color_hex)
            WHERE id = $1
            RETURNING id, name, description, color_hex, created_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(color_hex)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, "Já existe uma categoria com esse nome."))?;

        Ok(category)
    }

    pub async fn category_exists<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    // =========================================================================
    //  PRODUTOS
    // =========================================================================

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn find_product<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(product)
    }

    /// Trava a linha do produto para serializar escritas nas faixas dele.
    pub async fn lock_product<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(product)
    }

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        name: &str,
        category_id: Option<Uuid>,
        commission_percentage: Option<Decimal>,
        tier_basis: TierBasis,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, category_id, commission_percentage, tier_basis)
            VALUES ($1, $2, $3, $4)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(category_id)
        .bind(commission_percentage)
        .bind(tier_basis)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("O produto '{}' já existe.", name)))?;

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
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products SET
                name = COALESCE($2, name),
                category_id = COALESCE($3, category_id),
                commission_percentage = COALESCE($4, commission_percentage),
                tier_basis = COALESCE($5, tier_basis),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(category_id)
        .bind(commission_percentage)
        .bind(tier_basis)
        .bind(is_active)
        .fetch_optional(executor)
        .await
        .map_err(|e| AppError::from_unique(e, "Já existe um produto com esse nome."))?;

        Ok(product)
    }

    // =========================================================================
    //  FAIXAS DE COMISSÃO
    // =========================================================================

    pub async fn list_tiers<'e, E>(&self, executor: E, product_id: Uuid) -> Result<Vec<CommissionTier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tiers = sqlx::query_as::<_, CommissionTier>(&format!(
            r#"
            SELECT {TIER_COLUMNS} FROM product_commission_tiers
            WHERE product_id = $1
            ORDER BY range_min ASC, id ASC
            "#
        ))
        .bind(product_id)
        .fetch_all(executor)
        .await?;

        Ok(tiers)
    }

    pub async fn create_tier<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        input: &TierInput,
    ) -> Result<CommissionTier, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tier = sqlx::query_as::<_, CommissionTier>(&format!(
            r#"
            INSERT INTO product_commission_tiers (product_id, range_min, range_max, commission_amount)
            VALUES ($1, $2, $3, $4)
            RETURNING {TIER_COLUMNS}
            "#
        ))
        .bind(product_id)
        .bind(input.range_min)
        .bind(input.range_max)
        .bind(input.commission_amount)
        .fetch_one(executor)
        .await?;

        Ok(tier)
    }

    // Atualização total: range_max = NULL significa "sem teto"
    pub async fn update_tier<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        tier_id: Uuid,
        input: &TierInput,
    ) -> Result<Option<CommissionTier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tier = sqlx::query_as::<_, CommissionTier>(&format!(
            r#"
            UPDATE product_commission_tiers SET
                range_min = $3,
                range_max = $4,
                commission_amount = $5
            WHERE id = $2 AND product_id = $1
            RETURNING {TIER_COLUMNS}
            "#
        ))
        .bind(product_id)
        .bind(tier_id)
        .bind(input.range_min)
        .bind(input.range_max)
        .bind(input.commission_amount)
        .fetch_optional(executor)
        .await?;

        Ok(tier)
    }

    pub async fn delete_tier<'e, E>(&self, executor: E, product_id: Uuid, tier_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM product_commission_tiers WHERE id = $2 AND product_id = $1")
            .bind(product_id)
            .bind(tier_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
