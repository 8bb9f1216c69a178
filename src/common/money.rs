// src/common/money.rs

use rust_decimal::Decimal;

use crate::common::error::AppError;

// Limites das colunas NUMERIC do banco; acima disso o Postgres recusa com overflow.

/// NUMERIC(12,2): valores de prospectos, mensalidades e comissões.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// NUMERIC(14,2): limites das faixas de comissão.
pub fn max_tier_value() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// Dinheiro: não negativo, no máximo 2 casas e dentro do limite da coluna.
pub fn check_money(value: Decimal, max: Decimal, field: &'static str) -> Result<(), AppError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::field(field, "negative_value"));
    }
    if value.normalize().scale() > 2 {
        return Err(AppError::field(field, "too_many_decimals"));
    }
    if value > max {
        return Err(AppError::field(field, "value_too_large"));
    }
    Ok(())
}

/// Quantidade: inteira, não negativa e dentro do limite da coluna.
pub fn check_quantity(value: Decimal, max: Decimal, field: &'static str) -> Result<(), AppError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::field(field, "negative_value"));
    }
    if !value.fract().is_zero() {
        return Err(AppError::field(field, "fractional_quantity"));
    }
    if value > max {
        return Err(AppError::field(field, "value_too_large"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(result: Result<(), AppError>) -> &'static str {
        match result {
            Err(AppError::InvalidField { code, .. }) => code,
            Ok(()) => "ok",
            Err(other) => panic!("erro inesperado: {other}"),
        }
    }

    #[test]
    fn money_fits_numeric_12_2() {
        assert_eq!(code(check_money(Decimal::new(21_055, 2), max_amount(), "totalAmount")), "ok");
        assert_eq!(code(check_money(max_amount(), max_amount(), "totalAmount")), "ok");
        assert_eq!(code(check_money(Decimal::new(210_555, 3), max_amount(), "totalAmount")), "too_many_decimals");
        assert_eq!(code(check_money(Decimal::from(100_000_000_000i64), max_amount(), "totalAmount")), "value_too_large");
        assert_eq!(code(check_money(Decimal::from(-1), max_amount(), "totalAmount")), "negative_value");
    }

    #[test]
    fn trailing_zeros_do_not_count_as_decimals() {
        assert_eq!(code(check_money(Decimal::new(2_100_000, 4), max_amount(), "totalAmount")), "ok");
    }

    #[test]
    fn quantities_are_whole_numbers() {
        assert_eq!(code(check_quantity(Decimal::from(3), max_amount(), "movilRenovacion")), "ok");
        assert_eq!(code(check_quantity(Decimal::new(35, 1), max_amount(), "movilRenovacion")), "fractional_quantity");
        assert_eq!(code(check_quantity(Decimal::from(10_000_000_000i64), max_amount(), "movilRenovacion")), "value_too_large");
    }
}
