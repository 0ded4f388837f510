//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use std::str::FromStr;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Parse an optional stored UUID.
pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|v| parse_uuid(v, label)).transpose()
}

/// Parse a decimal column stored as canonical TEXT.
pub(crate) fn parse_decimal(value: &str, label: &str) -> ResultEngine<Decimal> {
    Decimal::from_str(value)
        .map_err(|_| EngineError::InvalidAmount(format!("invalid stored {label}: {value}")))
}

/// Parse a money column stored as canonical TEXT.
pub(crate) fn parse_money(value: &str, label: &str) -> ResultEngine<Money> {
    parse_decimal(value, label).map(Money::new)
}

/// Reject zero or negative quantities/prices.
pub(crate) fn ensure_positive(value: Decimal, label: &str) -> ResultEngine<()> {
    if value <= Decimal::ZERO {
        return Err(EngineError::InvalidQuantity(format!(
            "{label} must be > 0, got {value}"
        )));
    }
    Ok(())
}

/// Reject negative amounts (zero is allowed).
pub(crate) fn ensure_non_negative(value: Decimal, label: &str) -> ResultEngine<()> {
    if value < Decimal::ZERO {
        return Err(EngineError::InvalidQuantity(format!(
            "{label} must be >= 0, got {value}"
        )));
    }
    Ok(())
}
