//! The module contains the errors the engine can return.
//!
//! User-correctable failures:
//!
//! - [`InvalidQuantity`] a quantity, price or cost amount is not positive.
//! - [`InsufficientStock`] a dispense would drive stock below zero.
//! - [`FrozenEntity`] a cost was posted to a sold or deceased animal.
//! - [`AnimalNotActive`] / [`AlreadySold`] sale preconditions failed.
//! - [`OverPayment`] paid amount exceeds the sale price.
//! - [`BatchClosed`] membership change on a closed batch.
//! - [`UnknownVariant`] a kind, status or method string names no variant.
//!
//! [`InconsistentAggregate`] is a programmer error: a stored aggregate no
//! longer matches the data it is derived from. It is logged and never meant
//! to be shown to a user.
//!
//!  [`InvalidQuantity`]: EngineError::InvalidQuantity
//!  [`InsufficientStock`]: EngineError::InsufficientStock
//!  [`FrozenEntity`]: EngineError::FrozenEntity
//!  [`AnimalNotActive`]: EngineError::AnimalNotActive
//!  [`AlreadySold`]: EngineError::AlreadySold
//!  [`OverPayment`]: EngineError::OverPayment
//!  [`BatchClosed`]: EngineError::BatchClosed
//!  [`UnknownVariant`]: EngineError::UnknownVariant
//!  [`InconsistentAggregate`]: EngineError::InconsistentAggregate
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),
    #[error("Frozen entity: {0}")]
    FrozenEntity(String),
    #[error("Animal not active: {0}")]
    AnimalNotActive(String),
    #[error("Animal already sold: {0}")]
    AlreadySold(String),
    #[error("Over payment: {0}")]
    OverPayment(String),
    #[error("Batch closed: {0}")]
    BatchClosed(String),
    #[error("Inconsistent aggregate: {0}")]
    InconsistentAggregate(String),
    #[error("Invalid target: {0}")]
    InvalidTarget(String),
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Unknown variant: {0}")]
    UnknownVariant(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidQuantity(a), Self::InvalidQuantity(b)) => a == b,
            (Self::InsufficientStock(a), Self::InsufficientStock(b)) => a == b,
            (Self::FrozenEntity(a), Self::FrozenEntity(b)) => a == b,
            (Self::AnimalNotActive(a), Self::AnimalNotActive(b)) => a == b,
            (Self::AlreadySold(a), Self::AlreadySold(b)) => a == b,
            (Self::OverPayment(a), Self::OverPayment(b)) => a == b,
            (Self::BatchClosed(a), Self::BatchClosed(b)) => a == b,
            (Self::InconsistentAggregate(a), Self::InconsistentAggregate(b)) => a == b,
            (Self::InvalidTarget(a), Self::InvalidTarget(b)) => a == b,
            (Self::InvalidGoal(a), Self::InvalidGoal(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::UnknownVariant(a), Self::UnknownVariant(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
