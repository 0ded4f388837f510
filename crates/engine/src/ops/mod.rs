use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod access;
mod animals;
mod batches;
mod costs;
mod goals;
mod inventory;
mod rollup;
mod sales;

pub use inventory::{InventoryMovement, InventoryTransactionFilter};

/// Runs `$body` inside a fresh transaction bound to `$tx`. The transaction
/// commits when the body yields `Ok`; an error or early return drops it,
/// which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Handle to the farm ledger.
///
/// Every mutating method runs in its own database transaction: either all of
/// its writes (stock, journal, animal, batch, sale) are committed or none are.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Starts an [`EngineBuilder`].
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Builder for [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Migrated connection the engine runs on.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(
            normalize_required_text("  B-2026-01 ", "batch number").unwrap(),
            "B-2026-01"
        );
        assert!(matches!(
            normalize_required_text("   ", "ear tag"),
            Err(EngineError::InvalidName(_))
        ));
        assert_eq!(normalize_optional_text(Some("  ")), None);
    }
}
