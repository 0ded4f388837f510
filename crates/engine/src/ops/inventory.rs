use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    CostEntry, CostPosting, Direction, DispenseTarget, EngineError, InventoryItem,
    InventoryTransaction, ItemKind, ResultEngine, inventory_items, inventory_transactions,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

/// Result of a stock movement: the ledger row, the item after the movement
/// and, for costed dispenses, the journal entry it produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub transaction: InventoryTransaction,
    pub item: InventoryItem,
    pub cost_entry: Option<CostEntry>,
}

/// Filters for listing stock movements.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct InventoryTransactionFilter {
    pub item_id: Option<Uuid>,
    pub animal_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub direction: Option<Direction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn validate_list_filter(filter: &InventoryTransactionFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

trait ApplyMovementFilters: QueryFilter + Sized {
    fn apply_movement_filters(self, filter: &InventoryTransactionFilter) -> Self;
}

impl<T> ApplyMovementFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_movement_filters(mut self, filter: &InventoryTransactionFilter) -> Self {
        if let Some(item_id) = filter.item_id {
            self = self.filter(inventory_transactions::Column::ItemId.eq(item_id.to_string()));
        }
        if let Some(animal_id) = filter.animal_id {
            self =
                self.filter(inventory_transactions::Column::AnimalId.eq(animal_id.to_string()));
        }
        if let Some(batch_id) = filter.batch_id {
            self = self.filter(inventory_transactions::Column::BatchId.eq(batch_id.to_string()));
        }
        if let Some(direction) = filter.direction {
            self = self.filter(inventory_transactions::Column::Direction.eq(direction.as_str()));
        }
        if let Some(from) = filter.from {
            self = self.filter(inventory_transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(inventory_transactions::Column::OccurredAt.lt(to));
        }
        self
    }
}

impl Engine {
    /// Creates a stock item with zero stock. `code` must be unique.
    pub async fn new_inventory_item(
        &self,
        code: &str,
        name: &str,
        kind: ItemKind,
        unit: &str,
        reorder_point: Decimal,
    ) -> ResultEngine<InventoryItem> {
        let code = normalize_required_text(code, "item code")?;
        let name = normalize_required_text(name, "item name")?;
        let unit = normalize_required_text(unit, "unit")?;
        let item = with_tx!(self, |db_tx| {
            if self.find_item_by_code(&db_tx, &code).await?.is_some() {
                return Err(EngineError::ExistingKey(code));
            }
            let item = InventoryItem::new(code, name, kind, unit, reorder_point)?;
            inventory_items::ActiveModel::from(&item).insert(&db_tx).await?;
            Ok(item)
        })?;

        tracing::info!("new {} item {} ({})", item.kind.as_str(), item.code, item.id);
        Ok(item)
    }

    pub async fn inventory_item(&self, item_id: Uuid) -> ResultEngine<InventoryItem> {
        with_tx!(self, |db_tx| self.require_item(&db_tx, item_id).await)
    }

    pub async fn inventory_item_by_code(&self, code: &str) -> ResultEngine<InventoryItem> {
        let code = normalize_required_text(code, "item code")?;
        with_tx!(self, |db_tx| {
            self.find_item_by_code(&db_tx, &code)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("inventory item not exists".to_string()))
        })
    }

    /// Items whose stock is at or below their reorder point, by code.
    pub async fn low_stock_items(&self) -> ResultEngine<Vec<InventoryItem>> {
        with_tx!(self, |db_tx| {
            let models = inventory_items::Entity::find()
                .order_by_asc(inventory_items::Column::Code)
                .all(&db_tx)
                .await?;
            let mut out = Vec::new();
            for model in models {
                let item = InventoryItem::try_from(model)?;
                if item.needs_reorder() {
                    out.push(item);
                }
            }
            Ok(out)
        })
    }

    /// Books an incoming lot and re-averages the item's unit cost.
    pub async fn receive(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        source: Option<&str>,
    ) -> ResultEngine<InventoryMovement> {
        let occurred_at = Utc::now();
        let source = normalize_optional_text(source);
        let movement = with_tx!(self, |db_tx| {
            let mut item = self.require_item(&db_tx, item_id).await?;
            let transaction =
                InventoryTransaction::receipt(item.id, quantity, unit_cost, source, occurred_at)?;
            item.apply_receipt(quantity, unit_cost)?;

            inventory_transactions::ActiveModel::from(&transaction)
                .insert(&db_tx)
                .await?;
            inventory_items::ActiveModel::from(&item)
                .update(&db_tx)
                .await?;
            Ok(InventoryMovement {
                transaction,
                item,
                cost_entry: None,
            })
        })?;

        tracing::info!(
            "received {} {} of {} at {}; stock {} at unit cost {}",
            quantity,
            movement.item.unit,
            movement.item.code,
            unit_cost,
            movement.item.current_stock,
            movement.item.unit_cost
        );
        Ok(movement)
    }

    /// Takes stock out at the current unit cost.
    ///
    /// When the target names an animal or a batch the dispensed value is
    /// posted as a feed (or treatment, for medicine) cost in the same
    /// transaction. Fails with [`EngineError::InsufficientStock`] and leaves
    /// the stock unchanged when there is not enough on hand.
    pub async fn dispense(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        target: DispenseTarget,
    ) -> ResultEngine<InventoryMovement> {
        let occurred_at = Utc::now();
        let today = occurred_at.date_naive();
        let target = DispenseTarget {
            pen_number: normalize_optional_text(target.pen_number.as_deref()),
            ..target
        };
        let movement = with_tx!(self, |db_tx| {
            let mut item = self.require_item(&db_tx, item_id).await?;
            let unit_cost = item.unit_cost;
            let total_cost = match item.apply_dispense(quantity) {
                Ok(cost) => cost,
                Err(err) => {
                    tracing::warn!("rejected dispense of {quantity} {}: {err}", item.code);
                    return Err(err);
                }
            };
            let costed = target.is_costed();
            let transaction = InventoryTransaction::dispense(
                item.id,
                quantity,
                unit_cost,
                total_cost,
                target,
                occurred_at,
            )?;

            inventory_transactions::ActiveModel::from(&transaction)
                .insert(&db_tx)
                .await?;
            inventory_items::ActiveModel::from(&item)
                .update(&db_tx)
                .await?;

            let cost_entry = if costed {
                let posting = CostPosting {
                    category: item.kind.cost_category(),
                    amount: total_cost,
                    animal_id: transaction.animal_id,
                    batch_id: transaction.batch_id,
                    note: Some(format!("{quantity} {} of {}", item.unit, item.code)),
                    occurred_at,
                };
                let entry = self
                    .post_cost_in_tx(&db_tx, &posting, Some(transaction.id))
                    .await?;
                if let Some(batch_id) = entry.batch_id {
                    self.rollup_batch_in_tx(&db_tx, batch_id, today).await?;
                }
                Some(entry)
            } else {
                None
            };

            Ok(InventoryMovement {
                transaction,
                item,
                cost_entry,
            })
        })?;

        tracing::info!(
            "dispensed {} {} of {} for {}; stock {}",
            quantity,
            movement.item.unit,
            movement.item.code,
            movement.transaction.total_cost,
            movement.item.current_stock
        );
        Ok(movement)
    }

    /// Stock movements matching `filter`, oldest first.
    pub async fn inventory_transactions(
        &self,
        filter: &InventoryTransactionFilter,
    ) -> ResultEngine<Vec<InventoryTransaction>> {
        validate_list_filter(filter)?;
        with_tx!(self, |db_tx| {
            inventory_transactions::Entity::find()
                .apply_movement_filters(filter)
                .order_by_asc(inventory_transactions::Column::OccurredAt)
                .order_by_asc(inventory_transactions::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(InventoryTransaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
