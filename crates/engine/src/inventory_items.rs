//! The module contains `InventoryItem`, a stock-keeping unit of feed or
//! medicine, and its valuation rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CostCategory, EngineError, Money, ResultEngine,
    money::round_unit_cost,
    util::{ensure_non_negative, ensure_positive, parse_decimal, parse_money, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Feed,
    Medicine,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Medicine => "medicine",
        }
    }

    /// Cost bucket charged when this kind of item is dispensed to livestock.
    pub fn cost_category(self) -> CostCategory {
        match self {
            Self::Feed => CostCategory::Feed,
            Self::Medicine => CostCategory::Treatment,
        }
    }
}

impl TryFrom<&str> for ItemKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "feed" => Ok(Self::Feed),
            "medicine" => Ok(Self::Medicine),
            other => Err(EngineError::UnknownVariant(format!("item kind {other:?}"))),
        }
    }
}

/// A stocked feed or medicine item.
///
/// `total_value` is always `current_stock * unit_cost` rounded to money
/// precision, and `current_stock` never goes below zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub kind: ItemKind,
    pub unit: String,
    pub current_stock: Decimal,
    pub reorder_point: Decimal,
    pub unit_cost: Decimal,
    pub total_value: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(
        code: String,
        name: String,
        kind: ItemKind,
        unit: String,
        reorder_point: Decimal,
    ) -> ResultEngine<Self> {
        ensure_non_negative(reorder_point, "reorder_point")?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            code,
            name,
            kind,
            unit,
            current_stock: Decimal::ZERO,
            reorder_point,
            unit_cost: Decimal::ZERO,
            total_value: Money::ZERO,
            created_at: now,
            updated_at: now,
        })
    }

    /// Books an incoming lot.
    ///
    /// The unit cost becomes the cost-weighted average of the stock on hand
    /// and the incoming lot; with nothing on hand the lot cost replaces it.
    pub fn apply_receipt(&mut self, quantity: Decimal, unit_cost: Decimal) -> ResultEngine<()> {
        ensure_positive(quantity, "quantity")?;
        ensure_positive(unit_cost, "unit_cost")?;

        let out_of_range = || {
            EngineError::InvalidQuantity(format!(
                "{}: receipt of {quantity} at {unit_cost} is out of range",
                self.code
            ))
        };
        let new_stock = self.current_stock.checked_add(quantity).ok_or_else(out_of_range)?;
        let new_unit_cost = if self.current_stock.is_zero() {
            round_unit_cost(unit_cost)
        } else {
            let on_hand = self.current_stock.checked_mul(self.unit_cost);
            let incoming = quantity.checked_mul(unit_cost);
            let value = on_hand
                .zip(incoming)
                .and_then(|(on_hand, incoming)| on_hand.checked_add(incoming))
                .ok_or_else(out_of_range)?;
            round_unit_cost(value.checked_div(new_stock).ok_or_else(out_of_range)?)
        };
        let total_value = Money::from_product(new_stock, new_unit_cost)?;

        self.current_stock = new_stock;
        self.unit_cost = new_unit_cost;
        self.total_value = total_value;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Takes `quantity` out of stock at the current unit cost and returns the
    /// cost of the dispensed quantity. Fails without touching the item when
    /// the stock on hand is not enough.
    pub fn apply_dispense(&mut self, quantity: Decimal) -> ResultEngine<Money> {
        ensure_positive(quantity, "quantity")?;
        if quantity > self.current_stock {
            return Err(EngineError::InsufficientStock(format!(
                "{}: requested {quantity} {}, on hand {}",
                self.code, self.unit, self.current_stock
            )));
        }

        let cost = Money::from_product(quantity, self.unit_cost)?;
        let current_stock = self.current_stock - quantity;
        self.total_value = Money::from_product(current_stock, self.unit_cost)?;
        self.current_stock = current_stock;
        self.updated_at = Utc::now();
        Ok(cost)
    }

    pub fn needs_reorder(&self) -> bool {
        self.current_stock <= self.reorder_point
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub kind: String,
    pub unit: String,
    pub current_stock: String,
    pub reorder_point: String,
    pub unit_cost: String,
    pub total_value: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_transactions::Entity")]
    Transactions,
}

impl Related<super::inventory_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&InventoryItem> for ActiveModel {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            code: ActiveValue::Set(item.code.clone()),
            name: ActiveValue::Set(item.name.clone()),
            kind: ActiveValue::Set(item.kind.as_str().to_string()),
            unit: ActiveValue::Set(item.unit.clone()),
            current_stock: ActiveValue::Set(item.current_stock.to_string()),
            reorder_point: ActiveValue::Set(item.reorder_point.to_string()),
            unit_cost: ActiveValue::Set(item.unit_cost.to_string()),
            total_value: ActiveValue::Set(item.total_value.to_string()),
            created_at: ActiveValue::Set(item.created_at),
            updated_at: ActiveValue::Set(item.updated_at),
        }
    }
}

impl TryFrom<Model> for InventoryItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "inventory item")?,
            kind: ItemKind::try_from(model.kind.as_str())?,
            current_stock: parse_decimal(&model.current_stock, "current_stock")?,
            reorder_point: parse_decimal(&model.reorder_point, "reorder_point")?,
            unit_cost: parse_decimal(&model.unit_cost, "unit_cost")?,
            total_value: parse_money(&model.total_value, "total_value")?,
            code: model.code,
            name: model.name,
            unit: model.unit,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
