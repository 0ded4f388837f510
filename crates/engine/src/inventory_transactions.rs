//! Stock movements.
//!
//! An [`InventoryTransaction`] is the immutable record of one receipt or
//! dispense of an [`InventoryItem`](crate::InventoryItem). Rows are only ever
//! appended; a correction is a new, offsetting movement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    util::{ensure_positive, parse_decimal, parse_money, parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

impl TryFrom<&str> for Direction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            other => Err(EngineError::UnknownVariant(format!("movement direction {other:?}"))),
        }
    }
}

/// Where dispensed stock went.
///
/// When `animal_id` or `batch_id` is set the dispense is also charged to that
/// animal/batch as a cost.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenseTarget {
    pub batch_id: Option<Uuid>,
    pub animal_id: Option<Uuid>,
    pub pen_number: Option<String>,
}

impl DispenseTarget {
    pub fn animal(animal_id: Uuid) -> Self {
        Self {
            animal_id: Some(animal_id),
            ..Default::default()
        }
    }

    pub fn batch(batch_id: Uuid) -> Self {
        Self {
            batch_id: Some(batch_id),
            ..Default::default()
        }
    }

    /// `true` when the dispense has to be charged to livestock.
    pub fn is_costed(&self) -> bool {
        self.animal_id.is_some() || self.batch_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub item_id: Uuid,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub total_cost: Money,
    pub batch_id: Option<Uuid>,
    pub animal_id: Option<Uuid>,
    pub pen_number: Option<String>,
    /// Supplier or document reference for receipts.
    pub source: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryTransaction {
    pub fn receipt(
        item_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        source: Option<String>,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        ensure_positive(quantity, "quantity")?;
        ensure_positive(unit_cost, "unit_cost")?;
        Ok(Self {
            id: Uuid::new_v4(),
            item_id,
            direction: Direction::In,
            quantity,
            unit_cost,
            total_cost: Money::from_product(quantity, unit_cost)?,
            batch_id: None,
            animal_id: None,
            pen_number: None,
            source,
            occurred_at,
        })
    }

    pub fn dispense(
        item_id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        total_cost: Money,
        target: DispenseTarget,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        ensure_positive(quantity, "quantity")?;
        Ok(Self {
            id: Uuid::new_v4(),
            item_id,
            direction: Direction::Out,
            quantity,
            unit_cost,
            total_cost,
            batch_id: target.batch_id,
            animal_id: target.animal_id,
            pen_number: target.pen_number,
            source: None,
            occurred_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub item_id: String,
    pub direction: String,
    pub quantity: String,
    pub unit_cost: String,
    pub total_cost: String,
    pub batch_id: Option<String>,
    pub animal_id: Option<String>,
    pub pen_number: Option<String>,
    pub source: Option<String>,
    pub occurred_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_items::Entity",
        from = "Column::ItemId",
        to = "super::inventory_items::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Items,
}

impl Related<super::inventory_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&InventoryTransaction> for ActiveModel {
    fn from(tx: &InventoryTransaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            item_id: ActiveValue::Set(tx.item_id.to_string()),
            direction: ActiveValue::Set(tx.direction.as_str().to_string()),
            quantity: ActiveValue::Set(tx.quantity.to_string()),
            unit_cost: ActiveValue::Set(tx.unit_cost.to_string()),
            total_cost: ActiveValue::Set(tx.total_cost.to_string()),
            batch_id: ActiveValue::Set(tx.batch_id.map(|id| id.to_string())),
            animal_id: ActiveValue::Set(tx.animal_id.map(|id| id.to_string())),
            pen_number: ActiveValue::Set(tx.pen_number.clone()),
            source: ActiveValue::Set(tx.source.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
        }
    }
}

impl TryFrom<Model> for InventoryTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "inventory transaction")?,
            item_id: parse_uuid(&model.item_id, "inventory item")?,
            direction: Direction::try_from(model.direction.as_str())?,
            quantity: parse_decimal(&model.quantity, "quantity")?,
            unit_cost: parse_decimal(&model.unit_cost, "unit_cost")?,
            total_cost: parse_money(&model.total_cost, "total_cost")?,
            batch_id: parse_optional_uuid(model.batch_id.as_deref(), "batch")?,
            animal_id: parse_optional_uuid(model.animal_id.as_deref(), "animal")?,
            pen_number: model.pen_number,
            source: model.source,
            occurred_at: model.occurred_at,
        })
    }
}
