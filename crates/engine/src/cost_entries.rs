//! Cost journal.
//!
//! Every cost attributed to an animal or a batch is appended here as a
//! [`CostEntry`]. Animal and batch buckets are the running totals of these
//! entries; batch-only entries (shared feed, pen-level expenses) exist only
//! in the journal and in the batch buckets.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    util::{ensure_non_negative, parse_money, parse_optional_uuid, parse_uuid},
};

/// The bucket a cost is accumulated into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostCategory {
    Purchase,
    Feed,
    Treatment,
    Other,
}

impl CostCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::Feed => "feed",
            Self::Treatment => "treatment",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for CostCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "purchase" => Ok(Self::Purchase),
            "feed" => Ok(Self::Feed),
            "treatment" => Ok(Self::Treatment),
            "other" => Ok(Self::Other),
            other => Err(EngineError::UnknownVariant(format!("cost category {other:?}"))),
        }
    }
}

/// The four cost buckets shared by animals and batches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBuckets {
    pub purchase: Money,
    pub feed: Money,
    pub treatment: Money,
    pub other: Money,
}

impl CostBuckets {
    pub fn total(&self) -> ResultEngine<Money> {
        self.purchase
            .checked_add(self.feed)?
            .checked_add(self.treatment)?
            .checked_add(self.other)
    }

    pub fn add(&mut self, category: CostCategory, amount: Money) -> ResultEngine<()> {
        let bucket = match category {
            CostCategory::Purchase => &mut self.purchase,
            CostCategory::Feed => &mut self.feed,
            CostCategory::Treatment => &mut self.treatment,
            CostCategory::Other => &mut self.other,
        };
        *bucket = bucket.checked_add(amount)?;
        Ok(())
    }

    pub fn merge(&mut self, other: &CostBuckets) -> ResultEngine<()> {
        self.add(CostCategory::Purchase, other.purchase)?;
        self.add(CostCategory::Feed, other.feed)?;
        self.add(CostCategory::Treatment, other.treatment)?;
        self.add(CostCategory::Other, other.other)
    }
}

/// A request to attribute a cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostPosting {
    pub category: CostCategory,
    pub amount: Money,
    pub animal_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl CostPosting {
    pub fn new(category: CostCategory, amount: Money) -> Self {
        Self {
            category,
            amount,
            animal_id: None,
            batch_id: None,
            note: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn for_animal(mut self, animal_id: Uuid) -> Self {
        self.animal_id = Some(animal_id);
        self
    }

    pub fn for_batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// One journal row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEntry {
    pub id: Uuid,
    pub category: CostCategory,
    pub amount: Money,
    pub animal_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    /// Set when the cost comes from an inventory dispense.
    pub inventory_transaction_id: Option<Uuid>,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl CostEntry {
    pub(crate) fn new(
        posting: &CostPosting,
        batch_id: Option<Uuid>,
        inventory_transaction_id: Option<Uuid>,
    ) -> ResultEngine<Self> {
        ensure_non_negative(posting.amount.amount(), "amount")?;
        Ok(Self {
            id: Uuid::new_v4(),
            category: posting.category,
            amount: posting.amount,
            animal_id: posting.animal_id,
            batch_id,
            inventory_transaction_id,
            note: posting.note.clone(),
            occurred_at: posting.occurred_at,
        })
    }

    /// `true` for shared costs charged to a batch without a specific animal.
    pub fn is_batch_only(&self) -> bool {
        self.animal_id.is_none() && self.batch_id.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cost_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub category: String,
    pub amount: String,
    pub animal_id: Option<String>,
    pub batch_id: Option<String>,
    pub inventory_transaction_id: Option<String>,
    pub note: Option<String>,
    pub occurred_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CostEntry> for ActiveModel {
    fn from(entry: &CostEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            category: ActiveValue::Set(entry.category.as_str().to_string()),
            amount: ActiveValue::Set(entry.amount.to_string()),
            animal_id: ActiveValue::Set(entry.animal_id.map(|id| id.to_string())),
            batch_id: ActiveValue::Set(entry.batch_id.map(|id| id.to_string())),
            inventory_transaction_id: ActiveValue::Set(
                entry.inventory_transaction_id.map(|id| id.to_string()),
            ),
            note: ActiveValue::Set(entry.note.clone()),
            occurred_at: ActiveValue::Set(entry.occurred_at),
        }
    }
}

impl TryFrom<Model> for CostEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "cost entry")?,
            category: CostCategory::try_from(model.category.as_str())?,
            amount: parse_money(&model.amount, "amount")?,
            animal_id: parse_optional_uuid(model.animal_id.as_deref(), "animal")?,
            batch_id: parse_optional_uuid(model.batch_id.as_deref(), "batch")?,
            inventory_transaction_id: parse_optional_uuid(
                model.inventory_transaction_id.as_deref(),
                "inventory transaction",
            )?,
            note: model.note,
            occurred_at: model.occurred_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn unknown_category_is_rejected() {
        assert_eq!(CostCategory::try_from("feed").unwrap(), CostCategory::Feed);
        assert!(matches!(
            CostCategory::try_from("labour"),
            Err(EngineError::UnknownVariant(_))
        ));
    }

    #[test]
    fn buckets_total_is_sum_of_parts() {
        let mut buckets = CostBuckets::default();
        buckets.add(CostCategory::Purchase, Money::new(dec!(1200))).unwrap();
        buckets.add(CostCategory::Feed, Money::new(dec!(310.55))).unwrap();
        buckets.add(CostCategory::Feed, Money::new(dec!(10.45))).unwrap();
        buckets.add(CostCategory::Treatment, Money::new(dec!(80))).unwrap();

        assert_eq!(buckets.feed.amount(), dec!(321));
        assert_eq!(buckets.total().unwrap().amount(), dec!(1601));
    }

    #[test]
    fn bucket_overflow_leaves_bucket_unchanged() {
        let mut buckets = CostBuckets::default();
        buckets
            .add(CostCategory::Feed, Money::new(rust_decimal::Decimal::MAX))
            .unwrap();
        let err = buckets
            .add(CostCategory::Feed, Money::new(dec!(1)))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity(_)));
        assert_eq!(buckets.feed, Money::new(rust_decimal::Decimal::MAX));

        buckets
            .add(CostCategory::Other, Money::new(dec!(1)))
            .unwrap();
        assert!(buckets.total().is_err());
    }

    #[test]
    fn negative_posting_is_rejected() {
        let posting = CostPosting::new(CostCategory::Other, Money::new(dec!(-1)));
        assert!(matches!(
            CostEntry::new(&posting, None, None),
            Err(EngineError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn batch_only_entry() {
        let batch_id = Uuid::new_v4();
        let posting =
            CostPosting::new(CostCategory::Feed, Money::new(dec!(40))).for_batch(batch_id);
        let entry = CostEntry::new(&posting, Some(batch_id), None).unwrap();
        assert!(entry.is_batch_only());
    }
}
