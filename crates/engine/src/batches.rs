//! The module contains `Batch`, the cost center animals are grouped in, and
//! the rollup that derives its aggregates.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AnimalSale, AnimalStatus, CostBuckets, EngineError, Money, ResultEngine,
    animals::Animal,
    cost_entries::CostEntry,
    util::{parse_decimal, parse_money, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Active,
    Closed,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl TryFrom<&str> for BatchStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            other => Err(EngineError::UnknownVariant(format!("batch status {other:?}"))),
        }
    }
}

/// Aggregates derived from a batch's members, its batch-only cost entries
/// and its sales.
///
/// Computing it is a pure function of those inputs, so it does not depend on
/// the order animals were updated in and running it twice gives the same
/// figures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRollup {
    pub buckets: CostBuckets,
    pub total_animals: u32,
    pub sold_animals: u32,
    pub deceased_animals: u32,
    pub total_revenue: Money,
}

impl BatchRollup {
    /// Fails with [`EngineError::InvalidQuantity`] when a bucket, the total
    /// cost or the revenue does not fit in a `Decimal`.
    pub fn compute(
        members: &[Animal],
        batch_only: &[CostEntry],
        sales: &[AnimalSale],
    ) -> ResultEngine<Self> {
        let mut rollup = Self::default();
        for animal in members {
            rollup.buckets.merge(&animal.buckets())?;
            rollup.total_animals += 1;
            match animal.status {
                AnimalStatus::Active => {}
                AnimalStatus::Sold => rollup.sold_animals += 1,
                AnimalStatus::Deceased => rollup.deceased_animals += 1,
            }
        }
        for entry in batch_only.iter().filter(|e| e.is_batch_only()) {
            rollup.buckets.add(entry.category, entry.amount)?;
        }
        rollup.buckets.total()?;
        rollup.total_revenue = sales
            .iter()
            .try_fold(Money::ZERO, |acc, sale| acc.checked_add(sale.sale_price))?;
        Ok(rollup)
    }

    pub fn disposed_animals(&self) -> u32 {
        self.sold_animals + self.deceased_animals
    }
}

/// A cohort of animals managed and costed together.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub batch_number: String,
    pub start_date: NaiveDate,
    pub close_date: Option<NaiveDate>,
    pub status: BatchStatus,
    pub total_animals: u32,
    pub sold_animals: u32,
    pub deceased_animals: u32,
    pub purchase_cost: Money,
    pub feed_cost: Money,
    pub treatment_cost: Money,
    pub other_expenses: Money,
    pub total_cost: Money,
    pub total_revenue: Money,
    pub profit: Money,
    pub profit_percentage: Option<Decimal>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn new(batch_number: String, start_date: NaiveDate, note: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_number,
            start_date,
            close_date: None,
            status: BatchStatus::Active,
            total_animals: 0,
            sold_animals: 0,
            deceased_animals: 0,
            purchase_cost: Money::ZERO,
            feed_cost: Money::ZERO,
            treatment_cost: Money::ZERO,
            other_expenses: Money::ZERO,
            total_cost: Money::ZERO,
            total_revenue: Money::ZERO,
            profit: Money::ZERO,
            profit_percentage: None,
            note,
            created_at: Utc::now(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == BatchStatus::Closed
    }

    pub fn buckets(&self) -> CostBuckets {
        CostBuckets {
            purchase: self.purchase_cost,
            feed: self.feed_cost,
            treatment: self.treatment_cost,
            other: self.other_expenses,
        }
    }

    pub fn rollup(&self) -> BatchRollup {
        BatchRollup {
            buckets: self.buckets(),
            total_animals: self.total_animals,
            sold_animals: self.sold_animals,
            deceased_animals: self.deceased_animals,
            total_revenue: self.total_revenue,
        }
    }

    /// Average cost per head over every animal the batch has held.
    pub fn cost_per_head(&self) -> Option<Money> {
        self.total_cost.per_head(self.total_animals)
    }

    /// Rejects membership changes once the batch is closed.
    pub fn ensure_open(&self) -> ResultEngine<()> {
        if self.is_closed() {
            return Err(EngineError::BatchClosed(format!(
                "batch {} was closed on {}",
                self.batch_number,
                self.close_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "an unknown date".to_string())
            )));
        }
        Ok(())
    }

    /// Overwrites the stored aggregates with `rollup`, then closes the batch
    /// when every member has been sold or has died. Returns `true` when this
    /// call closed the batch.
    pub fn apply_rollup(&mut self, rollup: &BatchRollup, today: NaiveDate) -> ResultEngine<bool> {
        let total_cost = rollup.buckets.total()?;
        self.purchase_cost = rollup.buckets.purchase;
        self.feed_cost = rollup.buckets.feed;
        self.treatment_cost = rollup.buckets.treatment;
        self.other_expenses = rollup.buckets.other;
        self.total_cost = total_cost;
        self.total_animals = rollup.total_animals;
        self.sold_animals = rollup.sold_animals;
        self.deceased_animals = rollup.deceased_animals;
        self.total_revenue = rollup.total_revenue;
        self.profit = self.total_revenue - self.total_cost;
        self.profit_percentage = self.profit.percent_of(self.total_cost);

        if !self.is_closed()
            && rollup.total_animals > 0
            && rollup.disposed_animals() == rollup.total_animals
        {
            self.status = BatchStatus::Closed;
            self.close_date = Some(today);
            return Ok(true);
        }
        Ok(false)
    }

    /// Checks the derived fields against each other and, when given, against
    /// a freshly computed rollup.
    pub fn verify(&self, expected: Option<&BatchRollup>) -> ResultEngine<()> {
        let mut problems = Vec::new();
        match self.buckets().total() {
            Ok(sum) if sum == self.total_cost => {}
            Ok(sum) => problems.push(format!("total_cost {} != bucket sum {sum}", self.total_cost)),
            Err(err) => problems.push(format!("bucket sum: {err}")),
        }
        if self.profit != self.total_revenue - self.total_cost {
            problems.push(format!(
                "profit {} != revenue {} - cost {}",
                self.profit, self.total_revenue, self.total_cost
            ));
        }
        if let Some(expected) = expected
            && self.rollup() != *expected
        {
            problems.push(format!(
                "stored rollup {:?} != recomputed {:?}",
                self.rollup(),
                expected
            ));
        }

        if problems.is_empty() {
            return Ok(());
        }
        let message = format!("batch {}: {}", self.batch_number, problems.join("; "));
        tracing::error!(batch_id = %self.id, "{message}");
        Err(EngineError::InconsistentAggregate(message))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub batch_number: String,
    pub start_date: Date,
    pub close_date: Option<Date>,
    pub status: String,
    pub total_animals: i32,
    pub sold_animals: i32,
    pub deceased_animals: i32,
    pub purchase_cost: String,
    pub feed_cost: String,
    pub treatment_cost: String,
    pub other_expenses: String,
    pub total_cost: String,
    pub total_revenue: String,
    pub profit: String,
    pub profit_percentage: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::animals::Entity")]
    Animals,
}

impl Related<super::animals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Animals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

fn count_to_db(value: u32, label: &str) -> ResultEngine<i32> {
    i32::try_from(value)
        .map_err(|_| EngineError::InvalidAmount(format!("{label} out of range: {value}")))
}

fn count_from_db(value: i32, label: &str) -> ResultEngine<u32> {
    u32::try_from(value)
        .map_err(|_| EngineError::InvalidAmount(format!("invalid stored {label}: {value}")))
}

impl TryFrom<&Batch> for ActiveModel {
    type Error = EngineError;

    fn try_from(batch: &Batch) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(batch.id.to_string()),
            batch_number: ActiveValue::Set(batch.batch_number.clone()),
            start_date: ActiveValue::Set(batch.start_date),
            close_date: ActiveValue::Set(batch.close_date),
            status: ActiveValue::Set(batch.status.as_str().to_string()),
            total_animals: ActiveValue::Set(count_to_db(batch.total_animals, "total_animals")?),
            sold_animals: ActiveValue::Set(count_to_db(batch.sold_animals, "sold_animals")?),
            deceased_animals: ActiveValue::Set(count_to_db(batch.deceased_animals, "deceased_animals")?),
            purchase_cost: ActiveValue::Set(batch.purchase_cost.to_string()),
            feed_cost: ActiveValue::Set(batch.feed_cost.to_string()),
            treatment_cost: ActiveValue::Set(batch.treatment_cost.to_string()),
            other_expenses: ActiveValue::Set(batch.other_expenses.to_string()),
            total_cost: ActiveValue::Set(batch.total_cost.to_string()),
            total_revenue: ActiveValue::Set(batch.total_revenue.to_string()),
            profit: ActiveValue::Set(batch.profit.to_string()),
            profit_percentage: ActiveValue::Set(batch.profit_percentage.map(|p| p.to_string())),
            note: ActiveValue::Set(batch.note.clone()),
            created_at: ActiveValue::Set(batch.created_at),
        })
    }
}

impl TryFrom<Model> for Batch {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "batch")?,
            status: BatchStatus::try_from(model.status.as_str())?,
            total_animals: count_from_db(model.total_animals, "total_animals")?,
            sold_animals: count_from_db(model.sold_animals, "sold_animals")?,
            deceased_animals: count_from_db(model.deceased_animals, "deceased_animals")?,
            purchase_cost: parse_money(&model.purchase_cost, "purchase_cost")?,
            feed_cost: parse_money(&model.feed_cost, "feed_cost")?,
            treatment_cost: parse_money(&model.treatment_cost, "treatment_cost")?,
            other_expenses: parse_money(&model.other_expenses, "other_expenses")?,
            total_cost: parse_money(&model.total_cost, "total_cost")?,
            total_revenue: parse_money(&model.total_revenue, "total_revenue")?,
            profit: parse_money(&model.profit, "profit")?,
            profit_percentage: model
                .profit_percentage
                .as_deref()
                .map(|p| parse_decimal(p, "profit_percentage"))
                .transpose()?,
            batch_number: model.batch_number,
            start_date: model.start_date,
            close_date: model.close_date,
            note: model.note,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{AnimalOrigin, CostCategory, CostPosting, NewAnimal, Sex};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn member(batch_id: Uuid, tag: &str, purchase: Decimal, feed: Decimal) -> Animal {
        let mut animal = Animal::new(&NewAnimal {
            ear_tag: tag.to_string(),
            animal_type: "goat".to_string(),
            sex: Sex::Female,
            entry_date: day(1),
            entry_weight: dec!(20),
            batch_id: Some(batch_id),
            origin: AnimalOrigin::Purchased {
                price: Money::new(purchase),
            },
        })
        .unwrap();
        animal
            .accrue(CostCategory::Purchase, Money::new(purchase))
            .unwrap();
        animal.accrue(CostCategory::Feed, Money::new(feed)).unwrap();
        animal
    }

    #[test]
    fn rollup_sums_members_and_shared_costs() {
        let batch = Batch::new("B-2026-01".to_string(), day(1), None);
        let a = member(batch.id, "G-1", dec!(1500), dec!(100));
        let b = member(batch.id, "G-2", dec!(1600), dec!(120.5));
        let shared = CostEntry::new(
            &CostPosting::new(CostCategory::Feed, Money::new(dec!(30))).for_batch(batch.id),
            Some(batch.id),
            None,
        )
        .unwrap();

        let rollup = BatchRollup::compute(&[a, b], &[shared], &[]).unwrap();

        assert_eq!(rollup.buckets.purchase.amount(), dec!(3100));
        assert_eq!(rollup.buckets.feed.amount(), dec!(250.5));
        assert_eq!(rollup.buckets.total().unwrap().amount(), dec!(3350.5));
        assert_eq!(rollup.total_animals, 2);
    }

    #[test]
    fn rollup_is_order_independent() {
        let batch = Batch::new("B-2026-02".to_string(), day(1), None);
        let a = member(batch.id, "G-1", dec!(1000), dec!(10.01));
        let b = member(batch.id, "G-2", dec!(2000), dec!(20.02));

        assert_eq!(
            BatchRollup::compute(&[a.clone(), b.clone()], &[], &[]).unwrap(),
            BatchRollup::compute(&[b, a], &[], &[]).unwrap()
        );
    }

    #[test]
    fn apply_rollup_closes_when_everyone_is_gone() {
        let mut batch = Batch::new("B-2026-03".to_string(), day(1), None);
        let mut a = member(batch.id, "G-1", dec!(1000), dec!(0));
        let mut b = member(batch.id, "G-2", dec!(1000), dec!(0));

        a.mark_sold(dec!(35), day(20)).unwrap();
        let rollup = BatchRollup::compute(&[a.clone(), b.clone()], &[], &[]).unwrap();
        assert!(!batch.apply_rollup(&rollup, day(20)).unwrap());
        assert_eq!(batch.status, BatchStatus::Active);

        b.mark_deceased(day(21), Some("bloat".to_string())).unwrap();
        let rollup = BatchRollup::compute(&[a, b], &[], &[]).unwrap();
        assert!(batch.apply_rollup(&rollup, day(21)).unwrap());
        assert_eq!(batch.status, BatchStatus::Closed);
        assert_eq!(batch.close_date, Some(day(21)));
        assert!(matches!(batch.ensure_open(), Err(EngineError::BatchClosed(_))));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert_eq!(BatchStatus::try_from("closed").unwrap(), BatchStatus::Closed);
        assert!(matches!(BatchStatus::try_from("archived"), Err(EngineError::UnknownVariant(_))));
    }

    #[test]
    fn rollup_past_decimal_range_fails() {
        let batch = Batch::new("B-2026-06".to_string(), day(1), None);
        let a = member(batch.id, "G-1", Decimal::MAX, dec!(0));
        let b = member(batch.id, "G-2", dec!(1), dec!(0));

        assert!(matches!(
            BatchRollup::compute(&[a, b], &[], &[]),
            Err(EngineError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn counts_past_storage_range_are_rejected() {
        let mut batch = Batch::new("B-2026-07".to_string(), day(1), None);
        assert!(ActiveModel::try_from(&batch).is_ok());

        batch.total_animals = u32::MAX;
        assert!(matches!(
            ActiveModel::try_from(&batch),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn empty_batch_stays_open() {
        let mut batch = Batch::new("B-2026-04".to_string(), day(1), None);
        assert!(!batch.apply_rollup(&BatchRollup::default(), day(2)).unwrap());
        assert_eq!(batch.profit_percentage, None);
    }

    #[test]
    fn verify_flags_stale_aggregate() {
        let mut batch = Batch::new("B-2026-05".to_string(), day(1), None);
        let a = member(batch.id, "G-1", dec!(500), dec!(5));
        let rollup = BatchRollup::compute(std::slice::from_ref(&a), &[], &[]).unwrap();
        batch.apply_rollup(&rollup, day(2)).unwrap();
        batch.verify(Some(&rollup)).unwrap();

        let stale = BatchRollup::compute(&[], &[], &[]).unwrap();
        assert!(matches!(
            batch.verify(Some(&stale)),
            Err(EngineError::InconsistentAggregate(_))
        ));
    }
}
