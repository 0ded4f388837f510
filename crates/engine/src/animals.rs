//! The module contains `Animal` and its cost accumulation rules.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    CostBuckets, CostCategory, EngineError, Money, ResultEngine,
    money::round_to,
    util::{ensure_positive, parse_decimal, parse_money, parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimalStatus {
    Active,
    Sold,
    Deceased,
}

impl AnimalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Sold => "sold",
            Self::Deceased => "deceased",
        }
    }
}

impl TryFrom<&str> for AnimalStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "sold" => Ok(Self::Sold),
            "deceased" => Ok(Self::Deceased),
            other => Err(EngineError::UnknownVariant(format!("animal status {other:?}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl TryFrom<&str> for Sex {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(EngineError::UnknownVariant(format!("sex {other:?}"))),
        }
    }
}

/// How an animal entered the herd.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum AnimalOrigin {
    /// Bought in; the price is posted as purchase cost.
    Purchased { price: Money },
    /// Born on the farm; purchase cost stays 0.
    Born,
}

/// Registration data for a new animal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewAnimal {
    pub ear_tag: String,
    pub animal_type: String,
    pub sex: Sex,
    pub entry_date: NaiveDate,
    pub entry_weight: Decimal,
    pub batch_id: Option<Uuid>,
    pub origin: AnimalOrigin,
}

/// A single head of livestock.
///
/// `total_cost` is a stored snapshot of the four buckets and is rewritten on
/// every accrual. Once the animal is sold or deceased the buckets are frozen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: Uuid,
    pub ear_tag: String,
    pub animal_type: String,
    pub sex: Sex,
    pub entry_date: NaiveDate,
    pub entry_weight: Decimal,
    pub current_weight: Decimal,
    pub last_weighed_on: Option<NaiveDate>,
    pub status: AnimalStatus,
    pub batch_id: Option<Uuid>,
    pub purchase_cost: Money,
    pub accumulated_feed_cost: Money,
    pub accumulated_treatment_cost: Money,
    pub accumulated_other_cost: Money,
    pub total_cost: Money,
    pub disposed_on: Option<NaiveDate>,
    pub death_cause: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Animal {
    /// Builds an active animal with empty cost buckets. The purchase price
    /// is charged afterwards through the cost accumulator.
    pub fn new(input: &NewAnimal) -> ResultEngine<Self> {
        ensure_positive(input.entry_weight, "entry_weight")?;
        Ok(Self {
            id: Uuid::new_v4(),
            ear_tag: input.ear_tag.clone(),
            animal_type: input.animal_type.clone(),
            sex: input.sex,
            entry_date: input.entry_date,
            entry_weight: input.entry_weight,
            current_weight: input.entry_weight,
            last_weighed_on: None,
            status: AnimalStatus::Active,
            batch_id: input.batch_id,
            purchase_cost: Money::ZERO,
            accumulated_feed_cost: Money::ZERO,
            accumulated_treatment_cost: Money::ZERO,
            accumulated_other_cost: Money::ZERO,
            total_cost: Money::ZERO,
            disposed_on: None,
            death_cause: None,
            created_at: Utc::now(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == AnimalStatus::Active
    }

    pub fn buckets(&self) -> CostBuckets {
        CostBuckets {
            purchase: self.purchase_cost,
            feed: self.accumulated_feed_cost,
            treatment: self.accumulated_treatment_cost,
            other: self.accumulated_other_cost,
        }
    }

    /// Adds `amount` to the bucket for `category` and refreshes `total_cost`.
    pub fn accrue(&mut self, category: CostCategory, amount: Money) -> ResultEngine<()> {
        if !self.is_active() {
            return Err(EngineError::FrozenEntity(format!(
                "animal {} is {}",
                self.ear_tag,
                self.status.as_str()
            )));
        }
        if amount.is_negative() {
            return Err(EngineError::InvalidQuantity(format!(
                "cost amount must be >= 0, got {amount}"
            )));
        }

        let mut buckets = self.buckets();
        buckets.add(category, amount)?;
        let total = buckets.total()?;

        self.purchase_cost = buckets.purchase;
        self.accumulated_feed_cost = buckets.feed;
        self.accumulated_treatment_cost = buckets.treatment;
        self.accumulated_other_cost = buckets.other;
        self.total_cost = total;
        Ok(())
    }

    pub fn record_weight(&mut self, weight: Decimal, weighed_on: NaiveDate) -> ResultEngine<()> {
        self.require_active()?;
        ensure_positive(weight, "weight")?;
        self.current_weight = weight;
        self.last_weighed_on = Some(weighed_on);
        Ok(())
    }

    pub(crate) fn mark_sold(&mut self, weight: Decimal, sold_on: NaiveDate) -> ResultEngine<()> {
        self.require_active()?;
        self.current_weight = weight;
        self.last_weighed_on = Some(sold_on);
        self.status = AnimalStatus::Sold;
        self.disposed_on = Some(sold_on);
        Ok(())
    }

    pub(crate) fn mark_deceased(
        &mut self,
        died_on: NaiveDate,
        cause: Option<String>,
    ) -> ResultEngine<()> {
        self.require_active()?;
        self.status = AnimalStatus::Deceased;
        self.disposed_on = Some(died_on);
        self.death_cause = cause;
        Ok(())
    }

    /// Live weight gained since entry.
    pub fn weight_gain(&self) -> Decimal {
        self.current_weight - self.entry_weight
    }

    /// Average daily gain between entry and the last weighing, in weight
    /// units per day. `None` until the animal has been weighed after entry.
    pub fn daily_gain(&self) -> Option<Decimal> {
        let weighed_on = self.last_weighed_on?;
        let days = (weighed_on - self.entry_date).num_days();
        if days <= 0 {
            return None;
        }
        Some(round_to(self.weight_gain() / Decimal::from(days), 3))
    }

    /// Checks the stored snapshot against its components.
    pub fn verify(&self) -> ResultEngine<()> {
        let expected = self.buckets().total();
        if expected.as_ref().ok() != Some(&self.total_cost) {
            let expected = expected.map_or_else(|err| err.to_string(), |total| total.to_string());
            tracing::error!(
                animal_id = %self.id,
                stored = %self.total_cost,
                expected = %expected,
                "animal total_cost drifted from its buckets"
            );
            return Err(EngineError::InconsistentAggregate(format!(
                "animal {}: total_cost {} != {}",
                self.ear_tag, self.total_cost, expected
            )));
        }
        Ok(())
    }

    fn require_active(&self) -> ResultEngine<()> {
        if !self.is_active() {
            return Err(EngineError::AnimalNotActive(format!(
                "animal {} is {}",
                self.ear_tag,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "animals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub ear_tag: String,
    pub animal_type: String,
    pub sex: String,
    pub entry_date: Date,
    pub entry_weight: String,
    pub current_weight: String,
    pub last_weighed_on: Option<Date>,
    pub status: String,
    pub batch_id: Option<String>,
    pub purchase_cost: String,
    pub accumulated_feed_cost: String,
    pub accumulated_treatment_cost: String,
    pub accumulated_other_cost: String,
    pub total_cost: String,
    pub disposed_on: Option<Date>,
    pub death_cause: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::batches::Entity",
        from = "Column::BatchId",
        to = "super::batches::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Batches,
}

impl Related<super::batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Animal> for ActiveModel {
    fn from(animal: &Animal) -> Self {
        Self {
            id: ActiveValue::Set(animal.id.to_string()),
            ear_tag: ActiveValue::Set(animal.ear_tag.clone()),
            animal_type: ActiveValue::Set(animal.animal_type.clone()),
            sex: ActiveValue::Set(animal.sex.as_str().to_string()),
            entry_date: ActiveValue::Set(animal.entry_date),
            entry_weight: ActiveValue::Set(animal.entry_weight.to_string()),
            current_weight: ActiveValue::Set(animal.current_weight.to_string()),
            last_weighed_on: ActiveValue::Set(animal.last_weighed_on),
            status: ActiveValue::Set(animal.status.as_str().to_string()),
            batch_id: ActiveValue::Set(animal.batch_id.map(|id| id.to_string())),
            purchase_cost: ActiveValue::Set(animal.purchase_cost.to_string()),
            accumulated_feed_cost: ActiveValue::Set(animal.accumulated_feed_cost.to_string()),
            accumulated_treatment_cost: ActiveValue::Set(
                animal.accumulated_treatment_cost.to_string(),
            ),
            accumulated_other_cost: ActiveValue::Set(animal.accumulated_other_cost.to_string()),
            total_cost: ActiveValue::Set(animal.total_cost.to_string()),
            disposed_on: ActiveValue::Set(animal.disposed_on),
            death_cause: ActiveValue::Set(animal.death_cause.clone()),
            created_at: ActiveValue::Set(animal.created_at),
        }
    }
}

impl TryFrom<Model> for Animal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "animal")?,
            sex: Sex::try_from(model.sex.as_str())?,
            entry_weight: parse_decimal(&model.entry_weight, "entry_weight")?,
            current_weight: parse_decimal(&model.current_weight, "current_weight")?,
            status: AnimalStatus::try_from(model.status.as_str())?,
            batch_id: parse_optional_uuid(model.batch_id.as_deref(), "batch")?,
            purchase_cost: parse_money(&model.purchase_cost, "purchase_cost")?,
            accumulated_feed_cost: parse_money(&model.accumulated_feed_cost, "feed_cost")?,
            accumulated_treatment_cost: parse_money(
                &model.accumulated_treatment_cost,
                "treatment_cost",
            )?,
            accumulated_other_cost: parse_money(&model.accumulated_other_cost, "other_cost")?,
            total_cost: parse_money(&model.total_cost, "total_cost")?,
            ear_tag: model.ear_tag,
            animal_type: model.animal_type,
            entry_date: model.entry_date,
            last_weighed_on: model.last_weighed_on,
            disposed_on: model.disposed_on,
            death_cause: model.death_cause,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn unknown_status_and_sex_are_rejected() {
        assert_eq!(AnimalStatus::try_from("sold").unwrap(), AnimalStatus::Sold);
        assert_eq!(
            AnimalStatus::try_from("stolen").unwrap_err(),
            EngineError::UnknownVariant("animal status \"stolen\"".to_string())
        );
        assert!(matches!(Sex::try_from("Male"), Err(EngineError::UnknownVariant(_))));
    }

    fn animal() -> Animal {
        Animal::new(&NewAnimal {
            ear_tag: "TH-0001".to_string(),
            animal_type: "beef cattle".to_string(),
            sex: Sex::Male,
            entry_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            entry_weight: dec!(250),
            batch_id: None,
            origin: AnimalOrigin::Born,
        })
        .unwrap()
    }

    #[test]
    fn accrue_keeps_total_in_sync() {
        let mut animal = animal();
        animal
            .accrue(CostCategory::Purchase, Money::new(dec!(4200)))
            .unwrap();
        animal.accrue(CostCategory::Feed, Money::new(dec!(650.25))).unwrap();
        animal
            .accrue(CostCategory::Treatment, Money::new(dec!(120)))
            .unwrap();
        animal.accrue(CostCategory::Other, Money::new(dec!(29.75))).unwrap();

        assert_eq!(animal.total_cost.amount(), dec!(5000));
        animal.verify().unwrap();
    }

    #[test]
    fn disposed_animal_is_frozen() {
        let mut animal = animal();
        animal.accrue(CostCategory::Feed, Money::new(dec!(10))).unwrap();
        animal
            .mark_deceased(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(), None)
            .unwrap();

        let err = animal
            .accrue(CostCategory::Feed, Money::new(dec!(5)))
            .unwrap_err();
        assert!(matches!(err, EngineError::FrozenEntity(_)));
        assert_eq!(animal.accumulated_feed_cost.amount(), dec!(10));
        assert_eq!(animal.total_cost.amount(), dec!(10));
    }

    #[test]
    fn accrual_past_decimal_range_is_rejected() {
        let mut animal = animal();
        animal
            .accrue(CostCategory::Purchase, Money::new(Decimal::MAX))
            .unwrap();

        let err = animal
            .accrue(CostCategory::Feed, Money::new(dec!(1)))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuantity(_)));
        assert_eq!(animal.accumulated_feed_cost, Money::ZERO);
        assert_eq!(animal.total_cost, Money::new(Decimal::MAX));
        animal.verify().unwrap();
    }

    #[test]
    fn cannot_dispose_twice() {
        let mut animal = animal();
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        animal.mark_sold(dec!(450), day).unwrap();
        assert!(matches!(
            animal.mark_deceased(day, None),
            Err(EngineError::AnimalNotActive(_))
        ));
    }

    #[test]
    fn daily_gain_needs_a_later_weighing() {
        let mut animal = animal();
        assert_eq!(animal.daily_gain(), None);

        animal
            .record_weight(dec!(310), NaiveDate::from_ymd_opt(2026, 2, 20).unwrap())
            .unwrap();
        // 60 kg over 50 days
        assert_eq!(animal.daily_gain(), Some(dec!(1.2)));
        assert_eq!(animal.weight_gain(), dec!(60));
    }

    #[test]
    fn verify_detects_drift() {
        let mut animal = animal();
        animal.total_cost = Money::new(dec!(1));
        assert!(matches!(
            animal.verify(),
            Err(EngineError::InconsistentAggregate(_))
        ));
    }
}
