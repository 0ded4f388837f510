use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use sea_orm::{Condition, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Animal, Batch, Direction, EngineError, GoalEvaluation, GoalType, InventoryTransaction,
    ItemKind, NewGoal, PerformanceGoal, ResultEngine, animals, inventory_items,
    inventory_transactions, money::round_to, performance_goals, performance_goals::KPI_SCALE,
};

use super::{Engine, normalize_required_text, with_tx};

fn out_of_range(what: &str) -> EngineError {
    EngineError::InvalidQuantity(format!("{what} is out of range"))
}

fn checked_sum<'a>(values: impl IntoIterator<Item = &'a Decimal>, what: &str) -> ResultEngine<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(*value))
        .ok_or_else(|| out_of_range(what))
}

/// Mean daily gain over the members that have been weighed since entry.
fn average_daily_gain(members: &[Animal]) -> ResultEngine<Decimal> {
    let gains: Vec<Decimal> = members.iter().filter_map(Animal::daily_gain).collect();
    if gains.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let total = checked_sum(&gains, "daily gain")?;
    Ok(total / Decimal::from(gains.len()))
}

/// Feed dispensed per unit of live weight gained.
fn feed_conversion_ratio(feed: Decimal, members: &[Animal]) -> ResultEngine<Decimal> {
    let gains: Vec<Decimal> = members.iter().map(Animal::weight_gain).collect();
    let gain = checked_sum(&gains, "weight gain")?;
    if gain <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    feed.checked_div(gain).ok_or_else(|| out_of_range("feed conversion"))
}

impl Engine {
    pub async fn new_goal(&self, input: NewGoal) -> ResultEngine<PerformanceGoal> {
        let input = NewGoal {
            name: normalize_required_text(&input.name, "goal name")?,
            ..input
        };
        let goal = with_tx!(self, |db_tx| {
            if let Some(batch_id) = input.batch_id {
                self.require_batch(&db_tx, batch_id).await?;
            }
            let goal = PerformanceGoal::new(&input)?;
            performance_goals::ActiveModel::from(&goal)
                .insert(&db_tx)
                .await?;
            Ok(goal)
        })?;

        tracing::info!(
            "new {} goal {} with target {}",
            goal.goal_type.as_str(),
            goal.name,
            goal.target_value
        );
        Ok(goal)
    }

    pub async fn goal(&self, goal_id: Uuid) -> ResultEngine<PerformanceGoal> {
        with_tx!(self, |db_tx| self.require_goal(&db_tx, goal_id).await)
    }

    /// Overwrites the current value of a goal, for KPIs tracked by hand.
    pub async fn set_goal_value(
        &self,
        goal_id: Uuid,
        value: Decimal,
    ) -> ResultEngine<PerformanceGoal> {
        let goal = with_tx!(self, |db_tx| {
            let mut goal = self.require_goal(&db_tx, goal_id).await?;
            goal.set_current(value);
            performance_goals::ActiveModel::from(&goal)
                .update(&db_tx)
                .await?;
            Ok(goal)
        })?;

        tracing::info!("goal {} set to {}", goal.name, goal.current_value);
        Ok(goal)
    }

    /// Recomputes the current value of a batch-scoped goal from the batch's
    /// aggregates and members.
    ///
    /// Fails with [`EngineError::InvalidGoal`] for unscoped and custom goals.
    pub async fn refresh_goal(&self, goal_id: Uuid) -> ResultEngine<PerformanceGoal> {
        let goal = with_tx!(self, |db_tx| {
            let mut goal = self.require_goal(&db_tx, goal_id).await?;
            let Some(batch_id) = goal.batch_id else {
                return Err(EngineError::InvalidGoal(format!(
                    "goal {} has no batch to measure",
                    goal.name
                )));
            };
            let batch = self.require_batch(&db_tx, batch_id).await?;
            let value = self.measure(&db_tx, &goal, &batch).await?;
            goal.set_current(value);
            performance_goals::ActiveModel::from(&goal)
                .update(&db_tx)
                .await?;
            Ok(goal)
        })?;

        tracing::info!(
            "goal {} refreshed to {} (target {})",
            goal.name,
            goal.current_value,
            goal.target_value
        );
        Ok(goal)
    }

    /// Progress and status of a goal as of `today`. Writes nothing.
    pub async fn evaluate_goal(
        &self,
        goal_id: Uuid,
        today: NaiveDate,
    ) -> ResultEngine<GoalEvaluation> {
        with_tx!(self, |db_tx| {
            let goal = self.require_goal(&db_tx, goal_id).await?;
            goal.evaluate(today)
        })
    }

    async fn measure(
        &self,
        db: &DatabaseTransaction,
        goal: &PerformanceGoal,
        batch: &Batch,
    ) -> ResultEngine<Decimal> {
        let value = match goal.goal_type {
            GoalType::Adg => {
                let members = self.load_members(db, batch.id).await?;
                average_daily_gain(&members)?
            }
            GoalType::Fcr => {
                let members = self.load_members(db, batch.id).await?;
                let feed = self.feed_dispensed(db, batch.id, &members).await?;
                feed_conversion_ratio(feed, &members)?
            }
            GoalType::CostPerHead => batch
                .cost_per_head()
                .map(|money| money.amount())
                .unwrap_or(Decimal::ZERO),
            GoalType::Profit => batch.profit.amount(),
            GoalType::Custom => {
                return Err(EngineError::InvalidGoal(format!(
                    "custom goal {} is updated by hand",
                    goal.name
                )));
            }
        };
        Ok(round_to(value, KPI_SCALE))
    }

    async fn load_members(&self, db: &DatabaseTransaction, batch_id: Uuid) -> ResultEngine<Vec<Animal>> {
        animals::Entity::find()
            .filter(animals::Column::BatchId.eq(batch_id.to_string()))
            .all(db)
            .await?
            .into_iter()
            .map(Animal::try_from)
            .collect()
    }

    /// Quantity of feed dispensed to the batch as a whole or to any of its
    /// members.
    async fn feed_dispensed(
        &self,
        db: &DatabaseTransaction,
        batch_id: Uuid,
        members: &[Animal],
    ) -> ResultEngine<Decimal> {
        let feed_items: HashSet<String> = inventory_items::Entity::find()
            .filter(inventory_items::Column::Kind.eq(ItemKind::Feed.as_str()))
            .all(db)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect();

        let member_ids: Vec<String> = members.iter().map(|a| a.id.to_string()).collect();
        let mut target = Condition::any()
            .add(inventory_transactions::Column::BatchId.eq(batch_id.to_string()));
        if !member_ids.is_empty() {
            target = target.add(inventory_transactions::Column::AnimalId.is_in(member_ids));
        }

        let mut total = Decimal::ZERO;
        for model in inventory_transactions::Entity::find()
            .filter(inventory_transactions::Column::Direction.eq(Direction::Out.as_str()))
            .filter(target)
            .all(db)
            .await?
        {
            if !feed_items.contains(&model.item_id) {
                continue;
            }
            let quantity = InventoryTransaction::try_from(model)?.quantity;
            total = total
                .checked_add(quantity)
                .ok_or_else(|| out_of_range("feed dispensed"))?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{AnimalOrigin, NewAnimal, Sex};

    fn weighed(entry: Decimal, now: Decimal, days: i64) -> Animal {
        let entry_date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let mut animal = Animal::new(&NewAnimal {
            ear_tag: "K-1".to_string(),
            animal_type: "beef cattle".to_string(),
            sex: Sex::Male,
            entry_date,
            entry_weight: entry,
            batch_id: None,
            origin: AnimalOrigin::Born,
        })
        .unwrap();
        animal
            .record_weight(now, entry_date + chrono::Duration::days(days))
            .unwrap();
        animal
    }

    #[test]
    fn adg_averages_weighed_members() {
        let members = [weighed(dec!(200), dec!(260), 60), weighed(dec!(210), dec!(300), 60)];
        assert_eq!(average_daily_gain(&members).unwrap(), dec!(1.25));
        assert_eq!(average_daily_gain(&[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn fcr_divides_feed_by_gain() {
        let members = [weighed(dec!(200), dec!(260), 60), weighed(dec!(210), dec!(300), 60)];
        assert_eq!(feed_conversion_ratio(dec!(900), &members).unwrap(), dec!(6));
        assert_eq!(feed_conversion_ratio(dec!(900), &[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn fcr_past_decimal_range_fails() {
        let members = [weighed(dec!(200), dec!(200.001), 60)];
        assert!(matches!(
            feed_conversion_ratio(Decimal::MAX, &members),
            Err(EngineError::InvalidQuantity(_))
        ));
    }
}
