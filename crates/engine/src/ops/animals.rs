use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use sea_orm::{TransactionTrait, prelude::*};

use crate::{
    Animal, AnimalOrigin, CostCategory, CostPosting, EngineError, NewAnimal, ResultEngine,
    animals,
};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Registers an animal, bought in or born on the farm.
    ///
    /// A purchased animal's price is posted as its purchase cost; a newborn
    /// starts with all buckets at zero. The ear tag must be unique and a
    /// target batch must be open.
    pub async fn register_animal(&self, input: NewAnimal) -> ResultEngine<Animal> {
        let today = Utc::now().date_naive();
        let input = NewAnimal {
            ear_tag: normalize_required_text(&input.ear_tag, "ear tag")?,
            animal_type: normalize_required_text(&input.animal_type, "animal type")?,
            ..input
        };
        let animal = with_tx!(self, |db_tx| {
            if self
                .find_animal_by_ear_tag(&db_tx, &input.ear_tag)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(input.ear_tag.clone()));
            }
            if let Some(batch_id) = input.batch_id {
                self.require_open_batch(&db_tx, batch_id).await?;
            }

            let animal = Animal::new(&input)?;
            animals::ActiveModel::from(&animal).insert(&db_tx).await?;

            if let AnimalOrigin::Purchased { price } = input.origin {
                let posting = CostPosting::new(CostCategory::Purchase, price)
                    .for_animal(animal.id)
                    .with_note("purchase price");
                self.post_cost_in_tx(&db_tx, &posting, None).await?;
            }
            if let Some(batch_id) = animal.batch_id {
                self.rollup_batch_in_tx(&db_tx, batch_id, today).await?;
            }
            self.require_animal(&db_tx, animal.id).await
        })?;

        tracing::info!(
            "registered animal {} ({}), purchase cost {}",
            animal.ear_tag,
            animal.id,
            animal.purchase_cost
        );
        Ok(animal)
    }

    pub async fn animal(&self, animal_id: Uuid) -> ResultEngine<Animal> {
        with_tx!(self, |db_tx| self.require_animal(&db_tx, animal_id).await)
    }

    pub async fn animal_by_ear_tag(&self, ear_tag: &str) -> ResultEngine<Animal> {
        let ear_tag = normalize_required_text(ear_tag, "ear tag")?;
        with_tx!(self, |db_tx| {
            self.find_animal_by_ear_tag(&db_tx, &ear_tag)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("animal not exists".to_string()))
        })
    }

    /// Records a weighing of an active animal.
    pub async fn record_weight(
        &self,
        animal_id: Uuid,
        weight: Decimal,
        weighed_on: NaiveDate,
    ) -> ResultEngine<Animal> {
        let animal = with_tx!(self, |db_tx| {
            let mut animal = self.require_animal(&db_tx, animal_id).await?;
            animal.record_weight(weight, weighed_on)?;
            self.save_animal(&db_tx, &animal).await?;
            Ok(animal)
        })?;

        tracing::info!("animal {} weighed {} on {weighed_on}", animal.ear_tag, weight);
        Ok(animal)
    }

    /// Moves an active animal into `batch_id`, or out of any batch with
    /// `None`. Both the batch it leaves and the one it joins are rolled up.
    pub async fn assign_animal(
        &self,
        animal_id: Uuid,
        batch_id: Option<Uuid>,
    ) -> ResultEngine<Animal> {
        let today = Utc::now().date_naive();
        let animal = with_tx!(self, |db_tx| {
            let mut animal = self.require_animal(&db_tx, animal_id).await?;
            if !animal.is_active() {
                return Err(EngineError::AnimalNotActive(format!(
                    "animal {} is {}",
                    animal.ear_tag,
                    animal.status.as_str()
                )));
            }
            if animal.batch_id == batch_id {
                return Ok(animal);
            }

            if let Some(old) = animal.batch_id {
                self.require_open_batch(&db_tx, old).await?;
            }
            if let Some(new) = batch_id {
                self.require_open_batch(&db_tx, new).await?;
            }

            let previous = std::mem::replace(&mut animal.batch_id, batch_id);
            self.save_animal(&db_tx, &animal).await?;
            for touched in [previous, batch_id].into_iter().flatten() {
                self.rollup_batch_in_tx(&db_tx, touched, today).await?;
            }
            Ok(animal)
        })?;

        tracing::info!("animal {} assigned to batch {:?}", animal.ear_tag, animal.batch_id);
        Ok(animal)
    }

    /// Marks an active animal as deceased. Its costs are frozen and stay in
    /// its batch.
    pub async fn record_death(
        &self,
        animal_id: Uuid,
        died_on: NaiveDate,
        cause: Option<&str>,
    ) -> ResultEngine<Animal> {
        let today = Utc::now().date_naive();
        let cause = normalize_optional_text(cause);
        let animal = with_tx!(self, |db_tx| {
            let mut animal = self.require_animal(&db_tx, animal_id).await?;
            animal.mark_deceased(died_on, cause)?;
            self.save_animal(&db_tx, &animal).await?;
            if let Some(batch_id) = animal.batch_id {
                self.rollup_batch_in_tx(&db_tx, batch_id, today).await?;
            }
            Ok(animal)
        })?;

        tracing::info!(
            "animal {} died on {died_on}; frozen cost {}",
            animal.ear_tag,
            animal.total_cost
        );
        Ok(animal)
    }
}
