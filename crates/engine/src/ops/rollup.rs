use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Animal, AnimalSale, Batch, BatchRollup, CostEntry, ResultEngine, animal_sales, animals,
    cost_entries,
};

use super::{Engine, with_tx};

impl Engine {
    /// Recomputes a batch's denormalized aggregates from its members, its
    /// batch-only journal entries and its sales.
    ///
    /// Running it again without intervening changes yields the same batch.
    /// Closes the batch once every member has been sold or has died.
    pub async fn recompute_batch(&self, batch_id: Uuid) -> ResultEngine<Batch> {
        let today = Utc::now().date_naive();
        with_tx!(self, |db_tx| {
            self.rollup_batch_in_tx(&db_tx, batch_id, today).await
        })
    }

    /// Checks the stored aggregate of a batch, and the totals of each of its
    /// members, against a fresh in-memory rollup. Writes nothing.
    ///
    /// Fails with [`crate::EngineError::InconsistentAggregate`] on mismatch.
    pub async fn verify_batch(&self, batch_id: Uuid) -> ResultEngine<Batch> {
        with_tx!(self, |db_tx| {
            let batch = self.require_batch(&db_tx, batch_id).await?;
            let (members, rollup) = self.load_rollup(&db_tx, batch_id).await?;
            for animal in &members {
                animal.verify()?;
            }
            batch.verify(Some(&rollup))?;
            Ok(batch)
        })
    }

    pub(super) async fn rollup_batch_in_tx(
        &self,
        db: &DatabaseTransaction,
        batch_id: Uuid,
        today: NaiveDate,
    ) -> ResultEngine<Batch> {
        let mut batch = self.require_batch(db, batch_id).await?;
        let (_, rollup) = self.load_rollup(db, batch_id).await?;

        let closed = batch.apply_rollup(&rollup, today)?;
        self.save_batch(db, &batch).await?;

        tracing::debug!(
            "batch {} rolled up: {} animals ({} sold, {} deceased), cost {}, revenue {}",
            batch.batch_number,
            batch.total_animals,
            batch.sold_animals,
            batch.deceased_animals,
            batch.total_cost,
            batch.total_revenue
        );
        if closed {
            tracing::info!("batch {} closed on {today}", batch.batch_number);
        }
        Ok(batch)
    }

    async fn load_rollup(
        &self,
        db: &DatabaseTransaction,
        batch_id: Uuid,
    ) -> ResultEngine<(Vec<Animal>, BatchRollup)> {
        let batch_key = batch_id.to_string();

        let members = animals::Entity::find()
            .filter(animals::Column::BatchId.eq(batch_key.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(Animal::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let batch_only = cost_entries::Entity::find()
            .filter(cost_entries::Column::BatchId.eq(batch_key.clone()))
            .filter(cost_entries::Column::AnimalId.is_null())
            .all(db)
            .await?
            .into_iter()
            .map(CostEntry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        let sales = animal_sales::Entity::find()
            .filter(animal_sales::Column::BatchId.eq(batch_key))
            .all(db)
            .await?
            .into_iter()
            .map(AnimalSale::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let rollup = BatchRollup::compute(&members, &batch_only, &sales)?;
        Ok((members, rollup))
    }
}
