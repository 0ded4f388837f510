use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{CostEntry, CostPosting, EngineError, ResultEngine, cost_entries};

use super::{Engine, with_tx};

impl Engine {
    /// Attributes a cost to an animal and/or a batch.
    ///
    /// - With an `animal_id` the amount lands in the animal's bucket and, if
    ///   the animal belongs to a batch, in that batch's bucket through the
    ///   rollup. A `batch_id` given alongside must be the animal's batch.
    /// - With only a `batch_id` the cost is a shared, batch-only expense.
    ///
    /// Fails with [`EngineError::FrozenEntity`] for sold or deceased animals.
    pub async fn post_cost(&self, posting: CostPosting) -> ResultEngine<CostEntry> {
        let today = Utc::now().date_naive();
        let entry = with_tx!(self, |db_tx| {
            let entry = self.post_cost_in_tx(&db_tx, &posting, None).await?;
            if let Some(batch_id) = entry.batch_id {
                self.rollup_batch_in_tx(&db_tx, batch_id, today).await?;
            }
            Ok(entry)
        })?;

        tracing::info!(
            "posted {} cost {} (animal: {:?}, batch: {:?})",
            entry.category.as_str(),
            entry.amount,
            entry.animal_id,
            entry.batch_id
        );
        Ok(entry)
    }

    /// Journal entries charged to an animal, oldest first.
    pub async fn animal_cost_entries(&self, animal_id: Uuid) -> ResultEngine<Vec<CostEntry>> {
        with_tx!(self, |db_tx| {
            self.require_animal(&db_tx, animal_id).await?;
            cost_entries::Entity::find()
                .filter(cost_entries::Column::AnimalId.eq(animal_id.to_string()))
                .order_by_asc(cost_entries::Column::OccurredAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(CostEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Journal entries charged to a batch, both animal-level and batch-only,
    /// oldest first.
    pub async fn batch_cost_entries(&self, batch_id: Uuid) -> ResultEngine<Vec<CostEntry>> {
        with_tx!(self, |db_tx| {
            self.require_batch(&db_tx, batch_id).await?;
            cost_entries::Entity::find()
                .filter(cost_entries::Column::BatchId.eq(batch_id.to_string()))
                .order_by_asc(cost_entries::Column::OccurredAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(CostEntry::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Accrues `posting` and appends it to the journal. The caller is
    /// responsible for rolling up the returned entry's batch.
    pub(super) async fn post_cost_in_tx(
        &self,
        db: &DatabaseTransaction,
        posting: &CostPosting,
        inventory_transaction_id: Option<Uuid>,
    ) -> ResultEngine<CostEntry> {
        let batch_id = match (posting.animal_id, posting.batch_id) {
            (None, None) => {
                return Err(EngineError::InvalidTarget(
                    "a cost needs an animal or a batch".to_string(),
                ));
            }
            (Some(animal_id), requested_batch) => {
                let mut animal = self.require_animal(db, animal_id).await?;
                if requested_batch.is_some() && requested_batch != animal.batch_id {
                    tracing::warn!(
                        "rejected cost for animal {}: it is not in batch {:?}",
                        animal.ear_tag,
                        requested_batch
                    );
                    return Err(EngineError::InvalidTarget(format!(
                        "animal {} does not belong to the given batch",
                        animal.ear_tag
                    )));
                }
                if let Err(err) = animal.accrue(posting.category, posting.amount) {
                    tracing::warn!("rejected cost for animal {}: {err}", animal.ear_tag);
                    return Err(err);
                }
                self.save_animal(db, &animal).await?;
                animal.batch_id
            }
            (None, Some(batch_id)) => {
                let batch = self.require_batch(db, batch_id).await?;
                if let Err(err) = batch.ensure_open() {
                    tracing::warn!("rejected shared cost: {err}");
                    return Err(err);
                }
                Some(batch_id)
            }
        };

        let entry = CostEntry::new(posting, batch_id, inventory_transaction_id)?;
        cost_entries::ActiveModel::from(&entry).insert(db).await?;
        Ok(entry)
    }
}
