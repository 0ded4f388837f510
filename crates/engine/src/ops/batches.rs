use chrono::NaiveDate;
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{Animal, Batch, EngineError, ResultEngine, animals, batches};

use super::{Engine, normalize_optional_text, normalize_required_text, with_tx};

impl Engine {
    /// Opens a new, empty batch. `batch_number` must be unique.
    pub async fn new_batch(
        &self,
        batch_number: &str,
        start_date: NaiveDate,
        note: Option<&str>,
    ) -> ResultEngine<Batch> {
        let batch_number = normalize_required_text(batch_number, "batch number")?;
        let note = normalize_optional_text(note);
        let batch = with_tx!(self, |db_tx| {
            if self
                .find_batch_by_number(&db_tx, &batch_number)
                .await?
                .is_some()
            {
                return Err(EngineError::ExistingKey(batch_number));
            }
            let batch = Batch::new(batch_number, start_date, note);
            batches::ActiveModel::try_from(&batch)?.insert(&db_tx).await?;
            Ok(batch)
        })?;

        tracing::info!("new batch {} ({})", batch.batch_number, batch.id);
        Ok(batch)
    }

    pub async fn batch(&self, batch_id: Uuid) -> ResultEngine<Batch> {
        with_tx!(self, |db_tx| self.require_batch(&db_tx, batch_id).await)
    }

    pub async fn batch_by_number(&self, batch_number: &str) -> ResultEngine<Batch> {
        let batch_number = normalize_required_text(batch_number, "batch number")?;
        with_tx!(self, |db_tx| {
            self.find_batch_by_number(&db_tx, &batch_number)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("batch not exists".to_string()))
        })
    }

    /// Members of the batch, active and disposed, by ear tag.
    pub async fn batch_members(&self, batch_id: Uuid) -> ResultEngine<Vec<Animal>> {
        with_tx!(self, |db_tx| {
            self.require_batch(&db_tx, batch_id).await?;
            animals::Entity::find()
                .filter(animals::Column::BatchId.eq(batch_id.to_string()))
                .order_by_asc(animals::Column::EarTag)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Animal::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
