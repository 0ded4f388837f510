use chrono::Utc;
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, SqlErr, TransactionTrait, prelude::*};

use crate::{AnimalSale, EngineError, Money, ResultEngine, SaleTerms, animal_sales};

use super::{Engine, with_tx};

impl Engine {
    /// Sells an active animal.
    ///
    /// In one transaction: snapshots the animal's cost, writes the sale,
    /// marks the animal sold and rolls up its batch so the sale price shows
    /// up in the batch revenue and profit.
    pub async fn sell_animal(&self, animal_id: Uuid, terms: SaleTerms) -> ResultEngine<AnimalSale> {
        let today = Utc::now().date_naive();
        let sale = with_tx!(self, |db_tx| {
            let mut animal = self.require_animal(&db_tx, animal_id).await?;
            if !animal.is_active() {
                tracing::warn!(
                    "rejected sale of animal {}: it is {}",
                    animal.ear_tag,
                    animal.status.as_str()
                );
                return Err(EngineError::AnimalNotActive(format!(
                    "animal {} is {}",
                    animal.ear_tag,
                    animal.status.as_str()
                )));
            }
            if self.find_sale_by_animal(&db_tx, animal_id).await?.is_some() {
                return Err(EngineError::AlreadySold(animal.ear_tag));
            }

            let sale = AnimalSale::settle(&animal, &terms)?;
            animal.mark_sold(terms.weight, terms.sale_date)?;

            animal_sales::ActiveModel::from(&sale)
                .insert(&db_tx)
                .await
                .map_err(|err| match err.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        EngineError::AlreadySold(animal.ear_tag.clone())
                    }
                    _ => err.into(),
                })?;
            self.save_animal(&db_tx, &animal).await?;
            if let Some(batch_id) = animal.batch_id {
                self.rollup_batch_in_tx(&db_tx, batch_id, today).await?;
            }
            Ok(sale)
        })?;

        tracing::info!(
            "animal {} sold for {} (cost {}, profit {}, remaining {})",
            sale.animal_id,
            sale.sale_price,
            sale.total_cost,
            sale.profit,
            sale.remaining_amount
        );
        Ok(sale)
    }

    /// Books an instalment against a sale's outstanding balance.
    pub async fn record_sale_payment(&self, sale_id: Uuid, amount: Money) -> ResultEngine<AnimalSale> {
        let sale = with_tx!(self, |db_tx| {
            let mut sale = self.require_sale(&db_tx, sale_id).await?;
            sale.apply_payment(amount)?;
            animal_sales::ActiveModel::from(&sale).update(&db_tx).await?;
            Ok(sale)
        })?;

        tracing::info!(
            "payment {} on sale {}; remaining {}",
            amount,
            sale.id,
            sale.remaining_amount
        );
        Ok(sale)
    }

    pub async fn animal_sale(&self, sale_id: Uuid) -> ResultEngine<AnimalSale> {
        with_tx!(self, |db_tx| self.require_sale(&db_tx, sale_id).await)
    }

    pub async fn sale_for_animal(&self, animal_id: Uuid) -> ResultEngine<Option<AnimalSale>> {
        with_tx!(self, |db_tx| self.find_sale_by_animal(&db_tx, animal_id).await)
    }

    /// Sales of animals that belonged to `batch_id`, by sale date.
    pub async fn sales_for_batch(&self, batch_id: Uuid) -> ResultEngine<Vec<AnimalSale>> {
        with_tx!(self, |db_tx| {
            self.require_batch(&db_tx, batch_id).await?;
            animal_sales::Entity::find()
                .filter(animal_sales::Column::BatchId.eq(batch_id.to_string()))
                .order_by_asc(animal_sales::Column::SaleDate)
                .order_by_asc(animal_sales::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(AnimalSale::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }
}
