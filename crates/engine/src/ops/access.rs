use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    Animal, AnimalSale, Batch, EngineError, InventoryItem, PerformanceGoal, ResultEngine,
    animal_sales, animals, batches, inventory_items, performance_goals,
};

use super::Engine;

/// Generates a `require_*` loader that fetches a row by id inside the
/// current transaction and converts it to its domain type.
macro_rules! impl_require {
    ($require_fn:ident, $entity:path, $domain:ty, $err_msg:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
        ) -> ResultEngine<$domain> {
            let model = <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))?;
            <$domain>::try_from(model)
        }
    };
}

impl Engine {
    impl_require!(require_animal, animals::Entity, Animal, "animal not exists");
    impl_require!(require_batch, batches::Entity, Batch, "batch not exists");
    impl_require!(
        require_item,
        inventory_items::Entity,
        InventoryItem,
        "inventory item not exists"
    );
    impl_require!(require_sale, animal_sales::Entity, AnimalSale, "sale not exists");
    impl_require!(
        require_goal,
        performance_goals::Entity,
        PerformanceGoal,
        "goal not exists"
    );

    pub(super) async fn find_animal_by_ear_tag(
        &self,
        db: &DatabaseTransaction,
        ear_tag: &str,
    ) -> ResultEngine<Option<Animal>> {
        animals::Entity::find()
            .filter(animals::Column::EarTag.eq(ear_tag))
            .one(db)
            .await?
            .map(Animal::try_from)
            .transpose()
    }

    pub(super) async fn find_batch_by_number(
        &self,
        db: &DatabaseTransaction,
        batch_number: &str,
    ) -> ResultEngine<Option<Batch>> {
        batches::Entity::find()
            .filter(batches::Column::BatchNumber.eq(batch_number))
            .one(db)
            .await?
            .map(Batch::try_from)
            .transpose()
    }

    pub(super) async fn find_item_by_code(
        &self,
        db: &DatabaseTransaction,
        code: &str,
    ) -> ResultEngine<Option<InventoryItem>> {
        inventory_items::Entity::find()
            .filter(inventory_items::Column::Code.eq(code))
            .one(db)
            .await?
            .map(InventoryItem::try_from)
            .transpose()
    }

    pub(super) async fn find_sale_by_animal(
        &self,
        db: &DatabaseTransaction,
        animal_id: Uuid,
    ) -> ResultEngine<Option<AnimalSale>> {
        animal_sales::Entity::find()
            .filter(animal_sales::Column::AnimalId.eq(animal_id.to_string()))
            .one(db)
            .await?
            .map(AnimalSale::try_from)
            .transpose()
    }

    /// Loads the batch an animal is about to join and rejects closed ones.
    pub(super) async fn require_open_batch(
        &self,
        db: &DatabaseTransaction,
        batch_id: Uuid,
    ) -> ResultEngine<Batch> {
        let batch = self.require_batch(db, batch_id).await?;
        batch.ensure_open()?;
        Ok(batch)
    }

    pub(super) async fn save_animal(
        &self,
        db: &DatabaseTransaction,
        animal: &Animal,
    ) -> ResultEngine<()> {
        animals::ActiveModel::from(animal).update(db).await?;
        Ok(())
    }

    pub(super) async fn save_batch(&self, db: &DatabaseTransaction, batch: &Batch) -> ResultEngine<()> {
        batches::ActiveModel::try_from(batch)?.update(db).await?;
        Ok(())
    }
}
