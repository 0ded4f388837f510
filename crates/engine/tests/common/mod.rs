#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Animal, AnimalOrigin, Batch, Engine, InventoryItem, ItemKind, Money, NewAnimal, Sex,
};
use migration::MigratorTrait;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

pub async fn batch(engine: &Engine, number: &str) -> Batch {
    engine.new_batch(number, day(1, 5), None).await.unwrap()
}

pub async fn bought(
    engine: &Engine,
    ear_tag: &str,
    batch: Option<&Batch>,
    price: Decimal,
) -> Animal {
    engine
        .register_animal(NewAnimal {
            ear_tag: ear_tag.to_string(),
            animal_type: "beef cattle".to_string(),
            sex: Sex::Male,
            entry_date: day(1, 10),
            entry_weight: Decimal::from(250),
            batch_id: batch.map(|b| b.id),
            origin: AnimalOrigin::Purchased {
                price: Money::new(price),
            },
        })
        .await
        .unwrap()
}

pub async fn stocked_feed(engine: &Engine, code: &str, quantity: Decimal, unit_cost: Decimal) -> InventoryItem {
    let item = engine
        .new_inventory_item(code, "Finisher pellets", ItemKind::Feed, "kg", Decimal::from(50))
        .await
        .unwrap();
    engine
        .receive(item.id, quantity, unit_cost, Some("co-op"))
        .await
        .unwrap()
        .item
}
