use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use engine::{
    CostCategory, Direction, DispenseTarget, EngineError, InventoryTransactionFilter, ItemKind,
    Money,
};

mod common;
use common::{batch, bought, day, engine_with_db, stocked_feed};

#[tokio::test]
async fn receive_uses_cost_weighted_average() {
    let (engine, _db) = engine_with_db().await;
    let item = stocked_feed(&engine, "FEED-01", dec!(100), dec!(8.5)).await;
    assert_eq!(item.unit_cost, dec!(8.5));

    let movement = engine
        .receive(item.id, dec!(50), dec!(9.0), Some("invoice 118"))
        .await
        .unwrap();

    assert_eq!(movement.transaction.direction, Direction::In);
    assert_eq!(movement.transaction.total_cost, Money::new(dec!(450)));
    assert_eq!(movement.item.current_stock, dec!(150));
    assert_eq!(movement.item.unit_cost.round_dp(3), dec!(8.667));

    let stored = engine.inventory_item(item.id).await.unwrap();
    assert_eq!(stored.current_stock, movement.item.current_stock);
    assert_eq!(stored.unit_cost, movement.item.unit_cost);
    assert_eq!(
        stored.total_value,
        Money::from_product(stored.current_stock, stored.unit_cost).unwrap()
    );
}

#[tokio::test]
async fn receive_past_decimal_range_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let item = stocked_feed(&engine, "FEED-01", dec!(100), dec!(8.5)).await;

    let huge = Decimal::from(1_000_000_000_000_000_i64);
    let err = engine.receive(item.id, huge, huge, None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuantity(_)));

    let stored = engine.inventory_item(item.id).await.unwrap();
    assert_eq!(stored.current_stock, dec!(100));
    assert_eq!(stored.unit_cost, dec!(8.5));
    let receipts = engine
        .inventory_transactions(&InventoryTransactionFilter {
            item_id: Some(item.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(receipts.len(), 1);
}

#[tokio::test]
async fn receive_rejects_non_positive_quantity() {
    let (engine, _db) = engine_with_db().await;
    let item = stocked_feed(&engine, "FEED-01", dec!(10), dec!(2)).await;

    let err = engine
        .receive(item.id, Decimal::ZERO, dec!(2), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuantity(_)));

    let movements = engine
        .inventory_transactions(&InventoryTransactionFilter {
            item_id: Some(item.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
async fn dispense_past_stock_fails_and_changes_nothing() {
    let (engine, _db) = engine_with_db().await;
    let item = stocked_feed(&engine, "FEED-01", dec!(20), dec!(3)).await;

    let err = engine
        .dispense(item.id, dec!(20.5), DispenseTarget::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStock(_)));

    let stored = engine.inventory_item(item.id).await.unwrap();
    assert_eq!(stored.current_stock, dec!(20));
    let outs = engine
        .inventory_transactions(&InventoryTransactionFilter {
            direction: Some(Direction::Out),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(outs.is_empty());

    // The whole stock can still be drawn.
    let movement = engine
        .dispense(item.id, dec!(20), DispenseTarget::default())
        .await
        .unwrap();
    assert_eq!(movement.item.current_stock, Decimal::ZERO);
    assert_eq!(movement.item.total_value, Money::ZERO);
    assert!(movement.cost_entry.is_none());
}

#[tokio::test]
async fn dispense_to_animal_charges_animal_and_batch() {
    let (engine, _db) = engine_with_db().await;
    let pen = batch(&engine, "B-01").await;
    let steer = bought(&engine, "TH-001", Some(&pen), dec!(4000)).await;
    let item = stocked_feed(&engine, "FEED-01", dec!(100), dec!(8.5)).await;

    let movement = engine
        .dispense(
            item.id,
            dec!(12),
            DispenseTarget {
                animal_id: Some(steer.id),
                pen_number: Some("P3".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(movement.transaction.total_cost, Money::new(dec!(102)));
    assert_eq!(movement.transaction.pen_number.as_deref(), Some("P3"));
    let entry = movement.cost_entry.unwrap();
    assert_eq!(entry.category, CostCategory::Feed);
    assert_eq!(entry.inventory_transaction_id, Some(movement.transaction.id));
    assert_eq!(entry.batch_id, Some(pen.id));

    let steer = engine.animal(steer.id).await.unwrap();
    assert_eq!(steer.accumulated_feed_cost, Money::new(dec!(102)));
    assert_eq!(steer.total_cost, Money::new(dec!(4102)));

    let pen = engine.batch(pen.id).await.unwrap();
    assert_eq!(pen.feed_cost, Money::new(dec!(102)));
    assert_eq!(pen.total_cost, Money::new(dec!(4102)));

    let for_steer = engine
        .inventory_transactions(&InventoryTransactionFilter {
            animal_id: Some(steer.id),
            ..Default::default()
        })
        .await
        .unwrap();
    let ids: Vec<_> = for_steer.iter().map(|tx| tx.id).collect();
    assert_eq!(ids, vec![movement.transaction.id]);
}

#[tokio::test]
async fn medicine_is_charged_as_treatment() {
    let (engine, _db) = engine_with_db().await;
    let steer = bought(&engine, "TH-001", None, dec!(4000)).await;
    let item = engine
        .new_inventory_item("MED-IVM", "Ivermectin", ItemKind::Medicine, "ml", dec!(100))
        .await
        .unwrap();
    engine
        .receive(item.id, dec!(500), dec!(1.2), None)
        .await
        .unwrap();

    engine
        .dispense(item.id, dec!(25), DispenseTarget::animal(steer.id))
        .await
        .unwrap();

    let steer = engine.animal(steer.id).await.unwrap();
    assert_eq!(steer.accumulated_treatment_cost, Money::new(dec!(30)));
    assert_eq!(steer.accumulated_feed_cost, Money::ZERO);
}

#[tokio::test]
async fn dispense_to_frozen_animal_rolls_back_stock() {
    let (engine, _db) = engine_with_db().await;
    let steer = bought(&engine, "TH-001", None, dec!(4000)).await;
    engine
        .record_death(steer.id, day(2, 1), Some("bloat"))
        .await
        .unwrap();
    let item = stocked_feed(&engine, "FEED-01", dec!(100), dec!(8.5)).await;

    let err = engine
        .dispense(item.id, dec!(10), DispenseTarget::animal(steer.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::FrozenEntity(_)));

    let stored = engine.inventory_item(item.id).await.unwrap();
    assert_eq!(stored.current_stock, dec!(100));
    let outs = engine
        .inventory_transactions(&InventoryTransactionFilter {
            item_id: Some(item.id),
            direction: Some(Direction::Out),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(outs.is_empty());
}

#[tokio::test]
async fn low_stock_lists_items_at_or_below_reorder_point() {
    let (engine, _db) = engine_with_db().await;
    let pellets = stocked_feed(&engine, "FEED-01", dec!(100), dec!(8.5)).await;
    let hay = stocked_feed(&engine, "FEED-02", dec!(60), dec!(2)).await;

    engine
        .dispense(hay.id, dec!(10), DispenseTarget::default())
        .await
        .unwrap();

    let low = engine.low_stock_items().await.unwrap();
    let codes: Vec<&str> = low.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, vec!["FEED-02"]);
    assert!(!low.iter().any(|i| i.id == pellets.id));
}

#[tokio::test]
async fn item_code_must_be_unique() {
    let (engine, _db) = engine_with_db().await;
    stocked_feed(&engine, "FEED-01", dec!(1), dec!(1)).await;

    let err = engine
        .new_inventory_item(" FEED-01 ", "Other", ItemKind::Feed, "kg", Decimal::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("FEED-01".to_string()));

    let found = engine.inventory_item_by_code("FEED-01").await.unwrap();
    assert_eq!(found.name, "Finisher pellets");
}
