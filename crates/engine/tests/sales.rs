use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, Statement};

use engine::{
    AnimalStatus, BatchStatus, CostCategory, CostPosting, EngineError, Money, PaymentMethod,
    PaymentStatus, SaleTerms,
};

mod common;
use common::{batch, bought, day, engine_with_db};

fn terms(paid: Money) -> SaleTerms {
    SaleTerms {
        weight: dec!(450),
        price_per_kg: dec!(22),
        sale_date: day(7, 15),
        customer_id: Some("CUST-9".to_string()),
        payment_method: PaymentMethod::Transfer,
        paid_amount: paid,
    }
}

#[tokio::test]
async fn sale_freezes_cost_and_feeds_batch_revenue() {
    let (engine, _db) = engine_with_db().await;
    let pen = batch(&engine, "B-01").await;
    let steer = bought(&engine, "TH-001", Some(&pen), dec!(4200)).await;
    engine
        .post_cost(CostPosting::new(CostCategory::Treatment, Money::new(dec!(300))).for_animal(steer.id))
        .await
        .unwrap();
    engine
        .post_cost(CostPosting::new(CostCategory::Other, Money::new(dec!(500))).for_animal(steer.id))
        .await
        .unwrap();

    let sale = engine
        .sell_animal(steer.id, terms(Money::new(dec!(6000))))
        .await
        .unwrap();
    assert_eq!(sale.sale_price, Money::new(dec!(9900)));
    assert_eq!(sale.total_cost, Money::new(dec!(5000)));
    assert_eq!(sale.profit, Money::new(dec!(4900)));
    assert_eq!(sale.profit_percentage, Some(dec!(98)));
    assert_eq!(sale.remaining_amount, Money::new(dec!(3900)));
    assert_eq!(sale.payment_status(), PaymentStatus::Partial);
    assert_eq!(sale.batch_id, Some(pen.id));

    let steer = engine.animal(steer.id).await.unwrap();
    assert_eq!(steer.status, AnimalStatus::Sold);
    assert_eq!(steer.current_weight, dec!(450));
    assert_eq!(steer.disposed_on, Some(day(7, 15)));
    assert_eq!(steer.total_cost, Money::new(dec!(5000)));

    let pen = engine.batch(pen.id).await.unwrap();
    assert_eq!(pen.sold_animals, 1);
    assert_eq!(pen.total_revenue, Money::new(dec!(9900)));
    assert_eq!(pen.profit, Money::new(dec!(4900)));
    assert_eq!(pen.status, BatchStatus::Closed);

    let stored = engine.sale_for_animal(steer.id).await.unwrap().unwrap();
    assert_eq!(stored.id, sale.id);
    assert_eq!(stored.customer_id.as_deref(), Some("CUST-9"));
    let listed = engine.sales_for_batch(pen.id).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn animal_can_only_be_sold_once() {
    let (engine, _db) = engine_with_db().await;
    let steer = bought(&engine, "TH-001", None, dec!(4200)).await;
    engine
        .sell_animal(steer.id, terms(Money::ZERO))
        .await
        .unwrap();

    let err = engine
        .sell_animal(steer.id, terms(Money::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AnimalNotActive(_)));
}

#[tokio::test]
async fn existing_sale_blocks_active_animal() {
    let (engine, db) = engine_with_db().await;
    let steer = bought(&engine, "TH-001", None, dec!(4200)).await;
    let first = engine
        .sell_animal(steer.id, terms(Money::ZERO))
        .await
        .unwrap();

    // Status rewritten behind the engine's back: active, but a sale exists.
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE animals SET status = ? WHERE id = ?",
        vec!["active".into(), steer.id.to_string().into()],
    ))
    .await
    .unwrap();

    let err = engine
        .sell_animal(steer.id, terms(Money::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadySold(_)));

    let steer = engine.animal(steer.id).await.unwrap();
    assert_eq!(steer.status, AnimalStatus::Active);
    let stored = engine.sale_for_animal(steer.id).await.unwrap().unwrap();
    assert_eq!(stored.id, first.id);
}

#[tokio::test]
async fn sale_price_past_decimal_range_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let pen = batch(&engine, "B-01").await;
    let steer = bought(&engine, "TH-001", Some(&pen), dec!(4200)).await;

    let huge = Decimal::from(1_000_000_000_000_000_i64);
    let err = engine
        .sell_animal(
            steer.id,
            SaleTerms {
                weight: huge,
                price_per_kg: huge,
                ..terms(Money::ZERO)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuantity(_)));

    let steer = engine.animal(steer.id).await.unwrap();
    assert_eq!(steer.status, AnimalStatus::Active);
    assert!(engine.sale_for_animal(steer.id).await.unwrap().is_none());
    let pen = engine.batch(pen.id).await.unwrap();
    assert_eq!(pen.sold_animals, 0);
}

#[tokio::test]
async fn dead_animal_cannot_be_sold() {
    let (engine, _db) = engine_with_db().await;
    let steer = bought(&engine, "TH-001", None, dec!(4200)).await;
    engine.record_death(steer.id, day(3, 1), None).await.unwrap();

    let err = engine
        .sell_animal(steer.id, terms(Money::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AnimalNotActive(_)));
    assert!(engine.sale_for_animal(steer.id).await.unwrap().is_none());
}

#[tokio::test]
async fn rejected_sale_leaves_animal_untouched() {
    let (engine, _db) = engine_with_db().await;
    let pen = batch(&engine, "B-01").await;
    let steer = bought(&engine, "TH-001", Some(&pen), dec!(4200)).await;

    let err = engine
        .sell_animal(steer.id, terms(Money::new(dec!(9900.01))))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OverPayment(_)));

    let err = engine
        .sell_animal(
            steer.id,
            SaleTerms {
                weight: dec!(0),
                ..terms(Money::ZERO)
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidQuantity(_)));

    let steer = engine.animal(steer.id).await.unwrap();
    assert_eq!(steer.status, AnimalStatus::Active);
    assert!(engine.sale_for_animal(steer.id).await.unwrap().is_none());
    let pen = engine.batch(pen.id).await.unwrap();
    assert_eq!(pen.sold_animals, 0);
    assert_eq!(pen.total_revenue, Money::ZERO);
}

#[tokio::test]
async fn instalments_settle_the_balance() {
    let (engine, _db) = engine_with_db().await;
    let steer = bought(&engine, "TH-001", None, dec!(4200)).await;
    let sale = engine
        .sell_animal(steer.id, terms(Money::ZERO))
        .await
        .unwrap();
    assert_eq!(sale.payment_status(), PaymentStatus::Pending);

    let sale = engine
        .record_sale_payment(sale.id, Money::new(dec!(4000)))
        .await
        .unwrap();
    assert_eq!(sale.remaining_amount, Money::new(dec!(5900)));
    assert_eq!(sale.payment_status(), PaymentStatus::Partial);

    let err = engine
        .record_sale_payment(sale.id, Money::new(dec!(6000)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OverPayment(_)));

    engine
        .record_sale_payment(sale.id, Money::new(dec!(5900)))
        .await
        .unwrap();
    let sale = engine.animal_sale(sale.id).await.unwrap();
    assert_eq!(sale.paid_amount, Money::new(dec!(9900)));
    assert_eq!(sale.remaining_amount, Money::ZERO);
    assert_eq!(sale.payment_status(), PaymentStatus::Paid);
}
