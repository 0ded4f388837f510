use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use engine::{
    Batch, DispenseTarget, Engine, EngineError, GoalStatus, GoalType, ItemKind, NewGoal,
    PerformanceGoal,
};

mod common;
use common::{batch, bought, day, engine_with_db, stocked_feed};

async fn goal(engine: &Engine, goal_type: GoalType, target: Decimal, batch: Option<&Batch>) -> PerformanceGoal {
    engine
        .new_goal(NewGoal {
            name: format!("{} target", goal_type.as_str()),
            goal_type,
            target_value: target,
            batch_id: batch.map(|b| b.id),
            start_date: day(1, 1),
            end_date: Some(day(12, 31)),
        })
        .await
        .unwrap()
}

/// Two steers weighed after 60 days, fed from pellets, one dosed.
async fn fed_pen(engine: &Engine) -> Batch {
    let pen = batch(engine, "B-01").await;
    let a = bought(engine, "TH-001", Some(&pen), dec!(2000)).await;
    let b = bought(engine, "TH-002", Some(&pen), dec!(2000)).await;
    engine.record_weight(a.id, dec!(340), day(3, 11)).await.unwrap();
    engine.record_weight(b.id, dec!(310), day(3, 11)).await.unwrap();

    let pellets = stocked_feed(engine, "FEED-01", dec!(1000), dec!(2)).await;
    engine
        .dispense(pellets.id, dec!(600), DispenseTarget::batch(pen.id))
        .await
        .unwrap();
    engine
        .dispense(pellets.id, dec!(150), DispenseTarget::animal(a.id))
        .await
        .unwrap();

    let wormer = engine
        .new_inventory_item("MED-01", "Wormer", ItemKind::Medicine, "ml", dec!(10))
        .await
        .unwrap();
    engine.receive(wormer.id, dec!(100), dec!(1), None).await.unwrap();
    engine
        .dispense(wormer.id, dec!(10), DispenseTarget::animal(b.id))
        .await
        .unwrap();

    engine.batch(pen.id).await.unwrap()
}

#[tokio::test]
async fn refresh_measures_batch_kpis() {
    let (engine, _db) = engine_with_db().await;
    let pen = fed_pen(&engine).await;

    let adg = goal(&engine, GoalType::Adg, dec!(1.2), Some(&pen)).await;
    let adg = engine.refresh_goal(adg.id).await.unwrap();
    assert_eq!(adg.current_value, dec!(1.25));
    let eval = engine.evaluate_goal(adg.id, day(4, 1)).await.unwrap();
    assert_eq!(eval.progress, Decimal::ONE);
    assert_eq!(eval.status, GoalStatus::Achieved);

    let fcr = goal(&engine, GoalType::Fcr, dec!(6), Some(&pen)).await;
    let fcr = engine.refresh_goal(fcr.id).await.unwrap();
    assert_eq!(fcr.current_value, dec!(5));

    let per_head = goal(&engine, GoalType::CostPerHead, dec!(3000), Some(&pen)).await;
    let per_head = engine.refresh_goal(per_head.id).await.unwrap();
    assert_eq!(per_head.current_value, dec!(2755));
    let eval = engine.evaluate_goal(per_head.id, day(4, 1)).await.unwrap();
    assert_eq!(eval.progress, dec!(0.918));
    assert_eq!(eval.status, GoalStatus::Active);

    let profit = goal(&engine, GoalType::Profit, dec!(1000), Some(&pen)).await;
    let profit = engine.refresh_goal(profit.id).await.unwrap();
    assert_eq!(profit.current_value, dec!(-5510));
    let eval = engine.evaluate_goal(profit.id, day(4, 1)).await.unwrap();
    assert_eq!(eval.progress, Decimal::ZERO);

    let stored = engine.goal(profit.id).await.unwrap();
    assert_eq!(stored.current_value, dec!(-5510));
}

#[tokio::test]
async fn empty_batch_measures_zero() {
    let (engine, _db) = engine_with_db().await;
    let pen = batch(&engine, "B-EMPTY").await;

    for goal_type in [GoalType::Adg, GoalType::Fcr, GoalType::CostPerHead, GoalType::Profit] {
        let g = goal(&engine, goal_type, dec!(1), Some(&pen)).await;
        let g = engine.refresh_goal(g.id).await.unwrap();
        assert_eq!(g.current_value, Decimal::ZERO, "{}", goal_type.as_str());
    }
}

#[tokio::test]
async fn unscoped_and_custom_goals_are_not_refreshed() {
    let (engine, _db) = engine_with_db().await;
    let pen = batch(&engine, "B-01").await;

    let unscoped = goal(&engine, GoalType::Adg, dec!(1.2), None).await;
    let err = engine.refresh_goal(unscoped.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidGoal(_)));

    let custom = goal(&engine, GoalType::Custom, dec!(40), Some(&pen)).await;
    let err = engine.refresh_goal(custom.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidGoal(_)));

    let custom = engine.set_goal_value(custom.id, dec!(12.34567)).await.unwrap();
    assert_eq!(custom.current_value, dec!(12.346));
    let eval = engine.evaluate_goal(custom.id, day(6, 1)).await.unwrap();
    assert_eq!(eval.progress, dec!(0.309));
    assert_eq!(eval.status, GoalStatus::Active);

    let eval = engine.evaluate_goal(custom.id, day(12, 31)).await.unwrap();
    assert_eq!(eval.status, GoalStatus::Active);
    let eval = engine
        .evaluate_goal(custom.id, day(12, 31).succ_opt().unwrap())
        .await
        .unwrap();
    assert_eq!(eval.status, GoalStatus::Expired);
}

#[tokio::test]
async fn goal_needs_positive_target_and_known_batch() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .new_goal(NewGoal {
            name: "Margin".to_string(),
            goal_type: GoalType::Profit,
            target_value: Decimal::ZERO,
            batch_id: None,
            start_date: day(1, 1),
            end_date: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidGoal(_)));

    let err = engine
        .new_goal(NewGoal {
            name: "Margin".to_string(),
            goal_type: GoalType::Profit,
            target_value: dec!(100),
            batch_id: Some(Uuid::new_v4()),
            start_date: day(1, 1),
            end_date: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
