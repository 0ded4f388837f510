//! Farm ledger engine.
//!
//! Tracks feed and medicine stock, attributes costs to animals and batches,
//! keeps batch aggregates rolled up, settles sales into realized profit and
//! evaluates performance goals. Everything goes through [`Engine`], which
//! runs each operation in a single database transaction.

pub use animal_sales::{AnimalSale, PaymentMethod, PaymentStatus, SaleFigures, SaleTerms};
pub use animals::{Animal, AnimalOrigin, AnimalStatus, NewAnimal, Sex};
pub use batches::{Batch, BatchRollup, BatchStatus};
pub use cost_entries::{CostBuckets, CostCategory, CostEntry, CostPosting};
pub use error::EngineError;
pub use inventory_items::{InventoryItem, ItemKind};
pub use inventory_transactions::{Direction, DispenseTarget, InventoryTransaction};
pub use money::{MONEY_SCALE, Money, UNIT_COST_SCALE};
pub use ops::{
    Engine, EngineBuilder, InventoryMovement, InventoryTransactionFilter,
};
pub use performance_goals::{
    GoalEvaluation, GoalStatus, GoalType, KPI_SCALE, NewGoal, PerformanceGoal,
};

mod animal_sales;
mod animals;
mod batches;
mod cost_entries;
mod error;
mod inventory_items;
mod inventory_transactions;
mod money;
mod ops;
mod performance_goals;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
