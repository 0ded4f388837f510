//! Initial schema migration - creates all tables from scratch.
//!
//! - `batches`: cost centers and their rolled-up aggregates
//! - `animals`: livestock with per-animal cost buckets
//! - `inventory_items`: feed and medicine stock
//! - `inventory_transactions`: append-only stock movements
//! - `cost_entries`: append-only cost journal
//! - `animal_sales`: one settlement per sold animal
//! - `performance_goals`: KPI targets
//!
//! Decimal values (money, quantities, weights, unit costs) are stored as
//! canonical decimal text.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Batches {
    Table,
    Id,
    BatchNumber,
    StartDate,
    CloseDate,
    Status,
    TotalAnimals,
    SoldAnimals,
    DeceasedAnimals,
    PurchaseCost,
    FeedCost,
    TreatmentCost,
    OtherExpenses,
    TotalCost,
    TotalRevenue,
    Profit,
    ProfitPercentage,
    Note,
    CreatedAt,
}

#[derive(Iden)]
enum Animals {
    Table,
    Id,
    EarTag,
    AnimalType,
    Sex,
    EntryDate,
    EntryWeight,
    CurrentWeight,
    LastWeighedOn,
    Status,
    BatchId,
    PurchaseCost,
    AccumulatedFeedCost,
    AccumulatedTreatmentCost,
    AccumulatedOtherCost,
    TotalCost,
    DisposedOn,
    DeathCause,
    CreatedAt,
}

#[derive(Iden)]
enum InventoryItems {
    Table,
    Id,
    Code,
    Name,
    Kind,
    Unit,
    CurrentStock,
    ReorderPoint,
    UnitCost,
    TotalValue,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InventoryTransactions {
    Table,
    Id,
    ItemId,
    Direction,
    Quantity,
    UnitCost,
    TotalCost,
    BatchId,
    AnimalId,
    PenNumber,
    Source,
    OccurredAt,
}

#[derive(Iden)]
enum CostEntries {
    Table,
    Id,
    Category,
    Amount,
    AnimalId,
    BatchId,
    InventoryTransactionId,
    Note,
    OccurredAt,
}

#[derive(Iden)]
enum AnimalSales {
    Table,
    Id,
    AnimalId,
    BatchId,
    SaleDate,
    Weight,
    PricePerKg,
    SalePrice,
    TotalCost,
    Profit,
    ProfitPercentage,
    CustomerId,
    PaymentMethod,
    PaidAmount,
    RemainingAmount,
    CreatedAt,
}

#[derive(Iden)]
enum PerformanceGoals {
    Table,
    Id,
    Name,
    GoalType,
    TargetValue,
    CurrentValue,
    BatchId,
    StartDate,
    EndDate,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Batches
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Batches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Batches::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Batches::BatchNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Batches::StartDate).date().not_null())
                    .col(ColumnDef::new(Batches::CloseDate).date())
                    .col(
                        ColumnDef::new(Batches::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Batches::TotalAnimals).integer().not_null())
                    .col(ColumnDef::new(Batches::SoldAnimals).integer().not_null())
                    .col(ColumnDef::new(Batches::DeceasedAnimals).integer().not_null())
                    .col(ColumnDef::new(Batches::PurchaseCost).string().not_null())
                    .col(ColumnDef::new(Batches::FeedCost).string().not_null())
                    .col(ColumnDef::new(Batches::TreatmentCost).string().not_null())
                    .col(ColumnDef::new(Batches::OtherExpenses).string().not_null())
                    .col(ColumnDef::new(Batches::TotalCost).string().not_null())
                    .col(ColumnDef::new(Batches::TotalRevenue).string().not_null())
                    .col(ColumnDef::new(Batches::Profit).string().not_null())
                    .col(ColumnDef::new(Batches::ProfitPercentage).string())
                    .col(ColumnDef::new(Batches::Note).string())
                    .col(ColumnDef::new(Batches::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Animals
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Animals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Animals::Id).string().not_null().primary_key())
                    .col(
                        ColumnDef::new(Animals::EarTag)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Animals::AnimalType).string().not_null())
                    .col(ColumnDef::new(Animals::Sex).string().not_null())
                    .col(ColumnDef::new(Animals::EntryDate).date().not_null())
                    .col(ColumnDef::new(Animals::EntryWeight).string().not_null())
                    .col(ColumnDef::new(Animals::CurrentWeight).string().not_null())
                    .col(ColumnDef::new(Animals::LastWeighedOn).date())
                    .col(
                        ColumnDef::new(Animals::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Animals::BatchId).string())
                    .col(ColumnDef::new(Animals::PurchaseCost).string().not_null())
                    .col(
                        ColumnDef::new(Animals::AccumulatedFeedCost)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Animals::AccumulatedTreatmentCost)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Animals::AccumulatedOtherCost)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Animals::TotalCost).string().not_null())
                    .col(ColumnDef::new(Animals::DisposedOn).date())
                    .col(ColumnDef::new(Animals::DeathCause).string())
                    .col(ColumnDef::new(Animals::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-animals-batch_id")
                            .from(Animals::Table, Animals::BatchId)
                            .to(Batches::Table, Batches::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-animals-batch_id")
                    .table(Animals::Table)
                    .col(Animals::BatchId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Inventory items
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InventoryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(InventoryItems::Name).string().not_null())
                    .col(ColumnDef::new(InventoryItems::Kind).string().not_null())
                    .col(ColumnDef::new(InventoryItems::Unit).string().not_null())
                    .col(
                        ColumnDef::new(InventoryItems::CurrentStock)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::ReorderPoint)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryItems::UnitCost).string().not_null())
                    .col(
                        ColumnDef::new(InventoryItems::TotalValue)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Inventory transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InventoryTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ItemId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Direction)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Quantity)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::UnitCost)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TotalCost)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryTransactions::BatchId).string())
                    .col(ColumnDef::new(InventoryTransactions::AnimalId).string())
                    .col(ColumnDef::new(InventoryTransactions::PenNumber).string())
                    .col(ColumnDef::new(InventoryTransactions::Source).string())
                    .col(
                        ColumnDef::new(InventoryTransactions::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-inventory_transactions-item_id")
                            .from(InventoryTransactions::Table, InventoryTransactions::ItemId)
                            .to(InventoryItems::Table, InventoryItems::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory_transactions-item_id-occurred_at")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::ItemId)
                    .col(InventoryTransactions::OccurredAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory_transactions-batch_id")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::BatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-inventory_transactions-animal_id")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::AnimalId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Cost journal
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CostEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CostEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CostEntries::Category).string().not_null())
                    .col(ColumnDef::new(CostEntries::Amount).string().not_null())
                    .col(ColumnDef::new(CostEntries::AnimalId).string())
                    .col(ColumnDef::new(CostEntries::BatchId).string())
                    .col(ColumnDef::new(CostEntries::InventoryTransactionId).string())
                    .col(ColumnDef::new(CostEntries::Note).string())
                    .col(
                        ColumnDef::new(CostEntries::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cost_entries-batch_id")
                    .table(CostEntries::Table)
                    .col(CostEntries::BatchId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-cost_entries-animal_id")
                    .table(CostEntries::Table)
                    .col(CostEntries::AnimalId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Animal sales
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AnimalSales::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnimalSales::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AnimalSales::AnimalId).string().not_null())
                    .col(ColumnDef::new(AnimalSales::BatchId).string())
                    .col(ColumnDef::new(AnimalSales::SaleDate).date().not_null())
                    .col(ColumnDef::new(AnimalSales::Weight).string().not_null())
                    .col(ColumnDef::new(AnimalSales::PricePerKg).string().not_null())
                    .col(ColumnDef::new(AnimalSales::SalePrice).string().not_null())
                    .col(ColumnDef::new(AnimalSales::TotalCost).string().not_null())
                    .col(ColumnDef::new(AnimalSales::Profit).string().not_null())
                    .col(ColumnDef::new(AnimalSales::ProfitPercentage).string())
                    .col(ColumnDef::new(AnimalSales::CustomerId).string())
                    .col(
                        ColumnDef::new(AnimalSales::PaymentMethod)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AnimalSales::PaidAmount).string().not_null())
                    .col(
                        ColumnDef::new(AnimalSales::RemainingAmount)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AnimalSales::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-animal_sales-animal_id")
                            .from(AnimalSales::Table, AnimalSales::AnimalId)
                            .to(Animals::Table, Animals::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One sale per animal, even under concurrent writers.
        manager
            .create_index(
                Index::create()
                    .name("idx-animal_sales-animal_id-unique")
                    .table(AnimalSales::Table)
                    .col(AnimalSales::AnimalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-animal_sales-batch_id")
                    .table(AnimalSales::Table)
                    .col(AnimalSales::BatchId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Performance goals
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PerformanceGoals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PerformanceGoals::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PerformanceGoals::Name).string().not_null())
                    .col(
                        ColumnDef::new(PerformanceGoals::GoalType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceGoals::TargetValue)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceGoals::CurrentValue)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PerformanceGoals::BatchId).string())
                    .col(ColumnDef::new(PerformanceGoals::StartDate).date().not_null())
                    .col(ColumnDef::new(PerformanceGoals::EndDate).date())
                    .col(
                        ColumnDef::new(PerformanceGoals::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PerformanceGoals::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-performance_goals-batch_id")
                            .from(PerformanceGoals::Table, PerformanceGoals::BatchId)
                            .to(Batches::Table, Batches::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(PerformanceGoals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AnimalSales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CostEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Animals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Batches::Table).to_owned())
            .await?;
        Ok(())
    }
}
