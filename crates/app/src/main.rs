use std::error::Error;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use engine::{
    AnimalOrigin, CostCategory, CostPosting, Direction, DispenseTarget, Engine, GoalType,
    InventoryTransactionFilter, ItemKind, Money, NewAnimal, NewGoal, PaymentMethod, SaleTerms,
    Sex,
};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "farmledger")]
#[command(about = "Livestock cost and profit ledger")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`). Overrides
    /// the settings file.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Item(Item),
    Animal(Animal),
    Batch(Batch),
    Cost(Cost),
    Sale(Sale),
    Goal(Goal),
}

#[derive(Args, Debug)]
struct Item {
    #[command(subcommand)]
    command: ItemCommand,
}

#[derive(Subcommand, Debug)]
enum ItemCommand {
    Create(ItemCreateArgs),
    Show {
        #[arg(long)]
        code: String,
    },
    Receive(ReceiveArgs),
    Dispense(DispenseArgs),
    LowStock,
    Movements(MovementArgs),
}

#[derive(Args, Debug)]
struct ItemCreateArgs {
    #[arg(long)]
    code: String,
    #[arg(long)]
    name: String,
    #[arg(long, value_parser = parse_item_kind)]
    kind: ItemKind,
    #[arg(long)]
    unit: String,
    #[arg(long, default_value = "0")]
    reorder_point: Decimal,
}

#[derive(Args, Debug)]
struct ReceiveArgs {
    #[arg(long)]
    item: Uuid,
    #[arg(long)]
    quantity: Decimal,
    #[arg(long)]
    unit_cost: Decimal,
    #[arg(long)]
    source: Option<String>,
}

#[derive(Args, Debug)]
struct DispenseArgs {
    #[arg(long)]
    item: Uuid,
    #[arg(long)]
    quantity: Decimal,
    #[arg(long)]
    animal: Option<Uuid>,
    #[arg(long)]
    batch: Option<Uuid>,
    #[arg(long)]
    pen: Option<String>,
}

#[derive(Args, Debug)]
struct MovementArgs {
    #[arg(long)]
    item: Option<Uuid>,
    #[arg(long)]
    animal: Option<Uuid>,
    #[arg(long)]
    batch: Option<Uuid>,
    #[arg(long, value_parser = parse_direction)]
    direction: Option<Direction>,
}

#[derive(Args, Debug)]
struct Animal {
    #[command(subcommand)]
    command: AnimalCommand,
}

#[derive(Subcommand, Debug)]
enum AnimalCommand {
    Register(RegisterArgs),
    Show {
        #[arg(long)]
        ear_tag: String,
    },
    Weigh {
        #[arg(long)]
        animal: Uuid,
        #[arg(long)]
        weight: Decimal,
        #[arg(long)]
        on: NaiveDate,
    },
    Assign {
        #[arg(long)]
        animal: Uuid,
        /// Omit to take the animal out of its batch.
        #[arg(long)]
        batch: Option<Uuid>,
    },
    Death {
        #[arg(long)]
        animal: Uuid,
        #[arg(long)]
        on: NaiveDate,
        #[arg(long)]
        cause: Option<String>,
    },
    Costs {
        #[arg(long)]
        animal: Uuid,
    },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    ear_tag: String,
    #[arg(long)]
    animal_type: String,
    #[arg(long, value_parser = parse_sex)]
    sex: Sex,
    #[arg(long)]
    entry_date: NaiveDate,
    #[arg(long)]
    entry_weight: Decimal,
    #[arg(long)]
    batch: Option<Uuid>,
    /// Purchase price; omit for an animal born on the farm.
    #[arg(long)]
    price: Option<Money>,
}

#[derive(Args, Debug)]
struct Batch {
    #[command(subcommand)]
    command: BatchCommand,
}

#[derive(Subcommand, Debug)]
enum BatchCommand {
    Create {
        #[arg(long)]
        number: String,
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        note: Option<String>,
    },
    Show {
        #[arg(long)]
        number: String,
    },
    Members {
        #[arg(long)]
        batch: Uuid,
    },
    Recompute {
        #[arg(long)]
        batch: Uuid,
    },
    Verify {
        #[arg(long)]
        batch: Uuid,
    },
    Sales {
        #[arg(long)]
        batch: Uuid,
    },
    Costs {
        #[arg(long)]
        batch: Uuid,
    },
}

#[derive(Args, Debug)]
struct Cost {
    #[command(subcommand)]
    command: CostCommand,
}

#[derive(Subcommand, Debug)]
enum CostCommand {
    Post {
        #[arg(long, value_parser = parse_category)]
        category: CostCategory,
        #[arg(long)]
        amount: Money,
        #[arg(long)]
        animal: Option<Uuid>,
        #[arg(long)]
        batch: Option<Uuid>,
        #[arg(long)]
        note: Option<String>,
    },
}

#[derive(Args, Debug)]
struct Sale {
    #[command(subcommand)]
    command: SaleCommand,
}

#[derive(Subcommand, Debug)]
enum SaleCommand {
    Sell(SellArgs),
    Pay {
        #[arg(long)]
        sale: Uuid,
        #[arg(long)]
        amount: Money,
    },
    Show {
        #[arg(long)]
        sale: Uuid,
    },
}

#[derive(Args, Debug)]
struct SellArgs {
    #[arg(long)]
    animal: Uuid,
    #[arg(long)]
    weight: Decimal,
    #[arg(long)]
    price_per_kg: Decimal,
    #[arg(long)]
    date: NaiveDate,
    #[arg(long)]
    customer: Option<String>,
    #[arg(long, value_parser = parse_payment_method, default_value = "cash")]
    payment_method: PaymentMethod,
    #[arg(long, default_value = "0")]
    paid: Money,
}

#[derive(Args, Debug)]
struct Goal {
    #[command(subcommand)]
    command: GoalCommand,
}

#[derive(Subcommand, Debug)]
enum GoalCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, value_parser = parse_goal_type)]
        goal_type: GoalType,
        #[arg(long)]
        target: Decimal,
        #[arg(long)]
        batch: Option<Uuid>,
        #[arg(long)]
        start_date: NaiveDate,
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    Set {
        #[arg(long)]
        goal: Uuid,
        #[arg(long)]
        value: Decimal,
    },
    Refresh {
        #[arg(long)]
        goal: Uuid,
    },
    Evaluate {
        #[arg(long)]
        goal: Uuid,
        /// Defaults to today.
        #[arg(long)]
        on: Option<NaiveDate>,
    },
}

fn parse_item_kind(raw: &str) -> Result<ItemKind, String> {
    ItemKind::try_from(raw).map_err(|err| err.to_string())
}

fn parse_direction(raw: &str) -> Result<Direction, String> {
    Direction::try_from(raw).map_err(|err| err.to_string())
}

fn parse_sex(raw: &str) -> Result<Sex, String> {
    Sex::try_from(raw).map_err(|err| err.to_string())
}

fn parse_category(raw: &str) -> Result<CostCategory, String> {
    CostCategory::try_from(raw).map_err(|err| err.to_string())
}

fn parse_payment_method(raw: &str) -> Result<PaymentMethod, String> {
    PaymentMethod::try_from(raw).map_err(|err| err.to_string())
}

fn parse_goal_type(raw: &str) -> Result<GoalType, String> {
    GoalType::try_from(raw).map_err(|err| err.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn connect_db(
    database_url: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let database = sea_orm::Database::connect(database_url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "farmledger={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url());
    tracing::debug!("connecting to {url}");
    let db = connect_db(&url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Item(Item { command }) => run_item(&engine, command).await,
        Command::Animal(Animal { command }) => run_animal(&engine, command).await,
        Command::Batch(Batch { command }) => run_batch(&engine, command).await,
        Command::Cost(Cost { command }) => run_cost(&engine, command).await,
        Command::Sale(Sale { command }) => run_sale(&engine, command).await,
        Command::Goal(Goal { command }) => run_goal(&engine, command).await,
    }
}

async fn run_item(engine: &Engine, command: ItemCommand) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        ItemCommand::Create(args) => print_json(
            &engine
                .new_inventory_item(
                    &args.code,
                    &args.name,
                    args.kind,
                    &args.unit,
                    args.reorder_point,
                )
                .await?,
        ),
        ItemCommand::Show { code } => print_json(&engine.inventory_item_by_code(&code).await?),
        ItemCommand::Receive(args) => print_json(
            &engine
                .receive(
                    args.item,
                    args.quantity,
                    args.unit_cost,
                    args.source.as_deref(),
                )
                .await?,
        ),
        ItemCommand::Dispense(args) => {
            let target = DispenseTarget {
                batch_id: args.batch,
                animal_id: args.animal,
                pen_number: args.pen,
            };
            print_json(&engine.dispense(args.item, args.quantity, target).await?)
        }
        ItemCommand::LowStock => print_json(&engine.low_stock_items().await?),
        ItemCommand::Movements(args) => {
            let filter = InventoryTransactionFilter {
                item_id: args.item,
                animal_id: args.animal,
                batch_id: args.batch,
                direction: args.direction,
                ..Default::default()
            };
            print_json(&engine.inventory_transactions(&filter).await?)
        }
    }
}

async fn run_animal(
    engine: &Engine,
    command: AnimalCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        AnimalCommand::Register(args) => {
            let origin = match args.price {
                Some(price) => AnimalOrigin::Purchased { price },
                None => AnimalOrigin::Born,
            };
            let input = NewAnimal {
                ear_tag: args.ear_tag,
                animal_type: args.animal_type,
                sex: args.sex,
                entry_date: args.entry_date,
                entry_weight: args.entry_weight,
                batch_id: args.batch,
                origin,
            };
            print_json(&engine.register_animal(input).await?)
        }
        AnimalCommand::Show { ear_tag } => print_json(&engine.animal_by_ear_tag(&ear_tag).await?),
        AnimalCommand::Weigh { animal, weight, on } => {
            print_json(&engine.record_weight(animal, weight, on).await?)
        }
        AnimalCommand::Assign { animal, batch } => {
            print_json(&engine.assign_animal(animal, batch).await?)
        }
        AnimalCommand::Death { animal, on, cause } => {
            print_json(&engine.record_death(animal, on, cause.as_deref()).await?)
        }
        AnimalCommand::Costs { animal } => print_json(&engine.animal_cost_entries(animal).await?),
    }
}

async fn run_batch(
    engine: &Engine,
    command: BatchCommand,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        BatchCommand::Create {
            number,
            start_date,
            note,
        } => print_json(
            &engine
                .new_batch(&number, start_date, note.as_deref())
                .await?,
        ),
        BatchCommand::Show { number } => print_json(&engine.batch_by_number(&number).await?),
        BatchCommand::Members { batch } => print_json(&engine.batch_members(batch).await?),
        BatchCommand::Recompute { batch } => print_json(&engine.recompute_batch(batch).await?),
        BatchCommand::Verify { batch } => print_json(&engine.verify_batch(batch).await?),
        BatchCommand::Sales { batch } => print_json(&engine.sales_for_batch(batch).await?),
        BatchCommand::Costs { batch } => print_json(&engine.batch_cost_entries(batch).await?),
    }
}

async fn run_cost(engine: &Engine, command: CostCommand) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        CostCommand::Post {
            category,
            amount,
            animal,
            batch,
            note,
        } => {
            let mut posting = CostPosting::new(category, amount);
            posting.animal_id = animal;
            posting.batch_id = batch;
            posting.note = note;
            print_json(&engine.post_cost(posting).await?)
        }
    }
}

async fn run_sale(engine: &Engine, command: SaleCommand) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        SaleCommand::Sell(args) => {
            let terms = SaleTerms {
                weight: args.weight,
                price_per_kg: args.price_per_kg,
                sale_date: args.date,
                customer_id: args.customer,
                payment_method: args.payment_method,
                paid_amount: args.paid,
            };
            print_json(&engine.sell_animal(args.animal, terms).await?)
        }
        SaleCommand::Pay { sale, amount } => {
            print_json(&engine.record_sale_payment(sale, amount).await?)
        }
        SaleCommand::Show { sale } => print_json(&engine.animal_sale(sale).await?),
    }
}

async fn run_goal(engine: &Engine, command: GoalCommand) -> Result<(), Box<dyn Error + Send + Sync>> {
    match command {
        GoalCommand::Create {
            name,
            goal_type,
            target,
            batch,
            start_date,
            end_date,
        } => {
            let input = NewGoal {
                name,
                goal_type,
                target_value: target,
                batch_id: batch,
                start_date,
                end_date,
            };
            print_json(&engine.new_goal(input).await?)
        }
        GoalCommand::Set { goal, value } => print_json(&engine.set_goal_value(goal, value).await?),
        GoalCommand::Refresh { goal } => print_json(&engine.refresh_goal(goal).await?),
        GoalCommand::Evaluate { goal, on } => {
            let today = on.unwrap_or_else(|| chrono::Local::now().date_naive());
            print_json(&engine.evaluate_goal(goal, today).await?)
        }
    }
}
