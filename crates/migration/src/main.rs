use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "usage: migration [up|down|fresh|refresh|status] [DATABASE_URL]";

/// Applies the farm ledger schema. The database comes from the second
/// argument, then `DATABASE_URL`, then `farmledger.db` in the working
/// directory.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let action = args.next().unwrap_or_else(|| "up".to_string());
    let url = match args.next() {
        Some(url) => url,
        None => std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./farmledger.db?mode=rwc".to_string()),
    };

    let db = Database::connect(&url).await?;
    match action.as_str() {
        "up" => migration::Migrator::up(&db, None).await?,
        // One step back: the init migration drops every table.
        "down" => migration::Migrator::down(&db, Some(1)).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "refresh" => migration::Migrator::refresh(&db).await?,
        "status" => migration::Migrator::status(&db).await?,
        other => {
            eprintln!("unknown action {other:?}\n{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
