//! Standalone migration runner.
//!
//! The server applies pending migrations on startup; this binary exists for
//! operating on a database without booting the full service (CI jobs,
//! rollbacks, checking what a deploy would change).
//!
//! Usage: `cargo run -p migration -- [up|down|fresh|status] [--database-url <url>]`
//!
//! The target database comes from `--database-url` or the `DATABASE_URL`
//! environment variable; there is no implicit default.

use sea_orm::{Database, DbErr};
use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("migration failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DbErr> {
    let mut command: Option<String> = None;
    let mut url = std::env::var("DATABASE_URL").ok();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--database-url" => url = args.next(),
            other if command.is_none() => command = Some(other.to_string()),
            other => {
                return Err(DbErr::Custom(format!("unexpected argument: {other}")));
            }
        }
    }

    let Some(url) = url else {
        return Err(DbErr::Custom(
            "no database given; set DATABASE_URL or pass --database-url".to_string(),
        ));
    };

    let db = Database::connect(&url).await?;

    match command.as_deref() {
        // Plain `cargo run -p migration` brings the schema up to date.
        None | Some("up") => migration::Migrator::up(&db, None).await,
        Some("down") => migration::Migrator::down(&db, None).await,
        Some("fresh") => migration::Migrator::fresh(&db).await,
        Some("status") => migration::Migrator::status(&db).await,
        Some(other) => Err(DbErr::Custom(format!(
            "unknown command '{other}' (expected up, down, fresh, or status)"
        ))),
    }
}
