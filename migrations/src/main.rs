use sea_orm_migration::prelude::*;
use std::env;

use migration::Migrator;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let command = env::args().nth(1).unwrap_or_else(|| "up".to_string());

    let db = sea_orm::Database::connect(&db_url)
        .await
        .expect("Failed to connect to database");

    let outcome = match command.as_str() {
        "up" => Migrator::up(&db, None).await.map(|_| "Migrations applied"),
        "down" => Migrator::down(&db, Some(1)).await.map(|_| "Last migration rolled back"),
        "fresh" => Migrator::fresh(&db).await.map(|_| "Schema rebuilt from scratch"),
        "status" => Migrator::status(&db).await.map(|_| "Status listed"),
        other => {
            eprintln!("Unknown command: {}. Use: up, down, fresh, or status", other);
            std::process::exit(1);
        }
    };

    match outcome {
        Ok(message) => log::info!("{}", message),
        Err(e) => {
            log::error!("Migration command '{}' failed: {}", command, e);
            std::process::exit(1);
        }
    }
}
