//! Create the schema and upsert the default content blocks.
//!
//! Requires DATABASE_URL. Safe to run repeatedly: blocks are keyed by
//! (page, section, block_key) and existing rows are overwritten.

use eshrm_backend::{db, logging, seed, store::Store};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _log_guards = logging::init(&logging::LogConfig::from_env());

    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL must be set");
        std::process::exit(1);
    }

    let pool = match db::init_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    let store = Store::postgres(pool);

    if let Err(e) = store.migrate().await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    match seed::seed(&store).await {
        Ok(count) => {
            tracing::info!("Seeded {} content blocks", count);
            println!("Seeded {} content blocks", count);
        }
        Err(e) => {
            tracing::error!("Seeding failed: {}", e);
            std::process::exit(1);
        }
    }
}
