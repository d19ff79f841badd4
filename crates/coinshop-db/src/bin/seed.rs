//! # Catalog Seeder
//!
//! Applies migrations and installs the merch catalog.
//!
//! ## Usage
//! ```bash
//! # Uses DATABASE_URL (or the default local database)
//! cargo run -p coinshop-db --bin seed
//!
//! # Explicit connection string
//! cargo run -p coinshop-db --bin seed -- --database-url postgres://localhost/coinshop
//! ```
//!
//! Items already present (matched by name) are left untouched, so running
//! the seeder twice is harmless.

use std::env;

use coinshop_core::validation::validate_price;
use coinshop_core::Coins;
use coinshop_db::{AccountStore, Database, WalletConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Default merch catalog: (name, price in coins).
const MERCH_CATALOG: &[(&str, i64)] = &[
    ("t-shirt", 80),
    ("cup", 20),
    ("book", 50),
    ("pen", 10),
    ("powerbank", 200),
    ("hoody", 300),
    ("umbrella", 200),
    ("socks", 10),
    ("wallet", 50),
    ("pink-hoody", 500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = WalletConfig::load()?;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--database-url" | "-d" => {
                if i + 1 < args.len() {
                    config.database_url = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Coinshop Catalog Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --database-url <URL>  PostgreSQL connection string (default: $DATABASE_URL)");
                println!("  -h, --help                Show this help message");
                return Ok(());
            }
            other => {
                warn!(argument = %other, "Ignoring unknown argument");
            }
        }
        i += 1;
    }

    let db = Database::new(config.db_config()).await?;
    let store = db.store();
    info!("Connected to database, migrations applied");

    let mut inserted = 0;
    let mut skipped = 0;

    for (name, price) in MERCH_CATALOG {
        let price = Coins::new(*price);
        validate_price(price)?;

        if store.find_item(name).await?.is_some() {
            skipped += 1;
            continue;
        }

        let item = store.insert_item(name, price).await?;
        info!(id = %item.id, name = %item.name, price = %item.price, "Catalog item added");
        inserted += 1;
    }

    info!(inserted, skipped, "Seed complete");

    db.close().await;
    Ok(())
}
