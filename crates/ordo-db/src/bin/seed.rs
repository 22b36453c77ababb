//! Seeds a database with a small demo catalog.
//!
//! Usage: `seed [path-to-db]` (defaults to `ordo.db` in the working
//! directory). Refuses to touch a database that already has products.

use ordo_db::{Database, DbConfig, DbError};
use tracing::{info, warn};

const DEMO_CATALOG: &[(&str, i64, i64)] = &[
    ("Espresso", 350, 200),
    ("Cappuccino", 450, 200),
    ("Flat White", 475, 150),
    ("Croissant", 380, 80),
    ("Almond Croissant", 420, 60),
    ("Sourdough Loaf", 850, 30),
    ("Cold Brew Bottle", 600, 100),
    ("House Blend Beans 250g", 1400, 50),
];

#[tokio::main]
async fn main() -> Result<(), DbError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "ordo.db".into());
    let db = Database::new(DbConfig::new(&path)).await?;

    let products = db.products();
    let existing = products.count().await?;
    if existing > 0 {
        warn!(path = %path, existing, "Database already seeded, nothing to do");
        return Ok(());
    }

    for (name, price_cents, stock) in DEMO_CATALOG {
        let product = products.create(name, *price_cents, *stock).await?;
        info!(id = %product.id, name = %product.name, stock, "Seeded product");
    }

    info!(path = %path, count = DEMO_CATALOG.len(), "Seeding complete");
    db.close().await;
    Ok(())
}
