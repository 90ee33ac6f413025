//! Shared helpers for integration tests: an isolated in-memory database
//! plus product seeding.

use std::sync::Once;

use chrono::Utc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use teocat_core::Product;
use teocat_db::repository::product::generate_product_id;
use teocat_db::{Database, DbConfig};

static TRACING: Once = Once::new();

/// Installs the test log subscriber once per process.
///
/// Silent by default; `RUST_LOG=teocat_db=debug` shows the repository and
/// service logs while a test runs.
fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// Fresh, fully migrated in-memory database.
pub async fn test_db() -> Database {
    init_tracing();

    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Inserts and returns a taxed product with the given stock.
pub async fn seed_product(
    db: &Database,
    name: &str,
    price_cents: i64,
    tax_rate_bps: u32,
    stock: i64,
) -> Product {
    let now = Utc::now();
    let product = Product {
        id: generate_product_id(),
        name: name.to_string(),
        price_cents,
        applies_tax: tax_rate_bps > 0,
        tax_rate_bps,
        stock,
        category_id: None,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.expect("seed product");
    product
}

/// Current stock counter for a product.
pub async fn stock_of(db: &Database, product_id: &str) -> i64 {
    db.products()
        .get_by_id(product_id)
        .await
        .expect("product read")
        .expect("product exists")
        .stock
}

/// A random external reference id (supplier, customer, staff, ...).
pub fn external_id() -> String {
    Uuid::new_v4().to_string()
}
