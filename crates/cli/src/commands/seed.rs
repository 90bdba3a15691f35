//! Seed the database with demo data.
//!
//! Creates an admin, a seller, and a customer (each with a bearer token
//! printed to the log), one address, two products with inventory, and the
//! `SAVE10` coupon. Intended for local development and the integration
//! tests; running it twice is an error because the emails already exist.

use rust_decimal::Decimal;
use sqlx::PgPool;

use super::CliError;

/// Seed demo data into the API database.
///
/// # Errors
///
/// Returns an error if any insert fails (including re-running the seed
/// against an already-seeded database).
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    let admin_id = insert_user(&pool, "admin@bazaar.test", "Admin", "admin").await?;
    let seller_id = insert_user(&pool, "seller@bazaar.test", "Demo Seller", "seller").await?;
    let customer_id = insert_user(&pool, "customer@bazaar.test", "Demo Customer", "customer").await?;

    for (label, id) in [("admin", admin_id), ("seller", seller_id), ("customer", customer_id)] {
        let token = super::user::insert_token(&pool, id).await?;
        tracing::info!("{label} token: {token}");
    }

    let address_id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO addresses (user_id, recipient, line1, city, country)
        VALUES ($1, 'Demo Customer', '1 Demo Street', 'Cairo', 'EG')
        RETURNING id
        ",
    )
    .bind(customer_id)
    .fetch_one(&pool)
    .await?;
    tracing::info!("customer address: {address_id}");

    let category_id: i32 =
        sqlx::query_scalar("INSERT INTO categories (name_en) VALUES ('Apparel') RETURNING id")
            .fetch_one(&pool)
            .await?;

    let shirt_id = insert_product(
        &pool,
        seller_id,
        Some(category_id),
        "Linen Shirt",
        "SHIRT-001",
        Decimal::new(4999, 2),
        20,
        &["S", "M", "L"],
        &["Blue", "Red", "White"],
    )
    .await?;
    let mug_id = insert_product(
        &pool,
        seller_id,
        Some(category_id),
        "Stoneware Mug",
        "MUG-001",
        Decimal::new(1499, 2),
        50,
        &[],
        &[],
    )
    .await?;
    tracing::info!("products: shirt {shirt_id}, mug {mug_id}");

    let inventory_id: i32 = sqlx::query_scalar(
        "INSERT INTO inventories (product_id, total_quantity) VALUES ($1, 12) RETURNING id",
    )
    .bind(shirt_id)
    .fetch_one(&pool)
    .await?;
    for (size, colors, quantity) in [
        ("S", vec!["Blue"], 4),
        ("M", vec!["Blue", "Red"], 6),
        ("L", vec!["White"], 2),
    ] {
        sqlx::query(
            r"
            INSERT INTO inventory_variants (inventory_id, size, colors, quantity)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(inventory_id)
        .bind(size)
        .bind(&colors)
        .bind(quantity)
        .execute(&pool)
        .await?;
    }
    tracing::info!("shirt inventory: {inventory_id}");

    sqlx::query(
        r"
        INSERT INTO coupons (code, method, discount_type, value, applies_to, eligibility, active)
        VALUES ('SAVE10', 'code', 'percentage', 10, 'all', 'all', TRUE)
        ",
    )
    .execute(&pool)
    .await?;
    tracing::info!("coupon SAVE10 created");

    tracing::info!("Seed complete!");
    Ok(())
}

async fn insert_user(pool: &PgPool, email: &str, name: &str, role: &str) -> Result<i32, CliError> {
    let id: i32 = sqlx::query_scalar(
        "INSERT INTO users (email, name, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(email)
    .bind(name)
    .bind(role)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

#[allow(clippy::too_many_arguments)]
async fn insert_product(
    pool: &PgPool,
    seller_id: i32,
    category_id: Option<i32>,
    name_en: &str,
    sku: &str,
    price: Decimal,
    stock: i32,
    sizes: &[&str],
    colors: &[&str],
) -> Result<i32, CliError> {
    let sizes: Vec<String> = sizes.iter().map(ToString::to_string).collect();
    let colors: Vec<String> = colors.iter().map(ToString::to_string).collect();
    let id: i32 = sqlx::query_scalar(
        r"
        INSERT INTO products (
            seller_id, category_id, name_en, sku, original_price,
            stock_quantity, sizes, colors, active
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
        RETURNING id
        ",
    )
    .bind(seller_id)
    .bind(category_id)
    .bind(name_en)
    .bind(sku)
    .bind(price)
    .bind(stock)
    .bind(&sizes)
    .bind(&colors)
    .fetch_one(pool)
    .await?;
    Ok(id)
}
