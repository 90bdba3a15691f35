//! Integration test harness for Bazaar.
//!
//! # Running Tests
//!
//! The tests need a running API and its database:
//!
//! ```bash
//! export API_DATABASE_URL=postgres://localhost/bazaar_test
//! cargo run -p bazaar-cli -- migrate api
//! cargo run -p bazaar-api &
//!
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! Every test provisions its own users, products, and tokens directly in
//! the database, then exercises the HTTP surface under `/api/v1`.

use reqwest::Client;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Shared context: an HTTP client against the API plus a direct database
/// handle for fixtures and assertions.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub pool: PgPool,
}

/// A provisioned user with a bearer token.
pub struct TestUser {
    pub id: i32,
    pub token: Uuid,
}

impl TestContext {
    /// Connect to the API and database named by the environment.
    ///
    /// # Panics
    ///
    /// Panics if `API_DATABASE_URL` is unset or unreachable; the tests
    /// cannot run without it.
    pub async fn new() -> Self {
        let base_url =
            std::env::var("BAZAAR_API_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());
        let database_url =
            std::env::var("API_DATABASE_URL").expect("API_DATABASE_URL must be set for tests");
        let pool = PgPool::connect(&database_url)
            .await
            .expect("connect to test database");

        Self {
            client: Client::new(),
            base_url,
            pool,
        }
    }

    /// Create a user with the given role and issue a bearer token.
    pub async fn create_user(&self, role: &str) -> TestUser {
        let email = format!("{role}-{}@bazaar.test", Uuid::new_v4());
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO users (email, name, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&email)
        .bind(format!("Test {role}"))
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .expect("insert user");

        let token = Uuid::new_v4();
        sqlx::query("INSERT INTO api_tokens (token, user_id) VALUES ($1, $2)")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await
            .expect("insert token");

        TestUser { id, token }
    }

    /// Create a shipping address owned by a user.
    pub async fn create_address(&self, user_id: i32) -> i32 {
        sqlx::query_scalar(
            r"
            INSERT INTO addresses (user_id, recipient, line1, city, country)
            VALUES ($1, 'Tester', '1 Test Lane', 'Cairo', 'EG')
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .expect("insert address")
    }

    /// Create an active product with a unique SKU and flat stock.
    pub async fn create_product(
        &self,
        seller_id: i32,
        price_cents: i64,
        stock: i32,
        sizes: &[&str],
        colors: &[&str],
    ) -> i32 {
        let sizes: Vec<String> = sizes.iter().map(ToString::to_string).collect();
        let colors: Vec<String> = colors.iter().map(ToString::to_string).collect();
        sqlx::query_scalar(
            r"
            INSERT INTO products (
                seller_id, name_en, sku, original_price, stock_quantity,
                sizes, colors, active
            )
            VALUES ($1, 'Test Product', $2, $3::numeric / 100, $4, $5, $6, TRUE)
            RETURNING id
            ",
        )
        .bind(seller_id)
        .bind(format!("SKU-{}", Uuid::new_v4()))
        .bind(price_cents)
        .bind(stock)
        .bind(&sizes)
        .bind(&colors)
        .fetch_one(&self.pool)
        .await
        .expect("insert product")
    }

    /// Create a ledger with one or more variants for a product.
    pub async fn create_inventory(&self, product_id: i32, variants: &[(&str, &[&str], i32)]) -> i32 {
        let total: i32 = variants.iter().map(|(_, _, q)| q).sum();
        let inventory_id: i32 = sqlx::query_scalar(
            "INSERT INTO inventories (product_id, total_quantity) VALUES ($1, $2) RETURNING id",
        )
        .bind(product_id)
        .bind(total)
        .fetch_one(&self.pool)
        .await
        .expect("insert inventory");

        for (size, colors, quantity) in variants {
            let mut colors: Vec<String> = colors.iter().map(ToString::to_string).collect();
            colors.sort();
            colors.dedup();
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
            .execute(&self.pool)
            .await
            .expect("insert variant");
        }
        inventory_id
    }

    /// The current flat stock counter of a product.
    pub async fn product_stock(&self, product_id: i32) -> i32 {
        sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_one(&self.pool)
            .await
            .expect("read stock")
    }

    /// The ledger's cached total and one variant's quantity.
    pub async fn ledger_quantities(&self, inventory_id: i32) -> (i32, Vec<i32>) {
        let total: i32 = sqlx::query_scalar("SELECT total_quantity FROM inventories WHERE id = $1")
            .bind(inventory_id)
            .fetch_one(&self.pool)
            .await
            .expect("read ledger total");
        let variants: Vec<i32> = sqlx::query_scalar(
            "SELECT quantity FROM inventory_variants WHERE inventory_id = $1 ORDER BY id",
        )
        .bind(inventory_id)
        .fetch_all(&self.pool)
        .await
        .expect("read variant quantities");
        (total, variants)
    }

    /// `GET` against the API with a bearer token, returning the envelope.
    pub async fn get(&self, user: &TestUser, path: &str) -> (reqwest::StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(user.token)
            .send()
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    /// `POST` a JSON body.
    pub async fn post(
        &self,
        user: &TestUser,
        path: &str,
        body: &Value,
    ) -> (reqwest::StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(user.token)
            .json(body)
            .send()
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    /// `PATCH` a JSON body.
    pub async fn patch(
        &self,
        user: &TestUser,
        path: &str,
        body: &Value,
    ) -> (reqwest::StatusCode, Value) {
        let response = self
            .client
            .patch(format!("{}{path}", self.base_url))
            .bearer_auth(user.token)
            .json(body)
            .send()
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }

    /// `DELETE` a path.
    pub async fn delete(&self, user: &TestUser, path: &str) -> (reqwest::StatusCode, Value) {
        let response = self
            .client
            .delete(format!("{}{path}", self.base_url))
            .bearer_auth(user.token)
            .send()
            .await
            .expect("request");
        let status = response.status();
        (status, response.json().await.expect("json body"))
    }
}
