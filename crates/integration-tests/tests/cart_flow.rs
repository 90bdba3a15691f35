//! Cart mutations, line merging, and coupon application against a live API.
//!
//! Run with `cargo test -p bazaar-integration-tests -- --ignored`.

use bazaar_integration_tests::TestContext;
use serde_json::json;
use uuid::Uuid;

/// Insert an active percentage coupon open to everyone.
async fn create_percentage_coupon(ctx: &TestContext, value: i32) -> String {
    let code = format!("PCT{}-{}", value, Uuid::new_v4().simple());
    sqlx::query("INSERT INTO coupons (code, discount_type, value) VALUES ($1, 'percentage', $2)")
        .bind(&code)
        .bind(value)
        .execute(&ctx.pool)
        .await
        .expect("insert coupon");
    code
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn adding_the_same_line_twice_merges_quantities() {
    let ctx = TestContext::new().await;
    let seller = ctx.create_user("seller").await;
    let buyer = ctx.create_user("customer").await;
    let product = ctx.create_product(seller.id, 25_00, 20, &["M"], &["Blue", "Red"]).await;
    ctx.create_inventory(product, &[("M", &["Blue"], 10), ("M", &["Red"], 10)])
        .await;

    let line = json!({ "product_id": product, "quantity": 2, "size": "M", "colors": ["Blue"] });
    let (status, _) = ctx.post(&buyer, "/api/v1/cart/items", &line).await;
    assert_eq!(status, 200);
    let (status, body) = ctx.post(&buyer, "/api/v1/cart/items", &line).await;
    assert_eq!(status, 200);

    let cart = &body["data"];
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 4);
    assert_eq!(cart["subtotal"], "100.00");

    // A different color set is its own line.
    let (status, body) = ctx
        .post(
            &buyer,
            "/api/v1/cart/items",
            &json!({ "product_id": product, "quantity": 1, "size": "M", "colors": ["Red"] }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["subtotal"], "125.00");
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn cart_unit_price_is_frozen_but_quantity_updates_resubtotal() {
    let ctx = TestContext::new().await;
    let seller = ctx.create_user("seller").await;
    let buyer = ctx.create_user("customer").await;
    let product = ctx.create_product(seller.id, 30_00, 20, &[], &[]).await;

    let (status, body) = ctx
        .post(
            &buyer,
            "/api/v1/cart/items",
            &json!({ "product_id": product, "quantity": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    let item_id = body["data"]["items"][0]["id"].as_i64().unwrap();

    sqlx::query("UPDATE products SET original_price = 45.00 WHERE id = $1")
        .bind(product)
        .execute(&ctx.pool)
        .await
        .unwrap();

    let (status, body) = ctx
        .patch(
            &buyer,
            &format!("/api/v1/cart/items/{item_id}"),
            &json!({ "quantity": 3 }),
        )
        .await;
    assert_eq!(status, 200);
    // The quantity change re-derives the subtotal from the frozen price.
    assert_eq!(body["data"]["items"][0]["unit_price"], "30.00");
    assert_eq!(body["data"]["items"][0]["subtotal"], "90.00");
    assert_eq!(body["data"]["total"], "90.00");
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn applying_a_coupon_discounts_the_cart_total() {
    let ctx = TestContext::new().await;
    let seller = ctx.create_user("seller").await;
    let buyer = ctx.create_user("customer").await;
    let product = ctx.create_product(seller.id, 50_00, 20, &[], &[]).await;
    let code = create_percentage_coupon(&ctx, 10).await;

    let (status, _) = ctx
        .post(
            &buyer,
            "/api/v1/cart/items",
            &json!({ "product_id": product, "quantity": 2 }),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = ctx
        .patch(&buyer, "/api/v1/cart", &json!({ "coupon_code": code }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["subtotal"], "100.00");
    assert_eq!(body["data"]["discount_amount"], "10.00");
    assert_eq!(body["data"]["total"], "90.00");

    let (status, body) = ctx
        .patch(&buyer, "/api/v1/cart", &json!({ "remove_coupon": true }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["discount_amount"], "0.00");
    assert_eq!(body["data"]["total"], "100.00");

    let (status, body) = ctx
        .patch(&buyer, "/api/v1/cart", &json!({ "coupon_code": "NO-SUCH-CODE" }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["data"]["reason"], "COUPON_NOT_FOUND");
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn cart_rejects_more_than_available_stock() {
    let ctx = TestContext::new().await;
    let seller = ctx.create_user("seller").await;
    let buyer = ctx.create_user("customer").await;
    let product = ctx.create_product(seller.id, 10_00, 3, &[], &[]).await;

    let (status, body) = ctx
        .post(
            &buyer,
            "/api/v1/cart/items",
            &json!({ "product_id": product, "quantity": 5 }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["data"]["reason"], "INSUFFICIENT_STOCK");

    // The advisory check does not reserve: another buyer can still take it.
    let other = ctx.create_user("customer").await;
    let (status, _) = ctx
        .post(
            &other,
            "/api/v1/cart/items",
            &json!({ "product_id": product, "quantity": 3 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(ctx.product_stock(product).await, 3);
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn clearing_the_cart_resets_totals_and_keeps_the_cart_row() {
    let ctx = TestContext::new().await;
    let seller = ctx.create_user("seller").await;
    let buyer = ctx.create_user("customer").await;
    let product = ctx.create_product(seller.id, 10_00, 10, &[], &[]).await;

    let (status, body) = ctx
        .post(
            &buyer,
            "/api/v1/cart/items",
            &json!({ "product_id": product, "quantity": 2 }),
        )
        .await;
    assert_eq!(status, 200);
    let cart_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = ctx.delete(&buyer, "/api/v1/cart/clear").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"].as_i64().unwrap(), cart_id);
    assert!(body["data"]["items"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["subtotal"], "0.00");
    assert_eq!(body["data"]["total"], "0.00");
}

#[tokio::test]
#[ignore = "requires a running API and database"]
async fn removing_one_line_leaves_the_rest() {
    let ctx = TestContext::new().await;
    let seller = ctx.create_user("seller").await;
    let buyer = ctx.create_user("customer").await;
    let first = ctx.create_product(seller.id, 10_00, 10, &[], &[]).await;
    let second = ctx.create_product(seller.id, 20_00, 10, &[], &[]).await;

    for (product, quantity) in [(first, 1), (second, 2)] {
        let (status, _) = ctx
            .post(
                &buyer,
                "/api/v1/cart/items",
                &json!({ "product_id": product, "quantity": quantity }),
            )
            .await;
        assert_eq!(status, 200);
    }

    let (_, body) = ctx.get(&buyer, "/api/v1/cart").await;
    let item_id = body["data"]["items"][0]["id"].as_i64().unwrap();

    let (status, body) = ctx
        .delete(&buyer, &format!("/api/v1/cart/items/{item_id}"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["subtotal"], "40.00");
}
