//! Concurrent order placement must never oversell.
//!
//! Run with `cargo test -p bazaar-integration-tests -- --ignored`.

use bazaar_integration_tests::TestContext;
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore = "requires a running API and database"]
async fn concurrent_orders_never_oversell() {
    const STOCK: i32 = 5;
    const BUYERS: usize = 12;

    let ctx = TestContext::new().await;
    let seller = ctx.create_user("seller").await;
    let product = ctx.create_product(seller.id, 10_00, STOCK, &[], &[]).await;

    let mut handles = Vec::with_capacity(BUYERS);
    for _ in 0..BUYERS {
        let buyer = ctx.create_user("customer").await;
        let address = ctx.create_address(buyer.id).await;
        let client = ctx.client.clone();
        let url = format!("{}/api/v1/orders", ctx.base_url);
        handles.push(tokio::spawn(async move {
            let response = client
                .post(url)
                .bearer_auth(buyer.token)
                .json(&json!({
                    "items": [{ "product_id": product, "quantity": 1 }],
                    "shipping_address_id": address,
                    "payment_method": "cash_on_delivery",
                }))
                .send()
                .await
                .expect("request");
            response.status().as_u16()
        }));
    }

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.expect("join") {
            201 => created += 1,
            409 => rejected += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    // Exactly the stock's worth of orders succeed and the counter lands on
    // zero; nothing is lost to a race.
    assert_eq!(created, STOCK as usize);
    assert_eq!(rejected, BUYERS - STOCK as usize);
    assert_eq!(ctx.product_stock(product).await, 0);
}
