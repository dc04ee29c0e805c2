//! Backend client against the mock storefront: paging, failures, orders,
//! order placement, product analysis and the sales report.

use chrono::Duration;
use serde_json::json;

use lastcall_client::profile::UserProfile;
use lastcall_client::{AdminOrders, ApiClient, LoadError};
use lastcall_common::cart::Cart;
use lastcall_common::currency::Money;
use lastcall_common::health::HealthRating;
use lastcall_common::order::{OrderId, OrderStatus, CASH_ON_DELIVERY};
use lastcall_common::product::ProductId;
use lastcall_integration::{init_tracing, product, MockBackend};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_all_stops_on_short_page() {
    init_tracing();
    let backend = MockBackend::start().await;
    backend
        .set_products((1..=25).map(|id| product(id, Duration::days(1))).collect())
        .await;

    let api = ApiClient::new(&backend.config(10)).unwrap();
    let all = api.fetch_all_products().await.unwrap();

    assert_eq!(all.len(), 25);
    assert_eq!(all.first().unwrap().id.0, 1);
    assert_eq!(all.last().unwrap().id.0, 25);
    assert_eq!(
        backend.product_requests().await,
        vec![(1, 10), (2, 10), (3, 10)]
    );
}

/// A catalog that is an exact multiple of the page size ends on an empty page.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_all_reads_trailing_empty_page() {
    let backend = MockBackend::start().await;
    backend
        .set_products((1..=20).map(|id| product(id, Duration::days(1))).collect())
        .await;

    let api = ApiClient::new(&backend.config(10)).unwrap();
    assert_eq!(api.fetch_all_products().await.unwrap().len(), 20);
    assert_eq!(backend.product_requests().await.len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_error_is_a_load_failure() {
    let backend = MockBackend::start().await;
    backend.fail_products(true);

    let api = ApiClient::new(&backend.config(10)).unwrap();
    let err = api.fetch_products_page(1, 10).await.unwrap_err();
    assert!(matches!(err, LoadError::Status { status: 500 }), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_backend_is_a_transport_failure() {
    let backend = MockBackend::start().await;
    let config = backend.config(10);
    drop(backend);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let api = ApiClient::new(&config).unwrap();
    let err = api.fetch_products_page(1, 10).await.unwrap_err();
    assert!(matches!(err, LoadError::Transport(_)), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn user_orders_decode_both_item_shapes() {
    let backend = MockBackend::start().await;
    backend
        .add_order(json!({
            "id": 1,
            "user_id": 7,
            "customer_name": "Alice",
            "payment_method": "cash",
            "status": "pending",
            "total_amount": "240.00",
            "items": [{ "product_id": 3, "product_name": "Bread", "price": 120, "quantity": 2 }]
        }))
        .await;
    backend
        .add_order(json!({
            "id": 2,
            "user_id": 7,
            "payment_method": "card",
            "status": "confirmed",
            "total_amount": 240,
            "items": "[{\"product_id\":3,\"product_name\":\"Bread\",\"price\":120,\"quantity\":2}]"
        }))
        .await;
    backend
        .add_order(json!({ "id": 3, "user_id": 8, "total_amount": 10, "items": [] }))
        .await;

    let api = ApiClient::new(&backend.config(10)).unwrap();
    let orders = api.user_orders(7).await.unwrap();

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].items, orders[1].items);
    assert_eq!(orders[0].items_total(), Money::from_major(240));
    assert_eq!(orders[1].status, OrderStatus::Confirmed);
    assert_eq!(orders[1].item_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn admin_confirms_delivery() {
    let backend = MockBackend::start().await;
    backend
        .add_order(json!({ "id": 11, "status": "pending", "total_amount": 90, "items": [] }))
        .await;
    backend
        .add_order(json!({ "id": 12, "status": "confirmed", "total_amount": 50, "items": [] }))
        .await;

    let api = ApiClient::new(&backend.config(10)).unwrap();
    let today = api.admin_orders(AdminOrders::Today).await.unwrap();
    assert_eq!(today.iter().map(|o| o.id).collect::<Vec<_>>(), vec![OrderId(11)]);

    api.confirm_delivery(OrderId(11)).await.unwrap();
    assert_eq!(backend.confirmed().await, vec![11]);

    let confirmed = api.admin_orders(AdminOrders::Confirmed).await.unwrap();
    assert_eq!(confirmed.len(), 2);
    let details = api.order_details(OrderId(11)).await.unwrap();
    assert_eq!(details.status, OrderStatus::Delivered);

    let err = api.confirm_delivery(OrderId(99)).await.unwrap_err();
    assert!(matches!(err, LoadError::Status { status: 404 }), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_order_is_not_found() {
    let backend = MockBackend::start().await;
    let api = ApiClient::new(&backend.config(10)).unwrap();
    let err = api.order_details(OrderId(5)).await.unwrap_err();
    assert!(matches!(err, LoadError::NotFound(ref m) if m == "Order not found"), "{err}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sales_report_decodes_loose_numbers() {
    let backend = MockBackend::start().await;
    backend
        .set_sales_report(json!({
            "summary": { "total_sales": "1500.50", "total_orders": "3", "total_items": 9 },
            "daily_sales": [{ "date": "2024-05-01", "daily_sales": 500 }],
            "monthly_sales": [
                { "month": "2024-04", "monthly_sales": 1000 },
                { "month": "2024-05", "monthly_sales": "500.50" }
            ],
            "best_selling_products": [{ "product_name": "Bread", "total_sold": "6" }]
        }))
        .await;

    let api = ApiClient::new(&backend.config(10)).unwrap();
    let report = api.sales_report().await.unwrap();

    assert_eq!(report.summary.total_sales, Money::from_cents(150_050));
    assert_eq!(report.summary.total_orders, 3);
    assert_eq!(report.average_order_value(), Money::from_cents(50_016));
    assert_eq!(report.best_selling_products[0].total_sold, 6);
    assert_eq!(report.recent_months(1)[0].month, "2024-05");
}

fn shopper() -> UserProfile {
    UserProfile {
        id: 7,
        name: "Alice".into(),
        email: None,
        role: None,
        phone: Some("0771234567".into()),
        address: Some("12 Lake Rd, Kandy".into()),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn placed_order_shows_up_in_user_orders() {
    init_tracing();
    let backend = MockBackend::start().await;
    let mut cart = Cart::new();
    cart.insert(product(1, Duration::days(1)));
    cart.insert(product(1, Duration::days(1)));
    cart.insert(product(2, Duration::hours(3)));

    let api = ApiClient::new(&backend.config(10)).unwrap();
    let id = api
        .create_order(&cart, &shopper(), CASH_ON_DELIVERY)
        .await
        .unwrap();

    let placed = backend.placed_orders().await;
    assert_eq!(placed.len(), 1);
    let body = &placed[0];
    assert_eq!(body["customer_id"], 7);
    assert_eq!(body["customer_number"], "0771234567");
    assert_eq!(body["customer_address"], "12 Lake Rd, Kandy");
    assert_eq!(body["payment_method"], "CashOnDelivery");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["quantity"], 2);
    assert_eq!(body["items"][0]["image"], "");

    let orders = api.user_orders(7).await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.id, id);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, cart.checkout_summary().grand_total);
    assert_eq!(order.items_total(), Money::from_major(360));
    assert_eq!(order.item_count(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_cart_is_refused_before_sending() {
    let backend = MockBackend::start().await;
    let api = ApiClient::new(&backend.config(10)).unwrap();

    let err = api
        .create_order(&Cart::new(), &shopper(), CASH_ON_DELIVERY)
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Rejected(_)), "{err}");
    assert!(backend.placed_orders().await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn product_analysis_is_decoded() {
    let backend = MockBackend::start().await;
    backend.set_products(vec![product(4, Duration::days(1))]).await;
    let api = ApiClient::new(&backend.config(10)).unwrap();

    let analysis = api.analyze_product(ProductId(4)).await.unwrap();
    assert_eq!(analysis.health_score, 62);
    assert_eq!(analysis.rating(), HealthRating::Moderate);
    assert_eq!(analysis.summary(), "Product 4 is fine in moderation.");

    let err = api.analyze_product(ProductId(99)).await.unwrap_err();
    assert!(matches!(err, LoadError::Rejected(ref m) if m == "Product not found"), "{err}");
}
