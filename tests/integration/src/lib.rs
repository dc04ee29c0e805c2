//! In-process mock of the storefront backend for end-to-end client tests.
//!
//! Serves the product, order, sales and analysis endpoints over HTTP plus the `/push`
//! WebSocket, all from shared state the test can poke at.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use lastcall_client::{ClientConfig, Snapshot};
use lastcall_common::event::RealtimeEvent;
use lastcall_common::product::{Product, ProductCode, ProductId};

#[derive(Debug, Clone)]
enum PushFrame {
    Text(String),
    Close,
}

struct MockState {
    products: Mutex<Vec<Product>>,
    fail_products: AtomicBool,
    product_requests: Mutex<Vec<(u32, u32)>>,
    orders: Mutex<Vec<Value>>,
    placed: Mutex<Vec<Value>>,
    confirmed: Mutex<Vec<u64>>,
    sales: Mutex<Value>,
    push: broadcast::Sender<PushFrame>,
    push_connections: AtomicUsize,
    push_accepted: AtomicUsize,
}

/// A running mock backend bound to an ephemeral local port.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let (push, _) = broadcast::channel(64);
        let state = Arc::new(MockState {
            products: Mutex::new(Vec::new()),
            fail_products: AtomicBool::new(false),
            product_requests: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            placed: Mutex::new(Vec::new()),
            confirmed: Mutex::new(Vec::new()),
            sales: Mutex::new(json!({})),
            push,
            push_connections: AtomicUsize::new(0),
            push_accepted: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/products/all", get(products_handler))
            .route("/api/orders/user/{user_id}", get(user_orders_handler))
            .route("/api/orders/admin/orders", get(admin_orders_handler))
            .route("/api/orders/admin/confirmed", get(confirmed_orders_handler))
            .route("/api/orders/details/{order_id}", get(order_details_handler))
            .route("/api/orders/admin/confirm/{order_id}", put(confirm_handler))
            .route("/api/orders/admin/sales-report", get(sales_handler))
            .route("/api/orders/create", post(create_order_handler))
            .route("/api/ai/analyze/{product_id}", get(analyze_handler))
            .route("/push", get(push_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!("Mock backend stopped: {e}");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn push_url(&self) -> String {
        format!("ws://{}/push", self.addr)
    }

    /// Client settings pointing at this backend, with fast reconnects.
    pub fn config(&self, page_size: u32) -> ClientConfig {
        let mut config = ClientConfig::new(self.base_url()).with_push_url(self.push_url());
        config.page_size = page_size;
        config.reconnect_min = Duration::from_millis(50);
        config.reconnect_max = Duration::from_millis(200);
        config.request_timeout = Duration::from_secs(5);
        config
    }

    pub async fn set_products(&self, products: Vec<Product>) {
        *self.state.products.lock().await = products;
    }

    /// Make the products endpoint answer HTTP 500.
    pub fn fail_products(&self, fail: bool) {
        self.state.fail_products.store(fail, Ordering::SeqCst);
    }

    /// `(page, limit)` of every products request so far.
    pub async fn product_requests(&self) -> Vec<(u32, u32)> {
        self.state.product_requests.lock().await.clone()
    }

    /// Add a raw order document, exactly as the backend would store it.
    pub async fn add_order(&self, order: Value) {
        self.state.orders.lock().await.push(order);
    }

    /// Request bodies received by the order placement endpoint.
    pub async fn placed_orders(&self) -> Vec<Value> {
        self.state.placed.lock().await.clone()
    }

    /// Order ids confirmed through the admin endpoint.
    pub async fn confirmed(&self) -> Vec<u64> {
        self.state.confirmed.lock().await.clone()
    }

    pub async fn set_sales_report(&self, report: Value) {
        *self.state.sales.lock().await = report;
    }

    pub fn push_event(&self, event: &RealtimeEvent) {
        let text = serde_json::to_string(event).expect("Event serializes");
        self.push_raw(&text);
    }

    /// Send an arbitrary text frame to every push subscriber.
    pub fn push_raw(&self, text: &str) {
        let _ = self.state.push.send(PushFrame::Text(text.to_string()));
    }

    /// Close every open push connection from the server side.
    pub fn drop_push_connections(&self) {
        let _ = self.state.push.send(PushFrame::Close);
    }

    pub fn push_connections(&self) -> usize {
        self.state.push_connections.load(Ordering::SeqCst)
    }

    /// Push connections accepted since start, including closed ones.
    pub fn push_accepted(&self) -> usize {
        self.state.push_accepted.load(Ordering::SeqCst)
    }

    /// Wait until exactly `n` push subscribers are connected.
    pub async fn wait_for_push_connections(&self, n: usize) {
        poll_until(|| self.push_connections() == n, || {
            format!("expected {n} push connection(s), have {}", self.push_connections())
        })
        .await;
    }

    /// Wait until at least `n` push connections have ever been accepted.
    pub async fn wait_for_push_accepted(&self, n: usize) {
        poll_until(|| self.push_accepted() >= n, || {
            format!("expected {n} accepted push connection(s), have {}", self.push_accepted())
        })
        .await;
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn poll_until(mut done: impl FnMut() -> bool, describe: impl Fn() -> String) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !done() {
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out: {}", describe());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A product expiring `expires_in` from now.
pub fn product(id: u64, expires_in: chrono::Duration) -> Product {
    Product {
        id: ProductId(id),
        code: ProductCode(format!("P{id:05}")),
        name: format!("Product {id}"),
        description: String::new(),
        category: Some("Bakery".into()),
        price: lastcall_common::currency::Money::from_major(200),
        discount_price: Some(lastcall_common::currency::Money::from_major(120)),
        image: None,
        expire_date: (Utc::now() + expires_in).to_rfc3339(),
    }
}

/// Wait (up to 10 s) for a snapshot matching `f`.
pub async fn wait_for_snapshot(
    rx: &mut watch::Receiver<Snapshot>,
    f: impl FnMut(&Snapshot) -> bool,
) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(f))
        .await
        .expect("Timed out waiting for snapshot")
        .expect("Session dropped")
        .clone()
}

pub fn ids(snapshot: &Snapshot) -> Vec<u64> {
    snapshot.entries.iter().map(|e| e.product.id.0).collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// ─── Handlers ───────────────────────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct PageQuery {
    page: Option<u32>,
    limit: Option<u32>,
}

async fn products_handler(
    State(state): State<Arc<MockState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Product>>, StatusCode> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10);
    state.product_requests.lock().await.push((page, limit));

    if state.fail_products.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let products = state.products.lock().await;
    let start = ((page - 1) * limit) as usize;
    let batch = products
        .iter()
        .skip(start)
        .take(limit as usize)
        .cloned()
        .collect();
    Ok(Json(batch))
}

fn order_id(order: &Value) -> Option<u64> {
    order.get("id").and_then(Value::as_u64)
}

fn order_status(order: &Value) -> &str {
    order.get("status").and_then(Value::as_str).unwrap_or("pending")
}

async fn user_orders_handler(
    State(state): State<Arc<MockState>>,
    Path(user_id): Path<u64>,
) -> Json<Value> {
    let orders: Vec<Value> = state
        .orders
        .lock()
        .await
        .iter()
        .filter(|o| o.get("user_id").and_then(Value::as_u64) == Some(user_id))
        .cloned()
        .collect();
    Json(json!({ "success": true, "orders": orders }))
}

async fn admin_orders_handler(State(state): State<Arc<MockState>>) -> Json<Value> {
    let orders: Vec<Value> = state
        .orders
        .lock()
        .await
        .iter()
        .filter(|o| order_status(o) == "pending")
        .cloned()
        .collect();
    Json(json!({ "orders": orders }))
}

async fn confirmed_orders_handler(State(state): State<Arc<MockState>>) -> Json<Value> {
    let orders: Vec<Value> = state
        .orders
        .lock()
        .await
        .iter()
        .filter(|o| order_status(o) != "pending")
        .cloned()
        .collect();
    Json(json!({ "orders": orders }))
}

async fn order_details_handler(
    State(state): State<Arc<MockState>>,
    Path(order_id_param): Path<u64>,
) -> Json<Value> {
    let orders = state.orders.lock().await;
    match orders.iter().find(|o| order_id(o) == Some(order_id_param)) {
        Some(order) => Json(json!({ "success": true, "order": order })),
        None => Json(json!({ "success": false, "message": "Order not found" })),
    }
}

async fn confirm_handler(
    State(state): State<Arc<MockState>>,
    Path(order_id_param): Path<u64>,
) -> Result<Json<Value>, StatusCode> {
    let mut orders = state.orders.lock().await;
    let order = orders
        .iter_mut()
        .find(|o| order_id(o) == Some(order_id_param))
        .ok_or(StatusCode::NOT_FOUND)?;
    order["status"] = json!("delivered");
    state.confirmed.lock().await.push(order_id_param);
    Ok(Json(json!({ "success": true })))
}

async fn sales_handler(State(state): State<Arc<MockState>>) -> Json<Value> {
    Json(state.sales.lock().await.clone())
}

/// Stores the order the way the backend lists it: pending, with
/// `product_name` on each item.
async fn create_order_handler(
    State(state): State<Arc<MockState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.placed.lock().await.push(body.clone());

    let items = body["items"].as_array().cloned().unwrap_or_default();
    if items.is_empty() {
        return Json(json!({ "success": false, "message": "Order has no items" }));
    }
    let items: Vec<Value> = items
        .iter()
        .map(|item| {
            json!({
                "product_id": item["product_id"],
                "product_name": item["name"],
                "price": item["price"],
                "quantity": item["quantity"],
            })
        })
        .collect();

    let mut orders = state.orders.lock().await;
    let id = 1000 + orders.len() as u64;
    orders.push(json!({
        "id": id,
        "user_id": body["customer_id"],
        "customer_name": body["customer_name"],
        "customer_number": body["customer_number"],
        "customer_address": body["customer_address"],
        "payment_method": body["payment_method"],
        "status": "pending",
        "total_amount": body["total_amount"],
        "items": items,
    }));
    Json(json!({ "success": true, "orderId": id, "message": "Order placed" }))
}

async fn analyze_handler(
    State(state): State<Arc<MockState>>,
    Path(product_id): Path<u64>,
) -> Json<Value> {
    let products = state.products.lock().await;
    match products.iter().find(|p| p.id.0 == product_id) {
        Some(product) => Json(json!({
            "success": true,
            "product": { "name": product.name, "expire_date": product.expire_date },
            "health_score": 62,
            "ai_analysis": format!("Score: 62\nAnalysis: {} is fine in moderation.", product.name),
        })),
        None => Json(json!({ "success": false, "message": "Product not found" })),
    }
}

async fn push_handler(ws: WebSocketUpgrade, State(state): State<Arc<MockState>>) -> Response {
    ws.on_upgrade(move |socket| push_socket(socket, state))
}

async fn push_socket(mut socket: WebSocket, state: Arc<MockState>) {
    let mut frames = state.push.subscribe();
    state.push_connections.fetch_add(1, Ordering::SeqCst);
    state.push_accepted.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(PushFrame::Text(text)) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(PushFrame::Close) | Err(_) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.push_connections.fetch_sub(1, Ordering::SeqCst);
}
