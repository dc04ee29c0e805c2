use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::currency::Money;
use crate::product::ProductId;

/// Payment label sent for cash on delivery.
pub const CASH_ON_DELIVERY: &str = "CashOnDelivery";

/// Unique order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fulfilment status as labelled by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// Placed, waiting for the shop.
    #[default]
    Pending,
    /// Accepted by the shop.
    Confirmed,
    /// Handed over to the customer.
    Delivered,
    Cancelled,
    /// A label this client does not know about.
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Other(label) => label,
        }
    }
}

impl From<String> for OrderStatus {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pending" => OrderStatus::Pending,
            "confirmed" => OrderStatus::Confirmed,
            "delivered" => OrderStatus::Delivered,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(label),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub price: Money,
    #[serde(default = "one")]
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

fn one() -> u32 {
    1
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// The items of an order in their one canonical shape.
///
/// Some endpoints send `items` as an array, others as a string holding the
/// JSON-encoded array. Both land here; anything unreadable becomes an empty
/// list rather than failing the whole order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireItems")]
pub struct OrderItems(pub Vec<OrderItem>);

#[derive(Deserialize)]
#[serde(untagged)]
enum WireItems {
    List(Vec<OrderItem>),
    Encoded(String),
    Unreadable(serde_json::Value),
}

impl From<WireItems> for OrderItems {
    fn from(wire: WireItems) -> Self {
        match wire {
            WireItems::List(items) => OrderItems(items),
            WireItems::Encoded(raw) => {
                OrderItems(serde_json::from_str(&raw).unwrap_or_default())
            }
            WireItems::Unreadable(_) => OrderItems::default(),
        }
    }
}

impl OrderItems {
    pub fn iter(&self) -> impl Iterator<Item = &OrderItem> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&OrderItem> {
        self.0.first()
    }
}

/// An order as returned by the orders API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_address: Option<String>,
    #[serde(default)]
    pub customer_number: Option<String>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: Money,
    /// Placement time, passed through as sent.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub items: OrderItems,
}

impl Order {
    /// Sum of the line totals (the backend's `total_amount` may include fees).
    pub fn items_total(&self) -> Money {
        self.items.iter().map(OrderItem::line_total).sum()
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

fn default_success() -> bool {
    true
}

/// `{ success, orders }` envelope. Admin listings omit `success`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrdersEnvelope {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `{ success, order }` envelope returned by the details endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderEnvelope {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub order: Option<Order>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Who an order is placed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: u64,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// One line of an order placement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    /// Unit price actually charged, i.e. the clearance price when there is one.
    pub price: Money,
    /// Image URL, or empty.
    pub image: String,
}

/// Body of `POST /api/orders/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: u64,
    pub customer_name: String,
    pub customer_number: Option<String>,
    pub customer_address: Option<String>,
    pub total_amount: Money,
    pub payment_method: String,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    /// Order for everything in `cart`, charged at the checkout grand total.
    /// Returns `None` when the cart is empty.
    pub fn from_cart(cart: &Cart, customer: Customer, payment_method: &str) -> Option<Self> {
        if cart.is_empty() {
            return None;
        }
        let items = cart
            .lines()
            .iter()
            .map(|line| NewOrderItem {
                product_id: line.product.id,
                name: line.product.name.clone(),
                quantity: line.quantity,
                price: line.product.effective_price(),
                image: line.product.image.clone().unwrap_or_default(),
            })
            .collect();
        Some(Self {
            customer_id: customer.id,
            customer_name: customer.name,
            customer_number: customer.phone,
            customer_address: customer.address,
            total_amount: cart.checkout_summary().grand_total,
            payment_method: payment_method.to_string(),
            items,
        })
    }
}

/// `{ success, orderId, message }` returned after placing an order.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacedOrder {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, rename = "orderId")]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub message: Option<String>,
}
