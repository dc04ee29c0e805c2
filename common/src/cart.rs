use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::currency::Money;
use crate::expiry::{classify_product, Classification};
use crate::product::{Product, ProductId};

/// Flat promotional discount applied at checkout.
pub const CHECKOUT_DISCOUNT: Money = Money::from_major(50);
/// Flat delivery fee applied at checkout.
pub const DELIVERY_FEE: Money = Money::from_major(50);

/// A product in the cart with its quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.product.effective_price().times(self.quantity)
    }
}

/// Price breakdown shown on the checkout screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSummary {
    pub subtotal: Money,
    pub discount: Money,
    pub delivery_fee: Money,
    pub grand_total: Money,
}

/// The shopper's cart. Owned by the session and handed to the screens that
/// need it; every change goes through one of the named operations below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit. A product already in the cart gets its quantity bumped.
    pub fn insert(&mut self, product: Product) {
        match self.lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.lines.push(CartLine {
                product,
                quantity: 1,
            }),
        }
    }

    pub fn remove(&mut self, id: ProductId) -> Option<CartLine> {
        let idx = self.lines.iter().position(|l| l.product.id == id)?;
        Some(self.lines.remove(idx))
    }

    /// Set the quantity of a line, clamped to at least one.
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, id: ProductId, quantity: u32) -> bool {
        match self.lines.iter_mut().find(|l| l.product.id == id) {
            Some(line) => {
                line.quantity = quantity.max(1);
                true
            }
            None => false,
        }
    }

    pub fn quantity(&self, id: ProductId) -> Option<u32> {
        self.lines
            .iter()
            .find(|l| l.product.id == id)
            .map(|l| l.quantity)
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn checkout_summary(&self) -> CheckoutSummary {
        let subtotal = self.subtotal();
        CheckoutSummary {
            subtotal,
            discount: CHECKOUT_DISCOUNT,
            delivery_fee: DELIVERY_FEE,
            grand_total: (subtotal + DELIVERY_FEE).saturating_sub(CHECKOUT_DISCOUNT),
        }
    }

    /// Per-line classification for the countdown shown next to each item.
    /// Expired lines stay in the cart; the shopper removes them.
    pub fn countdowns(&self, now: DateTime<Utc>) -> BTreeMap<ProductId, Classification> {
        self.lines
            .iter()
            .map(|l| (l.product.id, classify_product(now, &l.product)))
            .collect()
    }
}
