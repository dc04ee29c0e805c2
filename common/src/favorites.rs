use chrono::{DateTime, Utc};

use crate::collection::ProductCollection;
use crate::expiry::classify_product;
use crate::product::{Product, ProductId};

/// The shopper's saved products, at most one entry per product.
#[derive(Debug, Clone, Default)]
pub struct Favorites {
    items: ProductCollection,
}

impl Favorites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the product was already a favorite.
    pub fn insert(&mut self, product: Product) -> bool {
        self.items.insert(product)
    }

    pub fn remove(&mut self, id: ProductId) -> Option<Product> {
        self.items.remove_by_id(id)
    }

    /// Flip the heart icon. Returns whether the product is now a favorite.
    pub fn toggle(&mut self, product: Product) -> bool {
        if self.items.remove_by_id(product.id).is_some() {
            false
        } else {
            self.items.insert(product)
        }
    }

    pub fn is_favorite(&self, id: ProductId) -> bool {
        self.items.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop favorites whose deal has ended. Returns how many were removed.
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.items.len();
        let live: Vec<Product> = self
            .items
            .iter()
            .filter(|p| !classify_product(now, p).is_expired())
            .cloned()
            .collect();
        if live.len() != before {
            self.items.replace_all(live);
        }
        before - self.items.len()
    }
}
