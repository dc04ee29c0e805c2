use std::collections::HashSet;

use crate::product::{Product, ProductCode, ProductId};

/// How [`ProductCollection::insert_many`] treats the existing contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Discard the current contents first.
    Replace,
    /// Keep the current contents; skip incoming ids already present.
    Append,
}

/// Ordered list of products holding at most one entry per [`ProductId`].
///
/// Duplicates are dropped, never merged: the first occurrence of an id wins.
/// `revision` increases whenever the contents change so observers can tell a
/// membership change apart from a countdown-only refresh.
#[derive(Debug, Clone, Default)]
pub struct ProductCollection {
    entries: Vec<Product>,
    ids: HashSet<ProductId>,
    revision: u64,
}

impl ProductCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch. Returns how many products were actually added.
    pub fn insert_many<I>(&mut self, items: I, mode: InsertMode) -> usize
    where
        I: IntoIterator<Item = Product>,
    {
        let mut changed = false;
        if mode == InsertMode::Replace && !self.entries.is_empty() {
            self.entries.clear();
            self.ids.clear();
            changed = true;
        }

        let mut inserted = 0;
        for product in items {
            if self.ids.insert(product.id) {
                self.entries.push(product);
                inserted += 1;
            }
        }

        if changed || inserted > 0 {
            self.revision += 1;
        }
        inserted
    }

    /// Insert one product unless its id is already present.
    pub fn insert(&mut self, product: Product) -> bool {
        self.insert_many([product], InsertMode::Append) == 1
    }

    pub fn remove_by_id(&mut self, id: ProductId) -> Option<Product> {
        if !self.ids.remove(&id) {
            return None;
        }
        let idx = self.entries.iter().position(|p| p.id == id)?;
        self.revision += 1;
        Some(self.entries.remove(idx))
    }

    pub fn remove_by_code(&mut self, code: &ProductCode) -> Option<Product> {
        let id = self.entries.iter().find(|p| p.code == *code)?.id;
        self.remove_by_id(id)
    }

    /// Swap in a new list wholesale. Duplicates in `items` are still dropped.
    pub fn replace_all(&mut self, items: Vec<Product>) {
        self.entries.clear();
        self.ids.clear();
        for product in items {
            if self.ids.insert(product.id) {
                self.entries.push(product);
            }
        }
        self.revision += 1;
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.ids.clear();
            self.revision += 1;
        }
    }

    pub fn get(&self, id: ProductId) -> Option<&Product> {
        if !self.ids.contains(&id) {
            return None;
        }
        self.entries.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Product] {
        &self.entries
    }

    pub fn ids(&self) -> &HashSet<ProductId> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
