use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use lastcall_common::collection::{InsertMode, ProductCollection};
use lastcall_common::event::RealtimeEvent;
use lastcall_common::expiry::{classify_product, Classification};
use lastcall_common::product::{Product, ProductId};

/// Progress of the paged product load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LoadState {
    Idle,
    Loading { page: u32 },
    Loaded,
    /// The last request failed; contents are whatever was held before it.
    Failed(String),
}

/// A product with the classification from the latest refresh pass.
/// `classification` is `None` until the first tick after it arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedProduct {
    pub product: Product,
    pub classification: Option<Classification>,
}

/// What one refresh pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Products pruned this pass.
    pub expired: Vec<ProductId>,
    /// Whether the collection was swapped (some product expired).
    pub membership_changed: bool,
}

/// View model behind the deals screens: tracked products, their live
/// countdowns, and the paging state of the initial load.
#[derive(Debug, Clone)]
pub struct InventoryView {
    products: ProductCollection,
    countdowns: HashMap<ProductId, Classification>,
    sampled_at: Option<DateTime<Utc>>,
    load: LoadState,
    next_page: u32,
    has_more: bool,
}

impl Default for InventoryView {
    fn default() -> Self {
        Self {
            products: ProductCollection::new(),
            countdowns: HashMap::new(),
            sampled_at: None,
            load: LoadState::Idle,
            next_page: 1,
            has_more: true,
        }
    }
}

impl InventoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// One refresh pass against a single `now` sample.
    ///
    /// Expired products are pruned; the collection is only swapped when
    /// something actually expired. The countdown map is always rebuilt.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let mut countdowns = HashMap::with_capacity(self.products.len());
        let mut expired = Vec::new();

        for product in self.products.iter() {
            let classification = classify_product(now, product);
            if classification.is_expired() {
                expired.push(product.id);
            } else {
                countdowns.insert(product.id, classification);
            }
        }

        let membership_changed = !expired.is_empty();
        if membership_changed {
            let still_valid = self
                .products
                .iter()
                .filter(|p| countdowns.contains_key(&p.id))
                .cloned()
                .collect();
            self.products.replace_all(still_valid);
        }

        self.countdowns = countdowns;
        self.sampled_at = Some(now);
        TickOutcome {
            expired,
            membership_changed,
        }
    }

    /// Merge a pushed event. Returns `true` if the collection changed.
    pub fn apply_event(&mut self, event: RealtimeEvent) -> bool {
        match event {
            RealtimeEvent::Insert(product) => self.products.insert(product),
            RealtimeEvent::Expire { code } => match self.products.remove_by_code(&code) {
                Some(removed) => {
                    self.countdowns.remove(&removed.id);
                    true
                }
                None => false,
            },
        }
    }

    /// User-initiated removal.
    pub fn remove(&mut self, id: ProductId) -> Option<Product> {
        self.countdowns.remove(&id);
        self.products.remove_by_id(id)
    }

    /// Claim the next page to request, marking the view as loading.
    ///
    /// `reload` restarts from page 1. Returns `None` while another load is in
    /// flight, or when every page has already been read.
    pub fn begin_load(&mut self, reload: bool) -> Option<u32> {
        if self.is_loading() {
            return None;
        }
        let page = if reload {
            1
        } else if self.has_more {
            self.next_page
        } else {
            return None;
        };
        self.load = LoadState::Loading { page };
        Some(page)
    }

    /// Record the result of the page claimed by [`begin_load`](Self::begin_load).
    ///
    /// Page 1 replaces the contents, later pages append. A page shorter than
    /// `page_size` ends pagination. A failure leaves the contents untouched.
    pub fn finish_load(&mut self, page: u32, result: Result<Vec<Product>, String>, page_size: u32) {
        match result {
            Ok(items) => {
                let short = items.len() < page_size as usize;
                let mode = if page <= 1 {
                    InsertMode::Replace
                } else {
                    InsertMode::Append
                };
                self.products.insert_many(items, mode);
                if mode == InsertMode::Replace {
                    let products = &self.products;
                    self.countdowns.retain(|id, _| products.contains(*id));
                }
                self.has_more = !short;
                self.next_page = page + 1;
                self.load = LoadState::Loaded;
            }
            Err(message) => {
                self.load = LoadState::Failed(message);
            }
        }
    }

    pub fn products(&self) -> &ProductCollection {
        &self.products
    }

    pub fn countdown(&self, id: ProductId) -> Option<&Classification> {
        self.countdowns.get(&id)
    }

    pub fn countdowns(&self) -> &HashMap<ProductId, Classification> {
        &self.countdowns
    }

    pub fn sampled_at(&self) -> Option<DateTime<Utc>> {
        self.sampled_at
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load, LoadState::Loading { .. })
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn revision(&self) -> u64 {
        self.products.revision()
    }

    /// Products paired with their latest classification, in list order.
    pub fn tracked(&self) -> Vec<TrackedProduct> {
        self.products
            .iter()
            .map(|p| TrackedProduct {
                product: p.clone(),
                classification: self.countdowns.get(&p.id).copied(),
            })
            .collect()
    }
}

/// The two strips of the home screen, filtered by the search box.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections<'a> {
    /// At most 24h left.
    pub today_only: Vec<&'a TrackedProduct>,
    /// More than 24h left.
    pub upcoming: Vec<&'a TrackedProduct>,
}

/// Split tracked products into home-screen sections. Products not yet
/// classified appear in neither.
pub fn sections<'a>(tracked: &'a [TrackedProduct], query: &str) -> Sections<'a> {
    let mut out = Sections::default();
    for entry in tracked.iter().filter(|t| t.product.matches_query(query)) {
        match entry.classification.map(|c| c.bucket) {
            Some(bucket) if bucket.is_today_only() => out.today_only.push(entry),
            Some(bucket) if bucket.is_upcoming() => out.upcoming.push(entry),
            _ => {}
        }
    }
    out
}
