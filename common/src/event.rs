use serde::{Deserialize, Serialize};

use crate::collection::ProductCollection;
use crate::product::{Product, ProductCode};

/// Inventory change pushed by the backend.
///
/// On the wire: `{"event":"newProduct","data":{...product...}}` or
/// `{"event":"productExpired","data":{"code":"P00099"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    #[serde(rename = "newProduct")]
    Insert(Product),
    #[serde(rename = "productExpired")]
    Expire { code: ProductCode },
}

impl ProductCollection {
    /// Merge a pushed event. Returns `true` if the collection changed.
    ///
    /// Idempotent with respect to the initial load: an insert for an id that
    /// is already present is dropped, removing an unknown code does nothing.
    pub fn apply(&mut self, event: RealtimeEvent) -> bool {
        match event {
            RealtimeEvent::Insert(product) => self.insert(product),
            RealtimeEvent::Expire { code } => self.remove_by_code(&code).is_some(),
        }
    }
}
