//! Client side of the LastCall storefront: backend access, the realtime
//! push channel, and the inventory session that keeps expiring deals fresh.

pub mod api;
pub mod config;
pub mod error;
pub mod inventory;
pub mod profile;
pub mod push;
pub mod session;

pub use api::{AdminOrders, ApiClient, ProductSource};
pub use config::ClientConfig;
pub use error::{LoadError, ProfileError};
pub use inventory::{InventoryView, LoadState, TrackedProduct};
pub use push::{PushNotice, PushSubscription};
pub use session::{Clock, InventorySession, SessionHandle, Snapshot, SystemClock};
