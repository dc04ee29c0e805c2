pub mod cart;
pub mod collection;
pub mod currency;
pub mod event;
pub mod expiry;
pub mod favorites;
pub mod health;
pub mod order;
pub mod product;
pub mod sales;
mod wire;
