//! Data access for shopping-cart items: list a cart with its products,
//! look up one line, and clear a cart inside a transaction.

pub mod config;
pub mod db;
pub mod entities;
pub mod repository;
pub mod telemetry;

pub use config::{ConfigError, DatabaseConfig};
pub use repository::cart_item::{CartItemRepository, CartItemWithProduct};
pub use repository::{CartItemError, Session};
