//! # Repository Module
//!
//! Database repository implementations for the storefront.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Handler                                                               │
//! │       │                                                                 │
//! │       │  db.carts().add_item("user-1", "p-7", 2)                       │
//! │       ▼                                                                 │
//! │  CartRepository                                                        │
//! │  ├── get_cart(&self, user_id)                                          │
//! │  ├── add_item(&self, user_id, product_id, qty)                         │
//! │  ├── update_quantity / remove_item / clear                             │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog rows
//! - [`InventoryRepository`](inventory::InventoryRepository) - Atomic stock movements
//! - [`CartRepository`](cart::CartRepository) - Per-user carts
//! - [`OrderRepository`](order::OrderRepository) - Order reads, intents, settlement
//!
//! Some modules also expose connection-level functions (`*_on`) that the
//! checkout transaction composes.

pub mod cart;
pub mod inventory;
pub mod order;
pub mod product;
