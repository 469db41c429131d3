//! # Storage Module
//!
//! - `UserStore` port and its SQLite adapter
//! - Raw storage errors and their classification into `NormalizedError`

pub mod classifier;
pub mod errors;
pub mod users;

pub use classifier::classify;
pub use users::{SqliteUserStore, UserStore};
