//! Single-request operations for DynamoDB.
//!
//! This module provides:
//! - `get` - Get one item by key
//! - `put` - Put one item
//! - `scan` - Read a whole table, following pagination

mod get;
mod put;
mod scan;

pub use get::get_item;
pub use put::put_item;
pub use scan::scan_all;
