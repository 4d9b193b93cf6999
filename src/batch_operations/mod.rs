//! Batch operations module for DynamoDB.
//!
//! This module provides batch operations:
//! - `batch_get` - Get many items, 100 keys per request
//! - `batch_write` - Put many items, at most 25 per request, shrinking the
//!   batch when the store pushes back
//!
//! Both resubmit whatever the store reports as unprocessed until nothing is
//! left or the [`RetryPolicy`](crate::config::RetryPolicy) gives up. Neither is
//! meant to be driven concurrently for the same logical batch.

mod get;
mod write;

pub use get::batch_get;
pub use write::{batch_write, shrink_batch_size, WriteQueue, WriteState};
