//! dynoframe: move tabular data in and out of DynamoDB.
//!
//! Rows are [`Record`]s of [`Value`]s, tables of rows are [`Frame`]s. The
//! codec in [`conversions`] maps values to and from DynamoDB's
//! `AttributeValue`; [`TableAccess`] reads and writes whole frames through
//! the batching engine, which splits reads into requests of 100 keys and
//! writes into adaptive batches of at most 25 items.
//!
//! ```no_run
//! use dynoframe::{keys_from_column, AwsConfig, TableAccess};
//!
//! let access = TableAccess::connect(&AwsConfig::from_env())?;
//! let keys = keys_from_column("id", [1, 2, 3]);
//! let frame = access.get_frame("users", Some(keys.as_slice()), None, None)?;
//! access.put_frame("users_copy", &frame)?;
//! # Ok::<(), dynoframe::Error>(())
//! ```

pub mod basic_operations;
pub mod batch_operations;
pub mod client;
pub mod config;
pub mod conversions;
pub mod errors;
pub mod frame;
pub mod logging;
pub mod metrics;
pub mod records;
pub mod store;
pub mod table;
pub mod value;

pub use client::DynamoStore;
pub use config::{AwsConfig, RetryPolicy};
pub use conversions::{Item, deserialize, item_to_record, record_to_item, serialize};
pub use errors::{Error, Result};
pub use frame::{Column, DType, DTypeMap, Frame, IntWidth, RowSource, to_record};
pub use metrics::OperationMetrics;
pub use records::{
    RecordInput, items_to_records, records_to_wire, single_record_to_wire, wire_to_records,
};
pub use store::{
    BatchGetOutput, BatchWriteOutput, Projection, PutItemOutput, ScanOutput, StoreClient,
};
pub use table::{TableAccess, keys, keys_from_column};
pub use value::{Record, Timestamp, Value};
