//! Get item operation.

use tracing::debug;

use crate::conversions::{item_to_record, record_to_item};
use crate::errors::Result;
use crate::store::{Projection, StoreClient};
use crate::value::Record;

/// Get one item by key. Returns `None` when no item has that key.
pub fn get_item<S: StoreClient + ?Sized>(
    store: &S,
    table: &str,
    key: &Record,
    projection: Option<&Projection>,
) -> Result<Option<Record>> {
    let dynamo_key = record_to_item(key)?;
    let item = store.get_item(table, dynamo_key, projection)?;
    debug!(table, found = item.is_some(), "get_item");
    item.map(item_to_record).transpose()
}
