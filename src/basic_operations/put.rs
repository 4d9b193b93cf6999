//! Put item operation.

use tracing::debug;

use crate::conversions::record_to_item;
use crate::errors::{Error, Result};
use crate::store::{PutItemOutput, StoreClient};
use crate::value::Record;

/// Put one item, replacing any item with the same key.
pub fn put_item<S: StoreClient + ?Sized>(
    store: &S,
    table: &str,
    record: &Record,
) -> Result<PutItemOutput> {
    if record.is_empty() {
        return Err(Error::type_error("item must be a non-empty record"));
    }

    let item = record_to_item(record)?;
    let output = store.put_item(table, item)?;
    debug!(
        table,
        attributes = record.len(),
        duration_ms = output.metrics.duration_ms,
        "put_item"
    );
    Ok(output)
}
