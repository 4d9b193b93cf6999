//! Full-table scan.

use tracing::debug;

use crate::conversions::Item;
use crate::errors::Result;
use crate::store::{Projection, StoreClient};

/// Read every item of a table.
///
/// Follows `LastEvaluatedKey` until the store reports no more pages and
/// concatenates pages in scan order.
pub fn scan_all<S: StoreClient + ?Sized>(
    store: &S,
    table: &str,
    projection: Option<&Projection>,
) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    let mut start_key = None;
    let mut pages = 0usize;

    loop {
        let page = store.scan(table, start_key.take(), projection)?;
        pages += 1;
        items.extend(page.items);

        match page.last_evaluated_key {
            Some(key) => start_key = Some(key),
            None => break,
        }
    }

    debug!(table, pages, items = items.len(), "scan complete");
    Ok(items)
}
