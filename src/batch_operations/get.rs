//! Batch get operations for DynamoDB.

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::conversions::Item;
use crate::errors::{Error, Result};
use crate::store::{Projection, StoreClient, BATCH_GET_MAX_KEYS};

/// Get many items by key.
///
/// Keys are sent in chunks of [`BATCH_GET_MAX_KEYS`]. Within a chunk, keys the
/// store reports as unprocessed are resubmitted until none remain; `policy`
/// only bounds runs of calls that served no key at all. Results come
/// back in chunk order, then key order within the chunk; keys with no item are
/// dropped silently.
pub fn batch_get<S: StoreClient + ?Sized>(
    store: &S,
    table: &str,
    keys: Vec<Item>,
    projection: Option<&Projection>,
    policy: &RetryPolicy,
) -> Result<Vec<Item>> {
    let mut results = Vec::with_capacity(keys.len());

    for (chunk_index, chunk) in keys.chunks(BATCH_GET_MAX_KEYS).enumerate() {
        let found = get_chunk(store, table, chunk, projection, policy)?;
        debug!(
            table,
            chunk = chunk_index,
            requested = chunk.len(),
            found = found.len(),
            "batch_get chunk complete"
        );
        results.extend(found);
    }

    Ok(results)
}

fn get_chunk<S: StoreClient + ?Sized>(
    store: &S,
    table: &str,
    chunk: &[Item],
    projection: Option<&Projection>,
    policy: &RetryPolicy,
) -> Result<Vec<Item>> {
    let mut pending: Vec<Item> = chunk.to_vec();
    let mut found: Vec<Item> = Vec::with_capacity(chunk.len());
    let mut attempts: u32 = 0;

    loop {
        let submitted = pending.len();
        let output = store.batch_get_item(table, pending, projection)?;
        found.extend(output.items);

        if output.unprocessed_keys.is_empty() {
            break;
        }

        // Only calls that served no key count against the policy
        if output.unprocessed_keys.len() < submitted {
            attempts = 0;
        } else {
            attempts += 1;
        }
        if policy.exhausted(attempts) {
            return Err(Error::RetriesExhausted {
                pending: output.unprocessed_keys.len(),
                attempts,
            });
        }
        let delay = policy.delay(attempts);
        warn!(
            table,
            unprocessed = output.unprocessed_keys.len(),
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "batch_get returned unprocessed keys, resubmitting"
        );
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        pending = output.unprocessed_keys;
    }

    Ok(order_by_keys(chunk, found))
}

/// Sort items into the order of `keys`, dropping duplicates.
///
/// Items whose key attributes were projected away keep arrival order after
/// the matched ones.
fn order_by_keys(keys: &[Item], items: Vec<Item>) -> Vec<Item> {
    let Some(first) = keys.first() else {
        return items;
    };
    let mut key_names: Vec<&str> = first.keys().map(String::as_str).collect();
    key_names.sort_unstable();

    let positions: HashMap<String, usize> = keys
        .iter()
        .enumerate()
        .filter_map(|(i, key)| key_fingerprint(key, &key_names).map(|f| (f, i)))
        .collect();

    let mut matched: Vec<Option<Item>> = vec![None; keys.len()];
    let mut unmatched = Vec::new();
    for item in items {
        match key_fingerprint(&item, &key_names).and_then(|f| positions.get(&f)) {
            Some(&i) => {
                if matched[i].is_none() {
                    matched[i] = Some(item);
                }
            }
            None => unmatched.push(item),
        }
    }

    matched.into_iter().flatten().chain(unmatched).collect()
}

/// Stable text form of an item's key attributes.
fn key_fingerprint(item: &Item, key_names: &[&str]) -> Option<String> {
    let mut out = String::new();
    for name in key_names {
        let value = item.get(*name)?;
        out.push_str(name);
        out.push('=');
        match value {
            AttributeValue::S(s) => {
                out.push_str("S:");
                out.push_str(s);
            }
            AttributeValue::N(n) => {
                out.push_str("N:");
                out.push_str(n);
            }
            other => out.push_str(&format!("{:?}", other)),
        }
        out.push('\u{1f}');
    }
    Some(out)
}
