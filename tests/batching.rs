mod common;

use common::{ids, record, MemoryStore};
use dynoframe::{keys_from_column, Error, Record, RetryPolicy, TableAccess, Value};

const TABLE: &str = "large";

fn rows(n: i64) -> Vec<Record> {
    (0..n)
        .map(|i| {
            record(&[
                ("id", Value::Int(i)),
                ("letter", Value::from(((b'a' + (i % 26) as u8) as char).to_string())),
                ("number", Value::Int((i * 7) % 1000)),
            ])
        })
        .collect()
}

#[test]
fn test_put_items_in_batches_of_25() {
    let access = TableAccess::new(MemoryStore::new().with_table(TABLE));
    let metrics = access.put_items(TABLE, &rows(250)).unwrap();

    assert_eq!(*access.store().write_calls.borrow(), vec![25; 10]);
    assert_eq!(metrics.items_count, Some(250));
    assert_eq!(access.store().len(TABLE), 250);
}

#[test]
fn test_scan_follows_pages() {
    let store = MemoryStore::new().with_page_size(100);
    let access = TableAccess::new(store.with_table(TABLE));
    access.put_items(TABLE, &rows(250)).unwrap();

    let items = access.get_all_items(TABLE, None).unwrap();
    assert_eq!(items.len(), 250);
    assert_eq!(ids(&items), (0..250).collect::<Vec<_>>());
    assert_eq!(*access.store().scan_calls.borrow(), 3);
}

#[test]
fn test_get_items_in_chunks_of_100_keep_key_order() {
    let access = TableAccess::new(MemoryStore::new().with_table(TABLE));
    access.put_items(TABLE, &rows(250)).unwrap();

    let keys = keys_from_column("id", (0..125).rev());
    let items = access.get_items(TABLE, &keys, None).unwrap();

    assert_eq!(ids(&items), (0..125).rev().collect::<Vec<_>>());
    assert_eq!(*access.store().get_calls.borrow(), vec![100, 25]);
}

#[test]
fn test_get_items_skips_missing_keys() {
    let access = TableAccess::new(MemoryStore::new().with_table(TABLE));
    access.put_items(TABLE, &rows(10)).unwrap();

    let keys = keys_from_column("id", [2, 999, 5]);
    let items = access.get_items(TABLE, &keys, None).unwrap();
    assert_eq!(ids(&items), vec![2, 5]);
}

#[test]
fn test_get_items_resubmits_unprocessed_keys() {
    let store = MemoryStore::new().with_read_capacity(40);
    let access = TableAccess::new(store.with_table(TABLE))
        .with_retry_policy(RetryPolicy::immediate(5));
    access.put_items(TABLE, &rows(100)).unwrap();

    let keys = keys_from_column("id", 0..100);
    let items = access.get_items(TABLE, &keys, None).unwrap();

    assert_eq!(ids(&items), (0..100).collect::<Vec<_>>());
    assert_eq!(*access.store().get_calls.borrow(), vec![100, 60, 20]);
}

#[test]
fn test_put_items_shrinks_batch_under_pressure() {
    let store = MemoryStore::new().with_write_capacity(1);
    let access = TableAccess::new(store.with_table(TABLE))
        .with_retry_policy(RetryPolicy::unbounded());
    access.put_items(TABLE, &rows(30)).unwrap();

    let calls = access.store().write_calls.borrow().clone();
    assert_eq!(calls[..6], [25, 13, 7, 4, 3, 2]);
    assert!(calls[6..].iter().all(|&n| n <= 2));
    assert_eq!(access.store().len(TABLE), 30);
}

#[test]
fn test_partial_throttling_completes_with_default_policy() {
    let store = MemoryStore::new()
        .with_write_capacity(24)
        .with_read_capacity(40);
    let access = TableAccess::new(store.with_table(TABLE));
    assert_eq!(*access.retry_policy(), RetryPolicy::default());

    access.put_items(TABLE, &rows(300)).unwrap();
    assert_eq!(access.store().len(TABLE), 300);
    let calls = access.store().write_calls.borrow().clone();
    assert!(calls.len() > 11);
    assert!(calls.iter().all(|&n| n <= 25));

    let keys = keys_from_column("id", (0..250).rev());
    let items = access.get_items(TABLE, &keys, None).unwrap();
    assert_eq!(ids(&items), (0..250).rev().collect::<Vec<_>>());
}

#[test]
fn test_put_items_gives_up_when_nothing_is_written() {
    let store = MemoryStore::new().with_write_capacity(0);
    let access = TableAccess::new(store.with_table(TABLE))
        .with_retry_policy(RetryPolicy::immediate(2));

    let err = access.put_items(TABLE, &rows(25)).unwrap_err();
    assert!(matches!(
        err,
        Error::RetriesExhausted {
            pending: 25,
            attempts: 3
        }
    ));
    assert_eq!(access.store().write_calls.borrow().len(), 3);
}

#[test]
fn test_put_items_empty_makes_no_calls() {
    let access = TableAccess::new(MemoryStore::new().with_table(TABLE));
    access.put_items(TABLE, &[]).unwrap();
    assert!(access.store().write_calls.borrow().is_empty());
}
