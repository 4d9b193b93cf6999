mod common;

use aws_sdk_dynamodb::types::AttributeValue;
use common::{ids, record, MemoryStore};
use dynoframe::{keys_from_column, Error, TableAccess, Value};

const TABLE: &str = "users";

fn seeded() -> TableAccess<MemoryStore> {
    let access = TableAccess::new(MemoryStore::new().with_table(TABLE));
    let rows: Vec<_> = (0..5)
        .map(|i| {
            record(&[
                ("id", Value::Int(i)),
                ("name", Value::from(format!("user-{}", i))),
                ("score", Value::Float(i as f64 + 0.5)),
            ])
        })
        .collect();
    access.put_items(TABLE, &rows).unwrap();
    access
}

#[test]
fn test_get_item_existing_key() {
    let access = seeded();
    let item = access
        .get_item(TABLE, &record(&[("id", Value::Int(3))]))
        .unwrap()
        .unwrap();
    assert_eq!(item["name"], Value::from("user-3"));
    assert_eq!(item["score"], Value::Float(3.5));
    assert_eq!(item["id"], Value::Int(3));
}

#[test]
fn test_get_item_missing_key_is_none() {
    let access = seeded();
    let item = access.get_item(TABLE, &record(&[("id", Value::Int(42))])).unwrap();
    assert!(item.is_none());
}

#[test]
fn test_get_item_unknown_table() {
    let access = seeded();
    let err = access
        .get_item("nope", &record(&[("id", Value::Int(1))]))
        .unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(_)));
    assert!(err.is_store_error());
}

#[test]
fn test_put_item_return_response() {
    let access = seeded();
    let row = record(&[("id", Value::Int(10)), ("name", Value::from("new"))]);

    assert!(access.put_item(TABLE, &row, false).unwrap().is_none());

    let response = access.put_item(TABLE, &row, true).unwrap().unwrap();
    assert_eq!(response.metrics.consumed_wcu, Some(1.0));
    assert_eq!(access.store().len(TABLE), 6);
}

#[test]
fn test_put_item_integral_float_is_stored_without_fraction() {
    let access = seeded();
    let row = record(&[("id", Value::Int(20)), ("price", Value::Float(3.0))]);
    access.put_item(TABLE, &row, false).unwrap();

    let raw = access.store().raw_item(TABLE, 20).unwrap();
    assert_eq!(raw["price"], AttributeValue::N("3".into()));

    let back = access.get_item(TABLE, &record(&[("id", Value::Int(20))])).unwrap().unwrap();
    assert_eq!(back["price"], Value::Int(3));
}

#[test]
fn test_put_item_empty_record_is_type_error() {
    let access = seeded();
    let err = access.put_item(TABLE, &record(&[]), false).unwrap_err();
    assert!(matches!(err, Error::Type(_)));
}

#[test]
fn test_put_item_non_finite_float_is_rejected() {
    let access = seeded();
    let row = record(&[("id", Value::Int(30)), ("x", Value::Float(f64::INFINITY))]);
    let err = access.put_item(TABLE, &row, false).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
    assert_eq!(access.store().len(TABLE), 5);
}

#[test]
fn test_get_items_with_projection() {
    let access = seeded();
    let keys = keys_from_column("id", [4, 1]);
    let items = access.get_items(TABLE, &keys, Some(&["id", "name"][..])).unwrap();

    assert_eq!(ids(&items), vec![4, 1]);
    for item in &items {
        assert_eq!(item.len(), 2);
        assert!(!item.contains_key("score"));
    }
}

#[test]
fn test_get_all_items() {
    let access = seeded();
    let items = access.get_all_items(TABLE, None).unwrap();
    assert_eq!(ids(&items), vec![0, 1, 2, 3, 4]);

    let names = access.get_all_items(TABLE, Some(&["name"][..])).unwrap();
    assert!(names.iter().all(|r| r.len() == 1 && r.contains_key("name")));
}
