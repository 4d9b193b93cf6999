//! Whole-record conversions between tabular rows and DynamoDB items.

use aws_sdk_dynamodb::types::AttributeValue;

use crate::conversions::{item_to_record, record_to_item, Item};
use crate::errors::{Error, Result};
use crate::frame::{to_record, RowSource};
use crate::value::Record;

/// One record or a sequence of records.
#[derive(Debug, Clone)]
pub enum RecordInput {
    One(Record),
    Many(Vec<Record>),
}

impl From<Record> for RecordInput {
    fn from(record: Record) -> Self {
        RecordInput::One(record)
    }
}

impl From<Vec<Record>> for RecordInput {
    fn from(records: Vec<Record>) -> Self {
        RecordInput::Many(records)
    }
}

impl From<&[Record]> for RecordInput {
    fn from(records: &[Record]) -> Self {
        RecordInput::Many(records.to_vec())
    }
}

impl RecordInput {
    fn into_vec(self) -> Vec<Record> {
        match self {
            RecordInput::One(record) => vec![record],
            RecordInput::Many(records) => records,
        }
    }
}

/// Convert one record or a sequence of records to DynamoDB items.
pub fn records_to_wire(input: impl Into<RecordInput>) -> Result<Vec<Item>> {
    input
        .into()
        .into_vec()
        .iter()
        .map(record_to_item)
        .collect()
}

/// Convert DynamoDB items back to records.
pub fn items_to_records(items: Vec<Item>) -> Result<Vec<Record>> {
    items.into_iter().map(item_to_record).collect()
}

/// Convert a wire list of maps (`L` of `M`) back to records.
///
/// Anything other than a list whose every element is a map is a type error.
pub fn wire_to_records(value: AttributeValue) -> Result<Vec<Record>> {
    let AttributeValue::L(list) = value else {
        return Err(Error::type_error(
            "expected a list of items, got a single wire value",
        ));
    };
    list.into_iter()
        .enumerate()
        .map(|(i, element)| match element {
            AttributeValue::M(item) => item_to_record(item),
            _ => Err(Error::type_error(format!("element {} is not an item map", i))),
        })
        .collect()
}

/// Convert exactly one row to a DynamoDB item.
///
/// Accepts a single-row frame or one extracted row; a frame with any other
/// number of rows is a domain error pointing at [`records_to_wire`].
pub fn single_record_to_wire<'a>(source: impl Into<RowSource<'a>>) -> Result<Item> {
    let record = to_record(source).map_err(|e| match e {
        Error::Domain(_) => Error::domain(
            "expected a single row. Use records_to_wire to convert multiple rows.",
        ),
        other => other,
    })?;
    record_to_item(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::value::Value;
    use std::collections::HashMap;

    fn record(id: i64, score: f64) -> Record {
        Record::from([
            ("id".to_string(), Value::Int(id)),
            ("score".to_string(), Value::Float(score)),
        ])
    }

    #[test]
    fn test_single_record_normalizes_to_sequence() {
        let items = records_to_wire(record(1, 2.5)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["score"], AttributeValue::N("2.5".into()));
    }

    #[test]
    fn test_sequence_keeps_order() {
        let items = records_to_wire(vec![record(1, 1.0), record(2, f64::NAN)]).unwrap();
        assert_eq!(items[0]["id"], AttributeValue::N("1".into()));
        assert_eq!(items[1]["score"], AttributeValue::Null(true));
    }

    #[test]
    fn test_wire_to_records_requires_list_of_maps() {
        let item = HashMap::from([("id".to_string(), AttributeValue::N("3".into()))]);
        let records = wire_to_records(AttributeValue::L(vec![AttributeValue::M(item.clone())]))
            .unwrap();
        assert_eq!(records[0]["id"], Value::Int(3));

        assert!(matches!(
            wire_to_records(AttributeValue::M(item)),
            Err(Error::Type(_))
        ));
        assert!(matches!(
            wire_to_records(AttributeValue::L(vec![AttributeValue::S("x".into())])),
            Err(Error::Type(_))
        ));
    }

    #[test]
    fn test_single_record_rejects_multi_row_frame() {
        let frame = Frame::from_records(&[record(1, 1.0), record(2, 2.0)]);
        let err = single_record_to_wire(&frame).unwrap_err();
        assert!(matches!(err, Error::Domain(ref m) if m.contains("records_to_wire")));

        let item = single_record_to_wire(frame.row(0).unwrap()).unwrap();
        assert_eq!(item["id"], AttributeValue::N("1".into()));
    }
}
