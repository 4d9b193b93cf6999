//! In-memory DynamoDB stand-in for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::TimeDelta;
use dynoframe::{
    BatchGetOutput, BatchWriteOutput, Column, DType, Error, Frame, IntWidth, Item,
    OperationMetrics, Projection, PutItemOutput, Record, Result, ScanOutput, StoreClient, Value,
};

pub const KEY: &str = "id";

type Table = BTreeMap<String, Item>;

/// Single-key tables held in memory.
///
/// Every table is keyed on [`KEY`]. Capacity limits make batch calls report
/// part of their request as unprocessed, the way a throttled table does.
#[derive(Default)]
pub struct MemoryStore {
    tables: RefCell<HashMap<String, Table>>,
    /// Items per scan page. `None` returns the table in one page.
    pub page_size: Option<usize>,
    /// Keys served per BatchGetItem call; the rest come back unprocessed.
    pub read_capacity: Option<usize>,
    /// Items written per BatchWriteItem call; the rest come back unprocessed.
    pub write_capacity: Option<usize>,
    pub get_calls: RefCell<Vec<usize>>,
    pub write_calls: RefCell<Vec<usize>>,
    pub scan_calls: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &str) -> Self {
        self.tables
            .borrow_mut()
            .insert(table.to_string(), Table::new());
        self
    }

    pub fn with_page_size(mut self, n: usize) -> Self {
        self.page_size = Some(n);
        self
    }

    pub fn with_read_capacity(mut self, n: usize) -> Self {
        self.read_capacity = Some(n);
        self
    }

    pub fn with_write_capacity(mut self, n: usize) -> Self {
        self.write_capacity = Some(n);
        self
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables.borrow().get(table).map_or(0, Table::len)
    }

    pub fn raw_item(&self, table: &str, id: i64) -> Option<Item> {
        let key = Item::from([(KEY.to_string(), AttributeValue::N(id.to_string()))]);
        let fingerprint = fingerprint(&key).ok()?;
        self.tables.borrow().get(table)?.get(&fingerprint).cloned()
    }

    fn with_existing<T>(&self, table: &str, f: impl FnOnce(&mut Table) -> T) -> Result<T> {
        let mut tables = self.tables.borrow_mut();
        let t = tables.get_mut(table).ok_or_else(|| {
            Error::ResourceNotFound(format!("Table not found: {}", table))
        })?;
        Ok(f(t))
    }
}

/// Sortable text form of the key attribute. Numbers are zero-padded so
/// non-negative ids scan in numeric order.
fn fingerprint(item: &Item) -> Result<String> {
    match item.get(KEY) {
        Some(AttributeValue::N(n)) => {
            let i: i64 = n
                .parse()
                .map_err(|_| Error::Validation(format!("non-integer key {}", n)))?;
            Ok(format!("N{:+020}", i))
        }
        Some(AttributeValue::S(s)) => Ok(format!("S{}", s)),
        other => Err(Error::Validation(format!(
            "missing or unsupported key attribute: {:?}",
            other
        ))),
    }
}

fn project(item: Item, projection: Option<&Projection>) -> Item {
    match projection {
        Some(p) if !p.is_empty() => p.apply(item),
        _ => item,
    }
}

impl StoreClient for MemoryStore {
    fn get_item(
        &self,
        table: &str,
        key: Item,
        projection: Option<&Projection>,
    ) -> Result<Option<Item>> {
        let fp = fingerprint(&key)?;
        self.with_existing(table, |t| t.get(&fp).cloned().map(|i| project(i, projection)))
    }

    fn batch_get_item(
        &self,
        table: &str,
        mut keys: Vec<Item>,
        projection: Option<&Projection>,
    ) -> Result<BatchGetOutput> {
        if keys.len() > dynoframe::store::BATCH_GET_MAX_KEYS {
            return Err(Error::Validation("Too many items requested".into()));
        }
        self.get_calls.borrow_mut().push(keys.len());

        let served = self.read_capacity.unwrap_or(keys.len()).min(keys.len());
        let unprocessed_keys = keys.split_off(served);
        let fingerprints = keys.iter().map(fingerprint).collect::<Result<Vec<_>>>()?;

        let mut items = self.with_existing(table, |t| {
            fingerprints
                .iter()
                .filter_map(|fp| t.get(fp).cloned())
                .map(|i| project(i, projection))
                .collect::<Vec<_>>()
        })?;
        // The real service makes no ordering promise
        items.reverse();

        let count = items.len();
        Ok(BatchGetOutput {
            items,
            unprocessed_keys,
            metrics: OperationMetrics::with_capacity(0.0, Some(served as f64 * 0.5), None, Some(count)),
        })
    }

    fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
        projection: Option<&Projection>,
    ) -> Result<ScanOutput> {
        *self.scan_calls.borrow_mut() += 1;
        let start = exclusive_start_key.as_ref().map(fingerprint).transpose()?;

        self.with_existing(table, |t| {
            let lower = match &start {
                Some(fp) => Bound::Excluded(fp.clone()),
                None => Bound::Unbounded,
            };
            let mut remaining = t.range((lower, Bound::Unbounded));
            let page_size = self.page_size.unwrap_or(usize::MAX);

            let mut items = Vec::new();
            let mut last_key = None;
            for (_, item) in remaining.by_ref().take(page_size) {
                last_key = item.get(KEY).map(|k| Item::from([(KEY.to_string(), k.clone())]));
                items.push(project(item.clone(), projection));
            }
            let more = remaining.next().is_some();

            let count = items.len();
            ScanOutput {
                items,
                last_evaluated_key: if more { last_key } else { None },
                metrics: OperationMetrics::with_capacity(0.0, Some(1.0), None, Some(count)),
            }
        })
    }

    fn put_item(&self, table: &str, item: Item) -> Result<PutItemOutput> {
        let fp = fingerprint(&item)?;
        self.with_existing(table, |t| {
            t.insert(fp, item);
        })?;
        Ok(PutItemOutput {
            metrics: OperationMetrics::with_capacity(0.1, None, Some(1.0), Some(1)),
        })
    }

    fn batch_write_item(&self, table: &str, mut items: Vec<Item>) -> Result<BatchWriteOutput> {
        if items.len() > dynoframe::store::BATCH_WRITE_MAX_ITEMS {
            return Err(Error::Validation(
                "Too many items in the BatchWriteItem request".into(),
            ));
        }
        self.write_calls.borrow_mut().push(items.len());

        let written = self.write_capacity.unwrap_or(items.len()).min(items.len());
        let unprocessed_items = items.split_off(written);
        let entries = items
            .into_iter()
            .map(|i| Ok((fingerprint(&i)?, i)))
            .collect::<Result<Vec<_>>>()?;
        self.with_existing(table, |t| t.extend(entries))?;

        Ok(BatchWriteOutput {
            unprocessed_items,
            metrics: OperationMetrics::with_capacity(0.0, None, Some(written as f64), Some(written)),
        })
    }
}

pub fn utc() -> chrono::FixedOffset {
    chrono::FixedOffset::east_opt(0).expect("zero offset")
}

/// Three rows of mixed types with missing values in most columns.
pub fn mixed_frame() -> Frame {
    let ts = |s: &str| Value::Str(s.to_string());
    Frame::new(vec![
        Column::infer("A", vec!["abc".into(), Value::Null, Value::Float(f64::NAN)]),
        Column::new("B", DType::Int64, vec![2.into(), 3.into(), 4.into()]).unwrap(),
        Column::new(
            "C",
            DType::Timedelta,
            [70_321, 92_000, 256_000]
                .into_iter()
                .map(|s| Value::Duration(TimeDelta::seconds(s)))
                .collect(),
        )
        .unwrap(),
        Column::new(
            "D",
            DType::Datetime,
            vec![ts("2000-01-01"), ts("2000-12-31"), Value::NaT],
        )
        .unwrap(),
        Column::new(
            "E",
            DType::DatetimeTz(utc()),
            vec![ts("2000-01-01"), ts("2000-12-31 23:59:59"), Value::Null],
        )
        .unwrap(),
        Column::new(
            "F",
            DType::NullableInt(IntWidth::I32),
            vec![128.into(), Value::Null, Value::Null],
        )
        .unwrap(),
        Column::new(
            "G",
            DType::Float64,
            vec![std::f64::consts::PI.into(), Value::Null, Value::Null],
        )
        .unwrap(),
        Column::new("id", DType::Int64, vec![0.into(), 1.into(), 2.into()]).unwrap(),
    ])
    .unwrap()
}

pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|r| r[KEY].as_i64().expect("integer id"))
        .collect()
}
