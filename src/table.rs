//! Table access: records and frames in, records and frames out.
//!
//! [`TableAccess`] ties a [`StoreClient`] to the record codec and the batching
//! engine. Every method blocks until the store has answered.

use tracing::info;

use crate::basic_operations::{get_item, put_item, scan_all};
use crate::batch_operations::{batch_get, batch_write};
use crate::client::DynamoStore;
use crate::config::{AwsConfig, RetryPolicy};
use crate::errors::{Error, Result};
use crate::frame::{DTypeMap, Frame};
use crate::metrics::OperationMetrics;
use crate::records::{items_to_records, records_to_wire};
use crate::store::{Projection, PutItemOutput, StoreClient};
use crate::value::{Record, Value};

/// Build single-attribute keys from one attribute name and its values.
///
/// ```
/// let keys = dynoframe::keys_from_column("id", [1, 2, 3]);
/// assert_eq!(keys.len(), 3);
/// assert_eq!(keys[2]["id"], dynoframe::Value::Int(3));
/// ```
pub fn keys_from_column<N, I>(name: N, values: I) -> Vec<Record>
where
    N: Into<String>,
    I: IntoIterator,
    I::Item: Into<Value>,
{
    let name = name.into();
    values
        .into_iter()
        .map(|v| Record::from([(name.clone(), v.into())]))
        .collect()
}

/// Build keys from `(attribute, values)` pairs.
///
/// Only partition-key tables are supported, so exactly one pair is accepted;
/// anything else is a domain error.
pub fn keys<I, N, V>(columns: I) -> Result<Vec<Record>>
where
    I: IntoIterator<Item = (N, V)>,
    N: Into<String>,
    V: IntoIterator,
    V::Item: Into<Value>,
{
    let mut columns = columns.into_iter();
    let (name, values) = columns
        .next()
        .ok_or_else(|| Error::domain("A key attribute (partition key) is required."))?;
    if columns.next().is_some() {
        return Err(Error::domain(
            "Only one key attribute (partition key) is supported.",
        ));
    }
    Ok(keys_from_column(name, values))
}

fn projection(attributes: Option<&[&str]>) -> Option<Projection> {
    attributes.map(|a| Projection::new(a.iter().copied()))
}

/// Reads and writes against DynamoDB tables.
pub struct TableAccess<S> {
    store: S,
    retry_policy: RetryPolicy,
}

impl TableAccess<DynamoStore> {
    /// Connect to DynamoDB with the given client options.
    pub fn connect(config: &AwsConfig) -> Result<Self> {
        Ok(Self::new(DynamoStore::new(config)?))
    }
}

impl<S: StoreClient> TableAccess<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replace the policy used to resubmit unprocessed keys and items.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Get a single item. `None` if the key does not exist in the table.
    pub fn get_item(&self, table: &str, key: &Record) -> Result<Option<Record>> {
        get_item(&self.store, table, key, None)
    }

    /// Get multiple items, in key order. Keys not in the table are skipped.
    ///
    /// With `attributes`, only those attributes are requested per item.
    pub fn get_items(
        &self,
        table: &str,
        keys: &[Record],
        attributes: Option<&[&str]>,
    ) -> Result<Vec<Record>> {
        let wire_keys = records_to_wire(keys)?;
        let projection = projection(attributes);
        let items = batch_get(
            &self.store,
            table,
            wire_keys,
            projection.as_ref(),
            &self.retry_policy,
        )?;
        info!(table, requested = keys.len(), found = items.len(), "get_items");
        items_to_records(items)
    }

    /// Get every item in a table with a full scan.
    pub fn get_all_items(&self, table: &str, attributes: Option<&[&str]>) -> Result<Vec<Record>> {
        let projection = projection(attributes);
        let items = scan_all(&self.store, table, projection.as_ref())?;
        items_to_records(items)
    }

    /// Add or replace a single item.
    ///
    /// With `return_response`, the store's response is returned for diagnostics.
    pub fn put_item(
        &self,
        table: &str,
        record: &Record,
        return_response: bool,
    ) -> Result<Option<PutItemOutput>> {
        let output = put_item(&self.store, table, record)?;
        Ok(return_response.then_some(output))
    }

    /// Add or replace multiple items.
    pub fn put_items(&self, table: &str, records: &[Record]) -> Result<OperationMetrics> {
        let items = records_to_wire(records)?;
        batch_write(&self.store, table, items, &self.retry_policy)
    }

    /// Read items into a frame: the given keys if any, otherwise the whole table.
    ///
    /// `dtypes` re-types the named columns after inference.
    pub fn get_frame(
        &self,
        table: &str,
        keys: Option<&[Record]>,
        attributes: Option<&[&str]>,
        dtypes: Option<&DTypeMap>,
    ) -> Result<Frame> {
        let records = match keys {
            Some(keys) => self.get_items(table, keys, attributes)?,
            None => self.get_all_items(table, attributes)?,
        };
        match dtypes {
            Some(dtypes) => Frame::from_records_with_dtypes(&records, dtypes),
            None => Ok(Frame::from_records(&records)),
        }
    }

    /// Write every row of a frame as an item.
    pub fn put_frame(&self, table: &str, frame: &Frame) -> Result<OperationMetrics> {
        self.put_items(table, &frame.to_records())
    }
}
