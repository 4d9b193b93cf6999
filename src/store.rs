//! The store client seam.
//!
//! [`StoreClient`] is the set of primitives the batching engine and table
//! functions need from DynamoDB. [`DynamoStore`](crate::client::DynamoStore)
//! implements it over the AWS SDK; tests implement it in memory.
//!
//! Calls block until the store responds. Implementations honor DynamoDB's
//! per-call limits and may report part of a batch as unprocessed.

use std::collections::HashMap;

use crate::conversions::Item;
use crate::errors::Result;
use crate::metrics::OperationMetrics;

/// Maximum keys per BatchGetItem request (DynamoDB limit).
pub const BATCH_GET_MAX_KEYS: usize = 100;

/// Maximum items per BatchWriteItem request (DynamoDB limit).
pub const BATCH_WRITE_MAX_ITEMS: usize = 25;

/// Attribute projection for reads.
///
/// Renders as a `ProjectionExpression` of `#p0, #p1, …` placeholders plus the
/// matching `ExpressionAttributeNames`, so reserved words are safe to project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    attributes: Vec<String>,
}

impl Projection {
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    pub fn expression(&self) -> String {
        (0..self.attributes.len())
            .map(|i| format!("#p{}", i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn attribute_names(&self) -> HashMap<String, String> {
        self.attributes
            .iter()
            .enumerate()
            .map(|(i, name)| (format!("#p{}", i), name.clone()))
            .collect()
    }

    /// Keep only the projected attributes of an item.
    pub fn apply(&self, mut item: Item) -> Item {
        item.retain(|name, _| self.contains(name));
        item
    }
}

/// Result of one BatchGetItem call against a single table.
#[derive(Debug, Clone, Default)]
pub struct BatchGetOutput {
    pub items: Vec<Item>,
    pub unprocessed_keys: Vec<Item>,
    pub metrics: OperationMetrics,
}

/// One page of a Scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub items: Vec<Item>,
    /// `LastEvaluatedKey`; `None` once the scan is complete.
    pub last_evaluated_key: Option<Item>,
    pub metrics: OperationMetrics,
}

/// Diagnostics from a PutItem call.
#[derive(Debug, Clone, Default)]
pub struct PutItemOutput {
    pub metrics: OperationMetrics,
}

/// Result of one BatchWriteItem call against a single table.
#[derive(Debug, Clone, Default)]
pub struct BatchWriteOutput {
    /// Items of the request the store did not write.
    pub unprocessed_items: Vec<Item>,
    pub metrics: OperationMetrics,
}

/// Blocking DynamoDB primitives used by dynoframe.
pub trait StoreClient {
    fn get_item(
        &self,
        table: &str,
        key: Item,
        projection: Option<&Projection>,
    ) -> Result<Option<Item>>;

    /// At most [`BATCH_GET_MAX_KEYS`] keys per call.
    fn batch_get_item(
        &self,
        table: &str,
        keys: Vec<Item>,
        projection: Option<&Projection>,
    ) -> Result<BatchGetOutput>;

    fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
        projection: Option<&Projection>,
    ) -> Result<ScanOutput>;

    fn put_item(&self, table: &str, item: Item) -> Result<PutItemOutput>;

    /// At most [`BATCH_WRITE_MAX_ITEMS`] items per call.
    fn batch_write_item(&self, table: &str, items: Vec<Item>) -> Result<BatchWriteOutput>;
}

impl<S: StoreClient + ?Sized> StoreClient for &S {
    fn get_item(
        &self,
        table: &str,
        key: Item,
        projection: Option<&Projection>,
    ) -> Result<Option<Item>> {
        (**self).get_item(table, key, projection)
    }

    fn batch_get_item(
        &self,
        table: &str,
        keys: Vec<Item>,
        projection: Option<&Projection>,
    ) -> Result<BatchGetOutput> {
        (**self).batch_get_item(table, keys, projection)
    }

    fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
        projection: Option<&Projection>,
    ) -> Result<ScanOutput> {
        (**self).scan(table, exclusive_start_key, projection)
    }

    fn put_item(&self, table: &str, item: Item) -> Result<PutItemOutput> {
        (**self).put_item(table, item)
    }

    fn batch_write_item(&self, table: &str, items: Vec<Item>) -> Result<BatchWriteOutput> {
        (**self).batch_write_item(table, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;

    #[test]
    fn test_projection_placeholders() {
        let projection = Projection::new(["id", "name"]);
        assert_eq!(projection.expression(), "#p0, #p1");
        assert_eq!(projection.attribute_names()["#p1"], "name");
    }

    #[test]
    fn test_projection_apply() {
        let item = Item::from([
            ("id".to_string(), AttributeValue::N("1".into())),
            ("secret".to_string(), AttributeValue::S("x".into())),
        ]);
        let projected = Projection::new(["id"]).apply(item);
        assert_eq!(projected.len(), 1);
        assert!(projected.contains_key("id"));
    }
}
