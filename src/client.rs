//! DynamoDB client module.
//!
//! [`DynamoStore`] implements [`StoreClient`] over the AWS SDK. SDK calls are
//! async; each one is driven to completion on a shared tokio runtime, so every
//! method blocks the caller. Do not call these methods from inside an async
//! context.

use aws_config::meta::region::RegionProviderChain;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Credentials;
use aws_sdk_dynamodb::types::{
    ConsumedCapacity, KeysAndAttributes, PutRequest, ReturnConsumedCapacity, WriteRequest,
};
use aws_sdk_dynamodb::Client;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::AwsConfig;
use crate::conversions::Item;
use crate::errors::{map_sdk_error, Error, Result};
use crate::metrics::OperationMetrics;
use crate::store::{
    BatchGetOutput, BatchWriteOutput, Projection, PutItemOutput, ScanOutput, StoreClient,
};

/// Process-wide tokio runtime shared by every client.
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

fn shared_runtime() -> Result<Arc<Runtime>> {
    RUNTIME
        .get_or_try_init(|| {
            Runtime::new()
                .map(Arc::new)
                .map_err(|e| Error::Store(format!("Failed to create tokio runtime: {}", e)))
        })
        .cloned()
}

/// DynamoDB client with flexible credential configuration.
///
/// # Examples
///
/// ```no_run
/// use dynoframe::{AwsConfig, DynamoStore};
///
/// // Use environment variables / default chain
/// let store = DynamoStore::new(&AwsConfig::default())?;
///
/// // Use a local endpoint (DynamoDB Local, localstack)
/// let local = DynamoStore::new(&AwsConfig {
///     endpoint_url: Some("http://localhost:8000".into()),
///     ..AwsConfig::default()
/// })?;
/// # Ok::<(), dynoframe::Error>(())
/// ```
#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    runtime: Arc<Runtime>,
    region: String,
}

impl DynamoStore {
    /// Create a client from the given configuration.
    pub fn new(config: &AwsConfig) -> Result<Self> {
        let runtime = shared_runtime()?;
        let client = runtime.block_on(build_client(config));
        Ok(Self {
            client,
            runtime,
            region: config.resolved_region(),
        })
    }

    /// Wrap an already configured SDK client.
    pub fn from_client(client: Client) -> Result<Self> {
        let region = client
            .config()
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| AwsConfig::default().resolved_region());
        Ok(Self {
            client,
            runtime: shared_runtime()?,
            region,
        })
    }

    /// The configured AWS region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Check the client can reach DynamoDB with a single ListTables call.
    pub fn ping(&self) -> Result<bool> {
        self.runtime
            .block_on(self.client.list_tables().limit(1).send())
            .map(|_| true)
            .map_err(|e| map_sdk_error(e, None))
    }
}

/// Build the AWS SDK DynamoDB client with the given configuration.
async fn build_client(config: &AwsConfig) -> Client {
    // Region priority: param > env var > default
    let region_provider =
        RegionProviderChain::first_try(config.region.clone().map(aws_sdk_dynamodb::config::Region::new))
            .or_default_provider()
            .or_else(crate::config::DEFAULT_REGION);

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

    // Credentials priority: hardcoded > profile > env/default chain
    if let (Some(ak), Some(sk)) = (&config.access_key, &config.secret_key) {
        let creds = Credentials::new(
            ak,
            sk,
            config.session_token.clone(),
            None,
            "dynoframe-hardcoded",
        );
        config_loader = config_loader.credentials_provider(creds);
    } else if let Some(profile_name) = &config.profile {
        let profile_provider = ProfileFileCredentialsProvider::builder()
            .profile_name(profile_name)
            .build();
        config_loader = config_loader.credentials_provider(profile_provider);
    }

    if config.connect_timeout.is_some() || config.read_timeout.is_some() {
        let mut timeouts = TimeoutConfig::builder();
        if let Some(secs) = config.connect_timeout {
            timeouts = timeouts.connect_timeout(Duration::from_secs_f64(secs));
        }
        if let Some(secs) = config.read_timeout {
            timeouts = timeouts.read_timeout(Duration::from_secs_f64(secs));
        }
        config_loader = config_loader.timeout_config(timeouts.build());
    }

    if let Some(attempts) = config.max_retries {
        config_loader =
            config_loader.retry_config(RetryConfig::standard().with_max_attempts(attempts));
    }

    let sdk_config = config_loader.load().await;

    let mut dynamo_config = aws_sdk_dynamodb::config::Builder::from(&sdk_config);

    if let Some(url) = &config.endpoint_url {
        dynamo_config = dynamo_config.endpoint_url(url);
    }

    Client::from_conf(dynamo_config.build())
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn total_capacity(consumed: &[ConsumedCapacity]) -> Option<f64> {
    consumed
        .iter()
        .filter_map(|c| c.capacity_units())
        .reduce(|a, b| a + b)
}

fn non_empty_projection(projection: Option<&Projection>) -> Option<&Projection> {
    projection.filter(|p| !p.is_empty())
}

impl StoreClient for DynamoStore {
    fn get_item(
        &self,
        table: &str,
        key: Item,
        projection: Option<&Projection>,
    ) -> Result<Option<Item>> {
        let mut request = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .return_consumed_capacity(ReturnConsumedCapacity::Total);
        if let Some(p) = non_empty_projection(projection) {
            request = request
                .projection_expression(p.expression())
                .set_expression_attribute_names(Some(p.attribute_names()));
        }

        let start = Instant::now();
        let output = self
            .runtime
            .block_on(request.send())
            .map_err(|e| map_sdk_error(e, Some(table)))?;

        let rcu = output.consumed_capacity().and_then(|c| c.capacity_units());
        debug!(
            table,
            found = output.item.is_some(),
            duration_ms = elapsed_ms(start),
            consumed_rcu = ?rcu,
            "get_item"
        );
        Ok(output.item)
    }

    fn batch_get_item(
        &self,
        table: &str,
        keys: Vec<Item>,
        projection: Option<&Projection>,
    ) -> Result<BatchGetOutput> {
        let mut keys_and_attributes = KeysAndAttributes::builder().set_keys(Some(keys));
        if let Some(p) = non_empty_projection(projection) {
            keys_and_attributes = keys_and_attributes
                .projection_expression(p.expression())
                .set_expression_attribute_names(Some(p.attribute_names()));
        }
        let keys_and_attributes = keys_and_attributes
            .build()
            .map_err(|e| Error::Store(format!("Failed to build batch get request: {}", e)))?;

        let start = Instant::now();
        let mut output = self
            .runtime
            .block_on(
                self.client
                    .batch_get_item()
                    .request_items(table, keys_and_attributes)
                    .return_consumed_capacity(ReturnConsumedCapacity::Total)
                    .send(),
            )
            .map_err(|e| map_sdk_error(e, Some(table)))?;

        let rcu = total_capacity(output.consumed_capacity());
        let items = output
            .responses
            .take()
            .and_then(|mut r| r.remove(table))
            .unwrap_or_default();
        let unprocessed_keys = output
            .unprocessed_keys
            .take()
            .and_then(|mut u| u.remove(table))
            .map(|k| k.keys().to_vec())
            .unwrap_or_default();

        let metrics =
            OperationMetrics::with_capacity(elapsed_ms(start), rcu, None, Some(items.len()));
        Ok(BatchGetOutput {
            items,
            unprocessed_keys,
            metrics,
        })
    }

    fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<Item>,
        projection: Option<&Projection>,
    ) -> Result<ScanOutput> {
        let mut request = self
            .client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(exclusive_start_key)
            .return_consumed_capacity(ReturnConsumedCapacity::Total);
        if let Some(p) = non_empty_projection(projection) {
            request = request
                .projection_expression(p.expression())
                .set_expression_attribute_names(Some(p.attribute_names()));
        }

        let start = Instant::now();
        let output = self
            .runtime
            .block_on(request.send())
            .map_err(|e| map_sdk_error(e, Some(table)))?;

        let rcu = output.consumed_capacity().and_then(|c| c.capacity_units());
        let items = output.items.unwrap_or_default();
        let last_evaluated_key = output.last_evaluated_key.filter(|k| !k.is_empty());
        let metrics =
            OperationMetrics::with_capacity(elapsed_ms(start), rcu, None, Some(items.len()));
        Ok(ScanOutput {
            items,
            last_evaluated_key,
            metrics,
        })
    }

    fn put_item(&self, table: &str, item: Item) -> Result<PutItemOutput> {
        let start = Instant::now();
        let output = self
            .runtime
            .block_on(
                self.client
                    .put_item()
                    .table_name(table)
                    .set_item(Some(item))
                    .return_consumed_capacity(ReturnConsumedCapacity::Total)
                    .send(),
            )
            .map_err(|e| map_sdk_error(e, Some(table)))?;

        let wcu = output.consumed_capacity().and_then(|c| c.capacity_units());
        Ok(PutItemOutput {
            metrics: OperationMetrics::with_capacity(elapsed_ms(start), None, wcu, Some(1)),
        })
    }

    fn batch_write_item(&self, table: &str, items: Vec<Item>) -> Result<BatchWriteOutput> {
        let submitted = items.len();
        let mut requests: Vec<WriteRequest> = Vec::with_capacity(submitted);
        for item in items {
            let put_request = PutRequest::builder()
                .set_item(Some(item))
                .build()
                .map_err(|e| Error::Store(format!("Failed to build put request: {}", e)))?;
            requests.push(WriteRequest::builder().put_request(put_request).build());
        }

        let start = Instant::now();
        let mut output = self
            .runtime
            .block_on(
                self.client
                    .batch_write_item()
                    .request_items(table, requests)
                    .return_consumed_capacity(ReturnConsumedCapacity::Total)
                    .send(),
            )
            .map_err(|e| map_sdk_error(e, Some(table)))?;

        let wcu = total_capacity(output.consumed_capacity());
        let unprocessed_items: Vec<Item> = output
            .unprocessed_items
            .take()
            .and_then(|mut u| u.remove(table))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|request| request.put_request.map(|p| p.item))
            .collect();

        let written = submitted.saturating_sub(unprocessed_items.len());
        Ok(BatchWriteOutput {
            unprocessed_items,
            metrics: OperationMetrics::with_capacity(elapsed_ms(start), None, wcu, Some(written)),
        })
    }
}
