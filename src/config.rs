//! Client and retry configuration.
//!
//! [`AwsConfig`] is forwarded to the AWS SDK without interpretation beyond
//! picking a credential source. [`RetryPolicy`] governs how batch operations
//! resubmit keys and items the store reports as unprocessed.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::{Error, Result};

/// Default region when neither the config nor the environment names one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Connection, region and credential options for the DynamoDB client.
///
/// Credential priority:
/// 1. Hardcoded credentials (access_key, secret_key, session_token)
/// 2. AWS profile from ~/.aws/credentials
/// 3. Default credential chain (env vars, instance profile, etc.)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    pub profile: Option<String>,
    /// Custom endpoint for local testing (DynamoDB Local, localstack, moto).
    pub endpoint_url: Option<String>,
    /// Seconds.
    pub connect_timeout: Option<f64>,
    /// Seconds.
    pub read_timeout: Option<f64>,
    /// SDK-level retry attempts for throttled or failed requests.
    pub max_retries: Option<u32>,
}

impl AwsConfig {
    /// Build from a pass-through option map, e.g. parsed from a settings file.
    pub fn from_options(options: HashMap<String, serde_json::Value>) -> Result<Self> {
        let object = serde_json::Value::Object(options.into_iter().collect());
        serde_json::from_value(object)
            .map_err(|e| Error::domain(format!("invalid client options: {}", e)))
    }

    /// Read region, endpoint and profile from the standard AWS variables.
    pub fn from_env() -> Self {
        Self {
            region: std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .ok(),
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            profile: std::env::var("AWS_PROFILE").ok(),
            ..Self::default()
        }
    }

    /// The region the client will use: config value, then environment, then default.
    pub fn resolved_region(&self) -> String {
        self.region.clone().unwrap_or_else(|| {
            std::env::var("AWS_REGION")
                .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|_| DEFAULT_REGION.to_string())
        })
    }
}

/// How batch operations resubmit unprocessed keys and items.
///
/// An attempt is one store call that processed none of what it was sent. The
/// count resets whenever a call makes any progress, so a throttled table that
/// still accepts part of every request never exhausts the policy. The delay
/// before the next call grows as `base_delay * 2^attempts`, capped at
/// `max_delay`, and with `jitter` is drawn uniformly from `[0, delay]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Calls in a row that may make no progress. `None` retries forever.
    pub max_attempts: Option<u32>,
    #[serde(with = "millis")]
    pub base_delay: Duration,
    #[serde(with = "millis")]
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Retry forever with no delay.
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Bounded retries with no delay.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Self::unbounded()
        }
    }

    /// True once `attempts` consecutive calls without progress exceed the limit.
    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts > max)
    }

    /// Delay before the call following the `attempts`-th consecutive call without progress.
    pub fn delay(&self, attempts: u32) -> Duration {
        if attempts == 0 || self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempts.min(31)).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);
        if self.jitter {
            delay.mul_f64(rand::random::<f64>())
        } else {
            delay
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_options() {
        let options = HashMap::from([
            ("region".to_string(), serde_json::json!("eu-west-1")),
            ("endpoint_url".to_string(), serde_json::json!("http://localhost:8000")),
            ("max_retries".to_string(), serde_json::json!(3)),
        ]);
        let config = AwsConfig::from_options(options).unwrap();
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.max_retries, Some(3));
        assert_eq!(config.resolved_region(), "eu-west-1");
    }

    #[test]
    fn test_from_options_rejects_unknown_keys() {
        let options = HashMap::from([("regoin".to_string(), serde_json::json!("x"))]);
        assert!(matches!(AwsConfig::from_options(options), Err(Error::Domain(_))));
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay(0), Duration::ZERO);
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(20), Duration::from_secs(5));
        assert_eq!(policy.delay(64), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_below_cap() {
        let policy = RetryPolicy::default();
        for attempt in 1..8 {
            assert!(policy.delay(attempt) <= Duration::from_secs(5));
        }
    }

    #[test]
    fn test_exhaustion() {
        assert!(!RetryPolicy::unbounded().exhausted(u32::MAX));
        let policy = RetryPolicy::immediate(2);
        assert!(!policy.exhausted(2));
        assert!(policy.exhausted(3));
        assert_eq!(policy.delay(5), Duration::ZERO);
    }

    #[test]
    fn test_policy_from_json() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_attempts": 4, "base_delay": 10, "jitter": false}"#)
                .unwrap();
        assert_eq!(policy.max_attempts, Some(4));
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_secs(5));
    }
}
