//! Error types for dynoframe.
//!
//! Maps AWS SDK errors to [`Error`] variants.
//! Uses typed `SdkError` variant matching, not string parsing of debug output.

use aws_sdk_dynamodb::error::SdkError;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure dynoframe can report.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrong input shape given to a conversion or table function.
    #[error("type error: {0}")]
    Type(String),

    /// Semantically invalid request.
    #[error("{0}")]
    Domain(String),

    /// A value could not be converted to or from its wire representation.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store kept reporting unprocessed keys or items past the retry limit.
    #[error("{pending} requests still unprocessed after {attempts} attempts")]
    RetriesExhausted { pending: usize, attempts: u32 },

    #[error("{0}")]
    ResourceNotFound(String),

    #[error("{0}")]
    ResourceInUse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    ConditionalCheckFailed(String),

    #[error("{0}")]
    ProvisionedThroughputExceeded(String),

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Credentials(String),

    #[error("{0}")]
    Connection(String),

    /// Any other store-side failure.
    #[error("{0}")]
    Store(String),
}

impl Error {
    /// Shorthand for [`Error::Type`].
    pub fn type_error(msg: impl Into<String>) -> Self {
        Error::Type(msg.into())
    }

    /// Shorthand for [`Error::Domain`].
    pub fn domain(msg: impl Into<String>) -> Self {
        Error::Domain(msg.into())
    }

    /// Shorthand for [`Error::Serialization`].
    pub fn serialization(msg: impl Into<String>) -> Self {
        Error::Serialization(msg.into())
    }

    /// True for errors raised by the store or the connection to it.
    pub fn is_store_error(&self) -> bool {
        !matches!(
            self,
            Error::Type(_)
                | Error::Domain(_)
                | Error::Serialization(_)
                | Error::RetriesExhausted { .. }
        )
    }
}

// ========== TYPED ERROR MAPPING ==========

/// Map non-service `SdkError` variants (dispatch failures, timeouts, etc.).
///
/// Returns `Some(Error)` for non-service errors, `None` for `ServiceError`.
fn map_outer_sdk_error<E, R>(err: &SdkError<E, R>) -> Option<Error>
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    match err {
        SdkError::DispatchFailure(dispatch) => {
            if dispatch.is_timeout() {
                Some(Error::Connection(
                    "Connection timed out to DynamoDB. Check your network or endpoint.".into(),
                ))
            } else if dispatch.is_io() {
                Some(Error::Connection(
                    "Connection failed to DynamoDB (I/O error). Check if the endpoint is reachable."
                        .into(),
                ))
            } else {
                Some(Error::Connection(
                    "Connection failed to DynamoDB. Check if the endpoint is reachable.".into(),
                ))
            }
        }
        SdkError::TimeoutError(_) => Some(Error::Connection(
            "Connection timed out to DynamoDB. Check your network or endpoint.".into(),
        )),
        SdkError::ConstructionFailure(err) => {
            let msg = format!("{:?}", err);
            if msg.contains("credentials")
                || msg.contains("Credentials")
                || msg.contains("NoCredentialsError")
            {
                Some(Error::Credentials(
                    "No AWS credentials found. Configure credentials via environment variables \
                    (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY), AWS profile, or IAM role."
                        .into(),
                ))
            } else {
                Some(Error::Store(format!("Failed to build request: {}", msg)))
            }
        }
        SdkError::ResponseError(err) => Some(Error::Store(format!(
            "Invalid response from DynamoDB: {:?}",
            err
        ))),
        SdkError::ServiceError(_) => None,
        _ => Some(Error::Store(format!(
            "Unknown error from DynamoDB: {:?}",
            err
        ))),
    }
}

/// Map a DynamoDB service error code + message to an [`Error`].
fn map_dynamodb_code(
    code: Option<&str>,
    message: Option<&str>,
    display: &str,
    table: Option<&str>,
) -> Error {
    match code {
        Some("UnrecognizedClientException") => {
            Error::Credentials("Invalid AWS credentials. Check your access key and secret.".into())
        }
        Some("ExpiredTokenException") | Some("ExpiredToken") => Error::Credentials(
            "AWS credentials have expired. Refresh your session token.".into(),
        ),
        Some("AccessDeniedException") => Error::AccessDenied(format!(
            "Access denied to DynamoDB: {}",
            message.unwrap_or("Check your IAM permissions.")
        )),
        Some("ProvisionedThroughputExceededException")
        | Some("LimitExceededException")
        | Some("RequestLimitExceeded")
        | Some("ThrottlingException") => Error::ProvisionedThroughputExceeded(
            "DynamoDB request rate too high. Try again with exponential backoff.".into(),
        ),
        Some("ResourceNotFoundException") => {
            let msg = if let Some(t) = table {
                format!("Table '{}' not found", t)
            } else {
                "Resource not found".to_string()
            };
            Error::ResourceNotFound(msg)
        }
        Some("ResourceInUseException") => {
            let msg = if let Some(t) = table {
                format!("Table '{}' is in use", t)
            } else {
                "Resource already in use".to_string()
            };
            Error::ResourceInUse(msg)
        }
        Some("ValidationException") => Error::Validation(message.unwrap_or(display).to_string()),
        Some("ConditionalCheckFailedException") => Error::ConditionalCheckFailed(
            "The condition expression evaluated to false".into(),
        ),
        Some("ItemCollectionSizeLimitExceededException") => {
            Error::Validation("Item collection size limit exceeded".into())
        }
        _ => Error::Store(message.unwrap_or(display).to_string()),
    }
}

/// Map DynamoDB errors using typed `SdkError` variants.
///
/// For `ServiceError`, uses `ProvideErrorMetadata` to get the error code and message
/// instead of parsing debug strings.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>, table: Option<&str>) -> Error
where
    E: aws_sdk_dynamodb::error::ProvideErrorMetadata + std::fmt::Debug + std::fmt::Display,
    R: std::fmt::Debug,
{
    if let Some(mapped) = map_outer_sdk_error(&err) {
        return mapped;
    }

    if let Some(service_err) = err.as_service_error() {
        let meta = aws_sdk_dynamodb::error::ProvideErrorMetadata::meta(service_err);
        let display = service_err.to_string();
        return map_dynamodb_code(meta.code(), meta.message(), &display, table);
    }

    Error::Store(format!("Unexpected DynamoDB error: {:?}", err))
}
