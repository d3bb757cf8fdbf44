//! # Driver Errors
//!
//! Error taxonomy shared by the parser, codec, engine and HTTP surface.
//!
//! - `Validation` / `MalformedBody`: caller input rejected before any provider call
//! - `Codec` / header errors: delete headers could not be decoded
//! - `Auth`: the provider rejected the supplied credentials (never retried)
//! - `Provision`: the provider failed; transient failures were already retried
//!
//! Messages are returned to callers verbatim, so they never contain secret values.

use crate::driver::codec::CodecError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Rejected caller input
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("\"{0}\" is required")]
    MissingField(String),
    #[error("\"id\" must match ^[a-z0-9][a-z0-9-]+[a-z0-9]$, got \"{0}\"")]
    InvalidId(String),
    #[error("Type \"{0}\" not supported by this driver.")]
    UnsupportedType(String),
    #[error("\"{field}\" must be a JSON object, got {found}")]
    NotAnObject { field: String, found: &'static str },
    #[error("\"{field}\": {reason}")]
    InvalidField { field: String, reason: String },
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("malformed request body: {0}")]
    MalformedBody(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("malformed HTTP header \"{header}\": {source}")]
    Codec {
        header: &'static str,
        #[source]
        source: CodecError,
    },
    #[error("missing HTTP header: expected \"{0}\"")]
    MissingHeader(&'static str),
    #[error("conflicting HTTP headers: send either \"{0}\" or \"{1}\", not both")]
    ConflictingHeaders(&'static str, &'static str),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("credentials rejected by provider: {0}")]
    Auth(String),
    #[error("provisioning failed: {0}")]
    Provision(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DriverError {
    /// Short class name used as a metrics label
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            DriverError::MalformedBody(_) | DriverError::Validation(_) => "validation",
            DriverError::Codec { .. }
            | DriverError::MissingHeader(_)
            | DriverError::ConflictingHeaders(..) => "codec",
            DriverError::NotFound(_) => "not_found",
            DriverError::Auth(_) => "auth",
            DriverError::Provision(_) => "provision",
            DriverError::Internal(_) => "internal",
        }
    }
}

impl From<ProviderError> for DriverError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Auth(msg) => DriverError::Auth(msg),
            ProviderError::Transient(msg) | ProviderError::Permanent(msg) => {
                DriverError::Provision(msg)
            }
        }
    }
}
