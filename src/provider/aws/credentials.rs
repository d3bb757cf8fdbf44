//! # AWS Account Credentials
//!
//! The `account` object carried in `driver_secrets` (create) or in the
//! `Humanitec-Driver-Account` header (account-only delete).

use crate::driver::error::ValidationError;
use serde_json::Value;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Static AWS credentials
///
/// Wiped from memory when dropped. `Debug` never prints the secret key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AwsCredentials {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &"<redacted>")
            .field(
                "aws_session_token",
                &self.aws_session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            aws_access_key_id: access_key_id.into(),
            aws_secret_access_key: secret_access_key.into(),
            aws_session_token: None,
        }
    }

    /// Read credentials from an account object
    ///
    /// Accepts `aws_access_key_id`/`aws_secret_access_key` and the shorter
    /// `access_key`/`secret_key` spellings. Errors name the offending key and its
    /// JSON type, never its value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `account` is not an object or a key is
    /// missing, empty or not a string.
    pub fn from_account(field: &str, account: &Value) -> Result<Self, ValidationError> {
        let Value::Object(map) = account else {
            return Err(ValidationError::NotAnObject {
                field: field.to_string(),
                found: json_type(account),
            });
        };

        let access_key_id =
            required_string(field, map, &["aws_access_key_id", "access_key"])?;
        let secret_access_key =
            required_string(field, map, &["aws_secret_access_key", "secret_key"])?;
        let session_token = match map.get("aws_session_token") {
            None | Some(Value::Null) => None,
            Some(Value::String(token)) => Some(token.clone()),
            Some(other) => {
                return Err(ValidationError::InvalidField {
                    field: format!("{field}.aws_session_token"),
                    reason: format!("expected string, got {}", json_type(other)),
                })
            }
        };

        Ok(Self {
            aws_access_key_id: access_key_id,
            aws_secret_access_key: secret_access_key,
            aws_session_token: session_token,
        })
    }
}

fn required_string(
    field: &str,
    map: &serde_json::Map<String, Value>,
    keys: &[&str],
) -> Result<String, ValidationError> {
    let primary = keys[0];
    let found = keys.iter().find_map(|key| map.get(*key));
    match found {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ValidationError::InvalidField {
            field: format!("{field}.{primary}"),
            reason: "must not be empty".to_string(),
        }),
        Some(other) => Err(ValidationError::InvalidField {
            field: format!("{field}.{primary}"),
            reason: format!("expected string, got {}", json_type(other)),
        }),
        None => Err(ValidationError::MissingField(format!("{field}.{primary}"))),
    }
}

/// JSON type name used in validation messages
pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
