//! Delete request headers
//!
//! DELETE carries no body. The caller sends either
//!
//! - `Humanitec-Driver-Secrets` (with `account` inside) and optionally
//!   `Humanitec-Driver-Params`, or
//! - `Humanitec-Driver-Account` with the bare credential object, optionally
//!   with `Humanitec-Driver-Params`.
//!
//! Without params the identity falls back to `{"region": DEFAULT_REGION}`.

use crate::constants::{HEADER_DRIVER_ACCOUNT, HEADER_DRIVER_PARAMS, HEADER_DRIVER_SECRETS};
use crate::driver::codec::{self, CodecError};
use crate::driver::error::{DriverError, ValidationError};
use crate::driver::identity::IdentityDeriver;
use crate::provider::aws::AwsCredentials;
use axum::http::HeaderMap;
use serde_json::{Map, Value};

/// Everything a delete needs, decoded from headers
#[derive(Debug)]
pub struct DeleteRequest {
    pub driver_params: Map<String, Value>,
    pub credentials: AwsCredentials,
}

/// Decode the delete headers
///
/// # Errors
///
/// [`DriverError::MissingHeader`] when no credentials were sent,
/// [`DriverError::ConflictingHeaders`] when both credential headers were sent,
/// [`DriverError::Codec`] for undecodable values and
/// [`DriverError::Validation`] for decodable values of the wrong shape.
pub fn decode_delete_headers(
    headers: &HeaderMap,
    deriver: &IdentityDeriver,
) -> Result<DeleteRequest, DriverError> {
    let params = header(headers, HEADER_DRIVER_PARAMS);
    let secrets = header(headers, HEADER_DRIVER_SECRETS);
    let account = header(headers, HEADER_DRIVER_ACCOUNT);

    let credentials = match (secrets, account) {
        (Some(_), Some(_)) => {
            return Err(DriverError::ConflictingHeaders(
                HEADER_DRIVER_SECRETS,
                HEADER_DRIVER_ACCOUNT,
            ))
        }
        (Some(token), None) => {
            let secrets = codec::decode_object(&token).map_err(codec_error(HEADER_DRIVER_SECRETS))?;
            let account = secrets.get("account").ok_or_else(|| {
                ValidationError::MissingField("driver_secrets.account".to_string())
            })?;
            AwsCredentials::from_account("driver_secrets.account", account)?
        }
        (None, Some(token)) => {
            let account: Value = codec::decode(&token).map_err(codec_error(HEADER_DRIVER_ACCOUNT))?;
            AwsCredentials::from_account("account", &account)?
        }
        (None, None) => return Err(DriverError::MissingHeader(HEADER_DRIVER_SECRETS)),
    };

    let driver_params = match params {
        Some(token) => codec::decode_object(&token).map_err(codec_error(HEADER_DRIVER_PARAMS))?,
        None => deriver.account_only_params(),
    };

    Ok(DeleteRequest {
        driver_params,
        credentials,
    })
}

/// Header value as text; non-UTF-8 bytes are replaced and then fail base64 decoding
fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}

fn codec_error(header: &'static str) -> impl Fn(CodecError) -> DriverError {
    move |source| DriverError::Codec { header, source }
}
