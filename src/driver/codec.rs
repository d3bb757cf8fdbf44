//! # Secret/Param Codec
//!
//! Transport encoding for structured values carried in HTTP headers:
//! base64 of the UTF-8 JSON serialization.
//!
//! DELETE requests carry no body, so `driver_params` and `driver_secrets` (or the
//! bare account credentials) travel as `Humanitec-Driver-*` headers in this form.
//!
//! Encoding always emits standard padded base64. Decoding also accepts unpadded
//! and URL-safe input, since callers build these headers with whatever base64
//! helper their platform ships.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Error decoding or encoding a transport token
///
/// Messages describe the shape problem only; the offending input may be a
/// secret and is never included.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("value is not valid base64")]
    InvalidBase64(#[source] base64::DecodeError),
    #[error("decoded value is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("decoded JSON is not an object")]
    NotAnObject,
    #[error("value could not be serialized to JSON: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Encode a value as base64(JSON(value))
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] if `value` has no JSON representation
/// (for example a map with non-string keys).
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_vec(value).map_err(CodecError::Serialize)?;
    Ok(STANDARD.encode(json))
}

/// Decode base64(JSON(value)) into `T`
///
/// # Errors
///
/// Returns [`CodecError::InvalidBase64`] or [`CodecError::InvalidJson`].
pub fn decode<T: DeserializeOwned>(token: &str) -> Result<T, CodecError> {
    let bytes = decode_base64(token)?;
    serde_json::from_slice(&bytes).map_err(CodecError::InvalidJson)
}

/// Decode a token that must hold a JSON object
///
/// # Errors
///
/// As [`decode`], plus [`CodecError::NotAnObject`] for arrays, strings, numbers and null.
pub fn decode_object(token: &str) -> Result<Map<String, Value>, CodecError> {
    match decode::<Value>(token)? {
        Value::Object(map) => Ok(map),
        _ => Err(CodecError::NotAnObject),
    }
}

fn decode_base64(token: &str) -> Result<Vec<u8>, CodecError> {
    let token = token.trim();
    LENIENT_STANDARD
        .decode(token)
        .or_else(|standard_err| {
            LENIENT_URL_SAFE
                .decode(token)
                .map_err(|_url_safe_err| standard_err)
        })
        .map_err(CodecError::InvalidBase64)
}
