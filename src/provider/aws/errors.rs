//! # AWS Error Classification
//!
//! Maps SDK failures from S3 and ElastiCache onto [`ProviderError`] so the
//! engine knows what to retry. Both SDKs share the smithy `SdkError` type.

use crate::provider::ProviderError;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Error codes meaning the credentials were rejected
const AUTH_CODES: &[&str] = &[
    "InvalidAccessKeyId",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
    "SignatureDoesNotMatch",
    "AccessDenied",
    "AccessDeniedException",
    "AuthFailure",
    "ExpiredToken",
    "InvalidToken",
    "TokenRefreshRequired",
];

/// Error codes worth retrying
const TRANSIENT_CODES: &[&str] = &[
    "SlowDown",
    "RequestTimeout",
    "RequestTimeTooSkewed",
    "InternalError",
    "ServiceUnavailable",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorClass {
    Auth,
    Transient,
    Permanent,
}

/// Classify a service error by its code, falling back to the HTTP status
pub(crate) fn classify_code(code: Option<&str>, status: Option<u16>) -> ErrorClass {
    if let Some(code) = code {
        if AUTH_CODES.contains(&code) {
            return ErrorClass::Auth;
        }
        if TRANSIENT_CODES.contains(&code) {
            return ErrorClass::Transient;
        }
    }
    match status {
        Some(429 | 500..=599) => ErrorClass::Transient,
        Some(401) => ErrorClass::Auth,
        _ => ErrorClass::Permanent,
    }
}

/// HTTP status of the raw response, if one was received
pub(crate) fn status_of<E>(err: &SdkError<E, HttpResponse>) -> Option<u16> {
    err.raw_response().map(|response| response.status().as_u16())
}

/// Classify any SDK failure for `operation` on `target` (bucket or cluster id)
pub(crate) fn classify<E>(operation: &str, target: &str, err: &SdkError<E, HttpResponse>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match err {
        // A user error is a request the client could not build or send as configured
        SdkError::DispatchFailure(failure) if failure.is_user() => ProviderError::Permanent(
            format!("{operation} {target}: {}", DisplayErrorContext(err)),
        ),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ProviderError::Transient(format!(
                "{operation} {target}: {}",
                DisplayErrorContext(err)
            ))
        }
        SdkError::ServiceError(_) => {
            let code = err.code();
            let message = format!(
                "{operation} {target}: {}: {}",
                code.unwrap_or("unknown error"),
                err.message().unwrap_or("no message")
            );
            match classify_code(code, status_of(err)) {
                ErrorClass::Auth => ProviderError::Auth(message),
                ErrorClass::Transient => ProviderError::Transient(message),
                ErrorClass::Permanent => ProviderError::Permanent(message),
            }
        }
        _ => ProviderError::Permanent(format!(
            "{operation} {target}: {}",
            DisplayErrorContext(err)
        )),
    }
}
