//! # Resource Definition
//!
//! Parses and validates the JSON document posted to `POST /`:
//!
//! ```json
//! {
//!   "id": "r1",
//!   "type": "s3",
//!   "resource_params": {},
//!   "driver_params": { "region": "eu-west-1" },
//!   "driver_secrets": { "account": { "aws_access_key_id": "...", "aws_secret_access_key": "..." } }
//! }
//! ```
//!
//! `type` is `s3` (bucket) or `redis` (single-node ElastiCache cluster, which
//! also needs `cache_node_type` and `cache_az` in `driver_params`).
//!
//! The loosely typed input is mapped to a tagged [`Backend`] at this boundary, so
//! unknown types never reach the provisioning layer. Parsing has no side effects.

use crate::driver::error::{DriverError, ValidationError};
use crate::provider::aws::credentials::json_type;
use crate::provider::aws::AwsCredentials;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static VALID_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]+[a-z0-9]$")
        .expect("Failed to compile resource id pattern - this should never happen")
});

static VALID_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]?)?-[a-z]+-[0-9]{1,2}$")
        .expect("Failed to compile region pattern - this should never happen")
});

/// Bucket name prefixes S3 reserves for its own features
const RESERVED_BUCKET_PREFIXES: &[&str] = &["xn--", "sthree-", "amzn-s3-demo-"];

/// Bucket name suffixes S3 reserves for access points and directory buckets
const RESERVED_BUCKET_SUFFIXES: &[&str] = &["-s3alias", "--ol-s3", ".mrap", "--x-s3", "--table-s3"];

/// Resource types this driver can provision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    S3,
    Redis,
}

impl ResourceType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::S3 => "s3",
            ResourceType::Redis => "redis",
        }
    }

    fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "s3" => Ok(ResourceType::S3),
            "redis" => Ok(ResourceType::Redis),
            other => Err(ValidationError::UnsupportedType(other.to_string())),
        }
    }
}

/// Backend-specific, validated view of `driver_params` + `driver_secrets`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    S3 {
        params: S3DriverParams,
        account: AwsCredentials,
    },
    Redis {
        params: RedisDriverParams,
        account: AwsCredentials,
    },
}

impl Backend {
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Backend::S3 { .. } => ResourceType::S3,
            Backend::Redis { .. } => ResourceType::Redis,
        }
    }
}

/// Identity-relevant fields of the S3 `driver_params`
///
/// Other keys are allowed and still take part in identity derivation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct S3DriverParams {
    /// Target region; the configured default applies when absent
    pub region: Option<String>,
    /// Explicit bucket name; overrides the derived name
    pub bucket: Option<String>,
}

impl S3DriverParams {
    /// Read the identity-relevant keys of `driver_params`
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidField`] for a non-string or empty
    /// `region`, or a `bucket` that is not a valid S3 bucket name.
    pub fn from_map(driver_params: &Map<String, Value>) -> Result<Self, ValidationError> {
        let region = optional_region(driver_params)?;
        let bucket = optional_string(driver_params, "bucket")?;
        if let Some(name) = &bucket {
            validate_bucket_name(name).map_err(|reason| ValidationError::InvalidField {
                field: "driver_params.bucket".to_string(),
                reason,
            })?;
        }
        Ok(Self { region, bucket })
    }
}

/// `driver_params` of the `redis` type
///
/// Other keys are allowed and still take part in identity derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisDriverParams {
    /// Target region; the configured default applies when absent
    pub region: Option<String>,
    /// ElastiCache node type, e.g. `cache.t3.micro`
    pub cache_node_type: String,
    /// Preferred availability zone of the single node, e.g. `eu-west-1a`
    pub cache_az: String,
}

impl RedisDriverParams {
    /// Keys that mark a set of `driver_params` as belonging to a cache cluster
    pub const MARKER_KEYS: [&'static str; 2] = ["cache_node_type", "cache_az"];

    /// Read and check the Redis keys of `driver_params`
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when a key is missing, empty, not a string or
    /// malformed.
    pub fn from_map(driver_params: &Map<String, Value>) -> Result<Self, ValidationError> {
        let region = optional_region(driver_params)?;
        let cache_node_type = optional_string(driver_params, "cache_node_type")?
            .ok_or_else(|| ValidationError::MissingField("driver_params.cache_node_type".into()))?;
        if !cache_node_type.starts_with("cache.") {
            return Err(ValidationError::InvalidField {
                field: "driver_params.cache_node_type".to_string(),
                reason: format!("expected a node type like cache.t3.micro, got \"{cache_node_type}\""),
            });
        }
        let cache_az = optional_string(driver_params, "cache_az")?
            .ok_or_else(|| ValidationError::MissingField("driver_params.cache_az".into()))?;
        Ok(Self {
            region,
            cache_node_type,
            cache_az,
        })
    }

    /// Whether `driver_params` describe a cache cluster rather than a bucket
    #[must_use]
    pub fn describes_cache_cluster(driver_params: &Map<String, Value>) -> bool {
        Self::MARKER_KEYS
            .iter()
            .any(|key| driver_params.contains_key(*key))
    }
}

/// A validated resource definition
///
/// Owned by one request; nothing here outlives it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub id: String,
    pub resource_params: Map<String, Value>,
    /// Kept verbatim; identity is derived from it
    pub driver_params: Map<String, Value>,
    pub backend: Backend,
}

impl ResourceDefinition {
    /// Parse a request body
    ///
    /// # Errors
    ///
    /// [`DriverError::MalformedBody`] when the body is not JSON,
    /// [`DriverError::Validation`] when it is JSON but not a valid definition.
    pub fn from_slice(body: &[u8]) -> Result<Self, DriverError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| DriverError::MalformedBody(format!("expected a JSON document: {e}")))?;
        Ok(Self::from_value(value)?)
    }

    /// Validate an already decoded document
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found. `id` and `type` are checked
    /// before anything else.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let mut doc = match value {
            Value::Object(doc) => doc,
            other => {
                return Err(ValidationError::NotAnObject {
                    field: "resource definition".to_string(),
                    found: json_type(&other),
                })
            }
        };

        let id = required_string(&doc, "id")?;
        validate_id(&id)?;
        let resource_type = ResourceType::parse(&required_string(&doc, "type")?)?;

        let resource_params = optional_object(&mut doc, "resource_params")?;
        let driver_params = optional_object(&mut doc, "driver_params")?;
        let driver_secrets = optional_object(&mut doc, "driver_secrets")?;

        let backend = match resource_type {
            ResourceType::S3 => Backend::S3 {
                params: S3DriverParams::from_map(&driver_params)?,
                account: account_from_secrets(&driver_secrets)?,
            },
            ResourceType::Redis => Backend::Redis {
                params: RedisDriverParams::from_map(&driver_params)?,
                account: account_from_secrets(&driver_secrets)?,
            },
        };

        Ok(Self {
            id,
            resource_params,
            driver_params,
            backend,
        })
    }

    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.backend.resource_type()
    }
}

/// Check a resource id against the accepted pattern
///
/// # Errors
///
/// Returns [`ValidationError::InvalidId`].
pub fn validate_id(id: &str) -> Result<(), ValidationError> {
    if VALID_ID.is_match(id) {
        Ok(())
    } else {
        Err(ValidationError::InvalidId(id.to_string()))
    }
}

/// Check an AWS region name such as `eu-west-1` or `us-gov-west-1`
///
/// # Errors
///
/// Returns a human-readable reason.
pub fn validate_region(region: &str) -> Result<(), String> {
    if VALID_REGION.is_match(region) {
        Ok(())
    } else {
        Err(format!("\"{region}\" is not an AWS region name"))
    }
}

/// Whether `name` starts with a prefix S3 reserves
#[must_use]
pub fn has_reserved_bucket_prefix(name: &str) -> bool {
    RESERVED_BUCKET_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Check S3 bucket naming rules
///
/// 3-63 characters of lowercase letters, digits, dots and hyphens, starting and
/// ending with a letter or digit, no `..`, not formatted as an IPv4 address, and
/// without a reserved prefix or suffix.
///
/// # Errors
///
/// Returns a human-readable reason.
pub fn validate_bucket_name(name: &str) -> Result<(), String> {
    if !(3..=63).contains(&name.len()) {
        return Err(format!(
            "bucket name must be 3 to 63 characters, got {}",
            name.len()
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err("bucket name may only contain lowercase letters, digits, '.' and '-'".into());
    }
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err("bucket name must start and end with a letter or digit".into());
    }
    if name.contains("..") {
        return Err("bucket name must not contain '..'".into());
    }
    if name.split('.').count() == 4 && name.split('.').all(|p| p.parse::<u8>().is_ok()) {
        return Err("bucket name must not be formatted as an IP address".into());
    }
    if has_reserved_bucket_prefix(name) {
        return Err(format!(
            "bucket name must not start with any of {RESERVED_BUCKET_PREFIXES:?}"
        ));
    }
    if RESERVED_BUCKET_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
    {
        return Err(format!(
            "bucket name must not end with any of {RESERVED_BUCKET_SUFFIXES:?}"
        ));
    }
    Ok(())
}

fn account_from_secrets(driver_secrets: &Map<String, Value>) -> Result<AwsCredentials, ValidationError> {
    let account = driver_secrets
        .get("account")
        .ok_or_else(|| ValidationError::MissingField("driver_secrets.account".to_string()))?;
    AwsCredentials::from_account("driver_secrets.account", account)
}

fn optional_region(driver_params: &Map<String, Value>) -> Result<Option<String>, ValidationError> {
    let region = optional_string(driver_params, "region")?;
    if let Some(region) = &region {
        validate_region(region).map_err(|reason| ValidationError::InvalidField {
            field: "driver_params.region".to_string(),
            reason,
        })?;
    }
    Ok(region)
}

fn required_string(doc: &Map<String, Value>, key: &str) -> Result<String, ValidationError> {
    match doc.get(key) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(key.to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(ValidationError::MissingField(key.to_string()))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::InvalidField {
            field: key.to_string(),
            reason: format!("expected string, got {}", json_type(other)),
        }),
    }
}

fn optional_string(map: &Map<String, Value>, key: &str) -> Result<Option<String>, ValidationError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationError::InvalidField {
            field: format!("driver_params.{key}"),
            reason: "must not be empty".to_string(),
        }),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ValidationError::InvalidField {
            field: format!("driver_params.{key}"),
            reason: format!("expected string, got {}", json_type(other)),
        }),
    }
}

/// Take an object-valued key; absent or null means empty
fn optional_object(
    doc: &mut Map<String, Value>,
    key: &str,
) -> Result<Map<String, Value>, ValidationError> {
    match doc.remove(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(ValidationError::NotAnObject {
            field: key.to_string(),
            found: json_type(&other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_doc() -> Value {
        json!({
            "id": "test-resource-1a2b",
            "type": "s3",
            "resource_params": {},
            "driver_params": {"region": "eu-west-1"},
            "driver_secrets": {
                "account": {
                    "aws_access_key_id": "AWS_ACCESS_KEY_ID-value",
                    "aws_secret_access_key": "AWS_SECRET_ACCESS_KEY-value"
                }
            }
        })
    }

    #[test]
    fn test_parses_valid_definition() {
        let def = ResourceDefinition::from_value(valid_doc()).unwrap();
        assert_eq!(def.id, "test-resource-1a2b");
        assert_eq!(def.resource_type(), ResourceType::S3);
        assert_eq!(def.driver_params.get("region"), Some(&json!("eu-west-1")));
        let Backend::S3 { params, account } = &def.backend else {
            panic!("expected an s3 backend, got {:?}", def.backend);
        };
        assert_eq!(params.region.as_deref(), Some("eu-west-1"));
        assert_eq!(params.bucket, None);
        assert_eq!(account.aws_access_key_id, "AWS_ACCESS_KEY_ID-value");
    }

    #[test]
    fn test_missing_or_empty_id_and_type() {
        for (key, replacement) in [
            ("id", Value::Null),
            ("id", json!("")),
            ("type", Value::Null),
            ("type", json!("  ")),
        ] {
            let mut doc = valid_doc();
            doc[key] = replacement;
            assert_eq!(
                ResourceDefinition::from_value(doc).unwrap_err(),
                ValidationError::MissingField(key.to_string())
            );
        }

        let mut doc = valid_doc();
        doc.as_object_mut().unwrap().remove("type");
        assert_eq!(
            ResourceDefinition::from_value(doc).unwrap_err(),
            ValidationError::MissingField("type".to_string())
        );
    }

    #[test]
    fn test_id_pattern() {
        for bad in ["UPPER", "ab", "-leading", "trailing-", "under_score"] {
            let mut doc = valid_doc();
            doc["id"] = json!(bad);
            assert_eq!(
                ResourceDefinition::from_value(doc).unwrap_err(),
                ValidationError::InvalidId(bad.to_string()),
                "id {bad} should be rejected"
            );
        }
        assert!(validate_id("r1x").is_ok());
    }

    #[test]
    fn test_unsupported_type() {
        let mut doc = valid_doc();
        doc["type"] = json!("postgres");
        assert_eq!(
            ResourceDefinition::from_value(doc).unwrap_err(),
            ValidationError::UnsupportedType("postgres".to_string())
        );
    }

    #[test]
    fn test_params_and_secrets_must_be_objects() {
        for key in ["resource_params", "driver_params", "driver_secrets"] {
            let mut doc = valid_doc();
            doc[key] = json!(["not", "an", "object"]);
            assert_eq!(
                ResourceDefinition::from_value(doc).unwrap_err(),
                ValidationError::NotAnObject {
                    field: key.to_string(),
                    found: "array"
                }
            );
        }
    }

    #[test]
    fn test_account_required() {
        let mut doc = valid_doc();
        doc["driver_secrets"] = json!({});
        assert_eq!(
            ResourceDefinition::from_value(doc).unwrap_err(),
            ValidationError::MissingField("driver_secrets.account".to_string())
        );
    }

    #[test]
    fn test_absent_params_default_to_empty() {
        let mut doc = valid_doc();
        let obj = doc.as_object_mut().unwrap();
        obj.remove("resource_params");
        obj.remove("driver_params");
        let def = ResourceDefinition::from_value(doc).unwrap();
        assert!(def.resource_params.is_empty());
        assert!(def.driver_params.is_empty());
    }

    #[test]
    fn test_region_and_bucket_shapes() {
        let mut doc = valid_doc();
        doc["driver_params"] = json!({"region": 5});
        assert!(matches!(
            ResourceDefinition::from_value(doc).unwrap_err(),
            ValidationError::InvalidField { ref field, .. } if field == "driver_params.region"
        ));

        for region in ["not-a-region", "EU-WEST-1", "eu-west", "eu-west-1 "] {
            let mut doc = valid_doc();
            doc["driver_params"] = json!({"region": region});
            assert!(
                matches!(
                    ResourceDefinition::from_value(doc).unwrap_err(),
                    ValidationError::InvalidField { ref field, .. } if field == "driver_params.region"
                ),
                "region {region:?} should be rejected"
            );
        }

        let mut doc = valid_doc();
        doc["driver_params"] = json!({"region": "eu-west-1", "bucket": "Not_Valid"});
        assert!(matches!(
            ResourceDefinition::from_value(doc).unwrap_err(),
            ValidationError::InvalidField { ref field, .. } if field == "driver_params.bucket"
        ));
    }

    #[test]
    fn test_malformed_body() {
        let err = ResourceDefinition::from_slice(b"{not json").unwrap_err();
        assert!(matches!(err, DriverError::MalformedBody(_)));

        let err = ResourceDefinition::from_slice(b"[1, 2]").unwrap_err();
        assert!(matches!(
            err,
            DriverError::Validation(ValidationError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_bucket_name_rules() {
        assert!(validate_bucket_name("my-bucket.logs").is_ok());
        assert!(validate_bucket_name("hd-0123456789abcdef01234567").is_ok());
        let too_long = "a".repeat(64);
        for bad in ["ab", "UPPER", "-start", "end-", "a..b", "192.168.1.1", too_long.as_str()] {
            assert!(validate_bucket_name(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_reserved_bucket_names() {
        for bad in [
            "xn--abc",
            "sthree-logs",
            "amzn-s3-demo-bucket",
            "assets-s3alias",
            "assets--ol-s3",
            "assets.mrap",
            "assets--x-s3",
            "assets--table-s3",
        ] {
            assert!(validate_bucket_name(bad).is_err(), "{bad} should be rejected");
        }
        assert!(validate_bucket_name("xn-abc").is_ok());
        assert!(validate_bucket_name("s3alias-assets").is_ok());

        let mut doc = valid_doc();
        doc["driver_params"] = json!({"bucket": "xn--abc"});
        assert!(matches!(
            ResourceDefinition::from_value(doc).unwrap_err(),
            ValidationError::InvalidField { ref field, .. } if field == "driver_params.bucket"
        ));
    }

    #[test]
    fn test_region_names() {
        for good in ["eu-west-1", "us-east-1", "ap-southeast-2", "us-gov-west-1", "cn-north-1", "us-isob-east-1"] {
            assert!(validate_region(good).is_ok(), "{good} should be accepted");
        }
        for bad in ["", "not-a-region", "euwest1", "eu-west-1a", "eu_west_1"] {
            assert!(validate_region(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    fn redis_doc() -> Value {
        let mut doc = valid_doc();
        doc["type"] = json!("redis");
        doc["driver_params"] = json!({
            "region": "eu-west-1",
            "cache_node_type": "cache.t3.micro",
            "cache_az": "eu-west-1a"
        });
        doc
    }

    #[test]
    fn test_parses_redis_definition() {
        let def = ResourceDefinition::from_value(redis_doc()).unwrap();
        assert_eq!(def.resource_type(), ResourceType::Redis);
        let Backend::Redis { params, account } = &def.backend else {
            panic!("expected a redis backend, got {:?}", def.backend);
        };
        assert_eq!(
            params,
            &RedisDriverParams {
                region: Some("eu-west-1".into()),
                cache_node_type: "cache.t3.micro".into(),
                cache_az: "eu-west-1a".into(),
            }
        );
        assert_eq!(account.aws_access_key_id, "AWS_ACCESS_KEY_ID-value");
        assert!(RedisDriverParams::describes_cache_cluster(&def.driver_params));
    }

    #[test]
    fn test_redis_params_required() {
        for key in ["cache_node_type", "cache_az"] {
            let mut doc = redis_doc();
            doc["driver_params"].as_object_mut().unwrap().remove(key);
            assert_eq!(
                ResourceDefinition::from_value(doc).unwrap_err(),
                ValidationError::MissingField(format!("driver_params.{key}"))
            );
        }

        let mut doc = redis_doc();
        doc["driver_params"]["cache_node_type"] = json!("t3.micro");
        assert!(matches!(
            ResourceDefinition::from_value(doc).unwrap_err(),
            ValidationError::InvalidField { ref field, .. } if field == "driver_params.cache_node_type"
        ));

        let mut doc = redis_doc();
        doc["driver_secrets"] = json!({});
        assert_eq!(
            ResourceDefinition::from_value(doc).unwrap_err(),
            ValidationError::MissingField("driver_secrets.account".to_string())
        );
    }
}
