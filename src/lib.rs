//! S3 Bucket Driver Library
//!
//! A stateless HTTP resource driver that provisions and deprovisions S3 buckets
//! and single-node ElastiCache Redis clusters. The driver keeps no state between
//! requests: the bucket name or cluster id is derived from `driver_params`, and delete requests carry params and credentials in
//! `Humanitec-Driver-*` headers.
//!
//! ## Quick Start
//!
//! ```rust
//! use bucket_driver::prelude::*;
//! ```

pub mod config;
pub mod constants;
pub mod driver;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod server;
