//! MongoDB connection management for the services in this workspace
//!
//! Configuration comes from the environment through `core_config::FromEnv`;
//! startup connections are retried with exponential backoff.
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::common::RetryConfig;
//! use database::mongodb::{MongoConfig, connect_from_config_with_retry};
//!
//! let config = MongoConfig::from_env()?;
//! let retry = RetryConfig::new().with_max_retries(5);
//! let client = connect_from_config_with_retry(&config, Some(retry)).await?;
//! let db = client.database(config.database());
//! ```

pub mod common;
pub mod mongodb;

pub use common::{DatabaseError, DatabaseResult};
