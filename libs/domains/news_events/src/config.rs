//! Query service settings

use crate::pipeline::LimitPlacement;
use core_config::{ConfigError, FromEnv, env_or_default, env_parse};
use std::env;
use std::path::PathBuf;

/// News event query configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewsEventsConfig {
    /// Collection holding the event documents
    pub collection: String,
    pub limit_placement: LimitPlacement,
    /// Taxonomy file to load instead of the bundled CAMEO table
    pub taxonomy_path: Option<PathBuf>,
}

impl Default for NewsEventsConfig {
    fn default() -> Self {
        Self {
            collection: "events".to_string(),
            limit_placement: LimitPlacement::default(),
            taxonomy_path: None,
        }
    }
}

impl FromEnv for NewsEventsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let collection = env_or_default("EVENTS_COLLECTION", "events");

        let limit_placement = env_parse("QUERY_LIMIT_PLACEMENT", LimitPlacement::default())?;

        let taxonomy_path = env::var("TAXONOMY_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            collection,
            limit_placement,
            taxonomy_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars_unset(
            ["EVENTS_COLLECTION", "QUERY_LIMIT_PLACEMENT", "TAXONOMY_PATH"],
            || {
                let config = NewsEventsConfig::from_env().unwrap();
                assert_eq!(config, NewsEventsConfig::default());
            },
        );
    }

    #[test]
    fn test_overrides() {
        temp_env::with_vars(
            [
                ("EVENTS_COLLECTION", Some("gdelt_events")),
                ("QUERY_LIMIT_PLACEMENT", Some("after_match")),
                ("TAXONOMY_PATH", Some("/etc/news/cameo.tsv")),
            ],
            || {
                let config = NewsEventsConfig::from_env().unwrap();
                assert_eq!(config.collection, "gdelt_events");
                assert_eq!(config.limit_placement, LimitPlacement::AfterMatch);
                assert_eq!(
                    config.taxonomy_path,
                    Some(PathBuf::from("/etc/news/cameo.tsv"))
                );
            },
        );
    }

    #[test]
    fn test_unknown_limit_placement_is_rejected() {
        temp_env::with_var("QUERY_LIMIT_PLACEMENT", Some("sometimes"), || {
            let err = NewsEventsConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("QUERY_LIMIT_PLACEMENT"));
        });
    }
}
