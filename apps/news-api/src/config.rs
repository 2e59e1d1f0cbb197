use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use database::mongodb::MongoConfig;
use domain_news_events::NewsEventsConfig;

pub use core_config::Environment;

/// Application configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub mongodb: MongoConfig,
    pub news: NewsEventsConfig,
    pub server: ServerConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let mongodb = MongoConfig::from_env()?;
        let news = NewsEventsConfig::from_env()?;
        let server = ServerConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            mongodb,
            news,
            server,
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_news_events::LimitPlacement;

    #[test]
    fn test_config_composes_components() {
        temp_env::with_vars(
            [
                ("MONGODB_URL", Some("mongodb://localhost:27017")),
                ("MONGODB_DATABASE", Some("gdelt")),
                ("EVENTS_COLLECTION", Some("gdelt_events")),
                ("QUERY_LIMIT_PLACEMENT", Some("after_match")),
                ("PORT", Some("8081")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.app.name, "news_api");
                assert_eq!(config.mongodb.database(), "gdelt");
                assert_eq!(config.news.collection, "gdelt_events");
                assert_eq!(config.news.limit_placement, LimitPlacement::AfterMatch);
                assert_eq!(config.server.port, 8081);
            },
        );
    }

    #[test]
    fn test_config_requires_mongodb() {
        temp_env::with_vars_unset(
            ["MONGODB_URL", "MONGO_URL", "MONGODB_DATABASE", "MONGO_DATABASE"],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("MONGODB_URL"));
            },
        );
    }
}
