//! Event store trait

use crate::error::Result;
use crate::pipeline::Stage;
use async_trait::async_trait;
use mongodb::bson::Document;

/// Executes stage sequences against the event collection
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Run `stages` in order and return the resulting documents.
    ///
    /// Either every document is returned or an error; there are no partial
    /// results.
    async fn execute(&self, stages: &[Stage]) -> Result<Vec<Document>>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use mockall::mock;

    mock! {
        pub EventStore {}

        #[async_trait]
        impl EventStore for EventStore {
            async fn execute(&self, stages: &[Stage]) -> Result<Vec<Document>>;
        }
    }
}
