use mongodb::Database;
use mongodb::bson::doc;

use crate::common::{DatabaseError, DatabaseResult};

/// `ping` command against `db`; needs no listDatabases privilege
pub(crate) async fn ping(db: &Database) -> mongodb::error::Result<()> {
    db.run_command(doc! { "ping": 1 }).await.map(|_| ())
}

/// Readiness probe for the database the service reads from
pub async fn check_health(db: &Database) -> DatabaseResult<()> {
    ping(db)
        .await
        .map_err(|e| DatabaseError::HealthCheckFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::Client;

    #[tokio::test]
    #[ignore] // Requires actual MongoDB
    async fn test_check_health() {
        let client = Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap();
        assert!(check_health(&client.database("test")).await.is_ok());
    }
}
