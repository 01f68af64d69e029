//! Connection management for MongoDB
//!
//! Builds the client and database handle that back [`MongoStore`]:
//! - URI parsing into client options
//! - Timeout and application name settings
//! - A ping to verify the server is reachable

use mongodb::bson::doc;
use mongodb::{Client, Database, options::ClientOptions};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result, describe_mongodb_error};
use crate::executor::MongoStore;

/// Application name reported when none is configured
pub const DEFAULT_APP_NAME: &str = "mongo-query-exec";

/// MongoDB connection manager
pub struct ConnectionManager {
    /// MongoDB client instance
    client: Option<Client>,

    /// Connection configuration
    config: ConnectionConfig,
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// # Arguments
    /// * `config` - Connection configuration
    ///
    /// # Returns
    /// * `Self` - New connection manager instance
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            client: None,
            config,
        }
    }

    /// Establish connection to MongoDB
    ///
    /// Parses the URI, builds the client and pings the configured database.
    ///
    /// # Returns
    /// * `Result<()>` - Success or connection error
    pub async fn connect(&mut self) -> Result<()> {
        let options = self.client_options().await?;
        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(describe_mongodb_error(&e)))?;

        debug!("Pinging database '{}'", self.config.database);
        client
            .database(&self.config.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError::ConnectionFailed(describe_mongodb_error(&e)))?;

        info!("Connected to MongoDB database '{}'", self.config.database);
        self.client = Some(client);
        Ok(())
    }

    /// Get the configured database handle
    ///
    /// # Returns
    /// * `Result<Database>` - Database handle or error when not connected
    pub fn get_database(&self) -> Result<Database> {
        Ok(self.get_client()?.database(&self.config.database))
    }

    /// Get the MongoDB client
    ///
    /// # Returns
    /// * `Result<&Client>` - Reference to client or error
    pub fn get_client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ConnectionError::ConnectionFailed("not connected".to_string()).into())
    }

    /// Build a store over the configured database
    pub fn store(&self) -> Result<MongoStore> {
        Ok(MongoStore::new(self.get_database()?))
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Parse the connection URI and apply configured settings
    ///
    /// # Returns
    /// * `Result<ClientOptions>` - Parsed client options or error
    async fn client_options(&self) -> Result<ClientOptions> {
        let mut options = ClientOptions::parse(&self.config.uri)
            .await
            .map_err(|e| ConnectionError::InvalidUri(describe_mongodb_error(&e)))?;

        let timeout = Duration::from_secs(self.config.timeout);
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.app_name = Some(
            self.config
                .app_name
                .clone()
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
        );

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;

    #[test]
    fn test_new_manager_is_disconnected() {
        let manager = ConnectionManager::new(ConnectionConfig::default());
        assert!(!manager.is_connected());
        assert!(matches!(
            manager.get_database(),
            Err(QueryError::Connection(ConnectionError::ConnectionFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_client_options_apply_settings() {
        let config = ConnectionConfig {
            timeout: 5,
            app_name: Some("reports".to_string()),
            ..ConnectionConfig::default()
        };
        let options = ConnectionManager::new(config).client_options().await.unwrap();
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.server_selection_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.app_name.as_deref(), Some("reports"));
    }

    #[tokio::test]
    async fn test_invalid_uri() {
        let config = ConnectionConfig {
            uri: "not-a-uri".to_string(),
            ..ConnectionConfig::default()
        };
        let err = ConnectionManager::new(config).connect().await.unwrap_err();
        assert!(matches!(
            err,
            QueryError::Connection(ConnectionError::InvalidUri(_))
        ));
    }
}
