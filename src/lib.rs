pub mod config;
pub mod db;
pub mod delivery;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use delivery::resolver::RoutedDistanceProvider;

pub use config::Config;
pub use error::{AppError, AppResult};

pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub distance_provider: Arc<dyn RoutedDistanceProvider>,
}

// sea-orm's `mock` feature removes the `Clone` derive from
// `DatabaseConnection` even though every variant enabled here is clonable,
// so clone the connection by matching variants instead of deriving.
impl Clone for AppState {
    fn clone(&self) -> Self {
        let db = match &self.db {
            DatabaseConnection::SqlxPostgresPoolConnection(conn) => {
                DatabaseConnection::SqlxPostgresPoolConnection(conn.clone())
            }
            DatabaseConnection::MockDatabaseConnection(conn) => {
                DatabaseConnection::MockDatabaseConnection(Arc::clone(conn))
            }
            DatabaseConnection::Disconnected => DatabaseConnection::Disconnected,
        };
        Self {
            db,
            config: self.config.clone(),
            distance_provider: Arc::clone(&self.distance_provider),
        }
    }
}
