use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction};
use thiserror::Error;

use crate::display::Display;
use crate::logging;

pub mod history;
pub mod orders;
pub mod schema;

pub static DATABASE_FILE: &str = "market.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("open database '{path}': {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },
    #[error("initialize database schema: {source}")]
    Schema { source: rusqlite::Error },
    #[error("begin transaction: {source}")]
    BeginTransaction { source: rusqlite::Error },
    #[error("commit transaction: {source}")]
    Commit { source: rusqlite::Error },
    #[error("{operation}: {source}")]
    Query {
        operation: String,
        source: rusqlite::Error,
    },
    #[error("database connection is unusable after a panic in another task")]
    Poisoned,
    #[error("persistence did not complete within {timeout:?}")]
    Timeout { timeout: Duration },
    #[error("persistence task failed: {source}")]
    Task { source: tokio::task::JoinError },
}

pub(crate) fn query_error(
    operation: &str,
) -> impl FnOnce(rusqlite::Error) -> PersistenceError + '_ {
    move |source| PersistenceError::Query {
        operation: operation.to_string(),
        source,
    }
}

/// Relational storage of live orders and daily history.
///
/// All access goes through one connection; writers are serialized by the mutex and each
/// call to [`MarketStore::transaction`] commits atomically or not at all.
#[derive(Clone)]
pub struct MarketStore {
    connection: Arc<Mutex<Connection>>,
}

impl MarketStore {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        logging::debug!("Opening database: {}", path.to_display());
        let connection = Connection::open(path).map_err(|source| PersistenceError::Open {
            path: path.to_display(),
            source,
        })?;
        Self::init(connection)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let connection = Connection::open_in_memory().map_err(|source| PersistenceError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::init(connection)
    }

    fn init(connection: Connection) -> Result<Self, PersistenceError> {
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(|source| PersistenceError::Schema { source })?;
        schema::create_tables(&connection).map_err(|source| PersistenceError::Schema { source })?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.connection
            .lock()
            .map_err(|_| PersistenceError::Poisoned)
    }

    /// Runs `operation` inside a transaction. Any error rolls every write of the call back.
    pub fn transaction<T>(
        &self,
        operation: impl FnOnce(&Transaction) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let mut connection = self.lock()?;
        let transaction = connection
            .transaction()
            .map_err(|source| PersistenceError::BeginTransaction { source })?;
        let result = operation(&transaction)?;
        transaction
            .commit()
            .map_err(|source| PersistenceError::Commit { source })?;
        Ok(result)
    }

    pub fn read<T>(
        &self,
        operation: impl FnOnce(&Connection) -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        let connection = self.lock()?;
        operation(&connection)
    }
}
