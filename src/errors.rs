use colored::{ColoredString, Colorize};
use thiserror::Error;

use crate::api::esi::EsiClientInitError;
use crate::configuration::{ConfigurationError, ConfigurationInitializationError, FSRessourcesError};
use crate::filesystem::{DirectoryCreationError, ItemUniverseError};
use crate::logging::StdoutError;
use crate::store::PersistenceError;
use crate::sync::aggregation::AggregationError;

pub trait Advice {
    fn advice(&self) -> Option<ColoredString>;
}

#[derive(Debug, Error)]
pub enum MarketSyncError {
    #[error(transparent)]
    FSRessourcesError(#[from] FSRessourcesError),
    #[error(transparent)]
    EnvironmentError(#[from] EnvironmentError),
    #[error(transparent)]
    DirectoryCreationError(#[from] DirectoryCreationError),
    #[error(transparent)]
    ConfigurationInitializationError(#[from] ConfigurationInitializationError),
    #[error(transparent)]
    ItemUniverseError(#[from] ItemUniverseError),
    #[error(transparent)]
    EsiClientInitError(#[from] EsiClientInitError),
    #[error(transparent)]
    PersistenceError(#[from] PersistenceError),
    #[error(transparent)]
    AggregationError(#[from] AggregationError),
    #[error(transparent)]
    StdoutError(#[from] StdoutError),
}

impl Advice for MarketSyncError {
    fn advice(&self) -> Option<ColoredString> {
        match self {
            MarketSyncError::EnvironmentError(EnvironmentError::NoItemSelected) => Some(
                "Select items with '--item <ID>', '--items-file <PATH>' or the 'items_file' entry of the [sync] configuration section."
                    .dimmed(),
            ),
            MarketSyncError::EnvironmentError(EnvironmentError::ConfigurationOptionLoading {
                ..
            }) => Some(
                "Check the 'EVEMARKETSYNC_*' environment variables and the configuration file."
                    .dimmed(),
            ),
            MarketSyncError::PersistenceError(PersistenceError::Open { .. }) => Some(
                "Another process may hold the market database, or '--data-directory' is not writable."
                    .dimmed(),
            ),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("Cache directory unknown")]
    CacheDirectoryUnknown,
    #[error("Data directory unknown")]
    DataDirectoryUnknown,
    #[error("Could not load configuration '{option_name}': {source}")]
    ConfigurationOptionLoading {
        option_name: String,
        source: ConfigurationError,
    },
    #[error("No item to work on")]
    NoItemSelected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advice_for_missing_items() {
        let err = MarketSyncError::from(EnvironmentError::NoItemSelected);
        assert!(err.advice().is_some());
        assert_eq!(err.to_string(), "No item to work on");
    }

    #[test]
    fn test_no_advice_by_default() {
        let err = MarketSyncError::from(EnvironmentError::DataDirectoryUnknown);
        assert!(err.advice().is_none());
    }
}
