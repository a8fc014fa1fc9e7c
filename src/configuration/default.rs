use std::path::PathBuf;
use std::time::Duration;

use crate::api::esi::DEFAULT_BASE_URL;
use crate::cache::DEFAULT_COOLDOWN_SECONDS;
use crate::configuration::{Configuration, ConfigurationError};
use crate::sync::{DEFAULT_CONCURRENCY, DEFAULT_PERSISTENCE_TIMEOUT};

/// The Forge
pub const DEFAULT_REGION_ID: i32 = 10000002;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DefaultConfiguration;

impl Configuration for DefaultConfiguration {
    fn no_color(&self) -> Result<Option<bool>, ConfigurationError> {
        Ok(None)
    }

    fn base_api_url(&self) -> Result<String, ConfigurationError> {
        Ok(DEFAULT_BASE_URL.to_string())
    }

    fn request_timeout(&self) -> Result<Duration, ConfigurationError> {
        Ok(DEFAULT_REQUEST_TIMEOUT)
    }

    fn region_id(&self) -> Result<i32, ConfigurationError> {
        Ok(DEFAULT_REGION_ID)
    }

    fn items_file(&self) -> Result<Option<PathBuf>, ConfigurationError> {
        Ok(None)
    }

    fn cooldown(&self) -> Result<Duration, ConfigurationError> {
        Ok(Duration::from_secs(DEFAULT_COOLDOWN_SECONDS))
    }

    fn concurrency(&self) -> Result<usize, ConfigurationError> {
        Ok(DEFAULT_CONCURRENCY)
    }

    fn persistence_timeout(&self) -> Result<Duration, ConfigurationError> {
        Ok(DEFAULT_PERSISTENCE_TIMEOUT)
    }
}
