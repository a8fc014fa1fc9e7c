use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::configuration::{positive, Configuration, ConfigurationError};
use crate::display::Display;

use super::ConfigurationDirectoryType;

pub async fn get_directory(dir_type: &ConfigurationDirectoryType) -> Option<PathBuf> {
    let directory = match dir_type {
        ConfigurationDirectoryType::Data => dirs::data_local_dir(),
        ConfigurationDirectoryType::Cache => dirs::cache_dir(),
        ConfigurationDirectoryType::Configuration => dirs::config_dir(),
    };
    directory.map(|mut d| {
        d.push("eve-market-sync");
        d
    })
}

#[derive(Debug, Error)]
pub enum FSConfigurationInitError {
    #[error("Could not load configuration file: {source}")]
    ConfigurationFileLoadingError {
        #[from]
        source: MainConfigurationInitError,
    },
}

pub struct FSConfiguration<T: Configuration> {
    path: Option<PathBuf>,
    cfg: Option<MainConfiguration>,
    default: T,
}

impl<T: Configuration> FSConfiguration<T> {
    pub fn new(cfg_file: Option<PathBuf>, default: T) -> Result<Self, FSConfigurationInitError> {
        let cfg = MainConfiguration::from(cfg_file.clone())?;
        Ok(FSConfiguration {
            path: cfg_file,
            cfg,
            default,
        })
    }

    fn api(&self) -> Option<&APIConfiguration> {
        self.cfg.as_ref().and_then(|cfg| cfg.api.as_ref())
    }

    fn sync(&self) -> Option<&SyncConfiguration> {
        self.cfg.as_ref().and_then(|cfg| cfg.sync.as_ref())
    }

    fn origin(&self, key: &str) -> String {
        let path = self
            .path
            .as_ref()
            .map(|p| p.to_display())
            .unwrap_or_default();
        format!("configuration file '{}' ({})", path, key)
    }
}

impl<T: Configuration> Configuration for FSConfiguration<T> {
    fn no_color(&self) -> Result<Option<bool>, ConfigurationError> {
        self.default.no_color()
    }

    fn base_api_url(&self) -> Result<String, ConfigurationError> {
        if let Some(url) = self.api().and_then(|api| api.base_url.as_ref()) {
            return Ok(url.to_string());
        }
        self.default.base_api_url()
    }

    fn request_timeout(&self) -> Result<Duration, ConfigurationError> {
        if let Some(seconds) = self.api().and_then(|api| api.timeout_seconds) {
            return positive(seconds, &self.origin("api.timeout_seconds")).map(Duration::from_secs);
        }
        self.default.request_timeout()
    }

    fn region_id(&self) -> Result<i32, ConfigurationError> {
        if let Some(region_id) = self.sync().and_then(|sync| sync.region_id) {
            return Ok(region_id);
        }
        self.default.region_id()
    }

    fn items_file(&self) -> Result<Option<PathBuf>, ConfigurationError> {
        if let Some(items_file) = self.sync().and_then(|sync| sync.items_file.as_ref()) {
            return Ok(Some(items_file.clone()));
        }
        self.default.items_file()
    }

    fn cooldown(&self) -> Result<Duration, ConfigurationError> {
        if let Some(seconds) = self.sync().and_then(|sync| sync.cooldown_seconds) {
            return Ok(Duration::from_secs(seconds));
        }
        self.default.cooldown()
    }

    fn concurrency(&self) -> Result<usize, ConfigurationError> {
        if let Some(concurrency) = self.sync().and_then(|sync| sync.concurrency) {
            return positive(concurrency, &self.origin("sync.concurrency"));
        }
        self.default.concurrency()
    }

    fn persistence_timeout(&self) -> Result<Duration, ConfigurationError> {
        if let Some(seconds) = self
            .sync()
            .and_then(|sync| sync.persistence_timeout_seconds)
        {
            return positive(seconds, &self.origin("sync.persistence_timeout_seconds"))
                .map(Duration::from_secs);
        }
        self.default.persistence_timeout()
    }
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct MainConfiguration {
    pub api: Option<APIConfiguration>,
    pub sync: Option<SyncConfiguration>,
}

#[derive(Debug, Error)]
pub enum MainConfigurationInitError {
    #[error("Check existence of configuration file ({path}): {source}")]
    ExistenceCheck {
        path: String,
        source: std::io::Error,
    },
    #[error("Read configuration file ({path}): {source}")]
    ReadConfigurationFile {
        path: String,
        source: std::io::Error,
    },
    #[error("Could not deserialize configuration file ({path}): {source}")]
    ConfigurationFileDeserialization {
        path: String,
        source: toml::de::Error,
    },
}

impl MainConfiguration {
    fn from(path: Option<PathBuf>) -> Result<Option<Self>, MainConfigurationInitError> {
        let path = match &path {
            Some(path) => path,
            None => return Ok(None),
        };
        let exists = path
            .try_exists()
            .map_err(|e| MainConfigurationInitError::ExistenceCheck {
                path: path.to_display(),
                source: e,
            })?;
        if !exists {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            MainConfigurationInitError::ReadConfigurationFile {
                path: path.to_display(),
                source: e,
            }
        })?;
        let result: MainConfiguration = toml::from_str(&content).map_err(|e| {
            MainConfigurationInitError::ConfigurationFileDeserialization {
                path: path.to_display(),
                source: e,
            }
        })?;
        Ok(Some(result))
    }
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct APIConfiguration {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct SyncConfiguration {
    pub region_id: Option<i32>,
    pub items_file: Option<PathBuf>,
    pub cooldown_seconds: Option<u64>,
    pub concurrency: Option<usize>,
    pub persistence_timeout_seconds: Option<u64>,
}
