use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::configuration::{positive, Configuration, ConfigurationError};

use super::ConfigurationDirectoryType;

#[derive(Debug, Error, PartialEq)]
#[error("Could not read value of environment variable {name}: {source}")]
pub struct UnreadableVarError {
    name: String,
    source: env::VarError,
}

fn var(name: &str) -> Result<Option<String>, UnreadableVarError> {
    match std::env::var(name) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(UnreadableVarError {
            name: name.to_string(),
            source: e,
        }),
    }
}

fn with_prefix(base_name: &str) -> String {
    format!("EVEMARKETSYNC_{}", base_name)
}

fn parsed_var<T: FromStr>(
    base_name: &str,
    expected: &str,
) -> Result<Option<T>, ConfigurationError> {
    let var_name = with_prefix(base_name);
    match var(&var_name)? {
        None => Ok(None),
        Some(val) => match val.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigurationError::InvalidValueError {
                got: val,
                expected: expected.to_string(),
                origin: format!("env var '{}'", var_name),
            }),
        },
    }
}

fn seconds_var(base_name: &str) -> Result<Option<Duration>, ConfigurationError> {
    let seconds: Option<u64> = parsed_var(base_name, "number of seconds")?;
    Ok(seconds.map(Duration::from_secs))
}

pub fn get_directory(
    dir_type: &ConfigurationDirectoryType,
) -> Result<Option<PathBuf>, UnreadableVarError> {
    let dir = match dir_type {
        ConfigurationDirectoryType::Data => var(&with_prefix("DATA_DIR"))?,
        ConfigurationDirectoryType::Cache => var(&with_prefix("CACHE_DIR"))?,
        ConfigurationDirectoryType::Configuration => match var(&with_prefix("CONFIG"))? {
            Some(cfg_file) => Path::new(&cfg_file)
                .parent()
                .and_then(|parent_path| parent_path.to_str().map(|p| p.to_string())),
            None => None,
        },
    };
    Ok(dir.map(PathBuf::from))
}

pub fn get_config_file() -> Result<Option<PathBuf>, UnreadableVarError> {
    if let Some(cfg_file) = var(&with_prefix("CONFIG"))? {
        return Ok(Some(PathBuf::from(cfg_file)));
    }
    Ok(None)
}

pub struct EnvironmentVariablesConfiguration<T: Configuration> {
    default: T,
}

impl<T: Configuration> EnvironmentVariablesConfiguration<T> {
    pub fn new(default: T) -> Self {
        EnvironmentVariablesConfiguration { default }
    }
}

impl<T: Configuration> Configuration for EnvironmentVariablesConfiguration<T> {
    fn no_color(&self) -> Result<Option<bool>, ConfigurationError> {
        let var_name = with_prefix("NO_COLOR");
        if let Some(val) = var(&var_name)? {
            let no_color = if val == "1" {
                true
            } else if val == "0" {
                false
            } else {
                return Err(ConfigurationError::InvalidValueError {
                    got: val,
                    expected: "[0,1]".to_string(),
                    origin: format!("env var '{}'", var_name),
                });
            };
            return Ok(Some(no_color));
        }
        self.default.no_color()
    }

    fn base_api_url(&self) -> Result<String, ConfigurationError> {
        if let Some(base_api_url) = var(&with_prefix("BASE_API_URL"))? {
            return Ok(base_api_url);
        }
        self.default.base_api_url()
    }

    fn request_timeout(&self) -> Result<Duration, ConfigurationError> {
        if let Some(timeout) = seconds_var("REQUEST_TIMEOUT")? {
            return positive(timeout.as_secs(), &with_prefix("REQUEST_TIMEOUT"))
                .map(Duration::from_secs);
        }
        self.default.request_timeout()
    }

    fn region_id(&self) -> Result<i32, ConfigurationError> {
        if let Some(region_id) = parsed_var("REGION_ID", "region id")? {
            return Ok(region_id);
        }
        self.default.region_id()
    }

    fn items_file(&self) -> Result<Option<PathBuf>, ConfigurationError> {
        if let Some(items_file) = var(&with_prefix("ITEMS_FILE"))? {
            return Ok(Some(PathBuf::from(items_file)));
        }
        self.default.items_file()
    }

    fn cooldown(&self) -> Result<Duration, ConfigurationError> {
        if let Some(cooldown) = seconds_var("COOLDOWN")? {
            return Ok(cooldown);
        }
        self.default.cooldown()
    }

    fn concurrency(&self) -> Result<usize, ConfigurationError> {
        if let Some(concurrency) = parsed_var("CONCURRENCY", "positive number")? {
            return positive(concurrency, &with_prefix("CONCURRENCY"));
        }
        self.default.concurrency()
    }

    fn persistence_timeout(&self) -> Result<Duration, ConfigurationError> {
        if let Some(timeout) = seconds_var("PERSISTENCE_TIMEOUT")? {
            return positive(timeout.as_secs(), &with_prefix("PERSISTENCE_TIMEOUT"))
                .map(Duration::from_secs);
        }
        self.default.persistence_timeout()
    }
}
