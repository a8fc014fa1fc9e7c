use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::configuration::cli::{Args, CLIConfiguration};
use crate::configuration::default::DefaultConfiguration;
use crate::configuration::env::EnvironmentVariablesConfiguration;
use crate::configuration::files::FSConfiguration;

pub mod cli;

pub mod env;

pub mod files;

pub mod default;

pub static CONFIGURATION_FILE: &str = "eve-market-sync.toml";

#[derive(Clone, Debug)]
pub enum ConfigurationDirectoryType {
    Data,
    Cache,
    Configuration,
}

impl std::fmt::Display for ConfigurationDirectoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfigurationDirectoryType::Data => "Data",
            ConfigurationDirectoryType::Cache => "Cache",
            ConfigurationDirectoryType::Configuration => "Configuration",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Error)]
pub enum ConfigurationInitializationError {
    #[error(transparent)]
    SystemError {
        #[from]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

pub async fn get(args: &Args) -> Result<impl Configuration, ConfigurationInitializationError> {
    let cfg_file = get_config_file(args)
        .await
        .map_err(Arc::from)
        .map_err(|e| ConfigurationInitializationError::SystemError { source: e })?;
    let cfg = FSConfiguration::new(cfg_file, DefaultConfiguration)
        .map_err(Arc::from)
        .map_err(|e| ConfigurationInitializationError::SystemError { source: e })?;
    let env_var_cfg = EnvironmentVariablesConfiguration::new(cfg);
    Ok(CLIConfiguration::new(args, env_var_cfg))
}

#[derive(Debug, Error)]
pub enum FSRessourcesError {
    #[error(transparent)]
    EnvVarError {
        #[from]
        source: env::UnreadableVarError,
    },
}

pub async fn get_config_file(args: &Args) -> Result<Option<PathBuf>, FSRessourcesError> {
    if let Some(cfg_path) = args.config.clone() {
        return Ok(Some(cfg_path));
    } else if let Some(cfg_path) = env::get_config_file()? {
        return Ok(Some(cfg_path));
    } else if let Some(mut cfg_dir) =
        files::get_directory(&ConfigurationDirectoryType::Configuration).await
    {
        cfg_dir.push(CONFIGURATION_FILE);
        return Ok(Some(cfg_dir));
    }
    Ok(None)
}

pub async fn get_directory(
    dir_type: ConfigurationDirectoryType,
    args: &Args,
) -> Result<Option<PathBuf>, FSRessourcesError> {
    let dir = if let Some(dir) = cli::get_directory(args, &dir_type) {
        Some(dir)
    } else if let Some(dir) = env::get_directory(&dir_type)? {
        Some(dir)
    } else {
        files::get_directory(&dir_type).await
    };
    Ok(dir)
}

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error(transparent)]
    EnvVarError(#[from] env::UnreadableVarError),
    #[error("value '{got}' is not valid ('{expected}') - loaded from {origin}")]
    InvalidValueError {
        got: String,
        expected: String,
        origin: String,
    },
}

/// Checks a value read from `origin` is strictly positive.
pub(crate) fn positive<T>(value: T, origin: &str) -> Result<T, ConfigurationError>
where
    T: PartialOrd + Default + ToString,
{
    if value <= T::default() {
        return Err(ConfigurationError::InvalidValueError {
            got: value.to_string(),
            expected: "> 0".to_string(),
            origin: origin.to_string(),
        });
    }
    Ok(value)
}

pub trait Configuration {
    fn no_color(&self) -> Result<Option<bool>, ConfigurationError>;

    fn base_api_url(&self) -> Result<String, ConfigurationError>;

    fn request_timeout(&self) -> Result<Duration, ConfigurationError>;

    fn region_id(&self) -> Result<i32, ConfigurationError>;

    fn items_file(&self) -> Result<Option<PathBuf>, ConfigurationError>;

    /// Minimum delay between two fetches of the same item.
    fn cooldown(&self) -> Result<Duration, ConfigurationError>;

    fn concurrency(&self) -> Result<usize, ConfigurationError>;

    fn persistence_timeout(&self) -> Result<Duration, ConfigurationError>;
}
