//! Command implementations for the Arrival CLI

pub mod extract;
pub mod replicate;
pub mod sense;
pub mod tables;

use std::path::Path;

use anyhow::{Context as _, Result};
use arrival_config::{Config, Credentials};

/// Configuration and secrets shared by every command
#[derive(Debug, Default)]
pub struct Context {
    pub config: Config,
    pub credentials: Credentials,
}

impl Context {
    /// Load the config file and the credentials file when given
    ///
    /// A path that is given but does not exist is an error.
    pub fn load(config: Option<&Path>, credentials: Option<&Path>) -> Result<Self> {
        let config = match config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Config::default(),
        };
        let credentials = match credentials {
            Some(path) => Credentials::from_file(path)
                .with_context(|| format!("failed to load credentials from {}", path.display()))?,
            None => Credentials::default(),
        };
        Ok(Self { config, credentials })
    }
}
