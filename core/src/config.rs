//! Generic configuration handed to backgrounds.
//!
//! The runtime does not know the shape of each background's settings; it
//! keeps the raw TOML table and lets the background deserialize it into its
//! own typed struct (with serde defaults for anything left out).

use crate::{Om1Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackgroundConfig {
    table: toml::Table,
}

impl BackgroundConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML source text.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(src)?;
        Ok(Self { table })
    }

    /// Builder-style setter for string values.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.table
            .insert(key.to_string(), toml::Value::String(value.into()));
        self
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.table.get(key).and_then(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.table.contains_key(key)
    }

    /// Deserialize into a background's typed configuration.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        toml::Value::Table(self.table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| Om1Error::ConfigError(e.to_string()))
    }
}
