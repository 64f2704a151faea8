//! Background factory registry: maps config type names to constructors.

use crate::{Background, BackgroundConfig, Om1Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds a started background from its configuration.
pub type BackgroundConstructor = fn(BackgroundConfig) -> Result<Box<dyn Background>>;

#[derive(Clone, Default)]
pub struct BackgroundRegistry {
    constructors: Arc<DashMap<String, BackgroundConstructor>>,
}

impl BackgroundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, type_name: &str, constructor: BackgroundConstructor) {
        info!(target: "background", kind = %type_name, "Registering background type");
        self.constructors.insert(type_name.to_string(), constructor);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    /// Construct a background of the given type.
    pub fn create(&self, type_name: &str, config: BackgroundConfig) -> Result<Box<dyn Background>> {
        // Copy the fn pointer out so the shard lock is released before construction.
        let constructor = self
            .constructors
            .get(type_name)
            .map(|c| *c.value())
            .ok_or_else(|| {
                Om1Error::BackgroundError(format!("Unknown background type: {}", type_name))
            })?;
        debug!(target: "background", kind = %type_name, "Creating background");
        constructor(config)
    }
}
