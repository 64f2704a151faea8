// Background system implementation
use crate::{Om1Error, Result};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// A long-lived component owned by the agent runtime.
///
/// Backgrounds do their setup at construction time (see
/// [`BackgroundRegistry`](crate::BackgroundRegistry)); the runtime only probes
/// them and tears them down.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Background: Send + Sync {
    fn name(&self) -> String;
    async fn health(&self) -> Result<bool>;
    async fn shutdown(&mut self) -> Result<()>;
}

/// Background Manager
pub struct BackgroundManager {
    backgrounds: Arc<DashMap<String, Box<dyn Background>>>,
}

impl Default for BackgroundManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundManager {
    pub fn new() -> Self {
        Self {
            backgrounds: Arc::new(DashMap::new()),
        }
    }

    /// Register a running background under its own name.
    ///
    /// Names are unique. A second background with a registered name is
    /// rejected and dropped without being shut down, so anything it shares
    /// with the registered one keeps running.
    pub async fn register(&self, background: Box<dyn Background>) -> Result<()> {
        let name = background.name();
        match self.backgrounds.entry(name.clone()) {
            Entry::Occupied(_) => {
                warn!(target: "background", background = %name, "Background already registered");
                Err(Om1Error::BackgroundError(format!(
                    "Background {} already registered",
                    name
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(background);
                info!(target: "background", background = %name, "Registered background");
                Ok(())
            }
        }
    }

    /// Check background health status
    pub async fn check_health(&self, name: &str) -> Result<bool> {
        if let Some(background) = self.backgrounds.get(name) {
            background.value().health().await
        } else {
            Err(Om1Error::BackgroundError(format!(
                "Background {} not found",
                name
            )))
        }
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backgrounds.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.backgrounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backgrounds.is_empty()
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Background Manager shutting down");

        // Drain first so no shard lock is held across an await.
        let names = self.names();
        for name in names {
            if let Some((_, mut background)) = self.backgrounds.remove(&name) {
                if let Err(e) = background.shutdown().await {
                    warn!("Error shutting down background {}: {}", name, e);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_named(name: &'static str) -> MockBackground {
        let mut bg = MockBackground::new();
        bg.expect_name().return_const(name.to_string());
        bg
    }

    #[tokio::test]
    async fn test_register_and_check_health() {
        let manager = BackgroundManager::new();
        let mut bg = mock_named("speaker");
        bg.expect_health().times(1).returning(|| Ok(true));
        bg.expect_shutdown().returning(|| Ok(()));

        manager.register(Box::new(bg)).await.unwrap();

        assert_eq!(manager.names(), vec!["speaker".to_string()]);
        assert!(manager.check_health("speaker").await.unwrap());
    }

    #[tokio::test]
    async fn test_check_health_unknown() {
        let manager = BackgroundManager::new();
        let err = manager.check_health("missing").await.unwrap_err();
        assert!(matches!(err, Om1Error::BackgroundError(_)));
    }

    #[tokio::test]
    async fn test_shutdown_continues_after_error() {
        let manager = BackgroundManager::new();

        let mut failing = mock_named("a");
        failing
            .expect_shutdown()
            .times(1)
            .returning(|| Err(Om1Error::BackgroundError("boom".into())));
        let mut ok = mock_named("b");
        ok.expect_shutdown().times(1).returning(|| Ok(()));

        manager.register(Box::new(failing)).await.unwrap();
        manager.register(Box::new(ok)).await.unwrap();

        manager.shutdown().await.unwrap();
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_name() {
        let manager = BackgroundManager::new();

        let mut first = mock_named("tts");
        first.expect_health().times(1).returning(|| Ok(true));
        first.expect_shutdown().times(1).returning(|| Ok(()));
        let mut second = mock_named("tts");
        second.expect_shutdown().never();

        manager.register(Box::new(first)).await.unwrap();
        let err = manager.register(Box::new(second)).await.unwrap_err();
        assert!(matches!(err, Om1Error::BackgroundError(_)));
        assert_eq!(manager.len(), 1);
        assert!(manager.check_health("tts").await.unwrap());

        manager.shutdown().await.unwrap();
    }
}
