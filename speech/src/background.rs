//! ElevenLabs TTS background.
//!
//! Reads its settings from the background config table:
//! - api_key: string (OpenMind platform key)
//! - elevenlabs_api_key: string
//! - voice_id: string (default JBFqnCBsd6RMkjVDRZzb)
//! - model_id: string (default eleven_flash_v2_5)
//! - output_format: string (default mp3_44100_128)
//! - url: string (default OpenMind ElevenLabs proxy)
//!
//! On construction it starts the process-wide provider and then configures it
//! with the same values, which also reconciles a provider that was created
//! earlier with other settings.

use crate::provider::ElevenLabsTtsProvider;
use crate::settings::{
    TtsSettings, TtsSettingsUpdate, DEFAULT_MODEL_ID, DEFAULT_OUTPUT_FORMAT, DEFAULT_TTS_URL,
    DEFAULT_VOICE_ID,
};
use async_trait::async_trait;
use om1_core::{Background, BackgroundConfig, BackgroundRegistry, Om1Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Type name used in agent config files.
pub const ELEVENLABS_TTS_BACKGROUND: &str = "ElevenLabsTTS";

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevenLabsTtsConfig {
    pub api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub output_format: Option<String>,
    pub url: Option<String>,
}

impl std::fmt::Debug for ElevenLabsTtsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsTtsConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "elevenlabs_api_key",
                &self.elevenlabs_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("output_format", &self.output_format)
            .field("url", &self.url)
            .finish()
    }
}

impl ElevenLabsTtsConfig {
    /// Fill unset fields with their defaults.
    pub fn resolve(&self) -> TtsSettings {
        TtsSettings {
            endpoint_url: self
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_TTS_URL.to_string()),
            api_key: self.api_key.clone(),
            provider_api_key: self.elevenlabs_api_key.clone(),
            voice_id: self
                .voice_id
                .clone()
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            model_id: self
                .model_id
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            output_format: self
                .output_format
                .clone()
                .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string()),
        }
    }
}

pub struct ElevenLabsTts {
    tts: Arc<ElevenLabsTtsProvider>,
}

impl ElevenLabsTts {
    /// Build from a generic background config, using the shared provider.
    pub fn new(config: BackgroundConfig) -> Result<Self> {
        let cfg: ElevenLabsTtsConfig = config.parse()?;
        let settings = cfg.resolve();
        let provider = ElevenLabsTtsProvider::shared(settings.clone());
        Self::with_provider(settings, provider)
    }

    /// Start `provider` and make sure it runs with `settings`.
    pub fn with_provider(settings: TtsSettings, provider: Arc<ElevenLabsTtsProvider>) -> Result<Self> {
        provider.start()?;
        provider.configure(TtsSettingsUpdate::from(&settings))?;
        info!(target = "tts", "Eleven Labs TTS Provider initialized in background");
        Ok(Self { tts: provider })
    }

    pub fn provider(&self) -> &Arc<ElevenLabsTtsProvider> {
        &self.tts
    }
}

#[async_trait]
impl Background for ElevenLabsTts {
    fn name(&self) -> String {
        ELEVENLABS_TTS_BACKGROUND.to_string()
    }

    async fn health(&self) -> Result<bool> {
        Ok(self.tts.is_running())
    }

    async fn shutdown(&mut self) -> Result<()> {
        // Stopping waits for the stream worker, which may be mid-request.
        let tts = Arc::clone(&self.tts);
        tokio::task::spawn_blocking(move || tts.stop())
            .await
            .map_err(|e| Om1Error::BackgroundError(format!("TTS shutdown task failed: {}", e)))?
    }
}

fn build_elevenlabs_tts(config: BackgroundConfig) -> Result<Box<dyn Background>> {
    Ok(Box::new(ElevenLabsTts::new(config)?))
}

/// Register the speech backgrounds with a registry.
pub fn register_backgrounds(registry: &BackgroundRegistry) {
    registry.register(ELEVENLABS_TTS_BACKGROUND, build_elevenlabs_tts);
}
