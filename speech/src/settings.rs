//! TTS session settings and change detection.
//!
//! [`TtsSettings`] is the full record a provider streams with.
//! [`TtsSettingsUpdate`] is the partial record accepted by
//! `ElevenLabsTtsProvider::configure`: unset fields keep their current value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// OpenMind proxy in front of the ElevenLabs synthesis API.
pub const DEFAULT_TTS_URL: &str = "https://api.openmind.org/api/core/elevenlabs/tts";
pub const DEFAULT_VOICE_ID: &str = "JBFqnCBsd6RMkjVDRZzb";
pub const DEFAULT_MODEL_ID: &str = "eleven_flash_v2_5";
pub const DEFAULT_OUTPUT_FORMAT: &str = "mp3_44100_128";

/// One of the recognized settings fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingField {
    EndpointUrl,
    ApiKey,
    ProviderApiKey,
    VoiceId,
    ModelId,
    OutputFormat,
}

impl SettingField {
    pub const ALL: [SettingField; 6] = [
        SettingField::EndpointUrl,
        SettingField::ApiKey,
        SettingField::ProviderApiKey,
        SettingField::VoiceId,
        SettingField::ModelId,
        SettingField::OutputFormat,
    ];

    /// Configuration key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingField::EndpointUrl => "url",
            SettingField::ApiKey => "api_key",
            SettingField::ProviderApiKey => "elevenlabs_api_key",
            SettingField::VoiceId => "voice_id",
            SettingField::ModelId => "model_id",
            SettingField::OutputFormat => "output_format",
        }
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsSettings {
    pub endpoint_url: String,
    /// OpenMind platform key, sent as `x-api-key`
    pub api_key: Option<String>,
    /// ElevenLabs key, forwarded in the request body
    pub provider_api_key: Option<String>,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_TTS_URL.to_string(),
            api_key: None,
            provider_api_key: None,
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
        }
    }
}

impl fmt::Debug for TtsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsSettings")
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &redact(self.api_key.as_deref()))
            .field("provider_api_key", &redact(self.provider_api_key.as_deref()))
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("output_format", &self.output_format)
            .finish()
    }
}

impl TtsSettings {
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_provider_api_key(mut self, key: impl Into<String>) -> Self {
        self.provider_api_key = Some(key.into());
        self
    }

    pub fn with_voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_output_format(mut self, output_format: impl Into<String>) -> Self {
        self.output_format = output_format.into();
        self
    }

    /// Fields that `update` would change. Pure; does not touch `self`.
    ///
    /// A supplied value equal to the current one is not a change, and neither
    /// is an absent value.
    pub fn diff(&self, update: &TtsSettingsUpdate) -> Vec<SettingField> {
        SettingField::ALL
            .into_iter()
            .filter(|field| match update.get(*field) {
                Some(new) => self.get(*field) != Some(new),
                None => false,
            })
            .collect()
    }

    /// Apply every supplied field and return the ones that changed.
    pub fn apply(&mut self, update: TtsSettingsUpdate) -> Vec<SettingField> {
        let changed = self.diff(&update);
        let TtsSettingsUpdate {
            endpoint_url,
            api_key,
            provider_api_key,
            voice_id,
            model_id,
            output_format,
        } = update;

        if let Some(v) = endpoint_url {
            self.endpoint_url = v;
        }
        if let Some(v) = api_key {
            self.api_key = Some(v);
        }
        if let Some(v) = provider_api_key {
            self.provider_api_key = Some(v);
        }
        if let Some(v) = voice_id {
            self.voice_id = v;
        }
        if let Some(v) = model_id {
            self.model_id = v;
        }
        if let Some(v) = output_format {
            self.output_format = v;
        }
        changed
    }

    pub fn get(&self, field: SettingField) -> Option<&str> {
        match field {
            SettingField::EndpointUrl => Some(&self.endpoint_url),
            SettingField::ApiKey => self.api_key.as_deref(),
            SettingField::ProviderApiKey => self.provider_api_key.as_deref(),
            SettingField::VoiceId => Some(&self.voice_id),
            SettingField::ModelId => Some(&self.model_id),
            SettingField::OutputFormat => Some(&self.output_format),
        }
    }
}

/// Partial settings for `configure`; `None` leaves a field as is.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TtsSettingsUpdate {
    pub endpoint_url: Option<String>,
    pub api_key: Option<String>,
    pub provider_api_key: Option<String>,
    pub voice_id: Option<String>,
    pub model_id: Option<String>,
    pub output_format: Option<String>,
}

impl fmt::Debug for TtsSettingsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsSettingsUpdate")
            .field("endpoint_url", &self.endpoint_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "provider_api_key",
                &self.provider_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("voice_id", &self.voice_id)
            .field("model_id", &self.model_id)
            .field("output_format", &self.output_format)
            .finish()
    }
}

impl TtsSettingsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn provider_api_key(mut self, key: impl Into<String>) -> Self {
        self.provider_api_key = Some(key.into());
        self
    }

    pub fn voice_id(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = Some(voice_id.into());
        self
    }

    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn output_format(mut self, output_format: impl Into<String>) -> Self {
        self.output_format = Some(output_format.into());
        self
    }

    pub fn get(&self, field: SettingField) -> Option<&str> {
        match field {
            SettingField::EndpointUrl => self.endpoint_url.as_deref(),
            SettingField::ApiKey => self.api_key.as_deref(),
            SettingField::ProviderApiKey => self.provider_api_key.as_deref(),
            SettingField::VoiceId => self.voice_id.as_deref(),
            SettingField::ModelId => self.model_id.as_deref(),
            SettingField::OutputFormat => self.output_format.as_deref(),
        }
    }
}

/// Every field of `settings`, supplied. Configuring with this is a no-op on
/// a provider already holding the same settings.
impl From<&TtsSettings> for TtsSettingsUpdate {
    fn from(s: &TtsSettings) -> Self {
        Self {
            endpoint_url: Some(s.endpoint_url.clone()),
            api_key: s.api_key.clone(),
            provider_api_key: s.provider_api_key.clone(),
            voice_id: Some(s.voice_id.clone()),
            model_id: Some(s.model_id.clone()),
            output_format: Some(s.output_format.clone()),
        }
    }
}

fn redact(value: Option<&str>) -> Option<&'static str> {
    value.map(|_| "<redacted>")
}
