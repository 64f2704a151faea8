// Speech capabilities for OM1 agents

pub mod background;
pub mod http_stream;
pub mod provider;
pub mod settings;
pub mod sink;
pub mod stream;

// Shared speech utilities
pub(crate) mod utils;

#[cfg(test)]
mod test_support;

pub use background::{
    register_backgrounds, ElevenLabsTts, ElevenLabsTtsConfig, ELEVENLABS_TTS_BACKGROUND,
};
pub use http_stream::{HttpAudioStream, HttpStreamFactory};
pub use provider::ElevenLabsTtsProvider;
pub use settings::{
    SettingField, TtsSettings, TtsSettingsUpdate, DEFAULT_MODEL_ID, DEFAULT_OUTPUT_FORMAT,
    DEFAULT_TTS_URL, DEFAULT_VOICE_ID,
};
pub use sink::{AudioEncoding, AudioSink, PlayerSink};
pub use stream::{
    AudioOutputStream, StreamFactory, TtsRequest, TtsState, TtsStateCallback, TtsStateNotifier,
};
