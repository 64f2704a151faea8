//! Audio output stream seam.
//!
//! A provider owns at most one [`AudioOutputStream`], opened through a
//! [`StreamFactory`] from the settings current at open time. The stream does
//! the network and playback work; the provider only opens and closes it.

use crate::settings::TtsSettings;
use crate::utils::gen_id;
use om1_core::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One synthesis request, serialized as the JSON request body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsRequest {
    #[serde(skip)]
    pub id: String,
    pub text: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevenlabs_api_key: Option<String>,
}

impl TtsRequest {
    /// Build a request for `text` from the given settings.
    pub fn from_settings(text: impl Into<String>, settings: &TtsSettings) -> Self {
        Self {
            id: gen_id(),
            text: text.into(),
            voice_id: settings.voice_id.clone(),
            model_id: settings.model_id.clone(),
            output_format: settings.output_format.clone(),
            elevenlabs_api_key: settings.provider_api_key.clone(),
        }
    }
}

/// Playback state reported to registered callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TtsState {
    Active,
    Inactive,
}

impl TtsState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsState::Active => "active",
            TtsState::Inactive => "inactive",
        }
    }
}

pub type TtsStateCallback = Arc<dyn Fn(TtsState) + Send + Sync>;

/// Shared list of playback state callbacks.
///
/// Clones share the same list, so callbacks registered on the provider after a
/// stream was opened still reach that stream.
#[derive(Clone, Default)]
pub struct TtsStateNotifier {
    callbacks: Arc<RwLock<Vec<TtsStateCallback>>>,
}

impl TtsStateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, callback: TtsStateCallback) {
        self.callbacks.write().push(callback);
    }

    pub fn notify(&self, state: TtsState) {
        // Call outside the lock; a callback may register another.
        let callbacks: Vec<TtsStateCallback> = self.callbacks.read().clone();
        for cb in callbacks {
            cb(state);
        }
    }
}

/// An open audio output channel.
#[cfg_attr(test, mockall::automock)]
pub trait AudioOutputStream: Send {
    /// Queue a request for synthesis and playback.
    fn add_request(&self, request: TtsRequest) -> Result<()>;

    /// Requests queued and not yet taken by the stream.
    fn pending(&self) -> usize;

    /// Release the stream. Queued requests are discarded. Must not wait for
    /// work in progress; an implementation may wait for it when dropped.
    fn close(&mut self) -> Result<()>;
}

/// Opens audio output streams bound to a settings snapshot.
#[cfg_attr(test, mockall::automock)]
pub trait StreamFactory: Send + Sync {
    fn open(
        &self,
        settings: &TtsSettings,
        notifier: TtsStateNotifier,
    ) -> Result<Box<dyn AudioOutputStream>>;
}
