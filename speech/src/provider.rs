//! ElevenLabs TTS provider.
//!
//! Owns the current [`TtsSettings`] and at most one open audio output stream.
//! `start`, `stop` and `configure` are serialized by one operation mutex, so a
//! configuration change and the restart it triggers are atomic with respect to
//! other callers. Readers (`is_running`, `settings`, pending messages) only
//! take the short-lived state lock.
//!
//! `configure` restarts the stream only when a supplied field actually differs
//! from the current one and the provider is running. Changes applied while
//! stopped take effect on the next `start`.
//!
//! Closed streams are dropped after both locks are released. Dropping a stream
//! waits for its worker, and the worker runs state callbacks that may call
//! back into the provider.

use crate::http_stream::HttpStreamFactory;
use crate::settings::{SettingField, TtsSettings, TtsSettingsUpdate};
use crate::stream::{AudioOutputStream, StreamFactory, TtsRequest, TtsState, TtsStateNotifier};
use om1_core::{singleton, Om1Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct ProviderState {
    settings: TtsSettings,
    // Some(_) exactly while running
    stream: Option<Box<dyn AudioOutputStream>>,
}

type Retired = Vec<Box<dyn AudioOutputStream>>;

pub struct ElevenLabsTtsProvider {
    ops: Mutex<()>,
    state: Mutex<ProviderState>,
    factory: Arc<dyn StreamFactory>,
    notifier: TtsStateNotifier,
}

impl ElevenLabsTtsProvider {
    /// Provider streaming over HTTP to the configured endpoint. Not started.
    pub fn new(settings: TtsSettings) -> Self {
        Self::with_factory(settings, Arc::new(HttpStreamFactory::default()))
    }

    pub fn with_factory(settings: TtsSettings, factory: Arc<dyn StreamFactory>) -> Self {
        Self {
            ops: Mutex::new(()),
            state: Mutex::new(ProviderState {
                settings,
                stream: None,
            }),
            factory,
            notifier: TtsStateNotifier::new(),
        }
    }

    /// The process-wide provider, created with `settings` on first use.
    ///
    /// Later callers get the existing instance unchanged; use `configure` to
    /// bring it to the settings they need.
    pub fn shared(settings: TtsSettings) -> Arc<Self> {
        singleton::instance(|| Self::new(settings))
    }

    /// Open the audio stream with the current settings. No-op when running.
    pub fn start(&self) -> Result<()> {
        let _ops = self.ops.lock();
        self.start_inner()
    }

    /// Close the audio stream. No-op when stopped.
    pub fn stop(&self) -> Result<()> {
        let mut retired = Retired::new();
        let res = {
            let _ops = self.ops.lock();
            self.stop_inner(&mut retired)
        };
        drop(retired);
        res
    }

    /// Apply a partial settings update, restarting the stream if running and
    /// anything changed.
    ///
    /// If closing the old stream fails the update is not applied and the
    /// provider is left stopped. If reopening fails the update is kept and the
    /// provider is left stopped.
    pub fn configure(&self, update: TtsSettingsUpdate) -> Result<()> {
        let mut retired = Retired::new();
        let res = {
            let _ops = self.ops.lock();
            self.configure_inner(update, &mut retired)
        };
        drop(retired);
        res
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().stream.is_some()
    }

    pub fn settings(&self) -> TtsSettings {
        self.state.lock().settings.clone()
    }

    /// Build a request for `text` from the current settings.
    pub fn create_pending_message(&self, text: &str) -> TtsRequest {
        TtsRequest::from_settings(text, &self.state.lock().settings)
    }

    /// Queue `text` for synthesis on the live stream. Blank text is ignored.
    pub fn add_pending_message(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let state = self.state.lock();
        let stream = state.stream.as_ref().ok_or(Om1Error::NotRunning)?;
        let request = TtsRequest::from_settings(text, &state.settings);
        debug!(target = "tts", id = %request.id, chars = text.len(), "Queueing TTS request");
        stream.add_request(request)
    }

    pub fn pending_message_count(&self) -> usize {
        self.state
            .lock()
            .stream
            .as_ref()
            .map(|s| s.pending())
            .unwrap_or(0)
    }

    /// Register a playback state callback. Kept across restarts.
    ///
    /// Callbacks run on the stream worker and may call any provider method.
    pub fn register_tts_state_callback<F>(&self, callback: F)
    where
        F: Fn(TtsState) + Send + Sync + 'static,
    {
        self.notifier.register(Arc::new(callback));
    }

    // Callers hold `ops`.
    fn configure_inner(&self, update: TtsSettingsUpdate, retired: &mut Retired) -> Result<()> {
        let (changed, running) = {
            let state = self.state.lock();
            (state.settings.diff(&update), state.stream.is_some())
        };
        if changed.is_empty() {
            debug!(target = "tts", "TTS settings unchanged");
            return Ok(());
        }
        let fields = field_names(&changed);

        if !running {
            self.state.lock().settings.apply(update);
            info!(target = "tts", fields = %fields, "TTS settings updated");
            return Ok(());
        }

        info!(target = "tts", fields = %fields, "TTS settings changed; restarting audio stream");
        self.stop_inner(retired)?;
        self.state.lock().settings.apply(update);
        self.start_inner()
    }

    // Callers hold `ops`.
    fn start_inner(&self) -> Result<()> {
        let settings = {
            let state = self.state.lock();
            if state.stream.is_some() {
                debug!(target = "tts", "TTS provider already running");
                return Ok(());
            }
            state.settings.clone()
        };
        let stream = self.factory.open(&settings, self.notifier.clone())?;
        self.state.lock().stream = Some(stream);
        info!(
            target = "tts",
            url = %settings.endpoint_url,
            voice = %settings.voice_id,
            model = %settings.model_id,
            format = %settings.output_format,
            "TTS provider started"
        );
        Ok(())
    }

    // Callers hold `ops`. The handle is released even if close fails.
    fn stop_inner(&self, retired: &mut Retired) -> Result<()> {
        let Some(mut stream) = self.state.lock().stream.take() else {
            return Ok(());
        };
        let res = stream.close();
        retired.push(stream);
        res?;
        info!(target = "tts", "TTS provider stopped");
        Ok(())
    }
}

impl Drop for ElevenLabsTtsProvider {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(mut stream) = state.stream.take() {
            if let Err(e) = stream.close() {
                warn!(target = "tts", error = %e, "Error closing TTS stream on drop");
            }
        }
    }
}

fn field_names(fields: &[SettingField]) -> String {
    fields
        .iter()
        .map(SettingField::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
