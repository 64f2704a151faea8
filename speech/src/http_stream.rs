//! HTTP-backed audio output stream.
//!
//! Each opened stream owns one worker thread. Requests queued with
//! `add_request` are POSTed in order to the configured endpoint; the returned
//! audio is handed to an [`AudioSink`]. Failed requests are logged and skipped.
//!
//! The endpoint may answer with raw audio bytes or with a JSON envelope
//! `{"response": "<base64 audio>"}`.

use crate::settings::TtsSettings;
use crate::sink::{AudioSink, PlayerSink};
use crate::stream::{AudioOutputStream, StreamFactory, TtsRequest, TtsState, TtsStateNotifier};
use crate::utils::now_ms;
use base64::Engine as _;
use crossbeam::channel::{self, Receiver, Sender};
use om1_core::{Om1Error, Result};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

/// Opens [`HttpAudioStream`]s that play through a shared sink.
pub struct HttpStreamFactory {
    sink: Arc<dyn AudioSink>,
    request_timeout: Duration,
}

impl Default for HttpStreamFactory {
    fn default() -> Self {
        let timeout_ms = std::env::var("TTS_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        Self {
            sink: Arc::new(PlayerSink::detect()),
            request_timeout: Duration::from_millis(timeout_ms),
        }
    }
}

impl HttpStreamFactory {
    pub fn new(sink: Arc<dyn AudioSink>, request_timeout: Duration) -> Self {
        Self {
            sink,
            request_timeout,
        }
    }
}

impl StreamFactory for HttpStreamFactory {
    fn open(
        &self,
        settings: &TtsSettings,
        notifier: TtsStateNotifier,
    ) -> Result<Box<dyn AudioOutputStream>> {
        let stream = HttpAudioStream::spawn(
            settings.clone(),
            Arc::clone(&self.sink),
            notifier,
            self.request_timeout,
        )?;
        Ok(Box::new(stream))
    }
}

pub struct HttpAudioStream {
    tx: Option<Sender<TtsRequest>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl HttpAudioStream {
    /// Start the worker thread. Returns once the HTTP client is ready.
    pub fn spawn(
        settings: TtsSettings,
        sink: Arc<dyn AudioSink>,
        notifier: TtsStateNotifier,
        request_timeout: Duration,
    ) -> Result<Self> {
        let (tx, rx) = channel::unbounded::<TtsRequest>();
        let (ready_tx, ready_rx) = channel::bounded::<std::result::Result<(), String>>(1);
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_worker = Arc::clone(&stop);

        // The blocking client lives entirely on the worker thread; it must not
        // be created or dropped inside an async runtime.
        let worker = std::thread::Builder::new()
            .name("tts-stream".into())
            .spawn(move || {
                let client = match reqwest::blocking::Client::builder()
                    .timeout(request_timeout)
                    .build()
                {
                    Ok(c) => {
                        let _ = ready_tx.send(Ok(()));
                        c
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                run_worker(client, settings, rx, stop_for_worker, sink, notifier);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx: Some(tx),
                stop,
                worker: Some(worker),
            }),
            Ok(Err(msg)) => {
                let _ = worker.join();
                Err(Om1Error::StreamError(format!(
                    "Failed to build HTTP client: {}",
                    msg
                )))
            }
            Err(_) => {
                let _ = worker.join();
                Err(Om1Error::StreamError(
                    "TTS worker exited during startup".into(),
                ))
            }
        }
    }
}

impl AudioOutputStream for HttpAudioStream {
    fn add_request(&self, request: TtsRequest) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Om1Error::NotRunning)?;
        tx.send(request)
            .map_err(|_| Om1Error::StreamError("TTS worker is gone".into()))
    }

    fn pending(&self) -> usize {
        self.tx.as_ref().map(|tx| tx.len()).unwrap_or(0)
    }

    /// Signal the worker to stop without waiting for it. The worker is
    /// joined when the stream is dropped.
    fn close(&mut self) -> Result<()> {
        let Some(tx) = self.tx.take() else {
            return Ok(());
        };
        self.stop.store(true, Ordering::Release);
        let discarded = tx.len();
        drop(tx);
        debug!(target = "tts", discarded, "TTS stream closed");
        Ok(())
    }
}

impl HttpAudioStream {
    fn join_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Dropped from a state callback running on the worker itself.
        if worker.thread().id() == std::thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            warn!(target = "tts", "TTS worker panicked");
        }
    }
}

impl Drop for HttpAudioStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(target = "tts", error = %e, "Error closing TTS stream on drop");
        }
        self.join_worker();
    }
}

fn run_worker(
    client: reqwest::blocking::Client,
    settings: TtsSettings,
    rx: Receiver<TtsRequest>,
    stop: Arc<AtomicBool>,
    sink: Arc<dyn AudioSink>,
    notifier: TtsStateNotifier,
) {
    info!(target = "tts", url = %settings.endpoint_url, voice = %settings.voice_id, "TTS stream worker started");

    while let Ok(request) = rx.recv() {
        if stop.load(Ordering::Acquire) {
            break;
        }

        let t0 = now_ms();
        let audio = match synthesize(&client, &settings, &request) {
            Ok(a) => a,
            Err(e) => {
                error!(target = "tts", id = %request.id, error = %e, "TTS synthesis failed");
                continue;
            }
        };
        let synthesis_ms = now_ms() - t0;
        if stop.load(Ordering::Acquire) {
            debug!(target = "tts", id = %request.id, "Stream closed during synthesis; dropping audio");
            break;
        }
        debug!(target = "tts", id = %request.id, bytes = audio.len(), synthesis_ms, "Synthesized audio");

        notifier.notify(TtsState::Active);
        let play_start = now_ms();
        if let Err(e) = sink.play(&audio, &request.output_format) {
            warn!(target = "tts", id = %request.id, error = %e, "Audio playback failed");
        }
        notifier.notify(TtsState::Inactive);
        debug!(target = "tts", id = %request.id, playback_ms = now_ms() - play_start, "Playback done");
    }

    info!(target = "tts", "TTS stream worker stopped");
}

fn synthesize(
    client: &reqwest::blocking::Client,
    settings: &TtsSettings,
    request: &TtsRequest,
) -> Result<Vec<u8>> {
    let mut req = client.post(&settings.endpoint_url).json(request);
    if let Some(key) = settings.api_key.as_deref() {
        req = req.header("x-api-key", key);
    }

    let response = req
        .send()
        .map_err(|e| Om1Error::StreamError(format!("TTS request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        return Err(Om1Error::StreamError(format!(
            "TTS endpoint returned status: {}",
            status
        )));
    }

    let is_json = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    let body = response
        .bytes()
        .map_err(|e| Om1Error::StreamError(format!("Failed to read TTS response: {}", e)))?;

    if is_json {
        decode_json_audio(&body)
    } else {
        Ok(body.to_vec())
    }
}

#[derive(Debug, Deserialize)]
struct AudioEnvelope {
    response: String,
}

/// Decode a `{"response": "<base64>"}` body into audio bytes.
pub(crate) fn decode_json_audio(body: &[u8]) -> Result<Vec<u8>> {
    let envelope: AudioEnvelope = serde_json::from_slice(body)?;
    base64::engine::general_purpose::STANDARD
        .decode(envelope.response.trim())
        .map_err(|e| Om1Error::StreamError(format!("Invalid base64 audio: {}", e)))
}
