//! Recording stream factory shared by the provider and background tests.
#![allow(dead_code)]

use om1_core::{Om1Error, Result};
use om1_speech::{AudioOutputStream, StreamFactory, TtsRequest, TtsSettings, TtsStateNotifier};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub opened_with: Mutex<Vec<TtsSettings>>,
    pub requests: Mutex<Vec<TtsRequest>>,
    pub notifiers: Mutex<Vec<TtsStateNotifier>>,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn last_opened(&self) -> Option<TtsSettings> {
        self.opened_with.lock().last().cloned()
    }
}

/// Counts opens and closes; optionally fails every open.
#[derive(Clone, Default)]
pub struct RecordingFactory {
    pub counters: Arc<Counters>,
    pub fail_open: bool,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }
}

impl StreamFactory for RecordingFactory {
    fn open(
        &self,
        settings: &TtsSettings,
        notifier: TtsStateNotifier,
    ) -> Result<Box<dyn AudioOutputStream>> {
        if self.fail_open {
            return Err(Om1Error::StreamError("audio device unavailable".into()));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        self.counters.opened_with.lock().push(settings.clone());
        self.counters.notifiers.lock().push(notifier);
        Ok(Box::new(RecordingStream {
            counters: Arc::clone(&self.counters),
            queued: Mutex::new(Vec::new()),
        }))
    }
}

struct RecordingStream {
    counters: Arc<Counters>,
    queued: Mutex<Vec<TtsRequest>>,
}

impl AudioOutputStream for RecordingStream {
    fn add_request(&self, request: TtsRequest) -> Result<()> {
        self.counters.requests.lock().push(request.clone());
        self.queued.lock().push(request);
        Ok(())
    }

    fn pending(&self) -> usize {
        self.queued.lock().len()
    }

    fn close(&mut self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.queued.lock().clear();
        Ok(())
    }
}
