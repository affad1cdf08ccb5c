use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::{RecognitionEvent, RecognitionResult, RecognitionSettings, RecognitionSink, SpeechRecognizer};
use crate::error::RecognizerError;

/// Text-driven recognition engine for terminals and demos.
///
/// Lines pushed through the paired [`ConsoleFeed`] become results: `~text`
/// is an interim hypothesis, anything else is final. Lines arriving while the
/// engine is stopped are dropped, as a real engine would not hear them.
/// Interim lines are dropped too when interim results are not enabled.
pub struct ConsoleRecognizer {
    inner: Arc<Mutex<ConsoleInner>>,
}

/// Producer side of a [`ConsoleRecognizer`].
#[derive(Clone)]
pub struct ConsoleFeed {
    inner: Arc<Mutex<ConsoleInner>>,
}

struct ConsoleInner {
    sink: RecognitionSink,
    settings: Option<RecognitionSettings>,
    active: bool,
    results: Vec<RecognitionResult>,
}

fn lock(inner: &Mutex<ConsoleInner>) -> MutexGuard<'_, ConsoleInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ConsoleRecognizer {
    pub fn new(sink: RecognitionSink) -> (Self, ConsoleFeed) {
        let inner = Arc::new(Mutex::new(ConsoleInner {
            sink,
            settings: None,
            active: false,
            results: Vec::new(),
        }));
        (
            Self {
                inner: inner.clone(),
            },
            ConsoleFeed { inner },
        )
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn configure(&mut self, settings: &RecognitionSettings) {
        lock(&self.inner).settings = Some(settings.clone());
    }

    fn start(&mut self) -> Result<(), RecognizerError> {
        let mut inner = lock(&self.inner);
        if inner.active {
            return Err(RecognizerError::AlreadyStarted);
        }
        inner.active = true;
        inner.results.clear();
        inner.sink.emit(RecognitionEvent::Started);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecognizerError> {
        let mut inner = lock(&self.inner);
        if inner.active {
            inner.active = false;
            inner.sink.emit(RecognitionEvent::Ended);
        }
        Ok(())
    }

    fn abort(&mut self) {
        let mut inner = lock(&self.inner);
        if inner.active {
            inner.active = false;
            inner.results.clear();
            inner.sink.emit(RecognitionEvent::Error {
                kind: "aborted".to_string(),
            });
            inner.sink.emit(RecognitionEvent::Ended);
        }
    }
}

impl ConsoleFeed {
    /// Feed one line. Returns false if the engine is not listening.
    pub fn push(&self, line: &str) -> bool {
        let mut inner = lock(&self.inner);
        if !inner.active {
            debug!("Console line dropped: recognizer inactive");
            return false;
        }

        let interim_results = inner.settings.as_ref().map_or(true, |s| s.interim_results);
        let result = match line.strip_prefix('~') {
            Some(_) if !interim_results => return false,
            Some(partial) => RecognitionResult::interim(partial),
            None => RecognitionResult::finalized(line),
        };

        // A pending interim hypothesis is revised in place, like a real engine.
        let revise = matches!(inner.results.last(), Some(last) if !last.is_final);
        if revise {
            inner.results.pop();
        }
        inner.results.push(result);
        let result_index = inner.results.len() - 1;

        let event = RecognitionEvent::Result {
            result_index,
            results: inner.results.clone(),
        };
        inner.sink.emit(event);
        true
    }
}
