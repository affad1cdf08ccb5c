use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{RecognitionErrorKind, RecognitionSettings, SpeechRecognizer, START_FAILED_MESSAGE};
use crate::error::RecognizerError;
use crate::kernel::event::{Event, EventSender};

/// What happened when the engine reported the end of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOutcome {
    /// Auto-restart was enabled and the engine accepted a new start.
    Restarted,
    /// Auto-restart was enabled but the engine refused to start again.
    RestartFailed,
    /// The user stopped (or a fatal error disabled auto-restart).
    Stopped,
}

/// Keeps a recognition engine alive: restart-on-end while the user wants to
/// listen, plus a periodic forced refresh for engines that go quiet after long use.
pub struct RecognitionAdapter {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    should_resume: bool,
    settings: RecognitionSettings,
    refresh_interval: Duration,
    refresh_task: Option<JoinHandle<()>>,
}

impl RecognitionAdapter {
    pub fn new(settings: RecognitionSettings, refresh_interval: Duration) -> Self {
        Self {
            recognizer: None,
            should_resume: false,
            settings,
            refresh_interval,
            refresh_task: None,
        }
    }

    /// Replace the engine. The previous one is released first.
    pub fn attach(&mut self, mut recognizer: Box<dyn SpeechRecognizer>) {
        self.teardown();
        recognizer.configure(&self.settings);
        debug!(
            "Recognition configured: language={}, continuous={}, interim_results={}",
            self.settings.language, self.settings.continuous, self.settings.interim_results
        );
        self.recognizer = Some(recognizer);
    }

    /// Request a session. `Ok(false)` means nothing was done (no engine, or
    /// a start is already requested). `Err` carries the user-facing message.
    pub fn start(&mut self) -> Result<bool, String> {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return Ok(false);
        };
        if self.should_resume {
            return Ok(false);
        }

        self.should_resume = true;
        match recognizer.start() {
            Ok(()) => {
                info!("Recognition start requested");
                Ok(true)
            }
            Err(e) => {
                warn!("Recognition failed to start: {}", e);
                self.should_resume = false;
                Err(start_failure_message(&e))
            }
        }
    }

    /// Graceful stop. Disables auto-restart.
    pub fn stop(&mut self) {
        self.should_resume = false;
        if let Some(recognizer) = self.recognizer.as_mut() {
            if let Err(e) = recognizer.stop() {
                warn!("Recognition stop failed: {}", e);
            }
        }
    }

    /// Engine error. Returns the message to surface, or `None` when benign.
    /// Any non-benign error disables auto-restart and stops the engine.
    pub fn on_error(&mut self, kind: &RecognitionErrorKind) -> Option<&'static str> {
        let message = kind.user_message()?;
        warn!("Recognition error {:?}; stopping", kind);
        self.stop();
        Some(message)
    }

    pub fn on_end(&mut self) -> EndOutcome {
        if !self.should_resume {
            return EndOutcome::Stopped;
        }
        let Some(recognizer) = self.recognizer.as_mut() else {
            return EndOutcome::Stopped;
        };

        match recognizer.start() {
            Ok(()) => {
                debug!("Recognition session ended; restarted");
                EndOutcome::Restarted
            }
            Err(e) => {
                warn!("Recognition restart failed: {}", e);
                self.should_resume = false;
                EndOutcome::RestartFailed
            }
        }
    }

    /// Start the periodic refresh timer if it is not already running.
    pub fn arm_refresh(&mut self, tx: &EventSender) {
        if self.refresh_task.is_some() {
            return;
        }
        let period = self.refresh_interval;
        let tx = tx.clone();
        self.refresh_task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(Event::RefreshDue).is_err() {
                    break;
                }
            }
        }));
    }

    pub fn disarm_refresh(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }

    /// Force-stop the engine without touching auto-restart; the end handler
    /// brings it back. Failures here are expected and swallowed.
    pub fn refresh(&mut self) -> bool {
        let Some(recognizer) = self.recognizer.as_mut() else {
            return false;
        };
        info!("Refreshing recognition session");
        if let Err(e) = recognizer.stop() {
            debug!("Refresh stop failed (ignored): {}", e);
        }
        true
    }

    /// Release the engine immediately. Nothing pending is delivered.
    pub fn teardown(&mut self) {
        self.should_resume = false;
        self.disarm_refresh();
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.abort();
        }
    }
}

impl Drop for RecognitionAdapter {
    fn drop(&mut self) {
        self.disarm_refresh();
    }
}

fn start_failure_message(error: &RecognizerError) -> String {
    match error {
        RecognizerError::Engine(message) if !message.trim().is_empty() => message.clone(),
        _ => START_FAILED_MESSAGE.to_string(),
    }
}
