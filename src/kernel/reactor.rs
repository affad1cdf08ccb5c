use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::event::{Command, Event, EventReceiver, EventSender};
use super::segment::{Segment, SegmentId};
use super::slot::{Dispatch, EnrichmentKind, LatestWinsSlot, ScheduleOutcome};
use super::state::{SessionState, StateDelta};
use super::telemetry::{EnrichmentPath, TelemetryEvent, TelemetryRecorder, TelemetrySnapshot};
use crate::config::SessionConfig;
use crate::error::EnrichmentError;
use crate::outputs::SessionView;
use crate::recognition::{
    collect_results, EndOutcome, RecognitionAdapter, RecognitionErrorKind, RecognitionEvent,
    RecognitionResult, RecognitionSettings, RecognitionSink, SpeechRecognizer,
    RESTART_FAILED_MESSAGE,
};
use crate::services::{AnswerDetection, AnswerRequest, EnrichmentService};

pub const TRANSLATION_FAILED_MESSAGE: &str = "Translation failed. Please try again later.";
pub const ANSWER_FAILED_MESSAGE: &str = "The assistant could not produce an answer.";

/// Cloneable front door to a running [`Session`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: EventSender,
}

impl SessionHandle {
    fn command(&self, command: Command) -> bool {
        self.tx.send(Event::Command(command)).is_ok()
    }

    pub fn start(&self) -> bool {
        self.command(Command::Start)
    }

    pub fn stop(&self) -> bool {
        self.command(Command::Stop)
    }

    pub fn toggle(&self) -> bool {
        self.command(Command::Toggle)
    }

    pub fn clear(&self) -> bool {
        self.command(Command::Clear)
    }

    pub fn set_answer_prompt(&self, prompt: impl Into<String>) -> bool {
        self.command(Command::SetAnswerPrompt(prompt.into()))
    }

    pub fn shutdown(&self) -> bool {
        self.command(Command::Shutdown)
    }

    /// Sink for a recognition engine feeding this session.
    pub fn sink(&self) -> RecognitionSink {
        RecognitionSink::new(self.tx.clone())
    }

    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// The live meeting session.
///
/// A single owner of all state: every input (engine callbacks, commands,
/// timer expiries, request completions) arrives on one channel and is
/// reduced in order by [`Session::step`]. Network calls and timers run in
/// spawned tasks and only ever report back through that channel.
pub struct Session {
    receiver: EventReceiver,
    tx: EventSender,
    pub state: SessionState,
    config: SessionConfig,
    service: Arc<dyn EnrichmentService>,
    adapter: RecognitionAdapter,
    interim_translation: LatestWinsSlot,
    interim_answer: LatestWinsSlot,
    /// Root of every request token; canceled on teardown.
    liveness: CancellationToken,
    /// Parent of in-flight segment enrichment; replaced on clear.
    segment_scope: CancellationToken,
    telemetry: TelemetryRecorder,
    view: watch::Sender<SessionView>,
    published_version: u64,
}

impl Session {
    pub fn new(config: SessionConfig, service: Arc<dyn EnrichmentService>) -> Self {
        let (tx, receiver) = mpsc::unbounded_channel();
        let liveness = CancellationToken::new();
        let state = SessionState::new(config.answer_prompt.clone());
        let (view, _) = watch::channel(SessionView::from(&state));

        Self {
            receiver,
            tx,
            interim_translation: LatestWinsSlot::new(
                EnrichmentKind::Translation,
                config.debounce(),
                liveness.child_token(),
            ),
            interim_answer: LatestWinsSlot::new(
                EnrichmentKind::Answer,
                config.debounce(),
                liveness.child_token(),
            ),
            adapter: RecognitionAdapter::new(
                RecognitionSettings::live(config.language.clone()),
                config.refresh_interval(),
            ),
            segment_scope: liveness.child_token(),
            liveness,
            published_version: state.version,
            state,
            config,
            service,
            telemetry: TelemetryRecorder::new(),
            view,
        }
    }

    /// Plug in the platform recognition engine. Without one the session
    /// stays `supported = false` and start requests are ignored.
    pub fn attach_recognizer(&mut self, recognizer: Box<dyn SpeechRecognizer>) {
        self.adapter.attach(recognizer);
        self.apply(StateDelta::Supported(true));
        self.publish();
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.tx.clone(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    pub fn interim_slot(&self, kind: EnrichmentKind) -> &LatestWinsSlot {
        match kind {
            EnrichmentKind::Translation => &self.interim_translation,
            EnrichmentKind::Answer => &self.interim_answer,
        }
    }

    /// Drive the session until shutdown.
    pub async fn run(&mut self) {
        info!("Session loop active");
        while let Some(event) = self.receiver.recv().await {
            if !self.step(event) {
                break;
            }
        }
        self.teardown();
        info!("Session loop stopped");
    }

    /// Wait for and handle exactly one event. Returns false on shutdown.
    pub async fn pump(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(event) => self.step(event),
            None => false,
        }
    }

    /// Handle one event. MUST NOT await: all I/O is spawned.
    pub fn step(&mut self, event: Event) -> bool {
        let keep_running = match event {
            Event::Command(command) => self.on_command(command),
            Event::Recognition(event) => {
                self.on_recognition(event);
                true
            }
            Event::DebounceElapsed { kind, generation } => {
                self.on_debounce(kind, generation);
                true
            }
            Event::RefreshDue => {
                if self.state.listening && self.adapter.refresh() {
                    self.telemetry.record(TelemetryEvent::SessionRefreshed);
                }
                true
            }
            Event::InterimTranslated { generation, outcome } => {
                self.on_interim_translated(generation, outcome);
                true
            }
            Event::InterimAnswered { generation, outcome } => {
                self.on_interim_answered(generation, outcome);
                true
            }
            Event::SegmentTranslated { id, outcome } => {
                self.on_segment_translated(id, outcome);
                true
            }
            Event::SegmentAnswered { id, outcome } => {
                self.on_segment_answered(id, outcome);
                true
            }
        };
        self.publish();
        keep_running
    }

    /// Release timers, in-flight requests and the engine. Idempotent.
    pub fn teardown(&mut self) {
        self.liveness.cancel();
        self.interim_translation.cancel();
        self.interim_answer.cancel();
        self.adapter.teardown();
        if self.state.listening {
            self.apply(StateDelta::ListeningChanged(false));
        }
        if !self.state.interim.is_empty() {
            self.apply(StateDelta::InterimReset);
        }
        self.publish();
    }

    fn apply(&mut self, delta: StateDelta) {
        self.state.reduce(delta);
    }

    fn publish(&mut self) {
        if self.state.version != self.published_version {
            self.published_version = self.state.version;
            self.view.send_replace(SessionView::from(&self.state));
        }
    }

    // === Commands ===

    fn on_command(&mut self, command: Command) -> bool {
        match command {
            Command::Start => self.start_listening(),
            Command::Stop => self.adapter.stop(),
            Command::Toggle => {
                if self.state.listening {
                    self.adapter.stop();
                } else {
                    self.start_listening();
                }
            }
            Command::Clear => self.clear(),
            Command::SetAnswerPrompt(prompt) => self.apply(StateDelta::AnswerPromptChanged(prompt)),
            Command::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        true
    }

    fn start_listening(&mut self) {
        if !self.state.supported {
            warn!("Start ignored: no speech recognizer available");
            return;
        }
        if self.state.listening {
            debug!("Start ignored: already listening");
            return;
        }
        if let Err(message) = self.adapter.start() {
            self.apply(StateDelta::ErrorRaised(message));
        }
    }

    fn clear(&mut self) {
        if self.state.listening {
            warn!("Clear rejected while listening");
            return;
        }

        self.segment_scope.cancel();
        self.segment_scope = self.liveness.child_token();
        self.interim_translation.cancel();
        self.interim_answer.cancel();

        let already_empty = self.state.segments.is_empty()
            && self.state.interim.is_empty()
            && self.state.error.is_none();
        if !already_empty {
            info!("Session cleared ({} segments)", self.state.segments.len());
            self.apply(StateDelta::Cleared);
        }
    }

    // === Recognition ===

    fn on_recognition(&mut self, event: RecognitionEvent) {
        match event {
            RecognitionEvent::Started => {
                if !self.state.listening {
                    info!("Listening");
                    self.apply(StateDelta::ListeningChanged(true));
                    self.adapter.arm_refresh(&self.tx);
                }
                if self.state.error.is_some() {
                    self.apply(StateDelta::ErrorCleared);
                }
            }
            RecognitionEvent::Result {
                result_index,
                results,
            } => self.on_results(result_index, &results),
            RecognitionEvent::Error { kind } => {
                let parsed = RecognitionErrorKind::parse(&kind);
                match self.adapter.on_error(&parsed) {
                    Some(message) => {
                        self.telemetry.record(TelemetryEvent::RecognitionError { kind });
                        self.apply(StateDelta::ErrorRaised(message.to_string()));
                    }
                    None => debug!("Recognition aborted"),
                }
            }
            RecognitionEvent::Ended => match self.adapter.on_end() {
                EndOutcome::Restarted => self.telemetry.record(TelemetryEvent::SessionRestarted),
                EndOutcome::RestartFailed => {
                    self.telemetry.record(TelemetryEvent::RestartFailed);
                    self.apply(StateDelta::ErrorRaised(RESTART_FAILED_MESSAGE.to_string()));
                    self.go_idle();
                }
                EndOutcome::Stopped => self.go_idle(),
            },
        }
    }

    fn go_idle(&mut self) {
        if self.state.listening {
            info!("Stopped listening");
            self.apply(StateDelta::ListeningChanged(false));
        }
        self.adapter.disarm_refresh();
        self.reset_interim();
    }

    fn on_results(&mut self, result_index: usize, results: &[RecognitionResult]) {
        let batch = collect_results(result_index, results);

        if batch.finals.is_empty() {
            self.set_interim(batch.interim);
            return;
        }

        for raw in &batch.finals {
            self.finalize(raw);
        }
        self.reset_interim();
    }

    // === Interim path ===

    fn set_interim(&mut self, text: String) {
        if text == self.state.interim.transcript {
            return;
        }
        self.apply(StateDelta::InterimTranscript(text.clone()));

        let was_pending = self.interim_translation.is_pending();
        match self.interim_translation.schedule(&text, &self.tx) {
            ScheduleOutcome::Cleared => self.apply(StateDelta::InterimTranslationCleared),
            ScheduleOutcome::Unchanged => {}
            ScheduleOutcome::Scheduled(_) if was_pending => {
                self.telemetry.record(TelemetryEvent::DebounceRescheduled {
                    kind: EnrichmentKind::Translation,
                });
            }
            ScheduleOutcome::Scheduled(_) => {}
        }

        let was_pending = self.interim_answer.is_pending();
        match self.interim_answer.schedule(&text, &self.tx) {
            ScheduleOutcome::Cleared => self.apply(StateDelta::InterimAnswerCleared),
            ScheduleOutcome::Unchanged => {}
            ScheduleOutcome::Scheduled(_) if was_pending => {
                self.telemetry.record(TelemetryEvent::DebounceRescheduled {
                    kind: EnrichmentKind::Answer,
                });
            }
            ScheduleOutcome::Scheduled(_) => {}
        }
    }

    fn reset_interim(&mut self) {
        self.interim_translation.cancel();
        self.interim_answer.cancel();
        if !self.state.interim.is_empty() {
            self.apply(StateDelta::InterimReset);
        }
    }

    fn on_debounce(&mut self, kind: EnrichmentKind, generation: u64) {
        match kind {
            EnrichmentKind::Translation => {
                let Some(Dispatch {
                    generation,
                    text,
                    token,
                }) = self.interim_translation.fire(generation)
                else {
                    return;
                };
                debug!(generation, "Interim translation dispatched");
                self.apply(StateDelta::InterimTranslating);
                self.record_dispatch(kind, EnrichmentPath::Interim);

                let service = self.service.clone();
                spawn_guarded(
                    &self.tx,
                    token,
                    async move { service.translate(&text).await },
                    move |outcome| Event::InterimTranslated { generation, outcome },
                );
            }
            EnrichmentKind::Answer => {
                let Some(Dispatch {
                    generation,
                    text,
                    token,
                }) = self.interim_answer.fire(generation)
                else {
                    return;
                };
                debug!(generation, "Interim answer dispatched");
                self.apply(StateDelta::InterimAnswering);
                self.record_dispatch(kind, EnrichmentPath::Interim);

                let request = AnswerRequest {
                    text,
                    history: self
                        .state
                        .segments
                        .history(Some(self.config.interim_history_limit)),
                    custom_prompt: self.state.answer_prompt.clone(),
                };
                let service = self.service.clone();
                spawn_guarded(
                    &self.tx,
                    token,
                    async move { service.detect_answer(&request).await },
                    move |outcome| Event::InterimAnswered { generation, outcome },
                );
            }
        }
    }

    fn on_interim_translated(&mut self, generation: u64, outcome: Result<String, EnrichmentError>) {
        if !self.interim_translation.settle(generation) {
            debug!(generation, "Stale interim translation discarded");
            self.telemetry.record(TelemetryEvent::StaleDiscarded {
                kind: EnrichmentKind::Translation,
            });
            return;
        }
        match outcome {
            Ok(translation) => {
                self.record_outcome(EnrichmentKind::Translation, EnrichmentPath::Interim, true);
                self.apply(StateDelta::InterimTranslated(translation));
            }
            Err(e) if e.is_canceled() => {}
            Err(e) => {
                warn!("Interim translation failed: {}", e);
                self.record_outcome(EnrichmentKind::Translation, EnrichmentPath::Interim, false);
                self.apply(StateDelta::InterimTranslationFailed);
            }
        }
    }

    fn on_interim_answered(&mut self, generation: u64, outcome: Result<AnswerDetection, EnrichmentError>) {
        if !self.interim_answer.settle(generation) {
            debug!(generation, "Stale interim answer discarded");
            self.telemetry.record(TelemetryEvent::StaleDiscarded {
                kind: EnrichmentKind::Answer,
            });
            return;
        }
        match outcome {
            Ok(detection) => {
                self.record_outcome(EnrichmentKind::Answer, EnrichmentPath::Interim, true);
                self.apply(StateDelta::InterimAnswered(detection));
            }
            Err(e) if e.is_canceled() => {}
            Err(e) => {
                warn!("Interim answer failed: {}", e);
                self.record_outcome(EnrichmentKind::Answer, EnrichmentPath::Interim, false);
                self.apply(StateDelta::InterimAnswerFailed);
            }
        }
    }

    // === Finalization path ===

    fn finalize(&mut self, raw: &str) {
        let english = raw.trim();
        if english.is_empty() {
            debug!("Empty final fragment skipped");
            self.telemetry.record(TelemetryEvent::EmptyFinalSkipped);
            return;
        }

        // Context is everything committed before this segment, including
        // earlier fragments of the same result cycle.
        let history = self.state.segments.history(None);
        let segment = Segment::new(english);
        let id = segment.id.clone();
        info!(segment = %id, "Segment committed");

        self.apply(StateDelta::SegmentAppended(segment));
        self.telemetry.record(TelemetryEvent::SegmentCommitted);
        self.apply(StateDelta::SegmentAnswering(id.clone()));

        let scope = self.segment_scope.child_token();

        self.record_dispatch(EnrichmentKind::Translation, EnrichmentPath::Final);
        let service = self.service.clone();
        let text = english.to_string();
        let translated_id = id.clone();
        spawn_guarded(
            &self.tx,
            scope.clone(),
            async move { service.translate(&text).await },
            move |outcome| Event::SegmentTranslated {
                id: translated_id,
                outcome,
            },
        );

        self.record_dispatch(EnrichmentKind::Answer, EnrichmentPath::Final);
        let service = self.service.clone();
        let request = AnswerRequest {
            text: english.to_string(),
            history,
            custom_prompt: self.state.answer_prompt.clone(),
        };
        spawn_guarded(
            &self.tx,
            scope,
            async move { service.detect_answer(&request).await },
            move |outcome| Event::SegmentAnswered { id, outcome },
        );
    }

    fn on_segment_translated(&mut self, id: SegmentId, outcome: Result<String, EnrichmentError>) {
        let outcome = match outcome {
            Ok(translation) => {
                self.record_outcome(EnrichmentKind::Translation, EnrichmentPath::Final, true);
                Ok(translation)
            }
            Err(e) if e.is_canceled() => return,
            Err(e) => {
                warn!(segment = %id, "Translation failed: {}", e);
                self.record_outcome(EnrichmentKind::Translation, EnrichmentPath::Final, false);
                Err(e.user_message(TRANSLATION_FAILED_MESSAGE))
            }
        };
        self.apply(StateDelta::SegmentTranslated { id, outcome });
    }

    fn on_segment_answered(&mut self, id: SegmentId, outcome: Result<AnswerDetection, EnrichmentError>) {
        let outcome = match outcome {
            Ok(detection) => {
                self.record_outcome(EnrichmentKind::Answer, EnrichmentPath::Final, true);
                Ok(detection)
            }
            Err(e) if e.is_canceled() => return,
            Err(e) => {
                warn!(segment = %id, "Answer failed: {}", e);
                self.record_outcome(EnrichmentKind::Answer, EnrichmentPath::Final, false);
                Err(e.user_message(ANSWER_FAILED_MESSAGE))
            }
        };
        self.apply(StateDelta::SegmentAnswered { id, outcome });
    }

    fn record_dispatch(&mut self, kind: EnrichmentKind, path: EnrichmentPath) {
        self.telemetry.record(TelemetryEvent::RequestDispatched { kind, path });
    }

    fn record_outcome(&mut self, kind: EnrichmentKind, path: EnrichmentPath, ok: bool) {
        let event = if ok {
            TelemetryEvent::RequestSucceeded { kind, path }
        } else {
            TelemetryEvent::RequestFailed { kind, path }
        };
        self.telemetry.record(event);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.liveness.cancel();
        self.adapter.teardown();
    }
}

/// Run `request` in the background and report its outcome unless `token`
/// is canceled first. A canceled request never reports anything.
fn spawn_guarded<T, F, W>(tx: &EventSender, token: CancellationToken, request: F, wrap: W)
where
    T: Send + 'static,
    F: Future<Output = Result<T, EnrichmentError>> + Send + 'static,
    W: FnOnce(Result<T, EnrichmentError>) -> Event + Send + 'static,
{
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => {}
            outcome = request => {
                if !token.is_cancelled() {
                    let _ = tx.send(wrap(outcome));
                }
            }
        }
    });
}
