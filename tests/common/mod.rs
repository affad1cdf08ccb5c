#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use meetline::config::SessionConfig;
use meetline::error::{EnrichmentError, RecognizerError};
use meetline::kernel::reactor::Session;
use meetline::kernel::segment::Answer;
use meetline::recognition::{
    RecognitionEvent, RecognitionResult, RecognitionSettings, RecognitionSink, SpeechRecognizer,
};
use meetline::services::{AnswerDetection, AnswerRequest, AudioClip, BatchTranscript, EnrichmentService};

/// Scriptable enrichment backend. Translations come back as `ZH:<text>`.
#[derive(Default)]
pub struct MockService {
    pub translate_calls: Mutex<Vec<String>>,
    pub answer_calls: Mutex<Vec<AnswerRequest>>,
    delays: Mutex<HashMap<String, Duration>>,
    translate_failures: Mutex<HashMap<String, EnrichmentError>>,
    answer_failures: Mutex<HashMap<String, EnrichmentError>>,
    questions: Mutex<HashMap<String, Answer>>,
}

impl MockService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delay(&self, text: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(text.to_string(), delay);
    }

    pub fn fail_translation(&self, text: &str, error: EnrichmentError) {
        self.translate_failures.lock().unwrap().insert(text.to_string(), error);
    }

    pub fn fail_answer(&self, text: &str, error: EnrichmentError) {
        self.answer_failures.lock().unwrap().insert(text.to_string(), error);
    }

    pub fn question(&self, text: &str, english: &str, chinese: &str) {
        self.questions.lock().unwrap().insert(
            text.to_string(),
            Answer {
                english: english.to_string(),
                chinese: chinese.to_string(),
            },
        );
    }

    pub fn translations(&self) -> Vec<String> {
        self.translate_calls.lock().unwrap().clone()
    }

    pub fn answers(&self) -> Vec<AnswerRequest> {
        self.answer_calls.lock().unwrap().clone()
    }

    async fn pause_for(&self, text: &str) {
        let delay = self.delays.lock().unwrap().get(text).copied();
        tokio::time::sleep(delay.unwrap_or(Duration::from_millis(50))).await;
    }
}

#[async_trait]
impl EnrichmentService for MockService {
    async fn translate(&self, text: &str) -> Result<String, EnrichmentError> {
        self.translate_calls.lock().unwrap().push(text.to_string());
        self.pause_for(text).await;
        if let Some(error) = self.translate_failures.lock().unwrap().get(text) {
            return Err(error.clone());
        }
        Ok(format!("ZH:{}", text))
    }

    async fn detect_answer(&self, request: &AnswerRequest) -> Result<AnswerDetection, EnrichmentError> {
        self.answer_calls.lock().unwrap().push(request.clone());
        self.pause_for(&request.text).await;
        if let Some(error) = self.answer_failures.lock().unwrap().get(&request.text) {
            return Err(error.clone());
        }
        let answer = self.questions.lock().unwrap().get(&request.text).cloned();
        Ok(match answer {
            Some(answer) => AnswerDetection::answered(answer),
            None => AnswerDetection::not_a_question(),
        })
    }

    async fn transcribe(&self, clip: AudioClip) -> Result<BatchTranscript, EnrichmentError> {
        clip.ensure_within_limit()?;
        Ok(BatchTranscript {
            english_transcript: "recorded".to_string(),
            chinese_translation: "ZH:recorded".to_string(),
        })
    }
}

/// Counters shared between a test and its [`ScriptedRecognizer`].
#[derive(Default)]
pub struct EngineCounters {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub aborts: AtomicUsize,
    settings: Mutex<Option<RecognitionSettings>>,
    active: AtomicBool,
    /// Starts beyond this count are refused.
    start_budget: AtomicUsize,
}

impl EngineCounters {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    /// What the session configured the engine with, if anything.
    pub fn settings(&self) -> Option<RecognitionSettings> {
        self.settings.lock().unwrap().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn refuse_starts_after(&self, count: usize) {
        self.start_budget.store(count, Ordering::SeqCst);
    }

    /// The engine ends the session on its own, as platforms do after silence.
    pub fn engine_ended(&self, sink: &RecognitionSink) {
        self.active.store(false, Ordering::SeqCst);
        sink.emit(RecognitionEvent::Ended);
    }
}

/// Engine that confirms start/stop immediately through its sink.
pub struct ScriptedRecognizer {
    sink: RecognitionSink,
    engine: Arc<EngineCounters>,
}

impl ScriptedRecognizer {
    pub fn new(sink: RecognitionSink) -> (Self, Arc<EngineCounters>) {
        let engine = Arc::new(EngineCounters::default());
        engine.start_budget.store(usize::MAX, Ordering::SeqCst);
        (
            Self {
                sink,
                engine: engine.clone(),
            },
            engine,
        )
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn configure(&mut self, settings: &RecognitionSettings) {
        *self.engine.settings.lock().unwrap() = Some(settings.clone());
    }

    fn start(&mut self) -> Result<(), RecognizerError> {
        let attempt = self.engine.starts.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.engine.start_budget.load(Ordering::SeqCst) {
            return Err(RecognizerError::Engine("engine busy".to_string()));
        }
        if self.engine.active.swap(true, Ordering::SeqCst) {
            return Err(RecognizerError::AlreadyStarted);
        }
        self.sink.emit(RecognitionEvent::Started);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecognizerError> {
        self.engine.stops.fetch_add(1, Ordering::SeqCst);
        if self.engine.active.swap(false, Ordering::SeqCst) {
            self.sink.emit(RecognitionEvent::Ended);
        }
        Ok(())
    }

    fn abort(&mut self) {
        self.engine.aborts.fetch_add(1, Ordering::SeqCst);
        if self.engine.active.swap(false, Ordering::SeqCst) {
            self.sink.emit(RecognitionEvent::Error {
                kind: "aborted".to_string(),
            });
            self.sink.emit(RecognitionEvent::Ended);
        }
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        debounce_ms: 600,
        ..SessionConfig::default()
    }
}

/// A session with a scripted engine attached, not yet listening.
pub fn session_with(service: Arc<MockService>) -> (Session, RecognitionSink, Arc<EngineCounters>) {
    session_with_config(test_config(), service)
}

pub fn session_with_config(
    config: SessionConfig,
    service: Arc<MockService>,
) -> (Session, RecognitionSink, Arc<EngineCounters>) {
    let mut session = Session::new(config, service);
    let sink = session.handle().sink();
    let (recognizer, engine) = ScriptedRecognizer::new(sink.clone());
    session.attach_recognizer(Box::new(recognizer));
    (session, sink, engine)
}

/// A listening session.
pub async fn listening_session(service: Arc<MockService>) -> (Session, RecognitionSink, Arc<EngineCounters>) {
    let (mut session, sink, engine) = session_with(service);
    session.handle().start();
    drive_until(&mut session, |s| s.state.listening).await;
    (session, sink, engine)
}

pub fn say_interim(sink: &RecognitionSink, text: &str) {
    sink.emit(RecognitionEvent::Result {
        result_index: 0,
        results: vec![RecognitionResult::interim(text)],
    });
}

pub fn say_final(sink: &RecognitionSink, texts: &[&str]) {
    sink.emit(RecognitionEvent::Result {
        result_index: 0,
        results: texts.iter().map(|t| RecognitionResult::finalized(*t)).collect(),
    });
}

/// Pump events until `done` holds. Fails after 30s (virtual when paused).
pub async fn drive_until<F>(session: &mut Session, mut done: F)
where
    F: FnMut(&Session) -> bool,
{
    let reached = tokio::time::timeout(Duration::from_secs(30), async {
        while !done(&*session) {
            if !session.pump().await {
                break;
            }
        }
    })
    .await;
    assert!(reached.is_ok(), "condition not reached within 30s");
}

/// Pump whatever arrives during the next `period`.
pub async fn run_for(session: &mut Session, period: Duration) {
    let deadline = Instant::now() + period;
    while let Ok(true) = tokio::time::timeout_at(deadline, session.pump()).await {}
}
