mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::drive_until;
use meetline::config::{OpenAiConfig, SessionConfig};
use meetline::error::EnrichmentError;
use meetline::kernel::reactor::Session;
use meetline::kernel::segment::{AnswerState, TranslationState};
use meetline::recognition::ConsoleRecognizer;
use meetline::services::{
    AnswerRequest, AudioClip, DirectCompletionService, EnrichmentService, HistoryEntry,
    HttpEnrichmentClient, MAX_AUDIO_BYTES,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn request(text: &str) -> AnswerRequest {
    AnswerRequest {
        text: text.to_string(),
        history: vec![HistoryEntry {
            english: "We moved the launch.".to_string(),
            chinese: None,
        }],
        custom_prompt: "Be brief.".to_string(),
    }
}

// === Meeting service endpoints ===

#[tokio::test]
async fn test_translate_posts_text_and_reads_translation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .and(body_json(json!({ "text": "Good morning" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "translation": "早上好" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpEnrichmentClient::new(server.uri(), TIMEOUT);
    assert_eq!(client.translate("Good morning").await.unwrap(), "早上好");
}

#[tokio::test]
async fn test_translate_without_field_reads_as_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "translation": 42 })))
        .mount(&server)
        .await;

    let client = HttpEnrichmentClient::new(format!("{}/", server.uri()), TIMEOUT);
    assert_eq!(client.translate("Hi").await.unwrap(), "");
}

#[tokio::test]
async fn test_error_body_becomes_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": "rate limited" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/answer"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal server error"))
        .mount(&server)
        .await;

    let client = HttpEnrichmentClient::new(server.uri(), TIMEOUT);
    assert_eq!(
        client.translate("Hi").await.unwrap_err(),
        EnrichmentError::Service("rate limited".to_string())
    );
    assert_eq!(
        client.detect_answer(&request("Hi?")).await.unwrap_err(),
        EnrichmentError::Status(500)
    );
}

#[tokio::test]
async fn test_answer_request_shape_and_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/answer"))
        .and(body_partial_json(json!({
            "text": "Is it Friday?",
            "history": [{ "english": "We moved the launch.", "chinese": null }],
            "customPrompt": "Be brief."
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "isQuestion": true, "answer": { "english": "Yes." } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/answer"))
        .and(body_partial_json(json!({ "text": "Noted." })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "isQuestion": false, "answer": { "english": "ignored" } })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/answer"))
        .and(body_partial_json(json!({ "text": "Really?" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isQuestion": true })))
        .mount(&server)
        .await;

    let client = HttpEnrichmentClient::new(server.uri(), TIMEOUT);

    let detection = client.detect_answer(&request("Is it Friday?")).await.unwrap();
    assert!(detection.is_question);
    let answer = detection.answer.unwrap();
    assert_eq!(answer.english, "Yes.");
    assert_eq!(answer.chinese, "");

    let detection = client.detect_answer(&request("Noted.")).await.unwrap();
    assert!(!detection.is_question);
    assert_eq!(detection.answer, None);

    let detection = client.detect_answer(&request("Really?")).await.unwrap();
    assert!(detection.is_question);
    assert_eq!(detection.answer, None);
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = HttpEnrichmentClient::new(server.uri(), TIMEOUT);
    let error = client.translate("Hi").await.unwrap_err();
    assert!(matches!(error, EnrichmentError::Decode(_)), "got {:?}", error);
}

#[tokio::test]
async fn test_transcribe_uploads_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/transcribe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "englishTranscript": "Welcome everyone.",
            "chineseTranslation": "欢迎大家。"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpEnrichmentClient::new(server.uri(), TIMEOUT);
    let transcript = client
        .transcribe(AudioClip::new("standup.wav", vec![0u8; 1024]))
        .await
        .unwrap();
    assert_eq!(transcript.english_transcript, "Welcome everyone.");
    assert_eq!(transcript.chinese_translation, "欢迎大家。");
}

#[tokio::test]
async fn test_oversized_audio_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = HttpEnrichmentClient::new(server.uri(), TIMEOUT);
    let error = client
        .transcribe(AudioClip::new("long.webm", vec![0u8; MAX_AUDIO_BYTES + 1]))
        .await
        .unwrap_err();
    assert!(matches!(error, EnrichmentError::AudioTooLarge { .. }));
}

#[tokio::test]
async fn test_rate_limited_translation_marks_segment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/translate"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({ "error": "rate limited" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/answer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "isQuestion": false })))
        .mount(&server)
        .await;

    let config = SessionConfig {
        service_url: server.uri(),
        debounce_ms: 50,
        ..SessionConfig::default()
    };
    let service = Arc::new(HttpEnrichmentClient::new(config.service_url.clone(), TIMEOUT));
    let mut session = Session::new(config, service);
    let (recognizer, feed) = ConsoleRecognizer::new(session.handle().sink());
    session.attach_recognizer(Box::new(recognizer));

    session.handle().start();
    drive_until(&mut session, |s| s.state.listening).await;
    assert!(feed.push("Let's ship it."));

    drive_until(&mut session, |s| {
        s.state
            .segments
            .segments()
            .first()
            .map(|seg| seg.translation_state != TranslationState::Translating && seg.answer_state == AnswerState::Done)
            .unwrap_or(false)
    })
    .await;

    let segment = &session.state.segments.segments()[0];
    assert_eq!(segment.translation_state, TranslationState::Error);
    assert_eq!(segment.translation_error.as_deref(), Some("rate limited"));
    assert_eq!(segment.chinese, None);
    assert!(!segment.is_question);
}

// === Direct completion backend ===

fn direct(server: &MockServer) -> DirectCompletionService {
    let mut config = OpenAiConfig::new("sk-test");
    config.base_url = server.uri();
    DirectCompletionService::new(config, TIMEOUT).unwrap()
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

#[tokio::test]
async fn test_direct_translate_uses_bearer_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({ "model": "gpt-4o-mini" })))
        .respond_with(completion("  你好  "))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(direct(&server).translate("Hello").await.unwrap(), "你好");
}

#[tokio::test]
async fn test_direct_answer_detects_then_answers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "max_tokens": 10 })))
        .respond_with(completion("TRUE"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "max_tokens": 500,
            "messages": [
                { "role": "system", "content": "Be brief." },
                { "role": "user", "content": "Previous: We moved the launch." }
            ]
        })))
        .respond_with(completion("Next Tuesday.\n---SEPARATOR---\n下周二。"))
        .expect(1)
        .mount(&server)
        .await;

    let detection = direct(&server).detect_answer(&request("When is launch?")).await.unwrap();
    assert!(detection.is_question);
    let answer = detection.answer.unwrap();
    assert_eq!(answer.english, "Next Tuesday.");
    assert_eq!(answer.chinese, "下周二。");
}

#[tokio::test]
async fn test_direct_answer_stops_when_not_a_question() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("false"))
        .expect(1)
        .mount(&server)
        .await;

    let detection = direct(&server).detect_answer(&request("Thanks all.")).await.unwrap();
    assert!(!detection.is_question);
    assert_eq!(detection.answer, None);
}

#[tokio::test]
async fn test_direct_upstream_error_message_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "error": { "message": "Incorrect API key provided" } })),
        )
        .mount(&server)
        .await;

    assert_eq!(
        direct(&server).translate("Hello").await.unwrap_err(),
        EnrichmentError::Service("Incorrect API key provided".to_string())
    );
}

#[tokio::test]
async fn test_direct_transcribe_then_translates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": " Hello everyone. " })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(completion("大家好。"))
        .expect(1)
        .mount(&server)
        .await;

    let transcript = direct(&server)
        .transcribe(AudioClip::new("call.m4a", vec![1u8; 2048]))
        .await
        .unwrap();
    assert_eq!(transcript.english_transcript, "Hello everyone.");
    assert_eq!(transcript.chinese_translation, "大家好。");
}
