use base64::Engine as _;
use chat_gateway::{
    ai::{GeminiCompletionProvider, MockCompletionProvider, ProviderError},
    app::{App, AppServices},
    config::GatewayConfig,
    gateway::CandidateOrder,
    models::{ChatRequest, ChatResponse, ConversationTurn, Credential, ResponseBody},
    prompts,
    quick_reply::QuickReplyTable,
};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_with_keys(keys: &[&str]) -> GatewayConfig {
    GatewayConfig {
        credentials: keys.iter().map(|k| Credential::new(*k)).collect(),
        quick_replies: QuickReplyTable::builtin().unwrap(),
        ..GatewayConfig::default()
    }
}

fn mock_app(provider: &MockCompletionProvider) -> App {
    App::with_services(
        config_with_keys(&["integration-key-0001"]),
        AppServices::new(Arc::new(provider.clone())),
    )
}

fn reply_of(response: &ChatResponse) -> (&str, Option<&str>) {
    match &response.body {
        ResponseBody::Reply { reply, title } => (reply.as_str(), title.as_deref()),
        other => panic!("expected a reply, got {:?}", other),
    }
}

fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let mut docx = docx_rs::Docx::new();
    for text in paragraphs {
        docx = docx.add_paragraph(
            docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text)),
        );
    }
    let mut cursor = Cursor::new(Vec::new());
    docx.build().pack(&mut cursor).unwrap();
    cursor.into_inner()
}

fn with_upload(message: &str, mime_type: &str, bytes: &[u8]) -> String {
    serde_json::json!({
        "history": [],
        "message": message,
        "fileData": format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes)
        ),
    })
    .to_string()
}

fn gemini_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
}

#[tokio::test]
async fn test_greeting_is_answered_without_provider_call() {
    let provider = MockCompletionProvider::new();
    let app = mock_app(&provider);

    let response = app
        .handle_json(r#"{"history": [], "message": "Halo!"}"#)
        .await;

    assert_eq!(response.status, 200);
    let (reply, title) = reply_of(&response);
    assert!(reply.contains("Kang Ajie"));
    assert_eq!(title, None);
    assert_eq!(provider.get_call_count(), 0);
}

#[tokio::test]
async fn test_math_question_carries_step_by_step_persona() {
    let provider = MockCompletionProvider::new()
        .with_reply("Langkah 1: 30% = 0,3. Langkah 2: 650.000.000 × 0,3 = 195.000.000.")
        .with_reply("Hitung Tiga Puluh Persen");
    let app = mock_app(&provider);

    let response = app
        .handle_json(r#"{"history": [], "message": "berapa 650000000 x 30%"}"#)
        .await;

    assert_eq!(response.status, 200);
    let (reply, title) = reply_of(&response);
    assert!(reply.contains("195.000.000"));
    assert_eq!(title, Some("Hitung Tiga Puluh Persen"));

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0]
        .prompt_text
        .contains("Matematika: Jelaskan langkah demi langkah."));
    assert!(calls[0]
        .prompt_text
        .ends_with("User: berapa 650000000 x 30%"));
}

#[tokio::test]
async fn test_word_document_text_is_injected_into_prompt() {
    let provider = MockCompletionProvider::new();
    let app = mock_app(&provider);
    let body = with_upload(
        "ringkas dokumen ini",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &docx_bytes(&["Notulen Rapat", "Anggaran disetujui sebesar 20 juta."]),
    );

    let response = app.handle_json(&body).await;

    assert_eq!(response.status, 200);
    let prompt = &provider.calls()[0].prompt_text;
    assert!(prompt.contains("[ISI FILE WORD]:\nNotulen Rapat\nAnggaran disetujui sebesar 20 juta."));
    assert!(!provider.calls()[0].has_binary);
}

#[tokio::test]
async fn test_corrupt_word_document_does_not_fail_the_turn() {
    let provider = MockCompletionProvider::new().with_reply("Maaf, filenya tidak bisa dibaca.");
    let app = mock_app(&provider);
    let body = with_upload("cek file ini", "application/msword", b"this is not a docx");

    let response = app.handle_json(&body).await;

    assert_eq!(response.status, 200);
    assert_eq!(reply_of(&response).0, "Maaf, filenya tidak bisa dibaca.");
    let prompt = &provider.calls()[0].prompt_text;
    assert!(prompt.contains("tidak bisa dibaca"));
    assert!(!prompt.contains("[ISI FILE"));
}

#[tokio::test]
async fn test_image_is_sent_as_binary_with_placeholder_message() {
    let provider = MockCompletionProvider::new();
    let app = mock_app(&provider);
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let body = with_upload("", "image/png", &png);

    let response = app.handle_json(&body).await;

    assert_eq!(response.status, 200);
    let call = &provider.calls()[0];
    assert!(call.has_binary);
    assert!(call
        .prompt_text
        .ends_with(&format!("User: {}", prompts::EMPTY_MESSAGE_PLACEHOLDER)));
}

#[tokio::test]
async fn test_greeting_with_attachment_still_reaches_provider() {
    let provider = MockCompletionProvider::new();
    let app = mock_app(&provider);
    let body = with_upload("halo", "text/plain", b"catatan belanja: telur, beras");

    app.handle_json(&body).await;

    assert!(provider.get_call_count() >= 1);
    assert!(provider.calls()[0]
        .prompt_text
        .contains("[ISI FILE TEXT]:\ncatatan belanja: telur, beras"));
}

#[tokio::test]
async fn test_no_title_for_ongoing_conversation() {
    let provider = MockCompletionProvider::new().with_reply("Lanjut ke bab dua.");
    let app = mock_app(&provider);

    let mut request = ChatRequest::new("lanjutkan");
    request.history = vec![
        ConversationTurn::user("jelaskan bab satu"),
        ConversationTurn::model("Bab satu membahas pengantar."),
    ];

    let response = app.handle(request).await;

    assert_eq!(reply_of(&response), ("Lanjut ke bab dua.", None));
    assert_eq!(provider.get_call_count(), 1);
    assert!(provider.calls()[0]
        .prompt_text
        .contains("User: jelaskan bab satu\nModel: Bab satu membahas pengantar."));
}

#[tokio::test]
async fn test_title_failure_keeps_the_reply() {
    let provider = MockCompletionProvider::new()
        .with_reply("Ini jawabannya.")
        .with_error(ProviderError::Network("connection reset".to_string()));
    let app = mock_app(&provider);

    let response = app.handle(ChatRequest::new("apa itu inflasi")).await;

    assert_eq!(response.status, 200);
    assert_eq!(reply_of(&response), ("Ini jawabannya.", None));
    assert_eq!(provider.get_call_count(), 2);
}

#[tokio::test]
async fn test_quota_fallback_moves_to_next_credential() {
    let provider = MockCompletionProvider::new()
        .with_quota_exhausted()
        .with_reply("Jawaban dari kunci kedua.");
    let app = App::with_services(
        GatewayConfig {
            title_generation: false,
            ..config_with_keys(&["first-key-aaaa", "second-key-bbbb"])
        },
        AppServices::new(Arc::new(provider.clone())),
    );

    let response = app.handle(ChatRequest::new("apa itu inflasi")).await;

    assert_eq!(reply_of(&response).0, "Jawaban dari kunci kedua.");
    let keys: Vec<String> = provider
        .calls()
        .into_iter()
        .map(|c| c.credential.expose().to_string())
        .collect();
    assert_eq!(keys, vec!["first-key-aaaa", "second-key-bbbb"]);
}

#[tokio::test]
async fn test_invalid_history_role_is_rejected() {
    let provider = MockCompletionProvider::new();
    let app = mock_app(&provider);

    let response = app
        .handle_json(r#"{"history": [{"role": "system", "text": "x"}], "message": "hai lagi"}"#)
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(provider.get_call_count(), 0);
}

#[tokio::test]
async fn test_gemini_fallback_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "first-key-aaaa"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .and(header("x-goog-api-key", "second-key-bbbb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("Halo dari Gemini.")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiCompletionProvider::new().with_base_url(server.uri());
    let app = App::with_services(
        GatewayConfig {
            candidate_order: CandidateOrder::ModelMajor,
            ..config_with_keys(&["first-key-aaaa", "second-key-bbbb"])
        },
        AppServices::new(Arc::new(provider)),
    );

    let mut request = ChatRequest::new("jelaskan inflasi singkat");
    request.history = vec![
        ConversationTurn::user("hai"),
        ConversationTurn::model("Hai! Ada yang bisa dibantu?"),
    ];
    let response = app.handle(request).await;

    assert_eq!(response.status, 200);
    assert_eq!(reply_of(&response), ("Halo dari Gemini.", None));
}

#[tokio::test]
async fn test_gemini_auth_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = GeminiCompletionProvider::new().with_base_url(server.uri());
    let app = App::with_services(
        config_with_keys(&["bad-key-aaaa", "other-key-bbbb"]),
        AppServices::new(Arc::new(provider)),
    );

    let response = app.handle(ChatRequest::new("jelaskan inflasi")).await;

    assert_eq!(response.status, 500);
    assert!(matches!(
        response.body,
        ResponseBody::Error { ref error, detail: None } if error == prompts::GENERIC_FAILURE
    ));
}

#[tokio::test]
async fn test_upload_without_media_type_is_ignored() {
    let provider = MockCompletionProvider::new();
    let app = App::with_services(
        GatewayConfig {
            title_generation: false,
            ..config_with_keys(&["integration-key-0001"])
        },
        AppServices::new(Arc::new(provider.clone())),
    );
    let body = serde_json::json!({
        "history": [],
        "message": "apa isi file ini",
        "fileData": base64::engine::general_purpose::STANDARD.encode(b"catatan rahasia"),
    })
    .to_string();

    let response = app.handle_json(&body).await;

    assert_eq!(response.status, 200);
    assert_eq!(provider.get_call_count(), 1);
    let first = &provider.calls()[0];
    assert!(!first.has_binary);
    assert!(!first.prompt_text.contains("[ISI FILE"));
    assert!(!first.prompt_text.contains("tidak bisa dibaca"));
    assert!(first.prompt_text.ends_with("User: apa isi file ini"));
}

#[tokio::test]
async fn test_data_url_without_base64_degrades_to_note() {
    let provider = MockCompletionProvider::new().with_reply("Maaf, filenya tidak terbaca.");
    let app = App::with_services(
        GatewayConfig {
            title_generation: false,
            ..config_with_keys(&["integration-key-0001"])
        },
        AppServices::new(Arc::new(provider.clone())),
    );
    let body = serde_json::json!({
        "history": [],
        "message": "baca ini",
        "fileData": "data:text/plain,hello",
    })
    .to_string();

    let response = app.handle_json(&body).await;

    assert_eq!(response.status, 200);
    assert_eq!(reply_of(&response).0, "Maaf, filenya tidak terbaca.");
    assert_eq!(provider.get_call_count(), 1);
    let prompt = &provider.calls()[0].prompt_text;
    assert!(prompt.contains("tidak bisa dibaca (upload data URL is not base64 encoded)"));
}
