mod common;

use common::{overloaded, ScriptedProvider, TestApp};
use health_assistant_service::services::providers::ProviderError;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn chat_returns_model_answer() {
    let provider = ScriptedProvider::answering("Drink water regularly.");
    let app = TestApp::spawn(provider.clone()).await;

    let response = app
        .post_json(
            "/api/chat",
            &json!({
                "message": "How much water should I drink?",
                "history": [
                    { "role": "user", "content": "Hi" },
                    { "role": "assistant", "content": "Hello! How can I help?" }
                ]
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["response"], "Drink water regularly.");

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(
        "Previous conversation:\nUser: Hi\nAssistant: Hello! How can I help?\nUser: How much water should I drink?\nAssistant:"
    ));
    assert!(prompts[0].starts_with("You are a virtual assistant specialised in health."));
}

#[tokio::test]
async fn chat_without_history_uses_empty_context() {
    let provider = ScriptedProvider::answering("OK");
    let app = TestApp::spawn(provider.clone()).await;

    let response = app.post_json("/api/chat", &json!({ "message": "Hello" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(provider.prompts()[0].ends_with("Previous conversation:\n\nUser: Hello\nAssistant:"));
}

#[tokio::test]
async fn chat_rejects_missing_message_without_calling_model() {
    let provider = ScriptedProvider::answering("OK");
    let app = TestApp::spawn(provider.clone()).await;

    for body in [
        json!({}),
        json!({ "message": "" }),
        json!({ "message": "   " }),
        json!({ "history": [] }),
    ] {
        let response = app.post_json("/api/chat", &body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn chat_rejects_malformed_json() {
    let provider = ScriptedProvider::answering("OK");
    let app = TestApp::spawn(provider.clone()).await;

    let response = app
        .client
        .post(format!("{}/api/chat", app.address))
        .header("Content-Type", "application/json")
        .body("{\"message\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON body");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn chat_retries_while_model_is_overloaded() {
    let provider = ScriptedProvider::new(vec![
        overloaded(),
        overloaded(),
        Ok("Eat more vegetables.".to_string()),
    ]);
    let app = TestApp::spawn(provider.clone()).await;

    let response = app.post_json("/api/chat", &json!({ "message": "Diet tips?" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["response"], "Eat more vegetables.");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn chat_gives_up_after_max_attempts() {
    let provider = ScriptedProvider::new(vec![overloaded(), overloaded(), overloaded(), overloaded()]);
    let app = TestApp::spawn(provider.clone()).await;

    let response = app.post_json("/api/chat", &json!({ "message": "Hello" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Model service error");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn chat_does_not_retry_permanent_failures() {
    let provider = ScriptedProvider::new(vec![
        Err(ProviderError::InvalidRequest("bad prompt".to_string())),
        Ok("never returned".to_string()),
    ]);
    let app = TestApp::spawn(provider.clone()).await;

    let response = app.post_json("/api/chat", &json!({ "message": "Hello" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn chat_rate_limit_is_not_retried() {
    let provider = ScriptedProvider::new(vec![Err(ProviderError::RateLimited)]);
    let app = TestApp::spawn(provider.clone()).await;

    let response = app.post_json("/api/chat", &json!({ "message": "Hello" })).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn chat_serves_fallback_message_when_configured() {
    let provider = ScriptedProvider::new(vec![overloaded(), overloaded(), overloaded()]);
    let app = TestApp::spawn_with(
        provider.clone(),
        &[
            ("MODEL_FAILURE_POLICY", "fallback"),
            ("MODEL_FALLBACK_MESSAGE", "Please try again later."),
        ],
    )
    .await;

    let response = app.post_json("/api/chat", &json!({ "message": "Hello" })).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["response"], "Please try again later.");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn chat_keeps_only_recent_history_when_limited() {
    let provider = ScriptedProvider::answering("OK");
    let app = TestApp::spawn_with(provider.clone(), &[("MAX_HISTORY_TURNS", "2")]).await;

    let response = app
        .post_json(
            "/api/chat",
            &json!({
                "message": "And now?",
                "history": [
                    { "role": "user", "content": "first" },
                    { "role": "assistant", "content": "second" },
                    { "role": "user", "content": "third" },
                    { "role": "model", "content": "fourth" }
                ]
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let prompt = &provider.prompts()[0];
    assert!(!prompt.contains("first"));
    assert!(!prompt.contains("second"));
    assert!(prompt.contains("User: third\nAssistant: fourth\nUser: And now?"));
}

#[tokio::test]
async fn chat_tolerates_malformed_history_turns() {
    let provider = ScriptedProvider::answering("OK");
    let app = TestApp::spawn(provider.clone()).await;

    let response = app
        .post_json(
            "/api/chat",
            &json!({
                "message": "Hi",
                "history": [
                    { "content": "no role" },
                    { "role": null, "content": "null role" },
                    { "role": "user", "content": null }
                ]
            }),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(provider.calls(), 1);
    assert!(provider.prompts()[0].contains(
        "Previous conversation:\nAssistant: no role\nAssistant: null role\nUser: \nUser: Hi\nAssistant:"
    ));
}

#[tokio::test]
async fn chat_accepts_null_history() {
    let provider = ScriptedProvider::answering("OK");
    let app = TestApp::spawn(provider.clone()).await;

    let response = app
        .post_json("/api/chat", &json!({ "message": "Hi", "history": null }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
}
