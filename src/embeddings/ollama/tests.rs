use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> OllamaConfig {
    let address = server.address();
    OllamaConfig {
        host: address.ip().to_string(),
        port: address.port(),
        model: "all-minilm:latest".to_string(),
        ..OllamaConfig::default()
    }
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        protocol: "http".to_string(),
        host: "test-host".to_string(),
        port: 1234,
        model: "test-model".to_string(),
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model(), "test-model");
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
}

#[test]
fn model_name_matching() {
    assert!(model_names_match("all-minilm:latest", "all-minilm"));
    assert!(model_names_match("all-minilm", "all-minilm:latest"));
    assert!(model_names_match("all-minilm:l6-v2", "all-minilm:l6-v2"));
    assert!(!model_names_match("all-minilm:l6-v2", "all-minilm"));
    assert!(!model_names_match("nomic-embed-text:latest", "all-minilm"));
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_embedding_posts_model_and_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({
            "model": "all-minilm:latest",
            "input": "What model should I use?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "all-minilm:latest",
            "embeddings": [[0.25, -0.5, 1.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client should build");
    let embedding = tokio::task::spawn_blocking(move || client.embed("What model should I use?"))
        .await
        .expect("task should join")
        .expect("embedding should succeed");

    assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_embedding_reports_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client should build");
    let result = tokio::task::spawn_blocking(move || client.embed("hello"))
        .await
        .expect("task should join");

    let message = format!("{:#}", result.expect_err("500 should fail"));
    assert!(message.contains("HTTP 500"), "unexpected error: {message}");
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_embedding_rejects_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [] })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client should build");
    let result = tokio::task::spawn_blocking(move || client.embed("hello"))
        .await
        .expect("task should join");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn health_check_validates_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "all-minilm:latest", "size": 45960996, "digest": "1b226e2802db" },
                { "name": "llama3:8b" }
            ]
        })))
        .mount(&server)
        .await;

    let client = OllamaClient::new(&config_for(&server)).expect("client should build");
    let missing = OllamaClient::new(&OllamaConfig {
        model: "nomic-embed-text".to_string(),
        ..config_for(&server)
    })
    .expect("client should build");

    let (healthy, unhealthy) =
        tokio::task::spawn_blocking(move || (client.health_check(), missing.health_check()))
            .await
            .expect("task should join");

    assert!(healthy.is_ok(), "health check failed: {healthy:?}");
    assert!(unhealthy.is_err());
}
