use std::time::Duration;

use azure_chat::{
    AzureOpenAiClient, AzureOpenAiConfig, ChatCompletions, ChatError, GenerationConfig,
    HttpClientConfig, Message,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, Request as WiremockRequest, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

const DEPLOYMENT: &str = "gpt-4o";
const COMPLETIONS_PATH: &str = "/openai/deployments/gpt-4o/chat/completions";

fn completion_body(text: &str) -> Value {
    json!({
        "id": "chatcmpl-abc",
        "object": "chat.completion",
        "created": 1_715_000_000,
        "model": "gpt-4o-2024-05-13",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": { "role": "assistant", "content": text }
        }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
    })
}

fn config_for(server: &MockServer, api_key: &str) -> AzureOpenAiConfig {
    AzureOpenAiConfig::new(server.uri(), DEPLOYMENT.to_string(), api_key.to_string())
}

fn client_for(server: &MockServer, http_config: Option<HttpClientConfig>) -> AzureOpenAiClient {
    let mut config = config_for(server, "test-key");
    if let Some(http_config) = http_config {
        config = config.with_http_config(http_config);
    }
    AzureOpenAiClient::new(config).expect("client")
}

fn parse_body(request: &WiremockRequest) -> Value {
    serde_json::from_slice(&request.body).expect("request body should be JSON")
}

#[tokio::test]
async fn sends_key_header_api_version_and_single_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(query_param("api-version", "2024-05-01-preview"))
        .and(header("api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Hola")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let completion = client
        .complete(DEPLOYMENT, &[Message::user("What is Rust?")])
        .await
        .expect("completion");

    assert_eq!(completion.first_text().unwrap(), "Hola");
    assert_eq!(completion.usage.unwrap().total_tokens, 15);

    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1);
    assert_eq!(
        parse_body(&requests[0]),
        json!({
            "model": "gpt-4o",
            "messages": [{
                "role": "user",
                "content": [{ "type": "text", "text": "What is Rust?" }]
            }]
        })
    );
}

#[tokio::test]
async fn generation_parameters_are_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("ok")))
        .mount(&server)
        .await;

    let config = config_for(&server, "test-key").with_generation_config(GenerationConfig {
        max_tokens: Some(800),
        top_p: Some(0.95),
        ..Default::default()
    });
    let client = AzureOpenAiClient::new(config).expect("client");
    client
        .complete(DEPLOYMENT, &[Message::user("hi")])
        .await
        .expect("completion");

    let requests = server.received_requests().await.expect("recorded requests");
    let body = parse_body(&requests[0]);
    assert_eq!(body["max_tokens"], 800);
    assert!(body.get("temperature").is_none());
    assert!((body["top_p"].as_f64().unwrap() - 0.95).abs() < 1e-6);
}

#[tokio::test]
async fn rejected_key_is_an_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(COMPLETIONS_PATH))
        .and(header("api-key", "your-api-key"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "code": "401",
                "message": "Access denied due to invalid subscription key or wrong API endpoint."
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Placeholder key from an empty environment, endpoint pointed at the mock.
    let config = AzureOpenAiConfig::from_lookup(|_| None).with_endpoint(server.uri());
    let client = AzureOpenAiClient::new(config).expect("construction does not validate the key");

    let err = client
        .complete(DEPLOYMENT, &[Message::system("prime")])
        .await
        .expect_err("placeholder key must be rejected");

    assert!(matches!(
        err,
        ChatError::Authentication {
            status_code: 401,
            ..
        }
    ));
}

#[tokio::test]
async fn placeholder_endpoint_fails_on_first_call() {
    let client = AzureOpenAiClient::new(AzureOpenAiConfig::from_lookup(|_| None))
        .expect("construction does not validate the endpoint");

    let err = client
        .complete(DEPLOYMENT, &[Message::system("prime")])
        .await
        .expect_err("placeholder endpoint is not a URL");

    assert!(matches!(err, ChatError::Network { .. }));
}

#[tokio::test]
async fn unknown_deployment_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {
                "code": "DeploymentNotFound",
                "message": "The API deployment for this resource does not exist."
            }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client
        .complete("missing", &[Message::user("hi")])
        .await
        .expect_err("deployment does not exist");

    assert_eq!(err.status_code(), Some(404));
    assert!(err.to_string().contains("DeploymentNotFound"));
}

#[tokio::test]
async fn server_errors_are_not_retried_by_default() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client
        .complete(DEPLOYMENT, &[Message::user("hi")])
        .await
        .expect_err("500 should fail");

    assert_eq!(err.status_code(), Some(500));
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn configured_retries_recover_from_transient_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("recovered")))
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        Some(HttpClientConfig {
            max_retries: 1,
            initial_retry_delay: Duration::from_millis(10),
            ..Default::default()
        }),
    );
    let completion = client
        .complete(DEPLOYMENT, &[Message::user("hi")])
        .await
        .expect("second attempt succeeds");

    assert_eq!(completion.first_text().unwrap(), "recovered");
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn malformed_success_body_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client_for(&server, None);
    let err = client
        .complete(DEPLOYMENT, &[Message::user("hi")])
        .await
        .expect_err("body is not JSON");

    assert!(matches!(err, ChatError::Parse { .. }));
}

#[tokio::test]
async fn maximum_retry_count_still_reports_transport_errors() {
    let config = AzureOpenAiConfig::from_lookup(|name| match name {
        "AZURE_OPENAI_MAX_RETRIES" => Some("4294967295".to_string()),
        _ => None,
    });
    assert_eq!(config.http_config.max_retries, u32::MAX);
    let client = AzureOpenAiClient::new(config).expect("client");

    let err = client
        .complete(DEPLOYMENT, &[Message::user("hi")])
        .await
        .expect_err("placeholder endpoint is not a URL");

    match err {
        ChatError::Network { message, .. } => {
            assert_eq!(message, format!("Request failed (attempt 1/{})", u32::MAX));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn slow_response_past_timeout_is_a_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("too late"))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        Some(HttpClientConfig {
            timeout: Some(Duration::from_millis(100)),
            ..Default::default()
        }),
    );
    let err = client
        .complete(DEPLOYMENT, &[Message::user("hi")])
        .await
        .expect_err("response arrives after the timeout");

    assert!(matches!(err, ChatError::Network { .. }));
}

#[tokio::test]
async fn exhausted_retries_return_the_last_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        Some(HttpClientConfig {
            max_retries: 1,
            initial_retry_delay: Duration::from_millis(10),
            ..Default::default()
        }),
    );
    let err = client
        .complete(DEPLOYMENT, &[Message::user("hi")])
        .await
        .expect_err("both attempts fail");

    assert!(matches!(
        err,
        ChatError::Api {
            status_code: Some(503),
            ..
        }
    ));
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn client_errors_are_not_retried_even_when_retries_are_configured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": "BadRequest", "message": "Invalid message content." }
        })))
        .mount(&server)
        .await;

    let client = client_for(
        &server,
        Some(HttpClientConfig {
            max_retries: 3,
            initial_retry_delay: Duration::from_millis(10),
            ..Default::default()
        }),
    );
    let err = client
        .complete(DEPLOYMENT, &[Message::user("hi")])
        .await
        .expect_err("400 is fatal");

    assert_eq!(err.status_code(), Some(400));
    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1);
}
