use conclave::{ModelCallOptions, ModelClient, ModelError, ModelMessage};
use conclave::{OpenAiClient, OpenAiClientConfig};

fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
    OpenAiClient::new(OpenAiClientConfig {
        api_key: "test-key".to_string(),
        base_url: server.url(),
        model: "gpt-4o-mini".to_string(),
        timeout_secs: 5,
        rate_limit_rps: 100.0,
        max_tokens: 256,
        temperature: 0.0,
    })
    .unwrap()
}

fn messages() -> Vec<ModelMessage> {
    vec![
        ModelMessage::system("score the specialists"),
        ModelMessage::user("Score Specialists for:\n `hello`"),
    ]
}

#[tokio::test]
async fn test_successful_request_returns_choices_and_usage() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "search;8;fits;None"}}],
                "usage": {"prompt_tokens": 42, "completion_tokens": 9, "total_tokens": 51}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let response = client
        .post_chat_request(&messages(), &ModelCallOptions::default())
        .await
        .unwrap();

    assert_eq!(response.first_choice(), "search;8;fits;None");
    let consumptions = response.consumptions();
    assert_eq!(consumptions.len(), 3);
    assert_eq!(consumptions[0].quantity(), 42.0);
    assert_eq!(consumptions[0].kind(), "gpt-4o-mini:prompt_tokens");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_usage_yields_no_consumptions() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"content": "ok"}}]}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let response = client
        .post_chat_request(&messages(), &ModelCallOptions::default())
        .await
        .unwrap();
    assert!(response.consumptions().is_empty());
}

#[tokio::test]
async fn test_429_maps_to_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .post_chat_request(&messages(), &ModelCallOptions::default())
        .await
        .unwrap_err();
    match err {
        ModelError::RateLimited(detail) => assert_eq!(detail, "slow down"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_error_maps_to_call_failed() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .post_chat_request(&messages(), &ModelCallOptions::default())
        .await
        .unwrap_err();
    match err {
        ModelError::CallFailed(detail) => {
            assert!(detail.contains("500"));
            assert!(detail.contains("boom"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_choices_is_a_call_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .post_chat_request(&messages(), &ModelCallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::CallFailed(_)));
}

#[tokio::test]
async fn test_invalid_body_is_a_call_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body("not json at all")
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client
        .post_chat_request(&messages(), &ModelCallOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::CallFailed(_)));
}
