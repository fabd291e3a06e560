mod common;

use common::{image_response, test_client, test_config, CountingHost, IMAGE_PATH};
use creative_suite::{
    AssetHandle, ErrorClass, GenerationClient, GenerationRequest, ImageSize, PanelState, Studio,
    SuiteError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_submit_stores_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("AAAA")))
        .mount(&server)
        .await;

    let studio = Studio::new(test_client(&server));
    assert_eq!(studio.state(), PanelState::Idle);

    let result = studio
        .submit(
            GenerationRequest::image("a red cube", ImageSize::Small),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(
        result.asset,
        AssetHandle::DataUri("data:image/png;base64,AAAA".to_string())
    );
    assert_eq!(studio.state(), PanelState::Completed(result));
}

#[tokio::test]
async fn test_empty_prompt_is_rejected_up_front() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("AAAA")))
        .expect(0)
        .mount(&server)
        .await;

    let studio = Studio::new(test_client(&server));
    let err = studio
        .submit(
            GenerationRequest::image("   ", ImageSize::Small),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SuiteError::InvalidRequest(_)));
    assert_eq!(studio.state(), PanelState::Idle);
}

#[tokio::test]
async fn test_second_submission_while_pending_is_busy() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(image_response("AAAA"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let studio = Studio::new(test_client(&server));
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        studio.submit(GenerationRequest::image("a red cube", ImageSize::Small), &cancel),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(studio.is_busy());
            studio
                .submit(GenerationRequest::image("a blue cube", ImageSize::Small), &cancel)
                .await
        }
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(SuiteError::Busy)));
    assert!(matches!(studio.state(), PanelState::Completed(_)));
}

#[tokio::test]
async fn test_failed_attempt_clears_previous_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .and(body_partial_json(json!({ "contents": [{ "parts": [{ "text": "works" }] }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("AAAA")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .and(body_partial_json(json!({ "contents": [{ "parts": [{ "text": "fails" }] }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let studio = Studio::new(test_client(&server));
    let cancel = CancellationToken::new();

    studio
        .submit(GenerationRequest::image("works", ImageSize::Small), &cancel)
        .await
        .unwrap();
    studio
        .submit(GenerationRequest::image("fails", ImageSize::Small), &cancel)
        .await
        .unwrap_err();

    assert_eq!(
        studio.state(),
        PanelState::Failed("Generation failed: no image data returned".to_string())
    );

    studio.reset().unwrap();
    assert_eq!(studio.state(), PanelState::Idle);
}

#[tokio::test]
async fn test_rejected_key_reopens_selection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let host = Arc::new(CountingHost::selected("stale_key"));
    let client = GenerationClient::with_config(host.clone(), test_config(&server)).unwrap();
    let studio = Studio::new(client);

    let err = studio
        .submit(
            GenerationRequest::image("a red cube", ImageSize::Small),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(err.needs_reselection());
    assert_eq!(host.selections(), 1);
    assert!(matches!(studio.state(), PanelState::Failed(_)));
}

#[tokio::test]
async fn test_panel_stays_busy_while_key_selection_is_open() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "API key not valid. Please pass a valid API key." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let host = Arc::new(
        CountingHost::selected("stale_key").with_select_delay(Duration::from_millis(400)),
    );
    let client = GenerationClient::with_config(host.clone(), test_config(&server)).unwrap();
    let studio = Studio::new(client);
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        studio.submit(GenerationRequest::image("a red cube", ImageSize::Small), &cancel),
        async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert_eq!(host.selections(), 1);
            assert!(studio.is_busy());
            assert_eq!(studio.state(), PanelState::InProgress);
            studio
                .submit(GenerationRequest::image("a blue cube", ImageSize::Small), &cancel)
                .await
        }
    );

    assert!(matches!(first, Err(SuiteError::KeyRejected(_))));
    assert!(matches!(second, Err(SuiteError::Busy)));
    assert_eq!(host.selections(), 1);
    assert!(matches!(studio.state(), PanelState::Failed(_)));
    assert!(!studio.is_busy());
}

#[tokio::test]
async fn test_cancelled_key_selection_is_not_reopened() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("AAAA")))
        .expect(0)
        .mount(&server)
        .await;

    let host = Arc::new(CountingHost::unselected(None));
    let client = GenerationClient::with_config(host.clone(), test_config(&server)).unwrap();
    let studio = Studio::new(client);

    let err = studio
        .submit(
            GenerationRequest::image("a red cube", ImageSize::Small),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Credential);
    assert!(!err.needs_reselection());
    assert_eq!(host.selections(), 1);
    assert_eq!(
        studio.state(),
        PanelState::Failed("Credential error: key selection was cancelled".to_string())
    );
}

#[tokio::test]
async fn test_cancelled_submission_leaves_panel_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("AAAA")))
        .mount(&server)
        .await;

    let studio = Studio::new(test_client(&server));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = studio
        .submit(GenerationRequest::image("a red cube", ImageSize::Small), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, SuiteError::Cancelled));
    assert_eq!(studio.state(), PanelState::Failed("cancelled".to_string()));
    assert!(!studio.is_busy());
}
