//! End-to-end tests for the HTTP adapter, driven through the router with
//! `tower::ServiceExt::oneshot` and a scripted in-process engine.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use common::{dir_is_empty, test_state, MockEngine};
use cosyvoice_gateway::{routes, AppState};

const BOUNDARY: &str = "test-boundary-7MA4YWxkTrZu0gW";

fn app(state: Arc<AppState>) -> Router {
    routes::api::create_api_router().with_state(state)
}

/// Hand-built multipart/form-data body: text fields plus an optional file
/// field named `prompt_wav`.
fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"prompt_wav\"; \
                 filename=\"{filename}\"\r\nContent-Type: audio/wav\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_is_public() {
    let tmp = TempDir::new().unwrap();
    let app = app(test_state(&tmp, None));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn zero_shot_produces_wav_and_normalizes_prompt_text() {
    let tmp = TempDir::new().unwrap();
    let engine = MockEngine::new(16_000, vec![8_000, 4_000]);
    let state = test_state(&tmp, Some(engine.clone()));
    let app = app(state.clone());

    let body = multipart_body(
        &[
            ("text", "Hello there"),
            ("prompt_text", "A reference line"),
            ("speed", "1.5"),
        ],
        Some(("voice.wav", b"fake riff payload")),
    );
    let response = app
        .oneshot(multipart_request("/tts/zero_shot", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["sample_rate"], 16_000);

    let filename = json["audio_filename"].as_str().unwrap();
    let out_path = state.config.audio_out_dir.join(filename);
    let reader = hound::WavReader::open(&out_path).unwrap();
    assert_eq!(reader.spec().sample_rate, 16_000);
    assert_eq!(reader.spec().channels, 1);
    // Chunks concatenate in order: 8000 + 4000 frames.
    assert_eq!(reader.len(), 12_000);

    let calls = engine.calls.lock();
    assert_eq!(
        calls.as_slice(),
        ["zero_shot|Hello there|A reference line<|endofprompt|>|1.5"]
    );
}

#[tokio::test]
async fn local_prompt_path_is_accepted() {
    let tmp = TempDir::new().unwrap();
    let engine = MockEngine::new(16_000, vec![500]);
    let state = test_state(&tmp, Some(engine));
    let src = tmp.path().join("reference.wav");
    std::fs::write(&src, b"pcm").unwrap();
    let app = app(state.clone());

    let body = multipart_body(
        &[
            ("text", "Bonjour"),
            ("prompt_wav_path", src.to_str().unwrap()),
        ],
        None,
    );
    let response = app
        .oneshot(multipart_request("/tts/cross_lingual", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(src.exists(), "source recording must remain untouched");
    // A uniquely named copy lands in the managed input directory.
    let stored: Vec<_> = std::fs::read_dir(&state.config.audio_in_dir)
        .unwrap()
        .collect();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn missing_prompt_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let engine = MockEngine::new(16_000, vec![100]);
    let app = app(test_state(&tmp, Some(engine)));

    let body = multipart_body(&[("text", "Hello"), ("prompt_text", "Ref")], None);
    let response = app
        .oneshot(multipart_request("/tts/zero_shot", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("prompt_wav or prompt_wav_path required"));
}

#[tokio::test]
async fn instruct_requires_instruct_text() {
    let tmp = TempDir::new().unwrap();
    let engine = MockEngine::new(16_000, vec![100]);
    let app = app(test_state(&tmp, Some(engine)));

    let body = multipart_body(
        &[("text", "Hello")],
        Some(("voice.wav", b"fake riff payload")),
    );
    let response = app
        .oneshot(multipart_request("/tts/instruct", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("instruct_text"));
}

#[tokio::test]
async fn absent_engine_answers_503_and_stores_nothing() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, None);
    let app = app(state.clone());

    let body = multipart_body(
        &[("text", "Hello"), ("prompt_text", "Ref")],
        Some(("voice.wav", b"fake riff payload")),
    );
    let response = app
        .oneshot(multipart_request("/tts/zero_shot", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["error"], "service unavailable: model not loaded");
    assert!(dir_is_empty(&state.config.audio_in_dir));
    assert!(dir_is_empty(&state.config.audio_out_dir));
}

#[tokio::test]
async fn missing_local_prompt_path_is_404() {
    let tmp = TempDir::new().unwrap();
    let engine = MockEngine::new(16_000, vec![100]);
    let state = test_state(&tmp, Some(engine));
    let missing = tmp.path().join("nope.wav");
    let app = app(state.clone());

    let body = multipart_body(
        &[
            ("text", "Hello"),
            ("prompt_text", "Ref"),
            ("prompt_wav_path", missing.to_str().unwrap()),
        ],
        None,
    );
    let response = app
        .oneshot(multipart_request("/tts/zero_shot", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(dir_is_empty(&state.config.audio_in_dir));
}

#[tokio::test]
async fn generated_audio_can_be_downloaded() {
    let tmp = TempDir::new().unwrap();
    let state = test_state(&tmp, None);
    std::fs::create_dir_all(&state.config.audio_out_dir).unwrap();
    std::fs::write(state.config.audio_out_dir.join("out.wav"), b"riff bytes").unwrap();
    let app = app(state);

    let response = app
        .oneshot(Request::get("/audio/out.wav").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"riff bytes");
}

#[tokio::test]
async fn unknown_audio_is_404() {
    let tmp = TempDir::new().unwrap();
    let app = app(test_state(&tmp, None));

    let response = app
        .oneshot(
            Request::get("/audio/missing.wav")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn traversal_filenames_are_rejected() {
    let tmp = TempDir::new().unwrap();
    let app = app(test_state(&tmp, None));

    let response = app
        .oneshot(
            Request::get("/audio/..%2Fsecret.wav")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
