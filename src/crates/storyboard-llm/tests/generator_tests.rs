//! Generator tests against a minimal local HTTP endpoint

use std::sync::{Arc, Mutex};
use std::time::Duration;
use storyboard_llm::{LlmConfig, LlmGenerator, Provider};
use storyboard_workflow::{
    GenerationError, GenerationService, ProjectCheckpoint, ProjectContext, Scene,
    SceneListContext, Stage, StageContext, StreamConsumer, StreamOutcome,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Serve one canned HTTP response per accepted connection, in order
async fn serve(responses: Vec<String>) -> String {
    serve_recording(responses).await.0
}

/// Like [`serve`], also recording each raw request
async fn serve_recording(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    tokio::spawn(async move {
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            recorded.lock().unwrap().push(request);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });

    (format!("http://{}", addr), requests)
}

/// Read headers and a Content-Length body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return String::from_utf8_lossy(&data).into_owned();
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                return text.into_owned();
            }
        }
    }
}

fn json_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}

fn completion(content: &str) -> String {
    json_response(
        "200 OK",
        &serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        })
        .to_string(),
    )
}

fn generator(base_url: String, max_retries: u32) -> LlmGenerator {
    let config = LlmConfig::new("test-key", base_url, "test-model")
        .with_timeout(Duration::from_secs(5))
        .with_max_retries(max_retries);
    LlmGenerator::new(config).unwrap()
}

fn gemini_generator(base_url: String) -> LlmGenerator {
    let config = LlmConfig::new("gemini-key", base_url, "gemini-test")
        .with_provider(Provider::Gemini)
        .with_timeout(Duration::from_secs(5))
        .with_max_retries(0);
    LlmGenerator::new(config).unwrap()
}

fn gemini_reply(text: &str) -> String {
    json_response(
        "200 OK",
        &serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}, "finishReason": "STOP"}]
        })
        .to_string(),
    )
}

fn stage_context() -> StageContext {
    let mut project = ProjectCheckpoint::new();
    project.art_style = "ink wash".to_string();
    project.scenes.push(Scene::new(1, "storm night"));
    StageContext::for_scene(&project, &project.scenes[0])
}

#[tokio::test]
async fn test_scene_list_from_completion() {
    let base_url = serve(vec![completion("1. Storm night\n2. [The bottle]\n3、The reply")]).await;
    let generator = generator(base_url, 0);

    let context = SceneListContext {
        project: ProjectContext::default(),
        count: 3,
    };
    let scenes = generator.generate_scene_list(&context).await.unwrap();
    assert_eq!(scenes, vec!["Storm night", "The bottle", "The reply"]);
}

#[tokio::test]
async fn test_stage_content_is_trimmed() {
    let base_url = serve(vec![completion("  A harbor at dusk.\n")]).await;
    let generator = generator(base_url, 0);

    let text = generator
        .generate_stage(Stage::SceneDescription, &stage_context())
        .await
        .unwrap();
    assert_eq!(text, "A harbor at dusk.");
}

#[tokio::test]
async fn test_empty_completion_is_invalid() {
    let base_url = serve(vec![completion("   ")]).await;
    let generator = generator(base_url, 0);

    let result = generator.generate_shot_prompt(&stage_context()).await;
    assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_auth_error_is_not_retried() {
    let base_url = serve(vec![json_response("401 Unauthorized", r#"{"error":"bad key"}"#)]).await;
    let generator = generator(base_url, 3);

    let err = generator
        .generate_scene_description(&stage_context())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Provider(m) if m.contains("Authentication")));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let base_url = serve(vec![
        json_response("503 Service Unavailable", "{}"),
        completion("recovered"),
    ])
    .await;
    let generator = generator(base_url, 1);

    let text = generator
        .generate_action_description(&stage_context())
        .await
        .unwrap();
    assert_eq!(text, "recovered");
}

#[tokio::test]
async fn test_stream_stage_decodes_sse() {
    let events = [
        r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"data: {"choices":[{"delta":{"content":"low angle, "}}]}"#,
        "data: {broken",
        r#"data: {"choices":[{"delta":{"content":"lantern light"}}]}"#,
        "data: [DONE]",
    ]
    .iter()
    .map(|e| format!("{}\n\n", e))
    .collect::<String>();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
        events
    );
    let base_url = serve(vec![response]).await;
    let generator = generator(base_url, 0);

    let stream = generator
        .stream_stage(Stage::ShotPrompt, &stage_context())
        .await
        .unwrap();
    let outcome = StreamConsumer::new(CancellationToken::new())
        .consume(stream)
        .await;
    assert_eq!(outcome, StreamOutcome::Complete("low angle, lantern light".to_string()));
}

#[tokio::test]
async fn test_gemini_generate_content() {
    let (base_url, requests) = serve_recording(vec![gemini_reply("  A harbor at dusk.\n")]).await;
    let generator = gemini_generator(base_url);

    let text = generator
        .generate_stage(Stage::SceneDescription, &stage_context())
        .await
        .unwrap();
    assert_eq!(text, "A harbor at dusk.");

    let request = requests.lock().unwrap()[0].clone();
    assert!(request.starts_with("POST /models/gemini-test:generateContent?key=gemini-key "));
    assert!(request.contains(r#""role":"user""#));
    assert!(request.contains("[System]"));
    assert!(!request.to_ascii_lowercase().contains("authorization: bearer"));
}

#[tokio::test]
async fn test_gemini_scene_list() {
    let base_url = serve(vec![gemini_reply("1. Storm night\n2. The bottle")]).await;
    let generator = gemini_generator(base_url);

    let context = SceneListContext {
        project: ProjectContext::default(),
        count: 2,
    };
    let scenes = generator.generate_scene_list(&context).await.unwrap();
    assert_eq!(scenes, vec!["Storm night", "The bottle"]);
}

#[tokio::test]
async fn test_gemini_stream_decodes_sse() {
    let events = [
        r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"low angle, "}]}}]}"#,
        r#"data: {"candidates":[{"content":{"role":"model","parts":[{"text":"lantern light"}]},"finishReason":"STOP"}]}"#,
    ]
    .iter()
    .map(|e| format!("{}\r\n\r\n", e))
    .collect::<String>();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
        events
    );
    let (base_url, requests) = serve_recording(vec![response]).await;
    let generator = gemini_generator(base_url);

    let stream = generator
        .stream_stage(Stage::ShotPrompt, &stage_context())
        .await
        .unwrap();
    let outcome = StreamConsumer::new(CancellationToken::new())
        .consume(stream)
        .await;
    assert_eq!(outcome, StreamOutcome::Complete("low angle, lantern light".to_string()));

    let request = requests.lock().unwrap()[0].clone();
    assert!(request.starts_with("POST /models/gemini-test:streamGenerateContent?key=gemini-key&alt=sse "));
}
