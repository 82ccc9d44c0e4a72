use manualqa_core::config::LlmConfig;
use manualqa_core::traits::AnswerGenerator;
use manualqa_rag::ChatCompletionGenerator;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

fn config(base_url: &str, api_key: Option<&str>) -> LlmConfig {
    LlmConfig {
        base_url: base_url.to_string(),
        model: "test-model".into(),
        api_key: api_key.map(str::to_string),
        timeout_secs: 5,
        ..LlmConfig::default()
    }
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Serves a single HTTP response and hands back the raw request it received.
async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        request
    });
    (format!("http://{addr}/v1"), handle)
}

#[test]
fn request_body_carries_model_settings_and_messages() {
    let generator = ChatCompletionGenerator::new(config("http://localhost:11434/v1/", None)).unwrap();
    assert_eq!(generator.endpoint(), "http://localhost:11434/v1/chat/completions");

    let body = generator.request_body("be precise", "## User Question\nE02?");
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["max_tokens"], 2048);
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "be precise");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "## User Question\nE02?");
}

#[tokio::test]
async fn returns_first_choice_content() {
    let reply = r#"{"choices":[{"message":{"role":"assistant","content":"Spindle overload [1]."}}]}"#;
    let (base_url, server) = serve_once("200 OK", reply.to_string()).await;
    let generator = ChatCompletionGenerator::new(config(&base_url, Some("secret"))).unwrap();

    let answer = generator.generate("system text", "prompt text").await.unwrap();
    assert_eq!(answer, "Spindle overload [1].");

    let request = server.await.unwrap().to_lowercase();
    assert!(request.starts_with("post /v1/chat/completions"));
    assert!(request.contains("authorization: bearer secret"));
    assert!(request.contains("\"model\":\"test-model\""));
}

#[tokio::test]
async fn http_errors_are_reported() {
    let (base_url, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#.to_string()).await;
    let generator = ChatCompletionGenerator::new(config(&base_url, None)).unwrap();

    let err = generator.generate("s", "p").await.unwrap_err();
    assert!(err.to_string().contains("500"));
    let request = server.await.unwrap().to_lowercase();
    assert!(!request.contains("authorization"));
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let (base_url, _server) = serve_once("200 OK", r#"{"choices":[]}"#.to_string()).await;
    let generator = ChatCompletionGenerator::new(config(&base_url, None)).unwrap();
    assert!(generator.generate("s", "p").await.is_err());
}
