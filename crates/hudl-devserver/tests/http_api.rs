//! End-to-end tests against a running dev server: raw HTTP/1.1 over a
//! local socket, no client stack.

use hudl_devserver::{DevServer, DevServerConfig, ReloadHub, TemplateRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn write_template(dir: &Path, file: &str, content: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, content).unwrap();
    path
}

fn card_template() -> &'static str {
    r#"/**
message CardData {
    string title = 1;
}
*/
// name: Card
// data: CardData
el {
    h1 `title`
}
"#
}

async fn start_server(dir: &Path, port: u16) -> (Arc<TemplateRegistry>, Arc<ReloadHub>) {
    let config = DevServerConfig::new(dir).with_addr(format!("127.0.0.1:{port}"));
    let server = DevServer::new(config);
    let registry = server.registry();
    let hub = server.reload_hub();
    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Wait until the listener accepts.
    for _ in 0..100 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return (registry, hub);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("dev server did not come up on port {port}");
}

async fn raw_request(port: u16, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn get(path: &str) -> Vec<u8> {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").into_bytes()
}

fn render_request(component: &str, body: &[u8]) -> Vec<u8> {
    let mut request = format!(
        "POST /render HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nX-Hudl-Component: {component}\r\nContent-Type: application/x-protobuf\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(body);
    request
}

#[tokio::test]
async fn render_returns_html_with_timing_header() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path(), "card.hudl", card_template());
    start_server(dir.path(), 39871).await;

    // title = "Hi": field 1, length-delimited
    let body = [10, 2, b'H', b'i'];
    let response = raw_request(39871, &render_request("Card", &body)).await;

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("content-type: text/html; charset=utf-8"), "{response}");
    assert!(response.to_lowercase().contains("x-hudl-render-time-ms:"), "{response}");
    assert!(response.contains("<h1>Hi</h1>"), "{response}");
}

#[tokio::test]
async fn render_without_component_header_is_400() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path(), "card.hudl", card_template());
    start_server(dir.path(), 39872).await;

    let request =
        b"POST /render HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
    let response = raw_request(39872, request).await;

    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
    assert!(response.contains("X-Hudl-Component"), "{response}");
    assert!(response.contains("\"error\""), "{response}");
}

#[tokio::test]
async fn render_unknown_component_is_404() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path(), "card.hudl", card_template());
    start_server(dir.path(), 39873).await;

    let response = raw_request(39873, &render_request("Ghost", &[])).await;
    assert!(response.starts_with("HTTP/1.1 404"), "{response}");
    assert!(response.contains("Ghost"), "{response}");
}

#[tokio::test]
async fn health_reports_registry_state() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path(), "card.hudl", card_template());
    start_server(dir.path(), 39874).await;

    let response = raw_request(39874, &get("/health")).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("\"status\":\"ok\""), "{response}");
    assert!(response.contains("\"templates_loaded\":1"), "{response}");
    assert!(response.contains("\"last_reload\""), "{response}");
}

#[tokio::test]
async fn component_listing() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path(), "card.hudl", card_template());
    write_template(
        dir.path(),
        "footer.hudl",
        "// name: Footer\nel {\n    footer {\n        p \"fin\"\n    }\n}\n",
    );
    start_server(dir.path(), 39875).await;

    let response = raw_request(39875, &get("/api/components")).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("\"name\":\"Card\""), "{response}");
    assert!(response.contains("\"data_type\":\"CardData\""), "{response}");
    assert!(response.contains("\"name\":\"Footer\""), "{response}");
    assert!(response.contains("\"data_type\":null"), "{response}");
}

#[tokio::test]
async fn full_document_gets_reload_script_fragment_does_not() {
    let dir = tempfile::tempdir().unwrap();
    write_template(
        dir.path(),
        "page.hudl",
        "// name: Page\nel {\n    html {\n        body {\n            p \"x\"\n        }\n    }\n}\n",
    );
    write_template(dir.path(), "card.hudl", card_template());
    start_server(dir.path(), 39876).await;

    let page = raw_request(39876, &render_request("Page", &[])).await;
    assert!(page.contains("EventSource"), "{page}");
    assert!(page.contains("/events"), "{page}");
    // Injected just before the close of body.
    let script_pos = page.find("<script>").unwrap();
    let close_pos = page.find("</body>").unwrap();
    assert!(script_pos < close_pos, "{page}");

    let fragment = raw_request(39876, &render_request("Card", &[])).await;
    assert!(!fragment.contains("EventSource"), "{fragment}");
}

#[tokio::test]
async fn stale_entry_survives_broken_reparse() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_template(dir.path(), "card.hudl", card_template());
    let (registry, _hub) = start_server(dir.path(), 39877).await;

    // Break the file and reparse directly (no watcher timing games).
    std::fs::write(&path, "// name: Card\nel { broken {").unwrap();
    assert!(registry.load_file(&path).is_err());

    let response = raw_request(39877, &render_request("Card", &[10, 2, b'H', b'i'])).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("<h1>Hi</h1>"), "{response}");
}

#[tokio::test]
async fn events_stream_delivers_reload() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path(), "card.hudl", card_template());
    let (_registry, hub) = start_server(dir.path(), 39878).await;

    let mut stream = TcpStream::connect(("127.0.0.1", 39878)).await.unwrap();
    stream
        .write_all(b"GET /events HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();

    // Give the subscription a moment to attach, then fire a reload.
    tokio::time::sleep(Duration::from_millis(100)).await;
    hub.notify_reload("Card");

    let mut collected = String::new();
    let mut buffer = [0u8; 4096];
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let read = tokio::time::timeout_at(deadline, stream.read(&mut buffer))
            .await
            .expect("timed out waiting for reload event")
            .unwrap();
        assert!(read > 0, "stream closed early: {collected}");
        collected.push_str(&String::from_utf8_lossy(&buffer[..read]));
        if collected.contains("\"type\":\"reload\"") {
            break;
        }
    }
    assert!(collected.contains("text/event-stream"), "{collected}");
    assert!(collected.contains("\"component\":\"Card\""), "{collected}");
}

#[tokio::test]
async fn preview_data_created_then_editable() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path(), "card.hudl", card_template());
    start_server(dir.path(), 39879).await;

    // First access creates the skeleton next to the source.
    let response = raw_request(39879, &get("/api/preview-data/Card")).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("title: \"\""), "{response}");
    assert!(dir.path().join("Card.preview.txtpb").exists());

    // Overwrite it.
    let content = "title: \"Mock\"\n";
    let put = format!(
        "PUT /api/preview-data/Card HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{content}",
        content.len()
    );
    let response = raw_request(39879, put.as_bytes()).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");

    let response = raw_request(39879, &get("/api/preview-data/Card")).await;
    assert!(response.contains("Mock"), "{response}");

    // Labels list includes the default.
    let response = raw_request(39879, &get("/api/preview-files/Card")).await;
    assert!(response.contains("default"), "{response}");
}

#[tokio::test]
async fn labeled_preview_created_via_post() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path(), "card.hudl", card_template());
    start_server(dir.path(), 39880).await;

    let body = r#"{"label":"empty","content":"title: \"\"\n"}"#;
    let post = format!(
        "POST /api/preview-files/Card HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let response = raw_request(39880, post.as_bytes()).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(dir.path().join("Card_empty.preview.txtpb").exists());

    let response = raw_request(39880, &get("/api/preview-data/Card?label=empty")).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
}

#[tokio::test]
async fn watcher_reload_reaches_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_template(dir.path(), "card.hudl", card_template());
    let (_registry, hub) = start_server(dir.path(), 39881).await;

    let mut events = hub.subscribe();
    tokio::time::sleep(Duration::from_millis(200)).await;

    std::fs::write(&path, card_template().replace("h1", "h2")).unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no reload event from watcher")
        .unwrap();
    assert_eq!(
        serde_json::to_value(&event).unwrap()["component"],
        serde_json::json!("Card")
    );

    // The reparsed version is served immediately.
    let response = raw_request(39881, &render_request("Card", &[10, 2, b'H', b'i'])).await;
    assert!(response.contains("<h2>Hi</h2>"), "{response}");
}
