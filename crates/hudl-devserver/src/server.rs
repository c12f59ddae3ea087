//! The HTTP surface.
//!
//! Endpoints:
//! - `POST /render` : render a component with wire-format input bytes.
//! - `GET /health` : registry status.
//! - `GET /events` : server-sent live-reload stream.
//! - `GET /api/components` : component listing.
//! - `GET|POST /api/preview-files/{component}` : preview labels.
//! - `GET|PUT /api/preview-data/{component}` : preview contents.

use crate::error::ServerError;
use crate::preview;
use crate::registry::{RegistryEntry, TemplateRegistry};
use crate::reload::ReloadHub;
use crate::watcher::{FileWatcher, WatchEvent};
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Full, StreamBody};
use hudl_schema::{decode_message, Value};
use hudl_syntax::LineCol;
use hudl_template::{render, RenderOptions};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

/// Configuration for [`DevServer`].
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Listen address, `host:port`.
    pub addr: String,
    /// Directory tree holding `.hudl` documents.
    pub watch_dir: PathBuf,
    /// Quiet window for coalescing watcher bursts.
    pub debounce: Duration,
    /// Per-render wall-clock budget.
    pub render_deadline: Duration,
}

impl DevServerConfig {
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            addr: "localhost:9999".to_string(),
            watch_dir: watch_dir.into(),
            debounce: Duration::from_millis(150),
            render_deadline: Duration::from_secs(5),
        }
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_render_deadline(mut self, deadline: Duration) -> Self {
        self.render_deadline = deadline;
        self
    }
}

/// The dev server: template registry, watcher, reload hub, HTTP listener.
pub struct DevServer {
    config: DevServerConfig,
    registry: Arc<TemplateRegistry>,
    reload: Arc<ReloadHub>,
}

type ResponseBody = BoxBody<Bytes, Infallible>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    file: String,
    line: u32,
    column: u32,
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
    templates_loaded: usize,
    last_reload: Option<String>,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(TemplateRegistry::new()),
            reload: Arc::new(ReloadHub::new()),
        }
    }

    pub fn registry(&self) -> Arc<TemplateRegistry> {
        self.registry.clone()
    }

    pub fn reload_hub(&self) -> Arc<ReloadHub> {
        self.reload.clone()
    }

    /// Load the tree, start the watcher, and serve until the process ends.
    pub async fn run(self) -> Result<(), ServerError> {
        let loaded = self.registry.load_tree(&self.config.watch_dir);
        info!(
            templates = loaded,
            dir = %self.config.watch_dir.display(),
            "template registry ready"
        );

        let watcher = FileWatcher::new(&self.config.watch_dir)?;
        tokio::spawn(watch_loop(
            watcher,
            self.config.debounce,
            self.registry.clone(),
            self.reload.clone(),
        ));

        let addr = resolve_addr(&self.config.addr)?;
        let listener = TcpListener::bind(addr).await?;
        info!("dev server listening on http://{addr}");

        let state = Arc::new(self);
        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let state = state.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = state.clone();
                    async move { Ok::<_, Infallible>(state.route(req).await) }
                });
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("connection ended: {err}");
                }
            });
        }
    }

    async fn route(&self, req: Request<Incoming>) -> Response<ResponseBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        match (method, path.as_str()) {
            (Method::POST, "/render") => self.handle_render(req).await,
            (Method::GET, "/health") => self.handle_health(),
            (Method::GET, "/events") => self.handle_events(),
            (Method::GET, "/api/components") => self.handle_components(),
            (method, path) => {
                if let Some(component) = path.strip_prefix("/api/preview-files/") {
                    return match method {
                        Method::GET => self.handle_preview_labels(component),
                        Method::POST => self.handle_preview_create(component, req).await,
                        _ => method_not_allowed(),
                    };
                }
                if let Some(component) = path.strip_prefix("/api/preview-data/") {
                    let label = query_param(req.uri().query(), "label");
                    return match method {
                        Method::GET => self.handle_preview_get(component, label.as_deref()),
                        Method::PUT => {
                            self.handle_preview_put(component, label.as_deref(), req).await
                        }
                        _ => method_not_allowed(),
                    };
                }
                json_error(
                    StatusCode::NOT_FOUND,
                    format!("no route for {path}"),
                    "",
                    0,
                    0,
                )
            }
        }
    }

    async fn handle_render(&self, req: Request<Incoming>) -> Response<ResponseBody> {
        let Some(component_name) = req
            .headers()
            .get("X-Hudl-Component")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
        else {
            return json_error(
                StatusCode::BAD_REQUEST,
                "missing X-Hudl-Component header",
                "",
                0,
                0,
            );
        };

        // Pin a consistent registry view for the whole request.
        let snapshot = self.registry.snapshot();
        let Some(entry) = snapshot.entry(&component_name).cloned() else {
            return json_error(
                StatusCode::NOT_FOUND,
                format!("component '{component_name}' not found"),
                "",
                0,
                0,
            );
        };

        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    format!("failed to read request body: {err}"),
                    "",
                    0,
                    0,
                );
            }
        };

        let input = match &entry.compiled.component.data_type {
            Some(data_type) => {
                match decode_message(&body, data_type, &entry.compiled.schema) {
                    Ok(value) => value,
                    Err(err) => {
                        return json_error(
                            StatusCode::BAD_REQUEST,
                            err.to_string(),
                            &entry.file.display().to_string(),
                            0,
                            0,
                        );
                    }
                }
            }
            None => Value::Null,
        };

        let options = RenderOptions {
            deadline: self.config.render_deadline,
        };
        let start = Instant::now();
        let output = match render(&component_name, &input, &snapshot, &options) {
            Ok(output) => output,
            Err(err) => {
                let (line, column) = err
                    .span
                    .map(|span| {
                        let pos = LineCol::of(&entry.source, span.start);
                        (pos.line, pos.column)
                    })
                    .unwrap_or((0, 0));
                return json_error(
                    StatusCode::BAD_REQUEST,
                    err.message,
                    &entry.file.display().to_string(),
                    line,
                    column,
                );
            }
        };
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        for eval_error in &output.errors {
            let pos = LineCol::of(&entry.source, eval_error.span.start);
            debug!(
                component = %component_name,
                line = pos.line,
                "expression error: {}",
                eval_error.message
            );
        }

        let mut html = output.html;
        if output.root_tag.as_deref() == Some("html") {
            inject_reload_script(&mut html, &self.config.addr);
        }

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
            .header("X-Hudl-Render-Time-Ms", format!("{elapsed_ms:.1}"))
            .body(full(html))
            .unwrap_or_else(|_| server_failure())
    }

    fn handle_health(&self) -> Response<ResponseBody> {
        json_ok(&HealthBody {
            status: "ok",
            templates_loaded: self.registry.len(),
            last_reload: self.registry.last_reload().map(|t| t.to_rfc3339()),
        })
    }

    fn handle_components(&self) -> Response<ResponseBody> {
        json_ok(&self.registry.records())
    }

    /// SSE stream: one `data:` frame per reload event, comment heartbeats
    /// to keep intermediaries from closing the connection.
    fn handle_events(&self) -> Response<ResponseBody> {
        let mut reload_rx = self.reload.subscribe();
        let (tx, rx) = mpsc::channel::<Result<Frame<Bytes>, Infallible>>(16);

        tokio::spawn(async move {
            if tx
                .send(Ok(Frame::data(Bytes::from_static(b": connected\n\n"))))
                .await
                .is_err()
            {
                return;
            }
            let mut heartbeat = tokio::time::interval(Duration::from_secs(15));
            heartbeat.tick().await; // the first tick fires immediately
            loop {
                tokio::select! {
                    event = reload_rx.recv() => match event {
                        Ok(event) => {
                            let payload = match serde_json::to_string(&event) {
                                Ok(json) => json,
                                Err(_) => continue,
                            };
                            let frame = Bytes::from(format!("data: {payload}\n\n"));
                            if tx.send(Ok(Frame::data(frame))).await.is_err() {
                                // Client closed the connection.
                                return;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "slow SSE subscriber lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                    },
                    _ = heartbeat.tick() => {
                        let frame = Bytes::from_static(b": heartbeat\n\n");
                        if tx.send(Ok(Frame::data(frame))).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(StreamBody::new(ReceiverStream::new(rx)).boxed())
            .unwrap_or_else(|_| server_failure())
    }

    fn handle_preview_labels(&self, component: &str) -> Response<ResponseBody> {
        let Some(entry) = self.registry.entry(component) else {
            return component_not_found(component);
        };
        json_ok(&preview::list_labels(&entry))
    }

    async fn handle_preview_create(
        &self,
        component: &str,
        req: Request<Incoming>,
    ) -> Response<ResponseBody> {
        let Some(entry) = self.registry.entry(component) else {
            return component_not_found(component);
        };

        #[derive(serde::Deserialize)]
        struct CreateBody {
            label: String,
            #[serde(default)]
            content: String,
        }

        let bytes = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                return json_error(StatusCode::BAD_REQUEST, err.to_string(), "", 0, 0);
            }
        };
        let body: CreateBody = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(err) => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    format!("invalid preview request: {err}"),
                    "",
                    0,
                    0,
                );
            }
        };

        match preview::save(&entry, Some(&body.label), &body.content) {
            Ok(()) => json_ok(&serde_json::json!({ "created": body.label })),
            Err(err) => io_failure(&entry, err),
        }
    }

    fn handle_preview_get(&self, component: &str, label: Option<&str>) -> Response<ResponseBody> {
        let Some(entry) = self.registry.entry(component) else {
            return component_not_found(component);
        };
        match preview::load_or_create(&entry, label) {
            Ok(content) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(full(content))
                .unwrap_or_else(|_| server_failure()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => json_error(
                StatusCode::NOT_FOUND,
                format!("no preview '{}' for '{component}'", label.unwrap_or("default")),
                "",
                0,
                0,
            ),
            Err(err) => io_failure(&entry, err),
        }
    }

    async fn handle_preview_put(
        &self,
        component: &str,
        label: Option<&str>,
        req: Request<Incoming>,
    ) -> Response<ResponseBody> {
        let Some(entry) = self.registry.entry(component) else {
            return component_not_found(component);
        };
        let bytes = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                return json_error(StatusCode::BAD_REQUEST, err.to_string(), "", 0, 0);
            }
        };
        let content = String::from_utf8_lossy(&bytes);
        match preview::save(&entry, label, &content) {
            Ok(()) => json_ok(&serde_json::json!({ "saved": true })),
            Err(err) => io_failure(&entry, err),
        }
    }
}

/// React to a batch of filesystem events: reparse changed documents,
/// drop removed ones, and notify subscribers.
async fn watch_loop(
    mut watcher: FileWatcher,
    debounce: Duration,
    registry: Arc<TemplateRegistry>,
    reload: Arc<ReloadHub>,
) {
    while let Some(batch) = watcher.next_batch(debounce).await {
        for event in batch {
            match event {
                WatchEvent::Changed(path) => match registry.load_file(&path) {
                    Ok(names) => {
                        for name in names {
                            info!(component = %name, "reloaded");
                            reload.notify_reload(&name);
                        }
                    }
                    Err(failure) => {
                        error!(
                            file = %failure.file.display(),
                            line = failure.line,
                            "reparse failed, keeping last good version: {}",
                            failure.message
                        );
                        reload.notify_error(&failure.message, &failure.file.display().to_string());
                    }
                },
                WatchEvent::Removed(path) => {
                    info!(file = %path.display(), "removed");
                    registry.remove_file(&path);
                }
            }
        }
    }
}

/// The client script appended before `</body>` when the rendered root is a
/// full `html` document. It reconnects through `EventSource` and reloads
/// the page on any `reload` message.
fn inject_reload_script(html: &mut String, addr: &str) {
    let script = format!(
        r#"<script>
(function() {{
  const ev = new EventSource('http://{addr}/events');
  ev.onmessage = (e) => {{
    try {{
      const data = JSON.parse(e.data);
      if (data.type === 'reload') {{
        location.reload();
      }}
    }} catch (err) {{}}
  }};
}})();
</script>"#
    );

    let lower = html.to_lowercase();
    if let Some(pos) = lower.rfind("</body>") {
        html.insert_str(pos, &script);
    } else {
        html.push_str(&script);
    }
}

fn resolve_addr(addr: &str) -> Result<SocketAddr, ServerError> {
    use std::net::ToSocketAddrs;
    addr.to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .ok_or_else(|| ServerError::InvalidAddr(addr.to_string()))
}

fn full(body: impl Into<Bytes>) -> ResponseBody {
    Full::new(body.into()).boxed()
}

fn json_ok<T: Serialize>(value: &T) -> Response<ResponseBody> {
    let body = serde_json::to_vec(value).unwrap_or_default();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(body))
        .unwrap_or_else(|_| server_failure())
}

fn json_error(
    status: StatusCode,
    error: impl Into<String>,
    file: &str,
    line: u32,
    column: u32,
) -> Response<ResponseBody> {
    let body = serde_json::to_vec(&ErrorBody {
        error: error.into(),
        file: file.to_string(),
        line,
        column,
    })
    .unwrap_or_default();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(full(body))
        .unwrap_or_else(|_| server_failure())
}

fn component_not_found(component: &str) -> Response<ResponseBody> {
    json_error(
        StatusCode::NOT_FOUND,
        format!("component '{component}' not found"),
        "",
        0,
        0,
    )
}

fn io_failure(entry: &RegistryEntry, err: std::io::Error) -> Response<ResponseBody> {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        err.to_string(),
        &entry.file.display().to_string(),
        0,
        0,
    )
}

fn method_not_allowed() -> Response<ResponseBody> {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed", "", 0, 0)
}

fn server_failure() -> Response<ResponseBody> {
    let mut response = Response::new(full("internal error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    let query = query?;
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next() == Some(key) {
            return parts.next().map(str::to_string);
        }
    }
    None
}
