// src/live/server.rs

//! Preview HTTP server for the output root.
//!
//! Files are served by `tower-http`'s `ServeDir`. HTML responses get a
//! `<script>` tag for the reload client injected before `</body>`.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::middleware::map_response;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Where the reload client script is served.
pub const CLIENT_PATH: &str = "/__assetflow/client.js";

const CLIENT_TAG: &str = r#"<script src="/__assetflow/client.js"></script>"#;

const CLIENT_SCRIPT: &str = r#"(() => {
  const socket = new WebSocket(`ws://${location.hostname}:__PORT__`);
  socket.addEventListener("message", (msg) => {
    let event;
    try {
      event = JSON.parse(msg.data);
    } catch {
      return;
    }
    if (event.scope !== "style") {
      location.reload();
      return;
    }
    const stamp = Date.now().toString();
    for (const link of document.querySelectorAll('link[rel="stylesheet"]')) {
      const url = new URL(link.href, location.href);
      if (event.paths.length > 0 && !event.paths.includes(url.pathname)) {
        continue;
      }
      url.searchParams.set("assetflow", stamp);
      link.href = url.toString();
    }
  });
})();
"#;

/// Reload client script connecting to `reload_port`.
pub fn client_script(reload_port: u16) -> String {
    CLIENT_SCRIPT.replace("__PORT__", &reload_port.to_string())
}

/// Insert the client `<script>` tag before the last `</body>`, or append it
/// if the document has none.
pub fn inject_client(html: &str) -> String {
    // ASCII lowercasing keeps byte offsets intact.
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(at) => {
            let mut out = String::with_capacity(html.len() + CLIENT_TAG.len());
            out.push_str(&html[..at]);
            out.push_str(CLIENT_TAG);
            out.push_str(&html[at..]);
            out
        }
        None => format!("{html}{CLIENT_TAG}"),
    }
}

/// Router serving `output_root` with client injection.
pub fn router(output_root: PathBuf, reload_port: u16) -> Router {
    let script: Arc<str> = Arc::from(client_script(reload_port));

    Router::new()
        .route(CLIENT_PATH, get(client_js))
        .fallback_service(ServeDir::new(output_root))
        .layer(map_response(inject_into_html))
        .with_state(script)
}

/// Bind `host:port`, or an ephemeral port if that one is taken.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    match TcpListener::bind((host, port)).await {
        Ok(listener) => Ok(listener),
        Err(err) if port != 0 => {
            let listener = TcpListener::bind((host, 0))
                .await
                .with_context(|| format!("binding preview server on {host}"))?;
            warn!(
                preferred_port = port,
                port = listener.local_addr()?.port(),
                error = %err,
                "preview port unavailable; using another"
            );
            Ok(listener)
        }
        Err(err) => Err(err).with_context(|| format!("binding preview server on {host}:{port}")),
    }
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    info!(url = %format!("http://{addr}/"), "preview server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("preview server failed")
}

async fn client_js(State(script): State<Arc<str>>) -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "application/javascript"),
            (CACHE_CONTROL, "no-store"),
        ],
        script.to_string(),
    )
}

async fn inject_into_html(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/html"));
    if !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer html response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_client(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_before_closing_body() {
        let html = "<html><BODY><p>hi</p></BODY></html>";
        assert_eq!(
            inject_client(html),
            format!("<html><BODY><p>hi</p>{CLIENT_TAG}</BODY></html>")
        );
    }

    #[test]
    fn appends_when_body_is_missing() {
        assert_eq!(inject_client("<p>fragment</p>"), format!("<p>fragment</p>{CLIENT_TAG}"));
    }

    #[test]
    fn script_targets_reload_port() {
        let script = client_script(35729);
        assert!(script.contains(":35729`"));
        assert!(!script.contains("__PORT__"));
    }

    #[tokio::test]
    async fn serves_html_with_client_and_other_files_untouched() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("index.html"), "<html><body>ok</body></html>")?;
        std::fs::write(dir.path().join("app.css"), "body{}")?;

        let listener = bind("127.0.0.1", 0).await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, router(dir.path().to_path_buf(), 4000), async {
            let _ = rx.await;
        }));

        let html = http_get(addr, "/").await?;
        assert!(html.contains(CLIENT_TAG), "{html}");

        let css = http_get(addr, "/app.css").await?;
        assert!(css.ends_with("body{}"), "{css}");
        assert!(!css.contains(CLIENT_TAG));

        let js = http_get(addr, CLIENT_PATH).await?;
        assert!(js.contains(":4000`"));

        let _ = tx.send(());
        server.await??;
        Ok(())
    }

    #[tokio::test]
    async fn busy_preview_port_falls_back_to_another() -> Result<()> {
        let taken = bind("127.0.0.1", 0).await?;
        let port = taken.local_addr()?.port();

        let listener = bind("127.0.0.1", port).await?;

        assert_ne!(listener.local_addr()?.port(), port);
        Ok(())
    }

    /// Minimal HTTP/1.0 GET; returns the raw response.
    async fn http_get(addr: SocketAddr, path: &str) -> Result<String> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut stream = tokio::net::TcpStream::connect(addr).await?;
        stream
            .write_all(format!("GET {path} HTTP/1.0\r\nHost: localhost\r\n\r\n").as_bytes())
            .await?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
