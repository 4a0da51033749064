//! HTTP front end for [`Server`], built on `tiny_http`.
//!
//! `tiny_http` parses and frames requests on its own connection threads.
//! A fixed set of blocking workers pulls parsed requests, serves the
//! percent-decoded path into a [`BufferedResponse`] and responds.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use color_eyre::eyre::Result;
use folio_core::{BufferedResponse, Server};
use folio_shared::STATUS_INTERNAL_SERVER_ERROR;
use percent_encoding::percent_decode_str;
use tiny_http::{Method, Request, Response};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Serve requests from `http` on `workers` blocking threads until `shutdown`
/// resolves, then wait for in-flight requests to finish.
pub(crate) async fn serve_on(
    http: Arc<tiny_http::Server>,
    server: Arc<Server>,
    workers: usize,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let workers = workers.max(1);
    let stopping = Arc::new(AtomicBool::new(false));

    let mut tasks = JoinSet::new();
    for _ in 0..workers {
        let http = Arc::clone(&http);
        let server = Arc::clone(&server);
        let stopping = Arc::clone(&stopping);
        tasks.spawn_blocking(move || worker_loop(&http, &server, &stopping));
    }

    shutdown.await;
    stopping.store(true, Ordering::SeqCst);
    // Each call releases one worker blocked in `recv`.
    for _ in 0..workers {
        http.unblock();
    }

    while let Some(joined) = tasks.join_next().await {
        joined?;
    }
    info!("listener stopped");
    Ok(())
}

fn worker_loop(http: &tiny_http::Server, server: &Server, stopping: &AtomicBool) {
    loop {
        match http.recv() {
            Ok(request) => handle(request, server),
            Err(_) if stopping.load(Ordering::SeqCst) => return,
            Err(e) => warn!(error = %e, "failed to receive request"),
        }
    }
}

fn handle(request: Request, server: &Server) {
    let response = match request.method() {
        Method::Get | Method::Head => match request_path(request.url()) {
            Some(path) => {
                let mut res = BufferedResponse::new();
                server.serve(&path, &mut res);
                let (status, body) = res.into_parts();
                Response::from_data(body)
                    .with_status_code(status.unwrap_or(STATUS_INTERNAL_SERVER_ERROR))
            }
            None => Response::from_string("bad request").with_status_code(400),
        },
        _ => Response::from_string("method not allowed").with_status_code(405),
    };

    if let Err(e) = request.respond(response) {
        debug!(error = %e, "failed to write response");
    }
}

/// Decode the path of an origin-form request target.
///
/// The query and fragment are dropped before decoding so an encoded `?` or
/// `#` stays part of the path. Targets that are not absolute paths, or that
/// decode to invalid UTF-8, are rejected.
fn request_path(target: &str) -> Option<String> {
    let path = target.split(['?', '#']).next().unwrap_or_default();
    if !path.starts_with('/') {
        return None;
    }
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::ServerOptions;
    use folio_plugin::builtin::{
        LogErrorHandler, MemoryCollection, MemorySourcer, PassthroughRenderer,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    #[test]
    fn decodes_request_paths() {
        assert_eq!(request_path("/index.html").as_deref(), Some("/index.html"));
        assert_eq!(request_path("/my%20file.txt").as_deref(), Some("/my file.txt"));
        assert_eq!(request_path("/caf%C3%A9.md?lang=fr").as_deref(), Some("/café.md"));
        assert_eq!(request_path("/a%3Fb#top").as_deref(), Some("/a?b"));
    }

    #[test]
    fn rejects_undecodable_targets() {
        assert_eq!(request_path("*"), None);
        assert_eq!(request_path("http://host/index.html"), None);
        assert_eq!(request_path("/%FF%FE"), None);
    }

    struct Running {
        addr: std::net::SocketAddr,
        stop: oneshot::Sender<()>,
        task: JoinHandle<Result<()>>,
    }

    fn start() -> Running {
        let files = MemoryCollection::new()
            .with_file("index.html", "<h1>home</h1>")
            .with_file("my file.txt", "spaced out");
        let server = Server::new(
            Arc::new(MemorySourcer::new(files)),
            Arc::new(PassthroughRenderer),
            Arc::new(LogErrorHandler),
            ServerOptions::default(),
        )
        .unwrap();

        let http = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = http.server_addr().to_ip().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(serve_on(Arc::new(http), Arc::new(server), 2, async move {
            let _ = stopped.await;
        }));

        Running { addr, stop, task }
    }

    async fn send(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    async fn stop(running: Running) {
        running.stop.send(()).unwrap();
        running.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn serves_file_over_tcp() {
        let running = start();
        let out = send(
            running.addr,
            "GET /index.html HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with("<h1>home</h1>"));
        stop(running).await;
    }

    #[tokio::test]
    async fn serves_percent_encoded_paths() {
        let running = start();
        let out = send(
            running.addr,
            "GET /my%20file.txt HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with("spaced out"));
        stop(running).await;
    }

    #[tokio::test]
    async fn head_omits_body() {
        let running = start();
        let out = send(
            running.addr,
            "HEAD /index.html HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(!out.contains("<h1>home</h1>"));
        stop(running).await;
    }

    #[tokio::test]
    async fn missing_file_is_a_500() {
        let running = start();
        let out = send(
            running.addr,
            "GET /missing.html HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(out.contains("did not recover"));
        stop(running).await;
    }

    #[tokio::test]
    async fn rejects_unsupported_methods() {
        let running = start();
        let out = send(
            running.addr,
            "POST /index.html HTTP/1.1\r\nHost: x\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
        stop(running).await;
    }
}
