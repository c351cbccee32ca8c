//! # Dispatcher
//! src/server/dispatcher.rs
//!
//! Máquina de estados de una conexión, en una sola pasada:
//!
//! ```text
//! leer (una vez) → parse ─ error           → 400 / 405
//!                         └ router ─ Handler          → handler (panic → 500)
//!                                  ├ MethodNotAllowed → 405
//!                                  └ NoRoute ─ POST   → 405
//!                                            └ resto  → archivos estáticos
//! → escribir → stats (exactamente una vez) → evento de log
//! ```
//!
//! Los errores nunca salen de la conexión: todo termina en una respuesta o
//! en un aborto silencioso si el peer se fue.

use crate::config::Config;
use crate::error::ServerError;
use crate::files::{PathResolver, Resolve, StaticFiles};
use crate::http::{
    CountingWriter, Method, ParseLimits, Request, ResponseFrame, ResponseWriter, StatusCode,
};
use crate::router::{RouteMatch, Router};
use crate::stats::StatsRegistry;
use std::any::Any;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Target de tracing para los eventos de acceso
pub const ACCESS_TARGET: &str = "origin_server::access";

/// Tamaño por defecto del buffer de lectura
pub const DEFAULT_READ_BUFFER: usize = 8192;

/// Conexión ya aceptada: lectura y escritura bloqueantes de bytes
pub trait Connection: Read + Write {
    /// Dirección del cliente, solo para logs
    fn peer(&self) -> String;
}

impl Connection for TcpStream {
    fn peer(&self) -> String {
        self.peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }
}

/// Cómo terminó una conexión
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// `None` si el cliente no mandó nada (Aborted)
    pub status: Option<StatusCode>,

    /// Bytes escritos de verdad (head + body)
    pub bytes: u64,

    /// `false` si la escritura se cortó o no hubo request
    pub complete: bool,
}

/// Respuesta decidida antes de escribir
struct Reply {
    method: Option<Method>,
    path: String,
    frame: ResponseFrame,
}

pub struct Dispatcher<R = PathResolver> {
    router: Arc<Router>,
    files: StaticFiles<R>,
    writer: ResponseWriter,
    stats: StatsRegistry,
    limits: ParseLimits,
    read_buffer: usize,
}

impl Dispatcher<PathResolver> {
    /// Dispatcher sobre el webroot y límites de `config`
    pub fn from_config(config: &Config, router: Arc<Router>, stats: StatsRegistry) -> Self {
        Dispatcher::new(router, StaticFiles::new(&config.webroot), stats)
            .with_server_name(&config.server_name)
            .with_limits(config.parse_limits())
            .with_read_buffer(config.read_buffer)
    }
}

impl<R: Resolve> Dispatcher<R> {
    pub fn new(router: Arc<Router>, files: StaticFiles<R>, stats: StatsRegistry) -> Self {
        Self {
            router,
            files,
            writer: ResponseWriter::new(crate::config::DEFAULT_SERVER_NAME),
            stats,
            limits: ParseLimits::default(),
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }

    pub fn with_server_name(mut self, name: &str) -> Self {
        self.writer = ResponseWriter::new(name);
        self
    }

    pub fn with_limits(mut self, limits: ParseLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_read_buffer(mut self, size: usize) -> Self {
        self.read_buffer = size.max(1);
        self
    }

    pub fn stats(&self) -> &StatsRegistry {
        &self.stats
    }

    /// Atiende una conexión completa.
    ///
    /// Actualiza el registro exactamente una vez y emite un evento en
    /// `origin_server::access`, incluso si el cliente se fue sin mandar nada.
    pub fn handle<C: Connection>(&self, conn: &mut C) -> Outcome {
        let start = Instant::now();
        let client = conn.peer();
        let mut buffer = vec![0u8; self.read_buffer];

        let read = match read_once(conn, &mut buffer) {
            Ok(0) => None,
            Ok(n) => Some(n),
            Err(e) => {
                tracing::debug!(client = %client, error = %e, "read failed");
                None
            }
        };

        let Some(n) = read else {
            let outcome = Outcome {
                status: None,
                bytes: 0,
                complete: false,
            };
            self.finish(&client, "-", "-", &outcome, start);
            return outcome;
        };

        let reply = self.respond(&buffer[..n]);
        let head_only = reply.method == Some(Method::HEAD);
        let status = reply.frame.status;

        let mut sink = CountingWriter::new(&mut *conn);
        let result = self.writer.send(&mut sink, reply.frame, head_only);
        let bytes = sink.written();

        let complete = match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    client = %client,
                    path = %reply.path,
                    bytes,
                    error = %e,
                    "response delivery aborted"
                );
                false
            }
        };

        let outcome = Outcome {
            status: Some(status),
            bytes,
            complete,
        };
        let method = reply.method.map(|m| m.as_str()).unwrap_or("-");
        self.finish(&client, method, &reply.path, &outcome, start);
        outcome
    }

    /// Decide la respuesta para los bytes recibidos
    fn respond(&self, raw: &[u8]) -> Reply {
        let request = match Request::parse_with_limits(raw, &self.limits) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "rejected request");
                return Reply {
                    method: None,
                    path: "-".to_string(),
                    frame: self.error_frame(&ServerError::from(e)),
                };
            }
        };

        let method = request.method();
        let path = request.path().to_string();

        let frame = match self.router.find(&path, method) {
            RouteMatch::Handler(handler) => {
                match panic::catch_unwind(AssertUnwindSafe(|| handler(&request))) {
                    Ok(response) => response.into(),
                    Err(payload) => {
                        self.error_frame(&ServerError::InternalFailure(handler_panic(&*payload)))
                    }
                }
            }
            RouteMatch::MethodNotAllowed => {
                self.error_frame(&ServerError::UnsupportedMethod(method.to_string()))
            }
            // El árbol estático es de solo lectura
            RouteMatch::NoRoute if method == Method::POST => {
                self.error_frame(&ServerError::UnsupportedMethod(method.to_string()))
            }
            RouteMatch::NoRoute => match self.files.serve(&path) {
                Ok(frame) => frame,
                Err(e) => self.error_frame(&e),
            },
        };

        Reply {
            method: Some(method),
            path,
            frame,
        }
    }

    fn error_frame(&self, err: &ServerError) -> ResponseFrame {
        if let ServerError::InternalFailure(source) = err {
            tracing::error!(error = %source, "internal failure");
        }
        self.files.error_response(err).into()
    }

    fn finish(&self, client: &str, method: &str, path: &str, outcome: &Outcome, start: Instant) {
        self.stats.record_request(outcome.bytes);

        tracing::info!(
            target: ACCESS_TARGET,
            client = %client,
            method = %method,
            path = %path,
            status = outcome.status.map(|s| s.as_u16()).unwrap_or(0),
            bytes = outcome.bytes,
            complete = outcome.complete,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        );
    }
}

/// Convierte el payload de un panic de handler en un error de I/O
fn handler_panic(payload: &(dyn Any + Send)) -> io::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    io::Error::new(io::ErrorKind::Other, format!("handler panicked: {message}"))
}

/// Una sola lectura; solo se reintenta si la interrumpe una señal
fn read_once<C: Read>(conn: &mut C, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match conn.read(buffer) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands;
    use crate::files::{ResolveError, ResolvedTarget};
    use crate::http::Response;
    use std::fs;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Conexión en memoria: lee de `input`, escribe en `output`
    struct MockConnection {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl MockConnection {
        fn new(raw: &[u8]) -> Self {
            Self {
                input: Cursor::new(raw.to_vec()),
                output: Vec::new(),
            }
        }

        fn text(&self) -> String {
            String::from_utf8_lossy(&self.output).into_owned()
        }
    }

    impl Read for MockConnection {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for MockConnection {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Connection for MockConnection {
        fn peer(&self) -> String {
            "127.0.0.1:50000".to_string()
        }
    }

    /// Conexión cuyo peer deja de aceptar bytes después de `limit`
    struct ClosingConnection {
        input: Cursor<Vec<u8>>,
        limit: usize,
        written: usize,
    }

    impl Read for ClosingConnection {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ClosingConnection {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written >= self.limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"));
            }
            let n = buf.len().min(self.limit - self.written);
            self.written += n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Connection for ClosingConnection {
        fn peer(&self) -> String {
            "127.0.0.1:50001".to_string()
        }
    }

    /// Resolver que cuenta cuántas veces se consulta el disco
    struct CountingResolver {
        inner: PathResolver,
        calls: Arc<AtomicUsize>,
    }

    impl Resolve for CountingResolver {
        fn resolve(&self, path: &str) -> Result<ResolvedTarget, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(path)
        }
    }

    /// Resolver que siempre falla como error interno
    struct FailingResolver;

    impl Resolve for FailingResolver {
        fn resolve(&self, _path: &str) -> Result<ResolvedTarget, ResolveError> {
            Err(ResolveError::Internal(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "out of memory",
            )))
        }
    }

    fn webroot() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), b"Hello World!").unwrap();
        fs::write(dir.path().join("style.css"), b"body { color: red; }").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        fs::write(dir.path().join("subdir/a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("subdir/nested")).unwrap();
        dir
    }

    fn router(stats: &StatsRegistry) -> Arc<Router> {
        let mut router = Router::new();
        commands::register_builtin(&mut router, stats);
        Arc::new(router)
    }

    fn dispatcher(root: &TempDir) -> Dispatcher {
        let stats = StatsRegistry::new();
        Dispatcher::new(router(&stats), StaticFiles::new(root.path()), stats)
    }

    fn counting_dispatcher(root: &TempDir) -> (Dispatcher<CountingResolver>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = CountingResolver {
            inner: PathResolver::new(root.path()),
            calls: Arc::clone(&calls),
        };
        let stats = StatsRegistry::new();
        let files = StaticFiles::with_resolver(root.path(), resolver);
        (Dispatcher::new(router(&stats), files, stats), calls)
    }

    fn exchange<R: Resolve>(dispatcher: &Dispatcher<R>, raw: &[u8]) -> (Outcome, String) {
        let mut conn = MockConnection::new(raw);
        let outcome = dispatcher.handle(&mut conn);
        (outcome, conn.text())
    }

    /// Head sin la línea `Date`
    fn head_without_date(response: &str) -> String {
        let head = response.split("\r\n\r\n").next().unwrap();
        head.lines()
            .filter(|line| !line.starts_with("Date:"))
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    #[test]
    fn test_get_index() {
        let root = webroot();
        let (outcome, text) = exchange(&dispatcher(&root), b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");

        assert_eq!(outcome.status, Some(StatusCode::Ok));
        assert!(outcome.complete);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html\r\n"));
        assert!(text.contains("Content-Length: 12\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.contains("Server: origin-server/0.1\r\n"));
        assert!(text.ends_with("\r\n\r\nHello World!"));
        assert_eq!(outcome.bytes, text.len() as u64);
    }

    #[test]
    fn test_get_stylesheet() {
        let root = webroot();
        let (_, text) = exchange(&dispatcher(&root), b"GET /style.css HTTP/1.1\r\n\r\n");

        assert!(text.contains("Content-Type: text/css\r\n"));
        assert!(text.ends_with("body { color: red; }"));
    }

    #[test]
    fn test_missing_file() {
        let root = webroot();
        let (outcome, text) = exchange(&dispatcher(&root), b"GET /missing.txt HTTP/1.1\r\n\r\n");

        assert_eq!(outcome.status, Some(StatusCode::NotFound));
        assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[test]
    fn test_post_registered_route() {
        let root = webroot();
        let (outcome, text) = exchange(&dispatcher(&root), b"POST /time HTTP/1.1\r\n\r\nbody");

        assert_eq!(outcome.status, Some(StatusCode::MethodNotAllowed));
        assert!(text.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    }

    #[test]
    fn test_post_without_route() {
        let root = webroot();
        let (outcome, _) = exchange(&dispatcher(&root), b"POST /index.html HTTP/1.1\r\n\r\n");
        assert_eq!(outcome.status, Some(StatusCode::MethodNotAllowed));
    }

    #[test]
    fn test_unsupported_method() {
        let root = webroot();
        let (outcome, _) = exchange(&dispatcher(&root), b"DELETE /index.html HTTP/1.1\r\n\r\n");
        assert_eq!(outcome.status, Some(StatusCode::MethodNotAllowed));
    }

    #[test]
    fn test_traversal_rejected() {
        let root = webroot();
        let d = dispatcher(&root);

        for target in ["/../../etc/passwd", "/subdir/../../secret", "/%2e%2e/etc/passwd", "/a..b"] {
            let raw = format!("GET {target} HTTP/1.1\r\n\r\n");
            let (outcome, text) = exchange(&d, raw.as_bytes());
            assert_eq!(outcome.status, Some(StatusCode::BadRequest));
            assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        }
    }

    #[test]
    fn test_malformed_request() {
        let root = webroot();
        let d = dispatcher(&root);

        let (outcome, _) = exchange(&d, b"GET /\r\n\r\n");
        assert_eq!(outcome.status, Some(StatusCode::BadRequest));

        let (outcome, _) = exchange(&d, b"\x00\x01\x02\x03garbage");
        assert_eq!(outcome.status, Some(StatusCode::BadRequest));
    }

    #[test]
    fn test_oversized_target_rejected() {
        let root = webroot();
        let d = dispatcher(&root).with_limits(ParseLimits {
            max_target: 8,
            ..ParseLimits::default()
        });

        let (outcome, _) = exchange(&d, b"GET /style.css HTTP/1.1\r\n\r\n");
        assert_eq!(outcome.status, Some(StatusCode::BadRequest));
    }

    #[test]
    fn test_listing() {
        let root = webroot();
        let (outcome, text) = exchange(&dispatcher(&root), b"GET /subdir/ HTTP/1.1\r\n\r\n");

        assert_eq!(outcome.status, Some(StatusCode::Ok));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(text.contains("href=\"/subdir/a.txt\""));
        assert!(text.contains("href=\"/subdir/nested/\""));
        assert!(!text.contains("style.css"));
        assert!(!text.contains("index.html"));
    }

    #[test]
    fn test_route_shadows_filesystem() {
        let root = webroot();
        fs::write(root.path().join("time"), b"static").unwrap();

        let (_, text) = exchange(&dispatcher(&root), b"GET /time HTTP/1.1\r\n\r\n");
        assert!(text.ends_with(" GMT"));
        assert!(!text.ends_with("static"));
    }

    #[test]
    fn test_method_not_allowed_skips_filesystem() {
        let root = webroot();
        fs::write(root.path().join("time"), b"static").unwrap();
        let (d, calls) = counting_dispatcher(&root);

        let (outcome, _) = exchange(&d, b"POST /time HTTP/1.1\r\n\r\n");
        assert_eq!(outcome.status, Some(StatusCode::MethodNotAllowed));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        exchange(&d, b"GET /style.css HTTP/1.1\r\n\r\n");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_head_matches_get() {
        let root = webroot();
        let d = dispatcher(&root);

        for path in ["/", "/style.css", "/subdir/", "/missing.txt", "/status", "/time"] {
            let (_, get) = exchange(&d, format!("GET {path} HTTP/1.1\r\n\r\n").as_bytes());
            let (head_outcome, head) = exchange(&d, format!("HEAD {path} HTTP/1.1\r\n\r\n").as_bytes());

            assert!(head.ends_with("\r\n\r\n"), "HEAD {path} wrote a body");
            assert_eq!(head_outcome.bytes, head.len() as u64);
            if path != "/status" {
                assert_eq!(head_without_date(&get), head_without_date(&head), "{path}");
            }
        }
    }

    #[test]
    fn test_idempotent_requests() {
        let root = webroot();
        let d = dispatcher(&root);
        let before = d.stats().snapshot().request_count;

        let responses: Vec<String> = (0..5)
            .map(|_| exchange(&d, b"GET /style.css HTTP/1.1\r\n\r\n").1)
            .collect();

        let first = head_without_date(&responses[0]);
        for response in &responses {
            assert_eq!(head_without_date(response), first);
            assert!(response.ends_with("body { color: red; }"));
        }
        assert_eq!(d.stats().snapshot().request_count, before + 5);
    }

    #[test]
    fn test_stats_count_bytes_written() {
        let root = webroot();
        let d = dispatcher(&root);

        let (first, _) = exchange(&d, b"GET / HTTP/1.1\r\n\r\n");
        let (second, _) = exchange(&d, b"GET /missing.txt HTTP/1.1\r\n\r\n");

        let snapshot = d.stats().snapshot();
        assert_eq!(snapshot.request_count, 2);
        assert_eq!(snapshot.bytes_sent, first.bytes + second.bytes);
    }

    #[test]
    fn test_empty_connection_is_aborted() {
        let root = webroot();
        let d = dispatcher(&root);
        let mut conn = MockConnection::new(b"");

        let outcome = d.handle(&mut conn);

        assert_eq!(outcome.status, None);
        assert!(!outcome.complete);
        assert!(conn.output.is_empty());
        assert_eq!(d.stats().snapshot().request_count, 1);
        assert_eq!(d.stats().snapshot().bytes_sent, 0);
    }

    #[test]
    fn test_write_failure_mid_stream() {
        let root = webroot();
        let big = vec![b'x'; 3 * crate::http::response::CHUNK_SIZE];
        fs::write(root.path().join("big.txt"), &big).unwrap();
        let d = dispatcher(&root);

        let mut conn = ClosingConnection {
            input: Cursor::new(b"GET /big.txt HTTP/1.1\r\n\r\n".to_vec()),
            limit: 1000,
            written: 0,
        };
        let outcome = d.handle(&mut conn);

        assert_eq!(outcome.status, Some(StatusCode::Ok));
        assert!(!outcome.complete);
        assert_eq!(outcome.bytes, 1000);
        assert_eq!(d.stats().snapshot().bytes_sent, 1000);
    }

    #[test]
    fn test_custom_handler() {
        let root = webroot();
        let stats = StatsRegistry::new();
        let mut router = Router::new();
        router.register("/echo", &[Method::POST], |req: &Request| {
            Response::new(StatusCode::Ok).with_body_bytes(req.body().unwrap_or_default().to_vec())
        });
        let d = Dispatcher::new(Arc::new(router), StaticFiles::new(root.path()), stats)
            .with_server_name("test/1.0");

        let (_, text) = exchange(&d, b"POST /echo HTTP/1.1\r\n\r\nping");
        assert!(text.contains("Server: test/1.0\r\n"));
        assert!(text.contains("Content-Length: 4\r\n"));
        assert!(text.ends_with("ping"));
    }

    #[test]
    fn test_handler_panic_is_500() {
        let root = webroot();
        let stats = StatsRegistry::new();
        let mut router = Router::new();
        router.register("/boom", &[Method::GET], |_req: &Request| -> Response {
            panic!("handler exploded")
        });
        let d = Dispatcher::new(Arc::new(router), StaticFiles::new(root.path()), stats);

        let (outcome, text) = exchange(&d, b"GET /boom HTTP/1.1\r\n\r\n");

        assert_eq!(outcome.status, Some(StatusCode::InternalServerError));
        assert!(outcome.complete);
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert_eq!(d.stats().snapshot().request_count, 1);
        assert_eq!(d.stats().snapshot().bytes_sent, text.len() as u64);

        // El dispatcher sigue atendiendo después del panic
        let (outcome, _) = exchange(&d, b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(outcome.status, Some(StatusCode::Ok));
        assert_eq!(d.stats().snapshot().request_count, 2);
    }

    #[test]
    fn test_internal_error_is_500() {
        let root = webroot();
        let stats = StatsRegistry::new();
        let files = StaticFiles::with_resolver(root.path(), FailingResolver);
        let d = Dispatcher::new(router(&stats), files, stats);

        let (outcome, text) = exchange(&d, b"GET /style.css HTTP/1.1\r\n\r\n");

        assert_eq!(outcome.status, Some(StatusCode::InternalServerError));
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert_eq!(d.stats().snapshot().request_count, 1);
        assert_eq!(d.stats().snapshot().bytes_sent, outcome.bytes);
    }
}
