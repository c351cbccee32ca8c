//! # Comandos Básicos
//! src/commands/basic.rs
//!
//! Implementación de los comandos incluidos:
//! - /status: Estado del servidor (HTML o JSON)
//! - /time: Fecha actual

use crate::http::{Method, Request, Response, StatusCode};
use crate::router::Router;
use crate::stats::{StatsRegistry, StatsSnapshot};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Registra `/status` y `/time` (GET y HEAD) en el router
pub fn register_builtin(router: &mut Router, stats: &StatsRegistry) {
    let stats = stats.clone();
    router.register("/status", &[Method::GET, Method::HEAD], move |req: &Request| {
        status_handler(req, &stats)
    });
    router.register("/time", &[Method::GET, Method::HEAD], time_handler);
}

/// Handler para /status
///
/// Lee un snapshot del registro; no tiene efectos además del conteo normal
/// de la propia request.
///
/// # Query parameters
/// - `format`: `json` para la versión JSON (opcional)
///
/// # Ejemplo de response
/// ```json
/// {
///   "start_time": 1760781600,
///   "uptime_secs": 42,
///   "request_count": 7,
///   "bytes_sent": 5120,
///   "active_connections": 1
/// }
/// ```
pub fn status_handler(req: &Request, stats: &StatsRegistry) -> Response {
    let snapshot = stats.snapshot();

    match req.query_param("format") {
        Some("json") => match serde_json::to_string_pretty(&snapshot) {
            Ok(body) => Response::json(&body),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize stats snapshot");
                Response::error(StatusCode::InternalServerError)
            }
        },
        _ => Response::html(&render_status(&snapshot)),
    }
}

fn render_status(snapshot: &StatsSnapshot) -> String {
    let started = httpdate::fmt_http_date(UNIX_EPOCH + Duration::from_secs(snapshot.start_time));
    format!(
        "<!doctype html><html><head><meta charset='utf-8'><title>Server status</title></head>\
         <body><h1>Server status</h1><table>\
         <tr><th>Started</th><td>{}</td></tr>\
         <tr><th>Uptime</th><td>{}</td></tr>\
         <tr><th>Requests</th><td>{}</td></tr>\
         <tr><th>Bytes sent</th><td>{}</td></tr>\
         <tr><th>Active connections</th><td>{}</td></tr>\
         </table></body></html>",
        started,
        snapshot.uptime_human(),
        snapshot.request_count,
        snapshot.bytes_sent,
        snapshot.active_connections
    )
}

/// Handler para /time
///
/// Retorna la hora actual como HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn time_handler(_req: &Request) -> Response {
    Response::text(&httpdate::fmt_http_date(SystemTime::now()))
}
