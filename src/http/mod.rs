//! # Módulo HTTP
//!
//! Implementa el subconjunto de HTTP/1.x que habla el servidor, sin
//! librerías de alto nivel:
//!
//! - Parsing de requests (request line, headers, body opcional)
//! - Construcción y escritura de responses con headers calculados
//! - Códigos de estado
//! - Tabla de tipos MIME
//!
//! ## Alcance
//!
//! - Una request por conexión; siempre `Connection: close`
//! - Nunca se emite chunked transfer encoding
//! - El body de un request se limita a lo que cabe en una sola lectura
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 404 Not Found\r\n
//! Content-Type: text/html; charset=utf-8\r\n
//! Content-Length: 143\r\n
//! Connection: close\r\n
//! Date: Sun, 18 Oct 2026 10:00:00 GMT\r\n
//! Server: origin-server/0.1\r\n
//! \r\n
//! <!doctype html>...
//! ```

pub mod mime;
pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, ParseLimits, Request};
pub use response::{Body, CountingWriter, Response, ResponseFrame, ResponseWriter};
pub use status::StatusCode;
