//! # Construcción y Escritura de Respuestas HTTP
//! src/http/response.rs
//!
//! Dos niveles:
//!
//! - [`Response`]: respuesta en memoria que producen los handlers y las
//!   páginas de error (status, Content-Type, body).
//! - [`ResponseFrame`] + [`ResponseWriter`]: lo que realmente se escribe en
//!   la conexión. El body puede ser un buffer o un archivo abierto que se
//!   envía por bloques.
//!
//! ## Formato en el cable
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 12\r\n
//! Connection: close\r\n
//! Date: Sun, 18 Oct 2026 10:00:00 GMT\r\n
//! Server: origin-server/0.1\r\n
//! \r\n
//! <body>
//! ```
//!
//! Los headers se calculan siempre aquí; nadie puede inyectar otros.
//! `Content-Length` es exactamente lo que se escribe después.

use super::StatusCode;
use std::fs::File;
use std::io::{self, Read, Write};
use std::time::SystemTime;

/// Tamaño de bloque al enviar archivos
pub const CHUNK_SIZE: usize = 8192;

/// Content-Type de las páginas HTML generadas por el servidor
pub const HTML_UTF8: &str = "text/html; charset=utf-8";

/// Respuesta en memoria
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    content_type: String,
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta vacía con el código indicado
    ///
    /// # Ejemplo
    /// ```
    /// use origin_server::http::{Response, StatusCode};
    ///
    /// let response = Response::new(StatusCode::Ok)
    ///     .with_content_type("text/plain")
    ///     .with_body("hola");
    /// assert_eq!(response.body(), b"hola");
    /// ```
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: Vec::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// 200 OK con `text/plain`
    pub fn text(body: &str) -> Self {
        Self::new(StatusCode::Ok).with_body(body)
    }

    /// 200 OK con HTML UTF-8
    pub fn html(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_content_type(HTML_UTF8)
            .with_body(body)
    }

    /// 200 OK con `application/json`
    pub fn json(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_content_type("application/json")
            .with_body(body)
    }

    /// Página de error HTML genérica para `status`
    ///
    /// # Ejemplo
    /// ```
    /// use origin_server::http::{Response, StatusCode};
    ///
    /// let response = Response::error(StatusCode::NotFound);
    /// let body = String::from_utf8(response.body().to_vec()).unwrap();
    /// assert!(body.contains("<h1>404 Not Found</h1>"));
    /// ```
    pub fn error(status: StatusCode) -> Self {
        let body = format!(
            "<!doctype html><html><head><meta charset='utf-8'><title>{status}</title></head>\
             <body><h1>{status}</h1><p>Sorry, an error occurred.</p></body></html>"
        );
        Self::new(status).with_content_type(HTML_UTF8).with_body(&body)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Origen de los bytes del body
#[derive(Debug)]
pub enum Body {
    /// Body completo en memoria
    Bytes(Vec<u8>),

    /// Archivo abierto y su tamaño según metadata
    File { file: File, len: u64 },
}

impl Body {
    /// Bytes que se anunciarán en `Content-Length`
    pub fn len(&self) -> u64 {
        match self {
            Body::Bytes(bytes) => bytes.len() as u64,
            Body::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Respuesta lista para escribir en la conexión
#[derive(Debug)]
pub struct ResponseFrame {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Body,
}

impl ResponseFrame {
    /// Frame para un archivo regular ya abierto
    pub fn file(file: File, len: u64, content_type: &str) -> Self {
        Self {
            status: StatusCode::Ok,
            content_type: content_type.to_string(),
            body: Body::File { file, len },
        }
    }
}

impl From<Response> for ResponseFrame {
    fn from(response: Response) -> Self {
        Self {
            status: response.status,
            content_type: response.content_type,
            body: Body::Bytes(response.body),
        }
    }
}

/// Serializa frames sobre cualquier `Write`
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    server_name: String,
}

impl ResponseWriter {
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_string(),
        }
    }

    /// Genera status line + headers + línea vacía
    pub fn head_bytes(
        &self,
        status: StatusCode,
        content_type: &str,
        content_length: u64,
        date: SystemTime,
    ) -> Vec<u8> {
        format!(
            "HTTP/1.1 {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             Date: {}\r\n\
             Server: {}\r\n\
             \r\n",
            status,
            content_type,
            content_length,
            httpdate::fmt_http_date(date),
            self.server_name
        )
        .into_bytes()
    }

    /// Escribe el frame completo. Con `head_only` (HEAD) no sale ningún byte
    /// de body, pero los headers son idénticos a los de GET.
    ///
    /// Un error de escritura corta el envío; no se reintenta.
    pub fn send<W: Write>(&self, sink: &mut W, frame: ResponseFrame, head_only: bool) -> io::Result<()> {
        let head = self.head_bytes(
            frame.status,
            &frame.content_type,
            frame.body.len(),
            SystemTime::now(),
        );
        sink.write_all(&head)?;

        if !head_only {
            match frame.body {
                Body::Bytes(bytes) => sink.write_all(&bytes)?,
                Body::File { file, len } => stream_file(file, len, sink)?,
            }
        }

        sink.flush()
    }
}

/// Copia exactamente `len` bytes del archivo en bloques de `CHUNK_SIZE`.
///
/// Si el archivo se acorta mientras se envía, retorna `UnexpectedEof`:
/// la conexión ya prometió `len` bytes y la entrega queda incompleta.
fn stream_file<W: Write>(file: File, len: u64, sink: &mut W) -> io::Result<()> {
    let mut reader = file.take(len);
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut sent = 0u64;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink.write_all(&chunk[..n])?;
        sent += n as u64;
    }

    if sent < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("file ended after {sent} of {len} bytes"),
        ));
    }
    Ok(())
}

/// `Write` que cuenta los bytes aceptados por el destino
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Bytes efectivamente escritos hasta ahora
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
