//! # Tabla MIME
//! src/http/mime.rs
//!
//! Tabla fija extensión → Content-Type. La comparación es sensible a
//! mayúsculas: `INDEX.HTML` se sirve como `application/octet-stream`.

use std::path::Path;

/// Content-Type por defecto para extensiones desconocidas o ausentes
pub const DEFAULT_MIME: &str = "application/octet-stream";

const MIME_TABLE: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("txt", "text/plain"),
    ("svg", "image/svg+xml"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("ico", "image/x-icon"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("woff2", "font/woff2"),
];

/// Busca el Content-Type para una extensión (sin el punto)
pub fn for_extension(ext: &str) -> &'static str {
    MIME_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME)
}

/// Determina el Content-Type a partir de la extensión final del path
///
/// # Ejemplo
/// ```
/// use origin_server::http::mime;
/// use std::path::Path;
///
/// assert_eq!(mime::for_path(Path::new("www/style.css")), "text/css");
/// assert_eq!(mime::for_path(Path::new("www/README")), "application/octet-stream");
/// ```
pub fn for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(for_extension)
        .unwrap_or(DEFAULT_MIME)
}
