//! # Parsing de Requests HTTP/1.x
//! src/http/request.rs
//!
//! Parser explícito del request: nunca deja campos a medio llenar, o
//! retorna un `Request` completo o un `ParseError` tipado.
//!
//! ## Formato de un Request
//!
//! ```text
//! GET /docs/a%20b.txt?x=1 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! \r\n
//! <body opcional>
//! ```
//!
//! ## Reglas
//!
//! 1. **Request Line**: se separa en whitespace; deben quedar exactamente
//!    tres campos `METHOD TARGET VERSION`.
//! 2. **Headers**: pares `Name: Value` hasta la primera línea vacía. Una
//!    línea sin `:` se ignora.
//! 3. **Body**: todo lo que sigue a la línea vacía, sin decodificar y sin
//!    validar contra `Content-Length`.

use std::collections::HashMap;
use thiserror::Error;

/// Métodos HTTP que el servidor reconoce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Obtener un recurso
    GET,

    /// HEAD - Como GET pero solo retorna headers
    HEAD,

    /// POST - Enviar datos a un recurso
    POST,
}

impl Method {
    /// Parsea un token de método
    ///
    /// # Errores
    ///
    /// Retorna `UnsupportedMethod` si el verbo no es GET, HEAD o POST
    fn from_token(s: &str) -> Result<Self, ParseError> {
        match s {
            "GET" => Ok(Method::GET),
            "HEAD" => Ok(Method::HEAD),
            "POST" => Ok(Method::POST),
            _ => Err(ParseError::UnsupportedMethod(s.to_string())),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Límites del parser. Un campo que los excede se rechaza, nunca se trunca.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_method: usize,
    pub max_target: usize,
    pub max_version: usize,
    pub max_headers: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_method: 16,
            max_target: 1024,
            max_version: 32,
            max_headers: 100,
        }
    }
}

/// Errores que pueden ocurrir durante el parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Buffer vacío o solo whitespace
    #[error("Empty request")]
    EmptyRequest,

    /// La request line no tiene los tres campos
    #[error("Invalid request line format")]
    InvalidRequestLine,

    /// Un campo de la request line excede su límite
    #[error("Field '{field}' exceeds {limit} bytes")]
    FieldTooLong { field: &'static str, limit: usize },

    /// Demasiados headers
    #[error("More than {0} headers")]
    TooManyHeaders(usize),

    /// El target no es un path absoluto
    #[error("Invalid request target: {0}")]
    InvalidTarget(String),

    /// Verbo fuera de GET/HEAD/POST
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

/// Representa un request HTTP parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP (GET, HEAD, POST)
    method: Method,

    /// Target tal como llegó (ej: "/a%20b?x=1")
    target: String,

    /// Path decodificado, siempre empieza con "/" (ej: "/a b")
    path: String,

    /// Query parameters decodificados (ej: {"x": "1"})
    query_params: HashMap<String, String>,

    /// Versión HTTP, sin validar (ej: "HTTP/1.1")
    version: String,

    /// Headers en orden de llegada
    headers: Vec<(String, String)>,

    /// Bytes después de la línea vacía, si hay alguno
    body: Option<Vec<u8>>,
}

impl Request {
    /// Parsea un request con los límites por defecto
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use origin_server::http::Request;
    ///
    /// let raw = b"GET /docs/a%20b.txt?lang=es HTTP/1.1\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.path(), "/docs/a b.txt");
    /// assert_eq!(request.query_param("lang"), Some("es"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        Self::parse_with_limits(buffer, &ParseLimits::default())
    }

    /// Parsea un request respetando `limits`
    pub fn parse_with_limits(buffer: &[u8], limits: &ParseLimits) -> Result<Self, ParseError> {
        if buffer.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ParseError::EmptyRequest);
        }

        // 1. Request line
        let (line, rest, _) = split_line(buffer);
        let (method, target, version) = Self::parse_request_line(line, limits)?;

        if !target.starts_with('/') {
            return Err(ParseError::InvalidTarget(target));
        }
        let (path, query_params) = Self::parse_path_and_query(&target);

        // 2. Headers y body
        let (headers, body) = Self::parse_headers_and_body(rest, limits)?;

        Ok(Request {
            method,
            target,
            path,
            query_params,
            version,
            headers,
            body,
        })
    }

    /// Tokeniza la request line en exactamente tres campos
    fn parse_request_line(
        line: &[u8],
        limits: &ParseLimits,
    ) -> Result<(Method, String, String), ParseError> {
        let line = String::from_utf8_lossy(line);
        let parts: Vec<&str> = line.split_ascii_whitespace().collect();

        let [method, target, version] = parts[..] else {
            return Err(ParseError::InvalidRequestLine);
        };

        check_len("method", method, limits.max_method)?;
        check_len("target", target, limits.max_target)?;
        check_len("version", version, limits.max_version)?;

        let method = Method::from_token(method)?;
        Ok((method, target.to_string(), version.to_string()))
    }

    /// Separa path y query, decodificando ambos
    ///
    /// Ejemplo: "/a%20b?x=1&y" → ("/a b", {"x": "1", "y": ""})
    fn parse_path_and_query(target: &str) -> (String, HashMap<String, String>) {
        match target.split_once('?') {
            Some((path, query)) => (percent_decode(path), Self::parse_query_string(query)),
            None => (percent_decode(target), HashMap::new()),
        }
    }

    fn parse_query_string(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|param| !param.is_empty())
            .map(|param| match param.split_once('=') {
                Some((key, value)) => (percent_decode(key), percent_decode(value)),
                None => (percent_decode(param), String::new()),
            })
            .collect()
    }

    /// Lee headers hasta la primera línea vacía; lo que sigue es el body
    fn parse_headers_and_body(
        mut rest: &[u8],
        limits: &ParseLimits,
    ) -> Result<(Vec<(String, String)>, Option<Vec<u8>>), ParseError> {
        let mut headers = Vec::new();

        while !rest.is_empty() {
            let (line, next, terminated) = split_line(rest);

            if line.is_empty() && terminated {
                let body = (!next.is_empty()).then(|| next.to_vec());
                return Ok((headers, body));
            }

            let text = String::from_utf8_lossy(line);
            if let Some((name, value)) = text.split_once(':') {
                if headers.len() >= limits.max_headers {
                    return Err(ParseError::TooManyHeaders(limits.max_headers));
                }
                headers.push((name.trim().to_string(), value.trim_start().to_string()));
            }

            rest = next;
        }

        Ok((headers, None))
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> Method {
        self.method
    }

    /// Obtiene el target sin decodificar
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Obtiene el path decodificado
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene todos los query parameters
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    /// Obtiene la versión HTTP
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene todos los headers en orden de llegada
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Obtiene un header; el nombre se compara sin distinguir mayúsculas
    ///
    /// # Ejemplo
    /// ```
    /// use origin_server::http::Request;
    ///
    /// let raw = b"GET / HTTP/1.1\r\nUser-Agent: curl\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.header("user-agent"), Some("curl"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Obtiene el body del request, si llegó alguno
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

fn check_len(field: &'static str, value: &str, limit: usize) -> Result<(), ParseError> {
    if value.len() > limit {
        return Err(ParseError::FieldTooLong { field, limit });
    }
    Ok(())
}

/// Separa la primera línea del buffer.
///
/// Retorna `(línea sin terminador, resto, encontró terminador)`. Acepta
/// `\r\n` y `\n` solo.
fn split_line(buffer: &[u8]) -> (&[u8], &[u8], bool) {
    match memchr::memchr(b'\n', buffer) {
        Some(pos) => {
            let line = &buffer[..pos];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            (line, &buffer[pos + 1..], true)
        }
        None => (buffer, &buffer[buffer.len()..], false),
    }
}

/// Decodifica `%XX` y `+` como espacio.
///
/// Una secuencia `%` mal formada (sin dos dígitos hex) se deja literal.
///
/// # Ejemplo
/// ```
/// use origin_server::http::request::percent_decode;
///
/// assert_eq!(percent_decode("a%20b+c"), "a b c");
/// assert_eq!(percent_decode("100%zz"), "100%zz");
/// ```
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() && is_hex_pair(bytes[i + 1], bytes[i + 2]) => {
                out.push(hex_value(bytes[i + 1]) << 4 | hex_value(bytes[i + 2]));
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn is_hex_pair(a: u8, b: u8) -> bool {
    a.is_ascii_hexdigit() && b.is_ascii_hexdigit()
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}
