//! # Listado de Directorios
//! src/files/listing.rs
//!
//! Renderiza un [`Listing`] como página HTML. Cada hijo es un link con
//! href = path del directorio + nombre (percent-encoded); los
//! subdirectorios llevan `/` al final.

use super::resolver::Listing;
use crate::http::Response;
use std::fmt::Write;

pub fn render(listing: &Listing) -> Response {
    let title = escape_html(&listing.display_path);
    let mut body = String::with_capacity(256 + listing.entries.len() * 64);

    let _ = write!(
        body,
        "<!doctype html><html><head><meta charset='utf-8'>\
         <meta name='viewport' content='width=device-width,initial-scale=1'>\
         <title>Index of {title}</title></head><body><h1>Index of {title}</h1><ul>"
    );

    for entry in &listing.entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        let _ = write!(
            body,
            "<li><a href=\"{}{}{}\">{}{}</a></li>",
            encode_href(&listing.display_path, true),
            encode_href(&entry.name, false),
            suffix,
            escape_html(&entry.name),
            suffix
        );
    }

    body.push_str("</ul><hr><a href=\"/\">Home</a></body></html>");
    Response::html(&body)
}

/// Escapa texto para insertarlo en HTML
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Percent-encoding de todo lo que no sea unreserved (RFC 3986).
/// Con `keep_slash` las `/` quedan literales.
fn encode_href(input: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for b in input.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            b'/' if keep_slash => out.push('/'),
            b => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}
