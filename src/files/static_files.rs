//! # Servidor de Recursos Estáticos
//! src/files/static_files.rs
//!
//! Une el resolver con la respuesta: abre el archivo, toma el tamaño de
//! su metadata y arma el frame que después se envía por bloques. Los
//! listados se renderizan en memoria.

use super::listing;
use super::resolver::{FileTarget, PathResolver, Resolve, ResolvedTarget, INDEX_FILE};
use crate::error::ServerError;
use crate::http::{Response, ResponseFrame, StatusCode};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Página de error opcional dentro del webroot
pub const NOT_FOUND_PAGE: &str = "404.html";

pub struct StaticFiles<R = PathResolver> {
    root: PathBuf,
    resolver: R,
}

impl StaticFiles<PathResolver> {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        let root = root.into();
        Self {
            resolver: PathResolver::new(root.clone()),
            root,
        }
    }
}

impl<R: Resolve> StaticFiles<R> {
    /// Usa otro resolver sobre el mismo webroot
    pub fn with_resolver<P: Into<PathBuf>>(root: P, resolver: R) -> Self {
        Self {
            root: root.into(),
            resolver,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resuelve `path` y arma el frame a enviar
    ///
    /// # Errores
    ///
    /// - `PathTraversalRejected` si el path contiene `..`
    /// - `ResourceNotFound` si no hay nada servible
    /// - `InternalFailure` solo ante falta de memoria
    pub fn serve(&self, path: &str) -> Result<ResponseFrame, ServerError> {
        match self.resolver.resolve(path)? {
            ResolvedTarget::RegularFile(target) => open_file(&target),
            ResolvedTarget::Listing(listing) => Ok(listing::render(&listing).into()),
            ResolvedTarget::NotFound => Err(ServerError::ResourceNotFound),
        }
    }

    /// Respuesta de error para `err`.
    ///
    /// Para 404 se usa `<webroot>/404.html` si existe; el resto usa la
    /// página genérica.
    pub fn error_response(&self, err: &ServerError) -> Response {
        let status = err.status();
        if status == StatusCode::NotFound {
            if let Some(page) = self.custom_not_found() {
                return Response::error(status).with_body_bytes(page);
            }
        }
        Response::error(status)
    }

    fn custom_not_found(&self) -> Option<Vec<u8>> {
        let path = self.root.join(NOT_FOUND_PAGE);
        let meta = fs::metadata(&path).ok()?;
        if !meta.is_file() {
            return None;
        }
        fs::read(&path).ok()
    }
}

/// Abre el archivo y arma el frame.
///
/// El tamaño se toma del archivo ya abierto: es el que se anuncia en
/// `Content-Length`.
fn open_file(target: &FileTarget) -> Result<ResponseFrame, ServerError> {
    let file = File::open(&target.path).map_err(not_found_or_internal)?;
    let len = file.metadata().map_err(not_found_or_internal)?.len();
    Ok(ResponseFrame::file(file, len, target.mime))
}

fn not_found_or_internal(err: io::Error) -> ServerError {
    if err.kind() == io::ErrorKind::OutOfMemory {
        ServerError::InternalFailure(err)
    } else {
        ServerError::ResourceNotFound
    }
}

/// ¿Existe un índice servible en `dir`?
pub fn has_index(dir: &Path) -> bool {
    fs::metadata(dir.join(INDEX_FILE))
        .map(|m| m.is_file())
        .unwrap_or(false)
}
