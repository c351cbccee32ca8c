//! # Resolución de Paths
//! src/files/resolver.rs
//!
//! Traduce un path de request ya decodificado a algo concreto del disco,
//! relativo al webroot. Pasos, en orden:
//!
//! 1. Cualquier `..` en el path se rechaza (chequeo de substring, no de
//!    segmento: `/a..b` también se rechaza).
//! 2. `/` es alias de `/index.html`.
//! 3. Candidato = webroot + path, se hace `stat`.
//! 4. Archivo regular → `RegularFile`.
//! 5. Directorio → su `index.html` si existe; si no, un `Listing` con los
//!    hijos directos en el orden en que los entrega el sistema operativo
//!    (sin ordenar, no es estable entre plataformas).
//! 6. Si el `stat` falla, se intenta una vez con separador final; si eso
//!    es un directorio se sigue como en 5, si no `NotFound`.
//!
//! Cualquier error del sistema de archivos (permisos, ENOENT, ...) termina
//! en `NotFound`. Solo la falta de memoria sube como `Internal`.
//! Nada se cachea: cada request vuelve a mirar el disco.

use crate::http::mime;
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::io;
use std::path::{PathBuf, MAIN_SEPARATOR};
use thiserror::Error;

/// Documento índice de cada directorio
pub const INDEX_FILE: &str = "index.html";

/// Resultado de resolver un path
#[derive(Debug)]
pub enum ResolvedTarget {
    /// Archivo a servir tal cual
    RegularFile(FileTarget),

    /// Directorio sin `index.html`: hay que generar un listado
    Listing(Listing),

    /// No existe, o no se puede leer
    NotFound,
}

/// Archivo regular encontrado en el webroot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub path: PathBuf,
    pub size: u64,
    pub mime: &'static str,
    /// `true` si vino de resolver un directorio a su `index.html`
    pub via_index: bool,
}

/// Contenido de un directorio listo para renderizar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub path: PathBuf,
    /// Path como lo ve el cliente, siempre termina en `/`
    pub display_path: String,
    pub entries: Vec<ListingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("path traversal rejected")]
    TraversalRejected,

    #[error("internal error while resolving: {0}")]
    Internal(#[source] io::Error),
}

/// Punto de extensión para la resolución de paths
pub trait Resolve: Send + Sync {
    fn resolve(&self, request_path: &str) -> Result<ResolvedTarget, ResolveError>;
}

/// Resolver sobre el sistema de archivos real
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// webroot + path, concatenados tal cual
    fn candidate(&self, path: &str) -> PathBuf {
        let mut joined = OsString::from(self.root.as_os_str());
        joined.push(path);
        PathBuf::from(joined)
    }

    fn resolve_path(&self, request_path: &str) -> Result<ResolvedTarget, ResolveError> {
        if request_path.contains("..") {
            return Err(ResolveError::TraversalRejected);
        }

        let path = if request_path == "/" { "/index.html" } else { request_path };
        let candidate = self.candidate(path);

        match fs::metadata(&candidate) {
            Ok(meta) if meta.is_file() => Ok(ResolvedTarget::RegularFile(file_target(
                candidate, &meta, false,
            ))),
            Ok(meta) if meta.is_dir() => self.resolve_directory(candidate, path),
            Ok(_) => Ok(ResolvedTarget::NotFound),
            Err(e) => {
                check_internal(e)?;
                self.resolve_maybe_directory(candidate, path)
            }
        }
    }

    /// Segundo intento con separador final
    fn resolve_maybe_directory(
        &self,
        candidate: PathBuf,
        path: &str,
    ) -> Result<ResolvedTarget, ResolveError> {
        let mut maybe_dir = candidate.into_os_string();
        if !path.ends_with('/') {
            maybe_dir.push(MAIN_SEPARATOR.to_string());
        }
        let maybe_dir = PathBuf::from(maybe_dir);

        match fs::metadata(&maybe_dir) {
            Ok(meta) if meta.is_dir() => self.resolve_directory(maybe_dir, path),
            Ok(_) => Ok(ResolvedTarget::NotFound),
            Err(e) => {
                check_internal(e)?;
                Ok(ResolvedTarget::NotFound)
            }
        }
    }

    /// Directorio: `index.html` o listado
    fn resolve_directory(&self, dir: PathBuf, path: &str) -> Result<ResolvedTarget, ResolveError> {
        let index = dir.join(INDEX_FILE);
        match fs::metadata(&index) {
            Ok(meta) if meta.is_file() => {
                return Ok(ResolvedTarget::RegularFile(file_target(index, &meta, true)));
            }
            Ok(_) => {}
            Err(e) => check_internal(e)?,
        }

        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                check_internal(e)?;
                return Ok(ResolvedTarget::NotFound);
            }
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            // Una entrada ilegible se omite del listado
            let Ok(entry) = entry else { continue };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == "." || name == ".." {
                continue;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push(ListingEntry { name, is_dir });
        }

        let display_path = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };

        Ok(ResolvedTarget::Listing(Listing {
            path: dir,
            display_path,
            entries,
        }))
    }
}

impl Resolve for PathResolver {
    fn resolve(&self, request_path: &str) -> Result<ResolvedTarget, ResolveError> {
        self.resolve_path(request_path)
    }
}

fn file_target(path: PathBuf, meta: &Metadata, via_index: bool) -> FileTarget {
    let mime = mime::for_path(&path);
    FileTarget {
        path,
        size: meta.len(),
        mime,
        via_index,
    }
}

/// Deja pasar los errores que colapsan a `NotFound`
fn check_internal(err: io::Error) -> Result<(), ResolveError> {
    if err.kind() == io::ErrorKind::OutOfMemory {
        return Err(ResolveError::Internal(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// webroot con index.html (12 bytes), style.css, subdir/ sin índice
    /// y docs/ con su propio índice
    fn webroot() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), b"<h1>Hi</h1>\n").unwrap();
        fs::write(dir.path().join("style.css"), b"body{}").unwrap();
        fs::create_dir(dir.path().join("subdir")).unwrap();
        fs::write(dir.path().join("subdir/a.txt"), b"a").unwrap();
        fs::create_dir(dir.path().join("subdir/nested")).unwrap();
        fs::write(dir.path().join("subdir/nested/deep.txt"), b"deep").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), b"docs").unwrap();
        dir
    }

    fn resolver(dir: &TempDir) -> PathResolver {
        PathResolver::new(dir.path())
    }

    #[test]
    fn test_root_maps_to_index() {
        let dir = webroot();
        match resolver(&dir).resolve("/").unwrap() {
            ResolvedTarget::RegularFile(target) => {
                assert!(target.path.ends_with("index.html"));
                assert_eq!(target.size, 12);
                assert_eq!(target.mime, "text/html");
                assert!(!target.via_index);
            }
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[test]
    fn test_regular_file() {
        let dir = webroot();
        match resolver(&dir).resolve("/style.css").unwrap() {
            ResolvedTarget::RegularFile(target) => {
                assert_eq!(target.mime, "text/css");
                assert_eq!(target.size, 6);
            }
            other => panic!("expected file, got {:?}", other),
        }
    }

    #[test]
    fn test_traversal_rejected_everywhere() {
        let dir = webroot();
        let resolver = resolver(&dir);

        for path in [
            "/..",
            "/../../etc/passwd",
            "/subdir/../../secret",
            "/a/b/c/d/../../../../..",
            "/subdir/..",
            "/x..y",
            "/..hidden",
        ] {
            assert!(
                matches!(resolver.resolve(path), Err(ResolveError::TraversalRejected)),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = webroot();
        assert!(matches!(
            resolver(&dir).resolve("/missing.txt").unwrap(),
            ResolvedTarget::NotFound
        ));
    }

    #[test]
    fn test_file_with_trailing_slash_is_not_found() {
        let dir = webroot();
        assert!(matches!(
            resolver(&dir).resolve("/style.css/").unwrap(),
            ResolvedTarget::NotFound
        ));
    }

    #[test]
    fn test_directory_with_index() {
        let dir = webroot();
        for path in ["/docs", "/docs/"] {
            match resolver(&dir).resolve(path).unwrap() {
                ResolvedTarget::RegularFile(target) => {
                    assert!(target.via_index);
                    assert!(target.path.ends_with("docs/index.html"));
                }
                other => panic!("expected index, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_directory_without_index_lists_direct_children() {
        let dir = webroot();
        match resolver(&dir).resolve("/subdir/").unwrap() {
            ResolvedTarget::Listing(listing) => {
                assert_eq!(listing.display_path, "/subdir/");

                let mut names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
                names.sort();
                assert_eq!(names, vec!["a.txt", "nested"]);

                let nested = listing.entries.iter().find(|e| e.name == "nested").unwrap();
                assert!(nested.is_dir);
            }
            other => panic!("expected listing, got {:?}", other),
        }
    }

    #[test]
    fn test_listing_display_path_gets_trailing_slash() {
        let dir = webroot();
        match resolver(&dir).resolve("/subdir").unwrap() {
            ResolvedTarget::Listing(listing) => assert_eq!(listing.display_path, "/subdir/"),
            other => panic!("expected listing, got {:?}", other),
        }
    }

    #[test]
    fn test_root_without_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        assert!(matches!(
            resolver(&dir).resolve("/").unwrap(),
            ResolvedTarget::NotFound
        ));
    }

    #[test]
    fn test_index_that_is_a_directory_falls_back_to_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("odd/index.html")).unwrap();

        match resolver(&dir).resolve("/odd/").unwrap() {
            ResolvedTarget::Listing(listing) => {
                assert_eq!(listing.entries.len(), 1);
                assert_eq!(listing.entries[0].name, "index.html");
            }
            other => panic!("expected listing, got {:?}", other),
        }
    }

    #[test]
    fn test_nul_byte_is_not_found() {
        let dir = webroot();
        assert!(matches!(
            resolver(&dir).resolve("/index.html\0").unwrap(),
            ResolvedTarget::NotFound
        ));
    }

    #[test]
    fn test_missing_webroot_is_not_found() {
        let resolver = PathResolver::new("/definitely/not/a/webroot");
        assert!(matches!(resolver.resolve("/").unwrap(), ResolvedTarget::NotFound));
    }
}
