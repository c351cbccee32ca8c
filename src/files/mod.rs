//! # Archivos Estáticos
//! src/files/mod.rs
//!
//! Todo lo que toca el webroot (solo lectura):
//!
//! - `resolver`: path de request → archivo, listado o nada
//! - `static_files`: abre archivos y arma frames, páginas de error
//! - `listing`: HTML del listado de directorios

pub mod listing;
pub mod resolver;
pub mod static_files;

pub use resolver::{
    FileTarget, Listing, ListingEntry, PathResolver, Resolve, ResolveError, ResolvedTarget,
};
pub use static_files::StaticFiles;
