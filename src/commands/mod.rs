//! # Comandos del Servidor
//!
//! Rutas dinámicas que vienen con el servidor. Cada comando es un handler
//! que recibe un Request y retorna una Response; los que necesitan estado
//! lo capturan al registrarse.
//!
//! - `/status`: uptime, requests, bytes y conexiones activas
//! - `/time`: hora actual como HTTP-date

pub mod basic;

pub use basic::{register_builtin, status_handler, time_handler};
