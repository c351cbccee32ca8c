//! # Estadísticas del Servidor
//! src/stats/mod.rs
//!
//! Contadores de proceso (requests, bytes enviados, arranque) y el gauge
//! de conexiones activas. Los lee el handler de `/status`.

pub mod registry;

pub use registry::{ActiveConnection, StatsRegistry, StatsSnapshot};
