//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! - `tcp`: bind, loop de accept y apagado
//! - `pool`: workers acotados que atienden conexiones
//! - `dispatcher`: una conexión de punta a punta (leer, decidir, escribir)

pub mod dispatcher;
pub mod pool;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use dispatcher::{Connection, Dispatcher, Outcome};
pub use pool::{PoolError, ThreadPool};
pub use tcp::{Server, ServerHandle};
