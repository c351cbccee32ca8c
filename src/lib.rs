//! # Origin Server
//! src/lib.rs
//!
//! Servidor HTTP/1.1 de origen: sirve un directorio de archivos estáticos
//! (con índices y listados) y un puñado de rutas dinámicas registradas
//! en proceso. Una request por conexión, siempre `Connection: close`.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: Parsing de requests, framing de responses, status y MIME
//! - `router`: Registro de rutas dinámicas (match exacto)
//! - `files`: Resolución segura de paths, archivos y listados
//! - `stats`: Contadores compartidos del proceso
//! - `commands`: Rutas incluidas (`/status`, `/time`)
//! - `server`: Dispatcher por conexión, pool de workers y loop TCP
//! - `config`, `logging`, `error`: configuración, tracing y errores
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use origin_server::config::Config;
//! use origin_server::router::Router;
//! use origin_server::server::Server;
//!
//! let config = Config::default();
//! let server = Server::bind(&config, Router::new()).expect("bind");
//! let handle = server.handle();
//! std::thread::spawn(move || server.run());
//! // ...
//! handle.shutdown();
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod files;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;
pub mod stats;
