//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./origin_server --port 8080 \
//!   --webroot ./www \
//!   --workers 16 \
//!   --queue 128
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 WEBROOT=/srv/www LOG_FORMAT=json MAX_HEADERS=50 ./origin_server
//! ```

use crate::error::ConfigError;
use crate::http::ParseLimits;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Valor por defecto del header `Server`
pub const DEFAULT_SERVER_NAME: &str = "origin-server/0.1";

/// Formato de salida de los logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Legible para humanos
    Pretty,
    /// Un objeto JSON por línea
    Json,
}

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "origin_server")]
#[command(about = "Servidor HTTP/1.1 de archivos estáticos con rutas dinámicas")]
#[command(version)]
pub struct Config {
    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Directorio raíz de los archivos servidos
    #[arg(long, default_value = "./www", env = "WEBROOT")]
    pub webroot: PathBuf,

    // === Concurrencia ===
    /// Número de workers que atienden conexiones
    #[arg(long, default_value = "16", env = "WORKERS")]
    pub workers: usize,

    /// Conexiones aceptadas que pueden esperar un worker libre
    #[arg(long = "queue", default_value = "128", env = "QUEUE_CAPACITY")]
    pub queue_capacity: usize,

    // === Límites del request ===
    /// Tamaño del buffer de la única lectura del request
    #[arg(long = "read-buffer", default_value = "8192", env = "READ_BUFFER")]
    pub read_buffer: usize,

    /// Largo máximo del método
    #[arg(long = "max-method", default_value = "16", env = "MAX_METHOD")]
    pub max_method: usize,

    /// Largo máximo del target (path + query)
    #[arg(long = "max-target", default_value = "1024", env = "MAX_TARGET")]
    pub max_target: usize,

    /// Largo máximo de la versión
    #[arg(long = "max-version", default_value = "32", env = "MAX_VERSION")]
    pub max_version: usize,

    /// Cantidad máxima de headers
    #[arg(long = "max-headers", default_value = "100", env = "MAX_HEADERS")]
    pub max_headers: usize,

    // === Identidad y logs ===
    /// Valor del header `Server`
    #[arg(long = "server-name", default_value = DEFAULT_SERVER_NAME, env = "SERVER_NAME")]
    pub server_name: String,

    /// Nivel de log (RUST_LOG tiene prioridad)
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Formato de log
    #[arg(long = "log-format", value_enum, default_value = "pretty", env = "LOG_FORMAT")]
    pub log_format: LogFormat,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use origin_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ConfigError> {
        let minimums = [
            ("workers", self.workers, 1),
            ("queue capacity", self.queue_capacity, 1),
            ("read buffer", self.read_buffer, 64),
            ("max method length", self.max_method, 1),
            ("max target length", self.max_target, 1),
            ("max version length", self.max_version, 1),
            ("max headers", self.max_headers, 1),
        ];

        for (name, value, min) in minimums {
            if value < min {
                return Err(ConfigError::TooSmall(name, min));
            }
        }

        if self.server_name.trim().is_empty() {
            return Err(ConfigError::EmptyServerName);
        }

        Ok(())
    }

    /// Límites del parser de requests
    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            max_method: self.max_method,
            max_target: self.max_target,
            max_version: self.max_version,
            max_headers: self.max_headers,
        }
    }

    /// Imprime un resumen de la configuración
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║              Origin Server Configuration                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝");
        println!();
        println!("🌐 Network:");
        println!("   Address:      {}", self.address());
        println!("   Webroot:      {}", self.webroot.display());
        println!("   Server name:  {}", self.server_name);
        println!();
        println!("👷 Workers:");
        println!("   Threads:      {}", self.workers);
        println!("   Queue:        {} pending connections", self.queue_capacity);
        println!();
        println!("📏 Request limits:");
        println!("   Read buffer:  {} bytes", self.read_buffer);
        println!(
            "   Method/Target/Version: {}/{}/{} bytes",
            self.max_method, self.max_target, self.max_version
        );
        println!("   Headers:      {}", self.max_headers);
        println!();
        println!("📝 Logging:     {} ({:?})", self.log_level, self.log_format);
        println!("═══════════════════════════════════════════════════════════════");
        println!();
    }
}

impl Default for Config {
    /// Mismos valores que los defaults del CLI
    fn default() -> Self {
        let limits = ParseLimits::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            webroot: PathBuf::from("./www"),
            workers: 16,
            queue_capacity: 128,
            read_buffer: 8192,
            max_method: limits.max_method,
            max_target: limits.max_target,
            max_version: limits.max_version,
            max_headers: limits.max_headers,
            server_name: DEFAULT_SERVER_NAME.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
