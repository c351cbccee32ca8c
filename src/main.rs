//! # Origin Server - Entry Point
//! src/main.rs
//!
//! Punto de entrada: configuración desde CLI/entorno, logging y servidor.
//! Solo los errores de arranque terminan el proceso (exit code 1).

use anyhow::{Context, Result};
use origin_server::config::Config;
use origin_server::logging;
use origin_server::router::Router;
use origin_server::server::Server;

fn main() {
    if let Err(e) = run() {
        eprintln!("💥 Error fatal: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = Config::new();
    config.validate().context("invalid configuration")?;

    logging::init(&config.log_level, config.log_format)?;
    config.print_summary();

    let server = Server::bind(&config, Router::new())?;
    server.run().context("server loop failed")?;
    Ok(())
}
