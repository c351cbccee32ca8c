//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Acepta conexiones y las entrega a un pool acotado de workers. Cada
//! worker atiende una conexión completa con el [`Dispatcher`] y la cierra.
//!
//! El apagado es cooperativo: [`ServerHandle::shutdown`] marca un flag y
//! despierta al `accept` con una conexión propia. `run` deja de aceptar,
//! espera a los workers y retorna.

use super::dispatcher::Dispatcher;
use super::pool::ThreadPool;
use crate::commands;
use crate::config::Config;
use crate::error::StartupError;
use crate::files::static_files::has_index;
use crate::router::Router;
use crate::stats::StatsRegistry;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Servidor HTTP/1.1 con pool de workers
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    stats: StatsRegistry,
    pool: ThreadPool,
    shutdown: Arc<AtomicBool>,
}

/// Permite detener un [`Server`] desde otro thread
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl Server {
    /// Valida `config`, hace bind y arranca los workers.
    ///
    /// Las rutas de `router` se consultan antes que `/status` y `/time`,
    /// así que pueden reemplazarlas.
    pub fn bind(config: &Config, mut router: Router) -> Result<Self, StartupError> {
        config.validate()?;

        let address = config.address();
        let listener = TcpListener::bind(&address).map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
        let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

        let stats = StatsRegistry::new();
        commands::register_builtin(&mut router, &stats);

        let dispatcher = Dispatcher::from_config(config, Arc::new(router), stats.clone());
        let pool = ThreadPool::new(config.workers, config.queue_capacity)?;

        if !config.webroot.is_dir() {
            tracing::warn!(webroot = %config.webroot.display(), "webroot is not a directory");
        } else if !has_index(&config.webroot) {
            tracing::warn!(webroot = %config.webroot.display(), "webroot has no index.html");
        }

        tracing::info!(
            address = %local_addr,
            webroot = %config.webroot.display(),
            workers = pool.size(),
            queue = config.queue_capacity,
            "server listening"
        );

        Ok(Self {
            listener,
            local_addr,
            dispatcher: Arc::new(dispatcher),
            stats,
            pool,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &StatsRegistry {
        &self.stats
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
            wake_addr: wake_addr(self.local_addr),
        }
    }

    /// Acepta conexiones hasta que se pida el apagado.
    ///
    /// Al salir espera a que terminen todas las conexiones en curso.
    pub fn run(self) -> io::Result<()> {
        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            let submitted = self.pool.execute(move || {
                let mut stream = stream;
                // Se suelta antes de cerrar el socket
                let _active = dispatcher.stats().track_connection();
                dispatcher.handle(&mut stream);
            });

            if let Err(e) = submitted {
                tracing::error!(error = %e, "cannot dispatch connection");
                break;
            }
        }

        tracing::info!("shutting down, waiting for in-flight connections");
        drop(self.pool);
        tracing::info!(requests = self.stats.snapshot().request_count, "server stopped");
        Ok(())
    }
}

impl ServerHandle {
    /// Pide el apagado. Es idempotente.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        // Despierta al accept bloqueado
        if let Err(e) = TcpStream::connect(self.wake_addr) {
            tracing::warn!(error = %e, "could not wake accept loop");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// Dirección conectable para una dirección de bind (0.0.0.0 → loopback)
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(v4) if v4.ip().is_unspecified() => {
            SocketAddr::from((Ipv4Addr::LOCALHOST, v4.port()))
        }
        SocketAddr::V6(v6) if v6.ip().is_unspecified() => {
            SocketAddr::from((Ipv6Addr::LOCALHOST, v6.port()))
        }
        other => other,
    }
}
