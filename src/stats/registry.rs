//! # Registro de Estadísticas
//! src/stats/registry.rs
//!
//! Único estado mutable compartido entre workers. Todo pasa por un
//! `Mutex` y la sección crítica es O(1): nunca se mantiene el lock
//! durante I/O.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Contadores de proceso thread-safe
#[derive(Clone)]
pub struct StatsRegistry {
    inner: Arc<Mutex<Counters>>,
    start_time: SystemTime,
    started: Instant,
}

/// Datos internos, solo accesibles bajo el lock
#[derive(Default)]
struct Counters {
    /// Requests terminadas (respondidas o abortadas)
    request_count: u64,

    /// Bytes escritos en conexiones
    bytes_sent: u64,

    /// Conexiones en manos de un worker ahora mismo
    active_connections: u64,
}

/// Copia de los contadores en un instante
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Segundos desde UNIX_EPOCH al arrancar
    pub start_time: u64,
    pub uptime_secs: u64,
    pub request_count: u64,
    pub bytes_sent: u64,
    pub active_connections: u64,
}

impl StatsRegistry {
    /// Crea un registro con el reloj de arranque en "ahora"
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Counters::default())),
            start_time: SystemTime::now(),
            started: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Los contadores siguen siendo válidos aunque otro worker haya hecho panic
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registra una request terminada y los bytes que escribió.
    ///
    /// Es la única operación que mueve `request_count` y `bytes_sent`,
    /// ambos solo crecen.
    pub fn record_request(&self, bytes_written: u64) {
        let mut counters = self.lock();
        counters.request_count += 1;
        counters.bytes_sent = counters.bytes_sent.saturating_add(bytes_written);
    }

    /// Marca una conexión como activa hasta que se suelte el guard
    pub fn track_connection(&self) -> ActiveConnection {
        self.lock().active_connections += 1;
        ActiveConnection {
            registry: self.clone(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Obtiene una copia consistente de los contadores
    pub fn snapshot(&self) -> StatsSnapshot {
        let (request_count, bytes_sent, active_connections) = {
            let counters = self.lock();
            (
                counters.request_count,
                counters.bytes_sent,
                counters.active_connections,
            )
        };

        StatsSnapshot {
            start_time: self
                .start_time
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            uptime_secs: self.uptime().as_secs(),
            request_count,
            bytes_sent,
            active_connections,
        }
    }
}

impl Default for StatsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard RAII de una conexión activa
pub struct ActiveConnection {
    registry: StatsRegistry,
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        let mut counters = self.registry.lock();
        counters.active_connections = counters.active_connections.saturating_sub(1);
    }
}

impl StatsSnapshot {
    /// Uptime en formato "1d 2h 3m 4s"
    ///
    /// # Ejemplo
    /// ```
    /// use origin_server::stats::StatsSnapshot;
    ///
    /// let snapshot = StatsSnapshot {
    ///     start_time: 0,
    ///     uptime_secs: 93_784,
    ///     request_count: 0,
    ///     bytes_sent: 0,
    ///     active_connections: 0,
    /// };
    /// assert_eq!(snapshot.uptime_human(), "1d 2h 3m 4s");
    /// ```
    pub fn uptime_human(&self) -> String {
        let secs = self.uptime_secs;
        format!(
            "{}d {}h {}m {}s",
            secs / 86_400,
            (secs % 86_400) / 3_600,
            (secs % 3_600) / 60,
            secs % 60
        )
    }
}
