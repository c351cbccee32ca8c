//! # Pool de Workers
//! src/server/pool.rs
//!
//! Número fijo de threads alimentados por un canal acotado. Si la cola
//! está llena, `execute` bloquea al que acepta conexiones (backpressure).
//! Al hacer drop se cierra el canal y se espera a cada worker, así que
//! el fin de todo trabajo en curso es observable.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("worker pool is shut down")]
    Closed,
}

struct Worker {
    id: usize,
    thread: thread::JoinHandle<()>,
}

impl Worker {
    fn spawn(id: usize, receiver: Arc<Mutex<Receiver<Job>>>) -> io::Result<Worker> {
        let thread = thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || loop {
                // El lock se suelta antes de ejecutar el job
                let message = receiver
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .recv();

                match message {
                    Ok(job) => {
                        // Un handler que hace panic no se lleva al worker
                        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::error!(worker = id, "job panicked");
                        }
                    }
                    Err(_) => break,
                }
            })?;

        Ok(Worker { id, thread })
    }
}

pub struct ThreadPool {
    workers: Vec<Worker>,
    sender: Option<SyncSender<Job>>,
}

impl ThreadPool {
    /// Crea `size` workers con una cola de `capacity` jobs pendientes.
    ///
    /// `size` y `capacity` se llevan a 1 como mínimo.
    pub fn new(size: usize, capacity: usize) -> Result<Self, PoolError> {
        let size = size.max(1);
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let mut workers = Vec::with_capacity(size);
        for id in 0..size {
            workers.push(Worker::spawn(id, Arc::clone(&receiver))?);
        }

        Ok(ThreadPool {
            workers,
            sender: Some(sender),
        })
    }

    /// Encola un job; bloquea mientras la cola esté llena
    pub fn execute<F>(&self, f: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::Closed)?;
        sender.send(Box::new(f)).map_err(|_| PoolError::Closed)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        drop(self.sender.take());

        for worker in self.workers.drain(..) {
            if worker.thread.join().is_err() {
                tracing::warn!(worker = worker.id, "worker thread panicked");
            }
        }
    }
}
