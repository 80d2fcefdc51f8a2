//! Lifecycle of one server connection.
//!
//! Each `ServerConnection` owns a single dedicated task for its entire
//! lifetime. That task establishes the session, registers it in the shared
//! directory, then parks on the cancellation token; teardown is a request
//! sent to the task, never resource release performed by a third party.
//! Anything acquired during initialization is therefore always released in
//! the task that acquired it, including when cancellation lands mid-handshake.

use crate::config::ServerConfig;
use crate::directory::SessionDirectory;
use crate::session::Session;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Where a connection is in its life.
///
/// `Idle → Initializing → Ready`, with `Idle`/`Initializing`/`Ready` moving
/// through `CleaningUp` to `Closed` on teardown, and `Initializing` able to
/// land on `Failed`. `Failed` is terminal: teardown of a failed connection
/// releases bookkeeping but leaves the state as `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Initializing,
    Ready,
    Failed,
    CleaningUp,
    Closed,
}

pub struct ServerConnection {
    name: String,
    config: ServerConfig,
    directory: SessionDirectory,
    state: Mutex<ConnectionState>,
    session: Mutex<Option<Arc<Session>>>,
    // Set-once, multi-waiter readiness signal. Fires on success, failure,
    // and cancellation alike; waiters inspect the state afterwards.
    ready_tx: watch::Sender<bool>,
    cancel: CancellationToken,
    task: AsyncMutex<Option<JoinHandle<()>>>,
    cleanup_done: AsyncMutex<bool>,
}

impl ServerConnection {
    pub fn new(name: impl Into<String>, config: ServerConfig, directory: SessionDirectory) -> Self {
        let (ready_tx, _) = watch::channel(false);
        Self {
            name: name.into(),
            config,
            directory,
            state: Mutex::new(ConnectionState::Idle),
            session: Mutex::new(None),
            ready_tx,
            cancel: CancellationToken::new(),
            task: AsyncMutex::new(None),
            cleanup_done: AsyncMutex::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().expect("connection state lock")
    }

    /// The session handle, present only while `Ready`.
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.lock().expect("connection session lock").clone()
    }

    /// Start initialization if it has not started, then wait for the
    /// readiness signal. Idempotent: later callers never re-run the
    /// handshake, they only wait for the first run's outcome.
    pub async fn initialize(self: &Arc<Self>) {
        let first = {
            let mut state = self.state.lock().expect("connection state lock");
            if *state == ConnectionState::Idle {
                *state = ConnectionState::Initializing;
                true
            } else {
                false
            }
        };

        if first {
            let mut slot = self.task.lock().await;
            let conn = Arc::clone(self);
            *slot = Some(tokio::spawn(conn.run()));
        }

        self.wait_until_initialized().await;
    }

    /// Wait until initialization has finished, successfully or not. Does not
    /// itself trigger initialization.
    pub async fn wait_until_initialized(&self) {
        let mut rx = self.ready_tx.subscribe();
        let _ = rx.wait_for(|fired| *fired).await;
    }

    /// The connection's dedicated task.
    async fn run(self: Arc<Self>) {
        let established = tokio::select! {
            _ = self.cancel.cancelled() => None,
            result = Session::establish(&self.name, &self.config) => Some(result),
        };

        let session = match established {
            None => {
                // Cancelled mid-initialization: the establish future was
                // dropped here, reaping any subprocess it had spawned.
                tracing::debug!(server = %self.name, "initialization cancelled");
                self.ready_tx.send_replace(true);
                return;
            }
            Some(Err(err)) => {
                tracing::error!(server = %self.name, %err, "initialization failed");
                self.set_state(ConnectionState::Failed);
                self.ready_tx.send_replace(true);
                return;
            }
            Some(Ok(session)) => Arc::new(session),
        };

        *self.session.lock().expect("connection session lock") = Some(Arc::clone(&session));
        self.directory.register(&self.name, Arc::clone(&session));
        self.set_state(ConnectionState::Ready);
        self.ready_tx.send_replace(true);
        tracing::info!(server = %self.name, "connection ready");

        // Park until teardown is requested, then release everything here.
        self.cancel.cancelled().await;
        self.directory.remove(&self.name);
        self.session.lock().expect("connection session lock").take();
        session.shutdown().await;
        tracing::info!(server = %self.name, "connection shut down");
    }

    /// Tear the connection down. Idempotent and safe to call concurrently:
    /// the guard lets exactly one teardown run while later callers observe
    /// its completion.
    pub async fn cleanup(&self) {
        let mut done = self.cleanup_done.lock().await;
        if *done {
            return;
        }

        {
            let mut state = self.state.lock().expect("connection state lock");
            if matches!(*state, ConnectionState::Initializing | ConnectionState::Ready) {
                *state = ConnectionState::CleaningUp;
            }
        }

        self.cancel.cancel();

        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!(server = %self.name, %err, "connection task ended abnormally");
            }
        }

        // Unblock waiters even if initialize() was never called.
        self.ready_tx.send_replace(true);
        {
            let mut state = self.state.lock().expect("connection state lock");
            // Failed is terminal and stays reported as such.
            if *state != ConnectionState::Failed {
                *state = ConnectionState::Closed;
            }
        }
        *done = true;
    }

    fn set_state(&self, next: ConnectionState) {
        *self.state.lock().expect("connection state lock") = next;
    }
}
