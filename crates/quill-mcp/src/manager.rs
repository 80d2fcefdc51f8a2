//! Connection manager: name → connection bookkeeping.

use crate::config::ServerConfig;
use crate::connection::ServerConnection;
use crate::directory::SessionDirectory;
use crate::session::Session;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// Tracks every server connection by name and owns the shared session
/// directory the connections publish into.
pub struct ConnectionManager {
    connections: Mutex<HashMap<String, Arc<ServerConnection>>>,
    directory: SessionDirectory,
    teardown: AsyncMutex<()>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            directory: SessionDirectory::new(),
            teardown: AsyncMutex::new(()),
        }
    }

    /// Connect to a server, or return the existing connection for `name`
    /// after waiting out its initialization. Concurrent calls for the same
    /// name share one underlying initialization attempt and observe the same
    /// terminal state.
    pub async fn connect(&self, name: &str, config: ServerConfig) -> Arc<ServerConnection> {
        let conn = {
            let mut connections = self.connections.lock().expect("connection map lock");
            if let Some(existing) = connections.get(name) {
                Arc::clone(existing)
            } else {
                let conn = Arc::new(ServerConnection::new(
                    name,
                    config,
                    self.directory.clone(),
                ));
                connections.insert(name.to_string(), Arc::clone(&conn));
                conn
            }
        };
        conn.initialize().await;
        conn
    }

    /// Look up the session for `name`. Returns `None` immediately for
    /// unknown names; otherwise waits for readiness and returns the handle,
    /// which is `None` when initialization failed.
    pub async fn get_session(&self, name: &str) -> Option<Arc<Session>> {
        let conn = {
            let connections = self.connections.lock().expect("connection map lock");
            connections.get(name).cloned()
        }?;
        conn.wait_until_initialized().await;
        conn.session()
    }

    /// Tear down the named connection and forget it. No-op when absent.
    pub async fn disconnect(&self, name: &str) {
        let conn = {
            let connections = self.connections.lock().expect("connection map lock");
            connections.get(name).cloned()
        };
        let Some(conn) = conn else { return };
        conn.cleanup().await;
        self.connections
            .lock()
            .expect("connection map lock")
            .remove(name);
        tracing::info!(server = name, "disconnected");
    }

    /// Tear down every connection. Guarded against concurrent re-entry: a
    /// second caller waits for the first run and then finds nothing left to
    /// do. One connection failing to shut down never stops the others.
    pub async fn disconnect_all(&self) {
        let _guard = self.teardown.lock().await;
        for name in self.server_names() {
            self.disconnect(&name).await;
        }
    }

    /// Snapshot of the currently registered server names.
    pub fn server_names(&self) -> Vec<String> {
        self.connections
            .lock()
            .expect("connection map lock")
            .keys()
            .cloned()
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().expect("connection map lock").len()
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionState;

    fn bad_config() -> ServerConfig {
        ServerConfig {
            command: "quill_no_such_command_xyz".to_string(),
            args: vec![],
            env: Default::default(),
            timeout_ms: 1000,
            transport: Default::default(),
        }
    }

    #[tokio::test]
    async fn get_session_for_unknown_name_returns_none_without_blocking() {
        let manager = ConnectionManager::new();
        assert!(manager.get_session("ghost").await.is_none());
    }

    #[tokio::test]
    async fn failed_connection_yields_no_session() {
        let manager = ConnectionManager::new();
        let conn = manager.connect("bad", bad_config()).await;
        assert_eq!(conn.state(), ConnectionState::Failed);
        assert!(manager.get_session("bad").await.is_none());
        assert!(manager.directory().is_empty());
    }

    #[tokio::test]
    async fn repeated_connect_reuses_the_connection() {
        let manager = ConnectionManager::new();
        let first = manager.connect("bad", bad_config()).await;
        let second = manager.connect("bad", bad_config()).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.connection_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_connect_shares_one_initialization() {
        let manager = Arc::new(ConnectionManager::new());
        let a = Arc::clone(&manager);
        let b = Arc::clone(&manager);
        let (ca, cb) = tokio::join!(
            tokio::spawn(async move { a.connect("bad", bad_config()).await }),
            tokio::spawn(async move { b.connect("bad", bad_config()).await }),
        );
        let (ca, cb) = (ca.unwrap(), cb.unwrap());
        assert!(Arc::ptr_eq(&ca, &cb));
        assert_eq!(ca.state(), ConnectionState::Failed);
        assert_eq!(cb.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn disconnect_absent_name_is_a_noop() {
        let manager = ConnectionManager::new();
        manager.disconnect("ghost").await;
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_all_is_idempotent() {
        let manager = ConnectionManager::new();
        manager.connect("one", bad_config()).await;
        manager.connect("two", bad_config()).await;
        manager.disconnect_all().await;
        assert_eq!(manager.connection_count(), 0);
        manager.disconnect_all().await;
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_disconnect_all_tears_down_once() {
        let manager = Arc::new(ConnectionManager::new());
        manager.connect("one", bad_config()).await;
        let a = Arc::clone(&manager);
        let b = Arc::clone(&manager);
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.disconnect_all().await }),
            tokio::spawn(async move { b.disconnect_all().await }),
        );
        ra.unwrap();
        rb.unwrap();
        assert_eq!(manager.connection_count(), 0);
    }
}
