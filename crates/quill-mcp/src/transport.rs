//! Stdio subprocess transport.
//!
//! Spawns a tool-server child process and exchanges newline-delimited
//! JSON-RPC messages over its stdin/stdout. A background reader task routes
//! responses to pending request waiters by id. The child is spawned with
//! `kill_on_drop`, so dropping a half-built transport (e.g. when an
//! initialization future is cancelled) reaps the process in the task that
//! spawned it.

use crate::config::ServerConfig;
use crate::error::McpError;
use crate::jsonrpc::{Notification, Request, Response};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

pub(crate) struct StdioTransport {
    name: String,
    timeout_ms: u64,
    next_id: AtomicU64,
    writer: Mutex<Option<BufWriter<ChildStdin>>>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>,
    child: Mutex<Option<Child>>,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl StdioTransport {
    /// Spawn the server process and start the reader task.
    pub(crate) fn spawn(name: &str, config: &ServerConfig) -> Result<Self, McpError> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| McpError::SpawnFailed {
            name: name.to_string(),
            source,
        })?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let reader_pending = Arc::clone(&pending);
        let reader_name = name.to_string();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                let resp: Response = match serde_json::from_str(&line) {
                    Ok(resp) => resp,
                    Err(err) => {
                        tracing::warn!(server = %reader_name, %err, "discarding unparseable line from server");
                        continue;
                    }
                };
                if let Some(id) = resp.id {
                    let mut pending = reader_pending.lock().await;
                    if let Some(tx) = pending.remove(&id) {
                        let _ = tx.send(resp);
                    } else {
                        tracing::debug!(server = %reader_name, id, "response for unknown request");
                    }
                }
                // Server-initiated requests and notifications are ignored.
            }
            // Stdout closed: the server is gone. Drop every waiter so callers
            // observe termination instead of hanging until their timeout.
            reader_pending.lock().await.drain().for_each(drop);
            tracing::debug!(server = %reader_name, "reader task finished");
        });

        Ok(Self {
            name: name.to_string(),
            timeout_ms: config.timeout_ms,
            next_id: AtomicU64::new(1),
            writer: Mutex::new(Some(BufWriter::new(stdin))),
            pending,
            child: Mutex::new(Some(child)),
            reader: std::sync::Mutex::new(Some(reader)),
        })
    }

    /// Send a request and wait (bounded by the configured timeout) for the
    /// matching response. JSON-RPC errors become `McpError::Rpc`.
    pub(crate) async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request::new(id, method, params);
        let line = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        if let Err(err) = self.write_line(&line).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), rx).await {
            Ok(Ok(resp)) => {
                if let Some(err) = resp.error {
                    return Err(McpError::Rpc {
                        server: self.name.clone(),
                        code: err.code,
                        message: err.message,
                    });
                }
                Ok(resp.result.unwrap_or(serde_json::Value::Null))
            }
            Ok(Err(_)) => Err(McpError::Terminated {
                name: self.name.clone(),
            }),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(McpError::Timeout {
                    name: self.name.clone(),
                    timeout_ms: self.timeout_ms,
                })
            }
        }
    }

    /// Send a notification. No response is expected.
    pub(crate) async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let line = serde_json::to_string(&Notification::new(method, params))?;
        self.write_line(&line).await
    }

    async fn write_line(&self, line: &str) -> Result<(), McpError> {
        let mut writer = self.writer.lock().await;
        let stream = writer.as_mut().ok_or_else(|| McpError::Terminated {
            name: self.name.clone(),
        })?;
        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await?;
        Ok(())
    }

    /// Kill the child process and stop the reader task.
    pub(crate) async fn shutdown(&self) {
        self.writer.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                tracing::debug!(server = %self.name, %err, "kill failed (server may have exited)");
            }
            let _ = child.wait().await;
        }

        let reader = self.reader.lock().expect("reader handle lock").take();
        if let Some(handle) = reader {
            handle.abort();
        }

        self.pending.lock().await.drain().for_each(drop);
    }
}
