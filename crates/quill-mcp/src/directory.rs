//! Shared directory of ready sessions.
//!
//! An explicitly constructed context object, cloned into every component
//! that needs session lookup. Only the owning `ServerConnection` mutates an
//! entry: it registers on successful initialization and removes on teardown.

use crate::session::Session;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct SessionDirectory {
    sessions: Arc<Mutex<HashMap<String, Arc<Session>>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, server: &str) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .expect("session directory lock")
            .get(server)
            .cloned()
    }

    pub(crate) fn register(&self, server: &str, session: Arc<Session>) {
        self.sessions
            .lock()
            .expect("session directory lock")
            .insert(server.to_string(), session);
    }

    pub(crate) fn remove(&self, server: &str) {
        self.sessions
            .lock()
            .expect("session directory lock")
            .remove(server);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session directory lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
