// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Id-keyed index of live sessions.
//
// Entries are inserted on construction and never removed automatically;
// releasing a session's backing leaves its entry in place. The owner drops
// entries explicitly (`remove`) or all at once on shutdown (`clear`).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use medialink_core::error::{MediaLinkError, Result};
use medialink_core::types::MediaId;

use crate::session::SessionCore;

#[derive(Debug, Default)]
pub struct Registry {
    sessions: Mutex<HashMap<MediaId, Arc<SessionCore>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. An id that is already present is refused.
    pub fn insert(&self, session: Arc<SessionCore>) -> Result<()> {
        let id = session.id();
        let mut sessions = self.sessions.lock().expect("registry lock poisoned");
        if sessions.contains_key(&id) {
            return Err(MediaLinkError::InvalidArgument(format!(
                "media id {id} already registered"
            )));
        }
        sessions.insert(id, session);
        debug!(media_id = %id, "session registered");
        Ok(())
    }

    /// Look up a session. The returned handle is detached from the lock.
    pub fn get(&self, id: &MediaId) -> Option<Arc<SessionCore>> {
        self.sessions
            .lock()
            .expect("registry lock poisoned")
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.sessions
            .lock()
            .expect("registry lock poisoned")
            .contains_key(id)
    }

    pub fn remove(&self, id: &MediaId) -> Option<Arc<SessionCore>> {
        let removed = self
            .sessions
            .lock()
            .expect("registry lock poisoned")
            .remove(id);
        if removed.is_some() {
            debug!(media_id = %id, "session dropped from registry");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.sessions.lock().expect("registry lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Callbacks;

    #[test]
    fn distinct_sessions_get_distinct_ids() {
        let registry = Registry::new();
        let a = Arc::new(SessionCore::new("a.mp3", Callbacks::new()));
        let b = Arc::new(SessionCore::new("b.mp3", Callbacks::new()));
        assert_ne!(a.id(), b.id());

        registry.insert(a.clone()).unwrap();
        registry.insert(b.clone()).unwrap();
        assert_eq!(registry.get(&a.id()).unwrap().src(), "a.mp3");
        assert_eq!(registry.get(&b.id()).unwrap().src(), "b.mp3");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_insert_is_refused() {
        let registry = Registry::new();
        let a = Arc::new(SessionCore::new("a.mp3", Callbacks::new()));
        registry.insert(a.clone()).unwrap();
        assert!(registry.insert(a).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_and_clear() {
        let registry = Registry::new();
        let a = Arc::new(SessionCore::new("a.mp3", Callbacks::new()));
        let b = Arc::new(SessionCore::new("b.mp3", Callbacks::new()));
        registry.insert(a.clone()).unwrap();
        registry.insert(b).unwrap();

        assert!(registry.remove(&a.id()).is_some());
        assert!(!registry.contains(&a.id()));
        registry.clear();
        assert!(registry.is_empty());
    }
}
