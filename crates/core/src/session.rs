//! Per-client state keyed by opaque session ids.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{RecitalError, Result};

/// Opaque session identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = RecitalError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s).map(Self).map_err(|_| RecitalError::UnknownSession(s.to_string()))
    }
}

/// In-memory session table.
#[derive(Debug)]
pub struct SessionStore<T> {
    sessions: HashMap<SessionId, T>,
}

impl<T> Default for SessionStore<T> {
    fn default() -> Self {
        Self { sessions: HashMap::new() }
    }
}

impl<T> SessionStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under a fresh id.
    pub fn create(&mut self, value: T) -> SessionId {
        let id = SessionId::new();
        self.sessions.insert(id, value);
        id
    }

    pub fn get(&self, id: &SessionId) -> Result<&T> {
        self.sessions.get(id).ok_or_else(|| RecitalError::UnknownSession(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Result<&mut T> {
        self.sessions.get_mut(id).ok_or_else(|| RecitalError::UnknownSession(id.to_string()))
    }

    /// The session under `id`, created with `init` if missing.
    pub fn get_or_insert_with(&mut self, id: SessionId, init: impl FnOnce() -> T) -> &mut T {
        self.sessions.entry(id).or_insert_with(init)
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<T> {
        self.sessions.remove(id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&SessionId, &mut T)> {
        self.sessions.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_remove() {
        let mut store = SessionStore::new();
        let a = store.create("first");
        let b = store.create("second");
        assert_ne!(a, b);
        assert_eq!(store.get(&a).unwrap(), &"first");

        *store.get_mut(&b).unwrap() = "changed";
        assert_eq!(store.remove(&b), Some("changed"));
        assert!(matches!(store.get(&b), Err(RecitalError::UnknownSession(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_session_id_round_trips_through_text() {
        let id = SessionId::new();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{id}\""));
    }

    #[test]
    fn test_get_or_insert_with() {
        let mut store = SessionStore::new();
        let id = SessionId::new();
        *store.get_or_insert_with(id, || 1) += 1;
        assert_eq!(store.get(&id).unwrap(), &2);
    }

    #[test]
    fn test_iter_mut_visits_every_session() {
        let mut store = SessionStore::new();
        store.create(1);
        store.create(2);
        store.iter_mut().for_each(|(_, value)| *value *= 10);

        let mut values: Vec<_> = store.iter_mut().map(|(_, value)| *value).collect();
        values.sort();
        assert_eq!(values, vec![10, 20]);
    }
}
