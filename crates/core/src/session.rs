//! Per-user session state and the store that holds it.
//!
//! A [`Session`] carries everything the pipeline needs between messages:
//! the transcript index, the conversation so far, the personas found in the
//! transcript, and the persona currently being emulated.
//!
//! Sessions are handed out as [`SessionHandle`]s. The host holds the
//! handle's lock across a full ingest or reply, which serializes work
//! within one session while different users proceed in parallel.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::error::Error;
use crate::index::SemanticSearch;

/// Opaque identity of the user who owns a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared, lockable session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// State for one user.
#[derive(Default)]
pub struct Session {
    /// Semantic index over the uploaded transcript
    pub index: Option<Arc<dyn SemanticSearch>>,

    /// Conversation so far, as `"<speaker>: <text>"` entries
    pub history: Vec<String>,

    /// Personas present in the transcript
    pub available_roles: BTreeSet<String>,

    /// Persona currently being emulated
    pub active_role: Option<String>,

    /// When the current transcript was ingested
    pub ingested_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("index_len", &self.index.as_ref().map(|i| i.len()))
            .field("history", &self.history.len())
            .field("available_roles", &self.available_roles)
            .field("active_role", &self.active_role)
            .field("ingested_at", &self.ingested_at)
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly built transcript index.
    ///
    /// Index and roles are replaced together, and the active persona and
    /// history are reset, so no reader ever sees a new index paired with an
    /// old persona or conversation.
    pub fn replace_transcript(
        &mut self,
        index: Arc<dyn SemanticSearch>,
        roles: BTreeSet<String>,
    ) {
        self.index = Some(index);
        self.available_roles = roles;
        self.active_role = None;
        self.history.clear();
        self.ingested_at = Some(Utc::now());
    }

    /// Choose the persona to emulate. Must be one of `available_roles`.
    pub fn select_role(&mut self, role: &str) -> Result<(), Error> {
        if !self.available_roles.contains(role) {
            return Err(Error::UnknownRole {
                role: role.to_string(),
                available: self.available_roles.iter().cloned().collect(),
            });
        }
        self.active_role = Some(role.to_string());
        Ok(())
    }

    /// Whether both an index and a persona are set.
    pub fn is_ready(&self) -> bool {
        self.index.is_some() && self.active_role.is_some()
    }
}

/// Keyed store of sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The store name (e.g., "in_memory").
    fn name(&self) -> &str;

    /// Fetch the user's session, creating an empty one on first contact.
    async fn get_or_create(&self, user: &UserId) -> SessionHandle;

    /// Drop a user's session. Returns whether one existed.
    async fn remove(&self, user: &UserId) -> bool;

    /// Number of live sessions.
    async fn count(&self) -> usize;
}

/// A process-local session store.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<UserId, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_or_create(&self, user: &UserId) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(user) {
            return handle.clone();
        }
        self.sessions
            .write()
            .await
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }

    async fn remove(&self, user: &UserId) -> bool {
        self.sessions.write().await.remove(user).is_some()
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
