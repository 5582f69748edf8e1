//! Connection identity and the live-connection registry.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Keep a handle to every connection between accept and full close
//! - Let the server snapshot the registry and force-close each connection
//! - Deregister automatically when a connection's guard is dropped

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Registry entry for one connection.
///
/// Cloning shares the same close trigger.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer_addr: SocketAddr,
    close_tx: Arc<watch::Sender<bool>>,
}

impl ConnectionHandle {
    /// Create a handle and the signal its connection task listens on.
    pub fn new(peer_addr: SocketAddr) -> (Self, CloseSignal) {
        let (tx, rx) = watch::channel(false);
        let handle = Self {
            id: ConnectionId::new(),
            peer_addr,
            close_tx: Arc::new(tx),
        };
        (handle, CloseSignal { rx })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Ask the connection to close. Returns `true` only for the first call.
    pub fn close(&self) -> bool {
        !self.close_tx.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.close_tx.borrow()
    }
}

/// Receiving side of a [`ConnectionHandle`]'s close trigger.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    rx: watch::Receiver<bool>,
}

impl CloseSignal {
    /// Resolve once the handle has been closed.
    ///
    /// Never resolves if every handle is dropped without closing.
    pub async fn closed(&mut self) {
        if self.rx.wait_for(|closed| *closed).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    running: bool,
    handles: HashMap<ConnectionId, ConnectionHandle>,
}

/// Mutex-guarded set of live connections keyed by [`ConnectionId`].
///
/// The lock is held only for map updates and snapshots, never across I/O.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl ConnectionRegistry {
    /// Create a registry that refuses registrations until [`open`](Self::open).
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start accepting registrations.
    pub fn open(&self) {
        self.lock().running = true;
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Add a connection. Returns `None` once the registry has been shut.
    ///
    /// The returned guard removes the entry when dropped.
    pub fn register(&self, handle: ConnectionHandle) -> Option<RegistryGuard> {
        let id = handle.id();
        {
            let mut state = self.lock();
            if !state.running {
                return None;
            }
            state.handles.insert(id, handle);
        }

        metrics::connection_opened();
        Some(RegistryGuard {
            registry: self.clone(),
            id,
        })
    }

    /// Remove a connection. Returns whether it was present.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.lock().handles.remove(&id).is_some()
    }

    /// Stop accepting registrations and return the handles live at that moment.
    pub fn shut(&self) -> Vec<ConnectionHandle> {
        let mut state = self.lock();
        state.running = false;
        state.handles.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Guard that tracks a connection's registration.
/// Deregisters when dropped.
#[derive(Debug)]
pub struct RegistryGuard {
    registry: ConnectionRegistry,
    id: ConnectionId,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
        metrics::connection_closed();
        tracing::trace!(connection_id = %self.id, "Connection deregistered");
    }
}
