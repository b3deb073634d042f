//! Mass-edit session storage.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use trainerhub_domain::BatchId;

use crate::infrastructure::cache::TtlCache;
use crate::use_cases::mass_edit::{MassEditSession, SessionPhase};

/// A stored session. Locks are held only while a transition reads or
/// writes it, never across a run's service calls.
pub type SharedSession = Arc<Mutex<MassEditSession>>;

/// TTL-based store of open mass-edit sessions.
///
/// Sessions stay in the store for their whole life, including while a run
/// is processing. A session left idle past the TTL (typically one parked in
/// species selection) is dropped without reconciliation; the community
/// site's inventory already reflects whatever was applied. Sessions that are
/// processing are never dropped.
pub struct MassEditStore {
    inner: TtlCache<BatchId, SharedSession>,
}

impl MassEditStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: TtlCache::new(ttl),
        }
    }

    pub async fn insert(&self, session: MassEditSession) -> SharedSession {
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        self.inner.insert(id, shared.clone()).await;
        shared
    }

    pub async fn get(&self, id: BatchId) -> Option<SharedSession> {
        self.inner.get(&id).await
    }

    /// Restart a session's idle timer.
    pub async fn touch(&self, id: BatchId) {
        self.inner.touch(&id).await;
    }

    pub async fn remove(&self, id: BatchId) -> Option<SharedSession> {
        self.inner.remove(&id).await
    }

    /// Drop idle sessions and return how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.inner.cleanup_expired(is_busy).await
    }
}

// A session that is locked or processing has a run in flight.
fn is_busy(session: &SharedSession) -> bool {
    session
        .try_lock()
        .map_or(true, |session| session.phase() == SessionPhase::Processing)
}
