// Latest ranked process list per session, with a TTL, for index-based remediation.

use crate::error::SnapshotError;
use crate::models::{ProcessRef, Ranking, SessionKey};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub session_key: SessionKey,
    pub ranking: Ranking,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl Snapshot {
    pub fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// At most one snapshot per session; `record` replaces, never appends.
#[derive(Default)]
pub struct SnapshotRegistry {
    snapshots: RwLock<HashMap<SessionKey, Snapshot>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, session_key: SessionKey, ranking: Ranking, ttl: Duration) -> Snapshot {
        let now = Instant::now();
        let snapshot = Snapshot {
            session_key: session_key.clone(),
            ranking,
            created_at: now,
            expires_at: now + ttl,
        };
        let mut snapshots = self.snapshots.write().await;
        snapshots.retain(|_, s| !s.is_expired(now));
        snapshots.insert(session_key, snapshot.clone());
        snapshot
    }

    /// Resolves a 1-based `index` against the session's live snapshot.
    pub async fn lookup(
        &self,
        session_key: &SessionKey,
        index: usize,
    ) -> Result<ProcessRef, SnapshotError> {
        let snapshots = self.snapshots.read().await;
        let snapshot = snapshots
            .get(session_key)
            .filter(|s| !s.is_expired(Instant::now()))
            .ok_or_else(|| SnapshotError::Stale {
                session: session_key.clone(),
            })?;
        snapshot
            .ranking
            .get(index)
            .map(ProcessRef::from)
            .ok_or_else(|| SnapshotError::IndexOutOfRange {
                session: session_key.clone(),
                index,
                len: snapshot.ranking.len(),
            })
    }

    /// Drops expired snapshots; returns how many were removed.
    pub async fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let mut snapshots = self.snapshots.write().await;
        let before = snapshots.len();
        snapshots.retain(|_, s| !s.is_expired(now));
        before - snapshots.len()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}
