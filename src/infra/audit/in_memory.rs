// In-memory implementation of AuditLogStore.
//
// Useful when no database path is configured and in tests - it follows
// the same contract as the SQLite implementation, including the
// retention rule on insert.

use crate::core::moderation::{AuditEntry, AuditError, AuditLogStore, LogRetention};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// DashMap keyed by an insertion sequence number so listing can order
/// entries most-recent-first without a global lock around readers.
pub struct InMemoryAuditStore {
    entries: DashMap<u64, AuditEntry>,
    next_seq: AtomicU64,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }
}

impl Default for InMemoryAuditStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLogStore for InMemoryAuditStore {
    async fn insert(&self, entry: AuditEntry, retention: LogRetention) -> Result<(), AuditError> {
        if retention == LogRetention::Disabled {
            return Ok(());
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(seq, entry);
        Ok(())
    }

    async fn list_page(&self, page: u32, page_size: u32) -> Result<Vec<AuditEntry>, AuditError> {
        let mut indexed: Vec<(u64, AuditEntry)> = self
            .entries
            .iter()
            .map(|kv| (*kv.key(), kv.value().clone()))
            .collect();
        indexed.sort_by(|a, b| b.0.cmp(&a.0));

        let offset = (page.max(1) - 1) as usize * page_size as usize;
        Ok(indexed
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .map(|(_, entry)| entry)
            .collect())
    }

    async fn count(&self) -> Result<u64, AuditError> {
        Ok(self.entries.len() as u64)
    }

    async fn clear_all(&self) -> Result<(), AuditError> {
        self.entries.clear();
        Ok(())
    }

    async fn expire_older_than(&self, days: u32) -> Result<u64, AuditError> {
        let cutoff = Utc::now() - chrono::Duration::days(days as i64);
        // Count removals inside the predicate: inserts may land while the
        // sweep runs, so differencing lengths would miscount.
        let removed = AtomicU64::new(0);
        self.entries.retain(|_, entry| {
            let keep = entry.created_at >= cutoff;
            if !keep {
                removed.fetch_add(1, Ordering::Relaxed);
            }
            keep
        });
        Ok(removed.into_inner())
    }
}
