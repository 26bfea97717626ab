//! In-memory submission repository.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::application::ports::{
    SubmissionClaim, SubmissionRecord, SubmissionRepository, SubmissionStoreError,
};
use crate::domain::order_execution::ExternalReference;

/// In-memory implementation of `SubmissionRepository`.
///
/// Lives for the process lifetime; a restart forgets every submission.
#[derive(Debug, Default)]
pub struct InMemorySubmissionRepository {
    records: RwLock<HashMap<ExternalReference, SubmissionRecord>>,
}

impl InMemorySubmissionRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of recorded submissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all records.
    pub fn clear(&self) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl SubmissionRepository for InMemorySubmissionRepository {
    async fn find(
        &self,
        external_reference: &ExternalReference,
    ) -> Result<Option<SubmissionRecord>, SubmissionStoreError> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(external_reference).cloned())
    }

    async fn save(&self, record: SubmissionRecord) -> Result<(), SubmissionStoreError> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.external_reference.clone(), record);
        Ok(())
    }

    async fn claim(
        &self,
        record: SubmissionRecord,
    ) -> Result<SubmissionClaim, SubmissionStoreError> {
        // Check and insert under one write guard.
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = records.get(&record.external_reference) {
            if existing.holds_reference() {
                return Ok(SubmissionClaim::Held(existing.clone()));
            }
        }
        records.insert(record.external_reference.clone(), record);
        Ok(SubmissionClaim::Acquired)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::ports::IntentionFingerprint;
    use crate::domain::order_execution::{ExecutionStatus, OrderSide};
    use crate::domain::shared::{AssetType, ClientKey, InstrumentKey, OrderId};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn record(reference: &str, status: ExecutionStatus) -> SubmissionRecord {
        SubmissionRecord {
            external_reference: ExternalReference::new(reference).unwrap(),
            client_key: ClientKey::new("cli"),
            fingerprint: IntentionFingerprint {
                instrument: InstrumentKey::new(AssetType::Stock, 211),
                side: OrderSide::Buy,
                quantity: dec!(100),
            },
            status,
            order_id: Some(OrderId::new("42")),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = InMemorySubmissionRepository::new();
        repo.save(record("ref-1", ExecutionStatus::Uncertain))
            .await
            .unwrap();

        let found = repo
            .find(&ExternalReference::new("ref-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, ExecutionStatus::Uncertain);
    }

    #[tokio::test]
    async fn test_find_not_found() {
        let repo = InMemorySubmissionRepository::new();
        let found = repo
            .find(&ExternalReference::new("nonexistent").unwrap())
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_record() {
        let repo = InMemorySubmissionRepository::new();
        repo.save(record("ref-1", ExecutionStatus::Uncertain))
            .await
            .unwrap();
        repo.save(record("ref-1", ExecutionStatus::Success))
            .await
            .unwrap();

        assert_eq!(repo.len(), 1);
        let found = repo
            .find(&ExternalReference::new("ref-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_clear() {
        let repo = InMemorySubmissionRepository::new();
        repo.save(record("a", ExecutionStatus::Success)).await.unwrap();
        repo.save(record("b", ExecutionStatus::Failure)).await.unwrap();

        repo.clear();

        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_claim_acquires_free_reference() {
        let repo = InMemorySubmissionRepository::new();

        let claim = repo
            .claim(record("ref-1", ExecutionStatus::Uncertain))
            .await
            .unwrap();

        assert_eq!(claim, SubmissionClaim::Acquired);
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_claim_is_held_by_success_and_in_flight() {
        let repo = InMemorySubmissionRepository::new();
        repo.save(record("done", ExecutionStatus::Success)).await.unwrap();
        repo.save(record("pending", ExecutionStatus::Uncertain))
            .await
            .unwrap();

        for reference in ["done", "pending"] {
            let claim = repo
                .claim(record(reference, ExecutionStatus::Uncertain))
                .await
                .unwrap();
            assert!(matches!(claim, SubmissionClaim::Held(held) if held.external_reference.as_str() == reference));
        }
        let done = repo
            .find(&ExternalReference::new("done").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(done.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_claim_replaces_definitive_failure() {
        let repo = InMemorySubmissionRepository::new();
        repo.save(record("ref-1", ExecutionStatus::Failure)).await.unwrap();

        let claim = repo
            .claim(record("ref-1", ExecutionStatus::Uncertain))
            .await
            .unwrap();

        assert_eq!(claim, SubmissionClaim::Acquired);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_have_one_winner() {
        let repo = Arc::new(InMemorySubmissionRepository::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.claim(record("contended", ExecutionStatus::Uncertain))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut acquired = 0;
        for handle in handles {
            if handle.await.unwrap() == SubmissionClaim::Acquired {
                acquired += 1;
            }
        }
        assert_eq!(acquired, 1);
    }
}
