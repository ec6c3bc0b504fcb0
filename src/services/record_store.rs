// src/services/record_store.rs
//! Record store client.
//!
//! Reads and mutates a holder's diplomas on the ledger and keeps a local
//! cache of the last authoritative read. The cache is only ever replaced
//! wholesale by a fresh read: after every confirmed mutation the holder's
//! full sequence is fetched again, so positions always match the ledger.
//!
//! Cached records are kept in an arena keyed by [`RecordId`], a surrogate
//! assigned when the sequence is read. Positions sent to the ledger are
//! projected from the id at the moment of the call.
//!
//! The cache lives as long as its session and holds at most
//! [`MAX_CACHED_HOLDERS`] holders; the least recently read one is evicted.

use crate::contracts::{ConfirmedTx, DiplomaLedger, SubmittedTx};
use crate::error::DiplomaError;
use crate::models::address::Address;
use crate::models::diploma::DiplomaRecord;
use log::{debug, info};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

pub const MAX_CACHED_HOLDERS: usize = 64;

/// Stable handle for a cached record, valid until the holder is re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecordId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub record: DiplomaRecord,
}

/// Observable progress of a mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    /// Accepted by the ledger, outcome unknown.
    Submitted(SubmittedTx),
    /// Finalized by the ledger.
    Confirmed(ConfirmedTx),
}

/// Result of a confirmed mutation and the re-read that followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReceipt {
    pub confirmed: ConfirmedTx,
    pub records: Vec<DiplomaRecord>,
}

#[derive(Default)]
struct RecordCache {
    holders: HashMap<Address, Vec<StoredRecord>>,
    /// Holders in read order, oldest first
    recent: VecDeque<Address>,
    next_id: u64,
}

impl RecordCache {
    fn replace(&mut self, holder: Address, records: &[DiplomaRecord]) {
        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            self.next_id += 1;
            stored.push(StoredRecord { id: RecordId(self.next_id), record: record.clone() });
        }
        self.holders.insert(holder, stored);

        self.recent.retain(|h| *h != holder);
        self.recent.push_back(holder);
        while self.recent.len() > MAX_CACHED_HOLDERS {
            if let Some(evicted) = self.recent.pop_front() {
                self.holders.remove(&evicted);
                debug!("evicted cached diplomas of {}", evicted);
            }
        }
    }
}

pub struct RecordStore {
    ledger: Arc<dyn DiplomaLedger>,
    cache: RwLock<RecordCache>,
}

impl RecordStore {
    pub fn new(ledger: Arc<dyn DiplomaLedger>) -> Self {
        Self { ledger, cache: RwLock::new(RecordCache::default()) }
    }

    /// Reads `address`'s diplomas from the ledger and replaces the cache.
    ///
    /// # Errors
    /// - [`DiplomaError::InvalidAddress`] before any ledger call
    /// - [`DiplomaError::Ledger`] if the read fails
    pub async fn fetch_records(&self, address: &str) -> Result<Vec<DiplomaRecord>, DiplomaError> {
        let holder = Address::parse(address)?;
        self.refresh(&holder).await
    }

    async fn refresh(&self, holder: &Address) -> Result<Vec<DiplomaRecord>, DiplomaError> {
        let records = self.ledger.diplomas(holder).await?;
        self.cache.write().await.replace(*holder, &records);
        debug!("cached {} diplomas for {}", records.len(), holder);
        Ok(records)
    }

    /// Last read of the holder's sequence, if any.
    pub async fn cached(&self, holder: &Address) -> Option<Vec<DiplomaRecord>> {
        let cache = self.cache.read().await;
        cache
            .holders
            .get(holder)
            .map(|stored| stored.iter().map(|s| s.record.clone()).collect())
    }

    /// Cached record at `index` together with its surrogate id.
    pub async fn record_at(&self, holder: &Address, index: usize) -> Option<StoredRecord> {
        let cache = self.cache.read().await;
        cache.holders.get(holder).and_then(|stored| stored.get(index)).cloned()
    }

    /// Current position of a cached record, `None` once it was re-read or removed.
    pub async fn position_of(&self, holder: &Address, id: RecordId) -> Option<usize> {
        let cache = self.cache.read().await;
        cache.holders.get(holder)?.iter().position(|s| s.id == id)
    }

    /// Appends a diploma and waits for confirmation, then re-reads the holder.
    ///
    /// # Errors
    /// - [`DiplomaError::InvalidAddress`] / [`DiplomaError::Validation`] before submission
    /// - [`DiplomaError::Ledger`] if submission or confirmation fails; the cache is left untouched
    pub async fn create_record(
        &self,
        address: &str,
        record: &DiplomaRecord,
        observe: &(dyn Fn(MutationPhase) + Send + Sync),
    ) -> Result<MutationReceipt, DiplomaError> {
        let holder = Address::parse(address)?;
        record.validate()?;

        let submitted = self.ledger.submit_add(&holder, record).await?;
        self.settle(&holder, submitted, observe).await
    }

    /// Replaces all four fields of the diploma at `index`.
    ///
    /// `index` must point into the holder's cached sequence. A sequence
    /// changed by another session since the last read is not detected.
    pub async fn update_record(
        &self,
        address: &str,
        index: usize,
        record: &DiplomaRecord,
        observe: &(dyn Fn(MutationPhase) + Send + Sync),
    ) -> Result<MutationReceipt, DiplomaError> {
        let holder = Address::parse(address)?;
        record.validate()?;
        self.check_index(&holder, index).await?;

        let submitted = self.ledger.submit_update(&holder, index, record).await?;
        self.settle(&holder, submitted, observe).await
    }

    /// Removes the diploma at `index`; later records shift down by one.
    pub async fn delete_record(
        &self,
        address: &str,
        index: usize,
        observe: &(dyn Fn(MutationPhase) + Send + Sync),
    ) -> Result<MutationReceipt, DiplomaError> {
        let holder = Address::parse(address)?;
        self.check_index(&holder, index).await?;

        let submitted = self.ledger.submit_delete(&holder, index).await?;
        self.settle(&holder, submitted, observe).await
    }

    async fn check_index(&self, holder: &Address, index: usize) -> Result<(), DiplomaError> {
        let cache = self.cache.read().await;
        let stored = cache
            .holders
            .get(holder)
            .ok_or_else(|| DiplomaError::Validation(format!("diplomas of {} are not loaded", holder)))?;
        if index >= stored.len() {
            return Err(DiplomaError::Validation(format!(
                "no diploma at position {} ({} loaded)",
                index,
                stored.len()
            )));
        }
        Ok(())
    }

    /// Waits for confirmation, then replaces the holder's cache with a fresh read.
    async fn settle(
        &self,
        holder: &Address,
        submitted: SubmittedTx,
        observe: &(dyn Fn(MutationPhase) + Send + Sync),
    ) -> Result<MutationReceipt, DiplomaError> {
        observe(MutationPhase::Submitted(submitted));
        let confirmed = self.ledger.confirm(&submitted).await?;
        info!("mutation 0x{:x} for {} confirmed", confirmed.tx_hash, holder);
        observe(MutationPhase::Confirmed(confirmed));

        let records = self.refresh(holder).await?;
        Ok(MutationReceipt { confirmed, records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::testing::{addr, alice, bob, carol, InMemoryLedger, ADMIN, STUDENT};
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    fn store_with(ledger: &InMemoryLedger) -> RecordStore {
        RecordStore::new(Arc::new(ledger.clone()))
    }

    fn ignore(_: MutationPhase) {}

    #[tokio::test]
    async fn invalid_address_fails_without_ledger_calls() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        let store = store_with(&ledger);

        for bad in ["0xABC", "", "hello"] {
            assert!(matches!(store.fetch_records(bad).await, Err(DiplomaError::InvalidAddress(_))));
            assert!(matches!(
                store.create_record(bad, &alice(), &ignore).await,
                Err(DiplomaError::InvalidAddress(_))
            ));
            assert!(matches!(
                store.update_record(bad, 0, &alice(), &ignore).await,
                Err(DiplomaError::InvalidAddress(_))
            ));
            assert!(matches!(
                store.delete_record(bad, 0, &ignore).await,
                Err(DiplomaError::InvalidAddress(_))
            ));
        }
        assert_eq!(ledger.state.calls(), 0);
    }

    #[tokio::test]
    async fn empty_field_is_rejected_before_submission() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        let store = store_with(&ledger);
        let mut record = alice();
        record.institution = " ".into();

        let err = store.create_record(STUDENT, &record, &ignore).await.unwrap_err();
        assert!(matches!(err, DiplomaError::Validation(_)));
        assert_eq!(ledger.state.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn create_reports_phases_then_refreshes() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        let store = store_with(&ledger);
        let phases = Mutex::new(Vec::new());
        let observe = |p: MutationPhase| phases.lock().unwrap().push(p);

        let receipt = store.create_record(STUDENT, &alice(), &observe).await.unwrap();

        assert_eq!(receipt.records, vec![alice()]);
        assert_eq!(store.cached(&addr(STUDENT)).await, Some(vec![alice()]));
        let phases = phases.into_inner().unwrap();
        assert!(matches!(phases[0], MutationPhase::Submitted(_)));
        assert!(matches!(phases[1], MutationPhase::Confirmed(c) if c.tx_hash == receipt.confirmed.tx_hash));
        assert_eq!(ledger.state.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delete_compacts_indices_on_refresh() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        ledger.seed(addr(STUDENT), vec![alice(), bob(), carol()]);
        let store = store_with(&ledger);
        store.fetch_records(STUDENT).await.unwrap();

        let receipt = store.delete_record(STUDENT, 1, &ignore).await.unwrap();

        assert_eq!(receipt.records, vec![alice(), carol()]);
        assert_eq!(store.record_at(&addr(STUDENT), 1).await.unwrap().record, carol());
    }

    #[tokio::test]
    async fn update_replaces_only_target() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        ledger.seed(addr(STUDENT), vec![alice(), bob()]);
        let store = store_with(&ledger);
        store.fetch_records(STUDENT).await.unwrap();

        let mut later = alice();
        later.year = 2025;
        let receipt = store.update_record(STUDENT, 0, &later, &ignore).await.unwrap();

        assert_eq!(receipt.records, vec![later, bob()]);
    }

    #[tokio::test]
    async fn index_outside_cached_sequence_is_rejected() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        ledger.seed(addr(STUDENT), vec![alice()]);
        let store = store_with(&ledger);

        // nothing loaded yet
        assert!(matches!(store.delete_record(STUDENT, 0, &ignore).await, Err(DiplomaError::Validation(_))));

        store.fetch_records(STUDENT).await.unwrap();
        assert!(matches!(store.delete_record(STUDENT, 1, &ignore).await, Err(DiplomaError::Validation(_))));
        assert_eq!(ledger.state.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_confirmation_leaves_cache_untouched() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        ledger.seed(addr(STUDENT), vec![alice()]);
        let store = store_with(&ledger);
        store.fetch_records(STUDENT).await.unwrap();
        ledger.fail_next_confirm(LedgerError::reverted("out of gas"));

        let err = store.delete_record(STUDENT, 0, &ignore).await.unwrap_err();

        assert_eq!(err, DiplomaError::Ledger(LedgerError::reverted("out of gas")));
        assert_eq!(store.cached(&addr(STUDENT)).await, Some(vec![alice()]));
        assert_eq!(ledger.state.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn surrogate_ids_are_reassigned_on_every_read() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        ledger.seed(addr(STUDENT), vec![alice(), bob()]);
        let store = store_with(&ledger);
        store.fetch_records(STUDENT).await.unwrap();

        let bob_id = store.record_at(&addr(STUDENT), 1).await.unwrap().id;
        assert_eq!(store.position_of(&addr(STUDENT), bob_id).await, Some(1));

        store.fetch_records(STUDENT).await.unwrap();
        assert_eq!(store.position_of(&addr(STUDENT), bob_id).await, None);
    }

    #[tokio::test]
    async fn least_recently_read_holder_is_evicted() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        let store = store_with(&ledger);
        let holders: Vec<String> = (1..=MAX_CACHED_HOLDERS as u64 + 1).map(|n| format!("0x{:040x}", n)).collect();

        for holder in &holders {
            store.fetch_records(holder).await.unwrap();
        }
        store.fetch_records(&holders[1]).await.unwrap();
        store.fetch_records(&holders[0]).await.unwrap();

        assert_eq!(store.cached(&addr(&holders[2])).await, None);
        assert_eq!(store.cached(&addr(&holders[0])).await, Some(vec![]));
        assert_eq!(store.cached(&addr(&holders[1])).await, Some(vec![]));
        assert_eq!(store.cache.read().await.holders.len(), MAX_CACHED_HOLDERS);
    }
}
