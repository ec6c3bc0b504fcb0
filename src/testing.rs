//! In-memory collaborators for unit tests.

use crate::contracts::{ConfirmedTx, DiplomaLedger, SubmittedTx};
use crate::error::LedgerError;
use crate::models::address::Address;
use crate::models::diploma::DiplomaRecord;
use crate::wallet::provider::WalletProvider;
use async_trait::async_trait;
use ethers::types::TxHash;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ADMIN: &str = "0x00000000000000000000000000000000000000aa";
pub const STUDENT: &str = "0x00000000000000000000000000000000000000b1";
pub const OTHER_STUDENT: &str = "0x00000000000000000000000000000000000000b2";

pub fn addr(raw: &str) -> Address {
    Address::parse(raw).unwrap()
}

pub fn alice() -> DiplomaRecord {
    DiplomaRecord::new("Alice", "B.Sc. CS", "Tech U", 2024)
}

pub fn bob() -> DiplomaRecord {
    DiplomaRecord::new("Bob", "M.A.", "Arts Inst.", 2023)
}

pub fn carol() -> DiplomaRecord {
    DiplomaRecord::new("Carol", "PhD", "Tech U", 2020)
}

enum PendingOp {
    Add(Address, DiplomaRecord),
    Update(Address, usize, DiplomaRecord),
    Delete(Address, usize),
}

/// Ledger state shared by every handle bound to it.
#[derive(Default)]
pub struct LedgerState {
    records: Mutex<HashMap<Address, Vec<DiplomaRecord>>>,
    pending: Mutex<HashMap<TxHash, PendingOp>>,
    next_tx: AtomicUsize,
    fail_next_submit: Mutex<Option<LedgerError>>,
    fail_next_confirm: Mutex<Option<LedgerError>>,
    fail_next_admin: Mutex<Option<LedgerError>>,
    confirm_delay: Mutex<Option<Duration>>,
    pub reads: AtomicUsize,
    pub submits: AtomicUsize,
    pub confirms: AtomicUsize,
    pub admin_reads: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl LedgerState {
    pub fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
            + self.submits.load(Ordering::SeqCst)
            + self.confirms.load(Ordering::SeqCst)
    }
}

/// Diploma ledger kept in memory. Mutations apply only on `confirm`.
#[derive(Clone)]
pub struct InMemoryLedger {
    admin: Address,
    signer: Address,
    pub state: Arc<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(admin: Address) -> Self {
        Self { admin, signer: admin, state: Arc::new(LedgerState::default()) }
    }

    pub fn bound_to(&self, signer: Address) -> Self {
        Self { admin: self.admin, signer, state: self.state.clone() }
    }

    pub fn seed(&self, student: Address, records: Vec<DiplomaRecord>) {
        self.state.records.lock().unwrap().insert(student, records);
    }

    pub fn stored(&self, student: &Address) -> Vec<DiplomaRecord> {
        self.state.records.lock().unwrap().get(student).cloned().unwrap_or_default()
    }

    pub fn fail_next_submit(&self, err: LedgerError) {
        *self.state.fail_next_submit.lock().unwrap() = Some(err);
    }

    pub fn fail_next_confirm(&self, err: LedgerError) {
        *self.state.fail_next_confirm.lock().unwrap() = Some(err);
    }

    pub fn fail_next_admin(&self, err: LedgerError) {
        *self.state.fail_next_admin.lock().unwrap() = Some(err);
    }

    pub fn delay_confirmations(&self, delay: Duration) {
        *self.state.confirm_delay.lock().unwrap() = Some(delay);
    }

    fn queue(&self, op: PendingOp) -> Result<SubmittedTx, LedgerError> {
        self.state.submits.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.state.fail_next_submit.lock().unwrap().take() {
            return Err(err);
        }
        if self.signer != self.admin {
            return Err(LedgerError::reverted("Only admin"));
        }
        let n = self.state.next_tx.fetch_add(1, Ordering::SeqCst) as u64 + 1;
        let tx_hash = TxHash::from_low_u64_be(n);
        self.state.pending.lock().unwrap().insert(tx_hash, op);

        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(SubmittedTx { tx_hash })
    }

    fn apply(&self, op: PendingOp) -> Result<(), LedgerError> {
        let mut records = self.state.records.lock().unwrap();
        match op {
            PendingOp::Add(student, record) => {
                records.entry(student).or_default().push(record);
            }
            PendingOp::Update(student, index, record) => {
                let list = records.entry(student).or_default();
                let slot = list.get_mut(index).ok_or_else(|| LedgerError::reverted("Index out of bounds"))?;
                *slot = record;
            }
            PendingOp::Delete(student, index) => {
                let list = records.entry(student).or_default();
                if index >= list.len() {
                    return Err(LedgerError::reverted("Index out of bounds"));
                }
                list.remove(index);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DiplomaLedger for InMemoryLedger {
    async fn admin(&self) -> Result<Address, LedgerError> {
        self.state.admin_reads.fetch_add(1, Ordering::SeqCst);
        let failure = self.state.fail_next_admin.lock().unwrap().take();
        match failure {
            Some(err) => Err(err),
            None => Ok(self.admin),
        }
    }

    async fn diplomas(&self, student: &Address) -> Result<Vec<DiplomaRecord>, LedgerError> {
        self.state.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.stored(student))
    }

    async fn submit_add(&self, student: &Address, record: &DiplomaRecord) -> Result<SubmittedTx, LedgerError> {
        self.queue(PendingOp::Add(*student, record.clone()))
    }

    async fn submit_update(
        &self,
        student: &Address,
        index: usize,
        record: &DiplomaRecord,
    ) -> Result<SubmittedTx, LedgerError> {
        self.queue(PendingOp::Update(*student, index, record.clone()))
    }

    async fn submit_delete(&self, student: &Address, index: usize) -> Result<SubmittedTx, LedgerError> {
        self.queue(PendingOp::Delete(*student, index))
    }

    async fn confirm(&self, tx: &SubmittedTx) -> Result<ConfirmedTx, LedgerError> {
        self.state.confirms.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.confirm_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        let op = self.state.pending.lock().unwrap().remove(&tx.tx_hash);
        if let Some(err) = self.state.fail_next_confirm.lock().unwrap().take() {
            return Err(err);
        }
        let op = op.ok_or_else(|| LedgerError::Transport("unknown transaction".into()))?;
        self.apply(op)?;
        Ok(ConfirmedTx { tx_hash: tx.tx_hash, block_number: Some(tx.tx_hash.to_low_u64_be()) })
    }
}

/// Wallet double with scripted accounts.
pub struct ScriptedWallet {
    pub authorized: Mutex<Vec<Address>>,
    pub on_request: Vec<Address>,
    pub ledger: InMemoryLedger,
    pub requests: AtomicUsize,
}

impl ScriptedWallet {
    /// Wallet whose user has already authorized `account`.
    pub fn connected(account: Address, ledger: InMemoryLedger) -> Self {
        Self {
            authorized: Mutex::new(vec![account]),
            on_request: vec![account],
            ledger,
            requests: AtomicUsize::new(0),
        }
    }

    /// Wallet with no authorized account until the user accepts a prompt.
    pub fn locked(account: Address, ledger: InMemoryLedger) -> Self {
        Self {
            authorized: Mutex::new(Vec::new()),
            on_request: vec![account],
            ledger,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn switch_account(&self, account: Address) {
        *self.authorized.lock().unwrap() = vec![account];
    }
}

#[async_trait]
impl WalletProvider for ScriptedWallet {
    async fn authorized_accounts(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(self.authorized.lock().unwrap().clone())
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, LedgerError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.authorized.lock().unwrap() = self.on_request.clone();
        Ok(self.on_request.clone())
    }

    async fn active_address(&self) -> Result<Address, LedgerError> {
        self.authorized
            .lock()
            .unwrap()
            .first()
            .copied()
            .ok_or_else(|| LedgerError::Transport("no active account".into()))
    }

    async fn bind_registry(&self, caller: &Address) -> Result<Arc<dyn DiplomaLedger>, LedgerError> {
        Ok(Arc::new(self.ledger.bound_to(*caller)))
    }
}
