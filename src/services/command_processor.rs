// src/services/command_processor.rs
//! Diploma command processor.
//!
//! Runs create, update and delete commands through a fixed sequence of
//! states, published on a watch channel:
//!
//! ```text
//! Idle -> Validating -> Authorizing -> Submitting -> Confirming -> Refreshing -> Idle
//!              \             \              \             \
//!               +-------------+--------------+-------------+--> Failed
//! ```
//!
//! Validation and authorization finish before the ledger is contacted.
//! Mutating commands of a session run one at a time, so the published state
//! always belongs to the running (or last finished) command. Reads of a
//! holder wait for an in-flight mutation of that holder so an older read
//! never overwrites the post-mutation refresh. Nothing is retried: a failed
//! command stays in `Failed` until the next one starts.

use crate::error::DiplomaError;
use crate::models::address::Address;
use crate::models::diploma::{DiplomaDraft, DiplomaRecord};
use crate::contracts::ConfirmedTx;
use crate::services::authorization::{authorize, Operation};
use crate::services::record_store::{MutationPhase, MutationReceipt, RecordId};
use crate::services::session::Session;
use ethers::types::TxHash;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};

/// Progress of the current (or last) mutating command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    Validating,
    Authorizing,
    Submitting,
    /// Submitted; waiting for the ledger to finalize `tx_hash`.
    Confirming { tx_hash: TxHash },
    Refreshing,
    Failed(DiplomaError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Create,
    Update,
    Delete,
    Lookup,
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub kind: CommandKind,
    pub holder: Address,
    /// Confirmation of the ledger transaction, for mutations.
    pub tx: Option<ConfirmedTx>,
    /// The holder's full sequence as read after the command.
    pub records: Vec<DiplomaRecord>,
}

impl CommandOutcome {
    fn mutation(kind: CommandKind, holder: Address, receipt: MutationReceipt) -> Self {
        Self { kind, holder, tx: Some(receipt.confirmed), records: receipt.records }
    }

    /// Short confirmation text for the user.
    pub fn message(&self) -> &'static str {
        match self.kind {
            CommandKind::Create => "Diploma added",
            CommandKind::Update => "Diploma updated",
            CommandKind::Delete => "Diploma deleted",
            CommandKind::Lookup => "Diplomas loaded",
        }
    }
}

/// The record currently open in the edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub holder: Address,
    /// Position when editing started
    pub index: usize,
    record_id: RecordId,
    pub draft: DiplomaDraft,
}

pub struct DiplomaCommandProcessor {
    session: Arc<Session>,
    state: watch::Sender<CommandState>,
    /// Held for the whole of a mutating command
    running: Mutex<()>,
    editing: Mutex<Option<EditSession>>,
    holder_locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl DiplomaCommandProcessor {
    pub fn new(session: Arc<Session>) -> Self {
        let (state, _) = watch::channel(CommandState::Idle);
        Self {
            session,
            state,
            running: Mutex::new(()),
            editing: Mutex::new(None),
            holder_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self) -> CommandState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CommandState> {
        self.state.subscribe()
    }

    // =====================
    // Reads
    // =====================

    /// Reads a holder's diplomas from the ledger.
    ///
    /// Issuers may read any holder; other callers only their own address.
    ///
    /// # Errors
    /// `NotReady`, `InvalidAddress`, `Authorization` or `Ledger`.
    pub async fn lookup(&self, holder: &str) -> Result<CommandOutcome, DiplomaError> {
        let context = self.session.context().await?;
        let target = Address::parse(holder)?;
        authorize(context.role, Operation::lookup(&context.caller, &target))?;

        let _guard = self.lock_holder(target).await;
        let records = context.store.fetch_records(holder).await?;
        Ok(CommandOutcome { kind: CommandKind::Lookup, holder: target, tx: None, records })
    }

    /// Reads the connected caller's own diplomas.
    pub async fn load_own_records(&self) -> Result<CommandOutcome, DiplomaError> {
        let context = self.session.context().await?;
        self.lookup(&context.caller.to_string()).await
    }

    /// Last read of `holder`'s diplomas without contacting the ledger.
    pub async fn cached_records(&self, holder: &Address) -> Result<Option<Vec<DiplomaRecord>>, DiplomaError> {
        let context = self.session.context().await?;
        Ok(context.store.cached(holder).await)
    }

    // =====================
    // Mutations
    // =====================

    /// Records a new diploma for `holder`.
    pub async fn create(&self, holder: &str, draft: &DiplomaDraft) -> Result<CommandOutcome, DiplomaError> {
        let _running = self.running.lock().await;
        let result = self.run_create(holder, draft).await;
        self.conclude(CommandKind::Create, result)
    }

    async fn run_create(&self, raw_holder: &str, draft: &DiplomaDraft) -> Result<CommandOutcome, DiplomaError> {
        self.begin();
        let context = self.session.context().await?;
        let holder = Address::parse(raw_holder)?;
        let record = draft.to_record()?;

        self.transition(CommandState::Authorizing);
        authorize(context.role, Operation::Create)?;

        let _guard = self.lock_holder(holder).await;
        self.transition(CommandState::Submitting);
        let observe = |phase: MutationPhase| self.observe(phase);
        let receipt = context.store.create_record(raw_holder, &record, &observe).await?;
        Ok(CommandOutcome::mutation(CommandKind::Create, holder, receipt))
    }

    /// Removes the diploma at `index` of `holder`'s last-read sequence.
    pub async fn delete(&self, holder: &str, index: usize) -> Result<CommandOutcome, DiplomaError> {
        let _running = self.running.lock().await;
        let result = self.run_delete(holder, index).await;
        self.conclude(CommandKind::Delete, result)
    }

    async fn run_delete(&self, raw_holder: &str, index: usize) -> Result<CommandOutcome, DiplomaError> {
        self.begin();
        let context = self.session.context().await?;
        let holder = Address::parse(raw_holder)?;

        self.transition(CommandState::Authorizing);
        authorize(context.role, Operation::Delete)?;

        let _guard = self.lock_holder(holder).await;
        self.transition(CommandState::Submitting);
        let observe = |phase: MutationPhase| self.observe(phase);
        let receipt = context.store.delete_record(raw_holder, index, &observe).await?;
        Ok(CommandOutcome::mutation(CommandKind::Delete, holder, receipt))
    }

    // =====================
    // Edit mode
    // =====================

    /// Opens the diploma at `index` for editing and returns the pre-filled form.
    ///
    /// # Errors
    /// `Validation` if the holder's diplomas are not loaded or `index` is out
    /// of range.
    pub async fn begin_edit(&self, holder: &str, index: usize) -> Result<DiplomaDraft, DiplomaError> {
        let context = self.session.context().await?;
        let holder = Address::parse(holder)?;
        authorize(context.role, Operation::Update)?;

        let stored = context
            .store
            .record_at(&holder, index)
            .await
            .ok_or_else(|| DiplomaError::Validation(format!("no diploma at position {}", index)))?;

        let draft = DiplomaDraft::from(&stored.record);
        *self.editing.lock().await = Some(EditSession {
            holder,
            index,
            record_id: stored.id,
            draft: draft.clone(),
        });
        debug!("editing diploma {} of {}", index, holder);
        Ok(draft)
    }

    /// Replaces the edit form contents.
    pub async fn set_draft(&self, draft: DiplomaDraft) -> Result<(), DiplomaError> {
        let mut editing = self.editing.lock().await;
        let edit = editing
            .as_mut()
            .ok_or_else(|| DiplomaError::Validation("no diploma is being edited".into()))?;
        edit.draft = draft;
        Ok(())
    }

    pub async fn editing(&self) -> Option<EditSession> {
        self.editing.lock().await.clone()
    }

    /// Leaves edit mode, discarding the draft.
    pub async fn cancel_edit(&self) {
        *self.editing.lock().await = None;
    }

    /// Submits the edit form as an update of the record being edited.
    ///
    /// Edit mode ends on success; on failure the draft is kept so it can be
    /// corrected and resubmitted.
    pub async fn submit_edit(&self) -> Result<CommandOutcome, DiplomaError> {
        let _running = self.running.lock().await;
        let result = self.run_update().await;
        if result.is_ok() {
            self.cancel_edit().await;
        }
        self.conclude(CommandKind::Update, result)
    }

    async fn run_update(&self) -> Result<CommandOutcome, DiplomaError> {
        self.begin();
        let context = self.session.context().await?;
        let edit = self
            .editing()
            .await
            .ok_or_else(|| DiplomaError::Validation("no diploma is being edited".into()))?;
        let record = edit.draft.to_record()?;

        self.transition(CommandState::Authorizing);
        authorize(context.role, Operation::Update)?;

        let _guard = self.lock_holder(edit.holder).await;
        let index = context.store.position_of(&edit.holder, edit.record_id).await.ok_or_else(|| {
            DiplomaError::Validation("the diploma list changed since editing started; reload and edit again".into())
        })?;

        self.transition(CommandState::Submitting);
        let observe = |phase: MutationPhase| self.observe(phase);
        let receipt = context
            .store
            .update_record(&edit.holder.to_string(), index, &record, &observe)
            .await?;
        Ok(CommandOutcome::mutation(CommandKind::Update, edit.holder, receipt))
    }

    // =====================
    // State machine plumbing
    // =====================

    fn begin(&self) {
        let failed = matches!(*self.state.borrow(), CommandState::Failed(_));
        if failed {
            self.transition(CommandState::Idle);
        }
        self.transition(CommandState::Validating);
    }

    fn transition(&self, next: CommandState) {
        debug!("command state -> {:?}", next);
        self.state.send_replace(next);
    }

    fn observe(&self, phase: MutationPhase) {
        match phase {
            MutationPhase::Submitted(tx) => self.transition(CommandState::Confirming { tx_hash: tx.tx_hash }),
            MutationPhase::Confirmed(_) => self.transition(CommandState::Refreshing),
        }
    }

    fn conclude(
        &self,
        kind: CommandKind,
        result: Result<CommandOutcome, DiplomaError>,
    ) -> Result<CommandOutcome, DiplomaError> {
        match &result {
            Ok(outcome) => {
                info!("{} for {}", outcome.message(), outcome.holder);
                self.transition(CommandState::Idle);
            }
            Err(err) if err.is_deferred() => {
                debug!("{:?} deferred: {}", kind, err);
                self.transition(CommandState::Idle);
            }
            Err(err) => {
                warn!("{:?} failed: {}", kind, err);
                self.transition(CommandState::Failed(err.clone()));
            }
        }
        result
    }

    async fn lock_holder(&self, holder: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.holder_locks.lock().await;
            // Only the map holds an idle lock; waiters and holders own a clone.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(holder).or_default().clone()
        };
        lock.lock_owned().await
    }
}
