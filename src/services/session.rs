// src/services/session.rs
//! Session context lifecycle.
//!
//! A session moves `Disconnected -> AwaitingAdmin -> Ready` as the identity
//! resolver reports progress, and back to `Disconnected` when the account
//! changes. Anything that needs the caller, the admin or the record cache
//! goes through [`Session::context`], which answers `NotReady` until the
//! admin address is known.

use crate::contracts::DiplomaLedger;
use crate::error::DiplomaError;
use crate::models::address::{Address, Role};
use crate::services::record_store::RecordStore;
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything known once identity and admin are resolved.
pub struct SessionContext {
    pub caller: Address,
    pub admin: Address,
    pub role: Role,
    /// Ledger client and record cache bound to `caller`
    pub store: RecordStore,
}

enum SessionPhase {
    Disconnected,
    AwaitingAdmin {
        caller: Address,
        ledger: Arc<dyn DiplomaLedger>,
    },
    Ready(Arc<SessionContext>),
}

/// Snapshot of the session for status banners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    Disconnected,
    AwaitingAdmin { caller: Address },
    Ready { caller: Address, admin: Address, role: Role },
}

pub struct Session {
    phase: RwLock<SessionPhase>,
}

impl Session {
    pub fn new() -> Self {
        Self { phase: RwLock::new(SessionPhase::Disconnected) }
    }

    /// Records the caller and the ledger handle bound to it.
    pub async fn identity_resolved(&self, caller: Address, ledger: Arc<dyn DiplomaLedger>) {
        info!("wallet connected as {}", caller);
        *self.phase.write().await = SessionPhase::AwaitingAdmin { caller, ledger };
    }

    /// Completes the session once the admin address is known.
    ///
    /// # Errors
    /// [`DiplomaError::NotReady`] if the session was invalidated or switched
    /// to another caller while the admin lookup was in flight.
    pub async fn admin_resolved(&self, caller: Address, admin: Address) -> Result<Arc<SessionContext>, DiplomaError> {
        let mut phase = self.phase.write().await;
        let ledger = match &*phase {
            SessionPhase::AwaitingAdmin { caller: pending, ledger } if *pending == caller => ledger.clone(),
            _ => return Err(DiplomaError::NotReady("session changed while loading the admin address".into())),
        };

        let role = Role::derive(&caller, &admin);
        info!("registry admin is {}; {} acts as {:?}", admin, caller, role);
        let context = Arc::new(SessionContext {
            caller,
            admin,
            role,
            store: RecordStore::new(ledger),
        });
        *phase = SessionPhase::Ready(context.clone());
        Ok(context)
    }

    /// Drops the context, its role and its cached records.
    pub async fn invalidate(&self) {
        debug!("session invalidated");
        *self.phase.write().await = SessionPhase::Disconnected;
    }

    /// The resolved context.
    ///
    /// # Errors
    /// [`DiplomaError::NotReady`] while the wallet or the admin lookup is pending.
    pub async fn context(&self) -> Result<Arc<SessionContext>, DiplomaError> {
        match &*self.phase.read().await {
            SessionPhase::Ready(context) => Ok(context.clone()),
            SessionPhase::AwaitingAdmin { .. } => {
                Err(DiplomaError::NotReady("admin address is still loading".into()))
            }
            SessionPhase::Disconnected => Err(DiplomaError::NotReady("wallet is not connected".into())),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        match &*self.phase.read().await {
            SessionPhase::Disconnected => SessionStatus::Disconnected,
            SessionPhase::AwaitingAdmin { caller, .. } => SessionStatus::AwaitingAdmin { caller: *caller },
            SessionPhase::Ready(context) => SessionStatus::Ready {
                caller: context.caller,
                admin: context.admin,
                role: context.role,
            },
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
