// src/services/registry_service.rs
//! Diploma registry service.
//!
//! Owns the session and wires identity resolution, the command processor and
//! the export renderer together. This is the object the HTTP layer talks to.

use crate::error::DiplomaError;
use crate::models::address::{Address, Role};
use crate::services::authorization::{authorize, Operation};
use crate::services::command_processor::DiplomaCommandProcessor;
use crate::services::export::{ExportBinding, ExportRenderer};
use crate::services::identity::IdentityResolver;
use crate::services::session::{Session, SessionStatus};
use chrono::NaiveDate;
use log::{info, warn};
use std::sync::Arc;

pub struct DiplomaRegistryService {
    resolver: IdentityResolver,
    session: Arc<Session>,
    processor: DiplomaCommandProcessor,
    exporter: ExportRenderer,
}

impl DiplomaRegistryService {
    pub fn new(resolver: IdentityResolver, exporter: ExportRenderer) -> Self {
        let session = Arc::new(Session::new());
        Self {
            resolver,
            processor: DiplomaCommandProcessor::new(session.clone()),
            session,
            exporter,
        }
    }

    /// Resolves the caller and admin. A student's own diplomas are loaded
    /// straight away.
    ///
    /// # Errors
    /// `NoWallet` if no signing collaborator is configured, `Ledger` if the
    /// wallet or the admin lookup fails.
    pub async fn connect(&self) -> Result<SessionStatus, DiplomaError> {
        let context = self.resolver.resolve(&self.session).await?;
        if context.role == Role::Holder {
            let own = self.processor.load_own_records().await?;
            info!("{} diplomas on record for {}", own.records.len(), context.caller);
        }
        Ok(self.session.status().await)
    }

    /// Drops everything tied to the previous account and connects again.
    ///
    /// Also the recovery path after a failed [`connect`](Self::connect).
    /// Served as `POST /session`.
    pub async fn account_changed(&self) -> Result<SessionStatus, DiplomaError> {
        info!("wallet account changed; resetting session");
        self.session.invalidate().await;
        self.processor.cancel_edit().await;
        self.connect().await
    }

    pub async fn status(&self) -> SessionStatus {
        self.session.status().await
    }

    pub fn processor(&self) -> &DiplomaCommandProcessor {
        &self.processor
    }

    pub fn exporter(&self) -> &ExportRenderer {
        &self.exporter
    }

    /// Reads `holder`'s diplomas unless a previous read is cached.
    ///
    /// Position-based commands address the last read sequence, so callers
    /// that skip an explicit lookup go through here first.
    pub async fn ensure_loaded(&self, holder: &str) -> Result<(), DiplomaError> {
        let target = Address::parse(holder)?;
        if self.processor.cached_records(&target).await?.is_none() {
            self.processor.lookup(holder).await?;
        }
        Ok(())
    }

    /// Binds a fresh certificate to the diploma at `index` of `holder`.
    ///
    /// Uses the last read of the holder's diplomas, reading them first if
    /// they have not been loaded.
    ///
    /// # Errors
    /// `InvalidAddress`, `Authorization` (students export only their own
    /// diplomas), `Validation` for an unknown position, `NotReady`, `Ledger`.
    pub async fn export(
        &self,
        holder: &str,
        index: usize,
        issue_date: NaiveDate,
    ) -> Result<ExportBinding, DiplomaError> {
        let context = self.session.context().await?;
        let target = Address::parse(holder)?;
        authorize(context.role, Operation::lookup(&context.caller, &target))?;

        self.ensure_loaded(holder).await?;
        let stored = context.store.record_at(&target, index).await.ok_or_else(|| {
            warn!("export of missing diploma {} for {}", index, target);
            DiplomaError::Validation(format!("no diploma at position {}", index))
        })?;

        self.exporter.bind(&stored.record, issue_date)
    }
}
