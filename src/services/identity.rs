// src/services/identity.rs
//! Identity resolver.
//!
//! Connects the wallet, binds a ledger handle to the caller and loads the
//! registry admin, reporting each step to the [`Session`].

use crate::error::{DiplomaError, LedgerError};
use crate::services::session::{Session, SessionContext};
use crate::wallet::provider::WalletProvider;
use log::{error, info};
use std::sync::Arc;

pub struct IdentityResolver {
    wallet: Option<Arc<dyn WalletProvider>>,
}

impl IdentityResolver {
    /// # Arguments
    /// * `wallet` - Signing collaborator, `None` when no wallet is installed
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        Self { wallet }
    }

    /// Resolves caller and admin and makes the session ready.
    ///
    /// Account access is only requested when the wallet has no authorized
    /// account yet. The admin is read through the handle bound to the caller.
    ///
    /// # Errors
    /// - [`DiplomaError::NoWallet`] without a signing collaborator
    /// - [`DiplomaError::Ledger`] if the user refuses access or a ledger read fails
    pub async fn resolve(&self, session: &Session) -> Result<Arc<SessionContext>, DiplomaError> {
        let wallet = self.wallet.as_ref().ok_or_else(|| {
            error!("{}", DiplomaError::NoWallet);
            DiplomaError::NoWallet
        })?;

        let mut accounts = wallet.authorized_accounts().await?;
        if accounts.is_empty() {
            info!("requesting account access from wallet");
            accounts = wallet.request_accounts().await?;
        }
        if accounts.is_empty() {
            return Err(LedgerError::Rejected.into());
        }

        let caller = wallet.active_address().await?;
        let ledger = wallet.bind_registry(&caller).await?;
        session.identity_resolved(caller, ledger.clone()).await;

        let admin = match ledger.admin().await {
            Ok(admin) => admin,
            Err(e) => {
                error!("cannot read registry admin: {}", e);
                session.invalidate().await;
                return Err(e.into());
            }
        };
        session.admin_resolved(caller, admin).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::address::Role;
    use crate::services::session::SessionStatus;
    use crate::testing::{addr, InMemoryLedger, ScriptedWallet, ADMIN, STUDENT};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn missing_wallet_is_reported() {
        let session = Session::new();
        let err = IdentityResolver::new(None).resolve(&session).await.err().unwrap();
        assert_eq!(err, DiplomaError::NoWallet);
        assert!(err.to_string().contains("install or connect"));
    }

    #[tokio::test]
    async fn existing_authorization_is_not_prompted_again() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        let wallet = Arc::new(ScriptedWallet::connected(addr(ADMIN), ledger.clone()));
        let session = Session::new();

        let context = IdentityResolver::new(Some(wallet.clone() as Arc<dyn WalletProvider>)).resolve(&session).await.unwrap();

        assert_eq!(wallet.requests.load(Ordering::SeqCst), 0);
        assert_eq!(context.role, Role::Issuer);
        assert_eq!(ledger.state.admin_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn locked_wallet_is_asked_for_access() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        let wallet = Arc::new(ScriptedWallet::locked(addr(STUDENT), ledger));
        let session = Session::new();

        let context = IdentityResolver::new(Some(wallet.clone() as Arc<dyn WalletProvider>)).resolve(&session).await.unwrap();

        assert_eq!(wallet.requests.load(Ordering::SeqCst), 1);
        assert_eq!(context.caller, addr(STUDENT));
        assert_eq!(context.role, Role::Holder);
    }

    #[tokio::test]
    async fn failed_admin_read_leaves_session_disconnected() {
        let ledger = InMemoryLedger::new(addr(ADMIN));
        ledger.fail_next_admin(LedgerError::Transport("rpc down".into()));
        let wallet: Arc<dyn WalletProvider> = Arc::new(ScriptedWallet::connected(addr(STUDENT), ledger.clone()));
        let resolver = IdentityResolver::new(Some(wallet));
        let session = Session::new();

        let err = resolver.resolve(&session).await.err().unwrap();

        assert_eq!(err, DiplomaError::Ledger(LedgerError::Transport("rpc down".into())));
        assert_eq!(session.status().await, SessionStatus::Disconnected);
        let not_ready = session.context().await.err().unwrap();
        assert_eq!(not_ready, DiplomaError::NotReady("wallet is not connected".into()));

        let context = resolver.resolve(&session).await.unwrap();
        assert_eq!(context.role, Role::Holder);
        assert_eq!(ledger.state.admin_reads.load(Ordering::SeqCst), 2);
    }
}
