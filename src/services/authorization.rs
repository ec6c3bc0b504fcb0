// src/services/authorization.rs
//! Role-based command authorization.
//!
//! This is a UX-level gate: it stops commands the connected role cannot
//! perform before any ledger call is attempted. The contract enforces admin
//! rights on its own as well.

use crate::error::DiplomaError;
use crate::models::address::{Address, Role};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Create,
    Update,
    Delete,
    /// Read diplomas recorded against someone else's address.
    LookupArbitrary,
    /// Read the caller's own diplomas.
    LookupOwn,
}

impl Operation {
    /// Classifies a read of `target`'s diplomas by `caller`.
    pub fn lookup(caller: &Address, target: &Address) -> Self {
        if caller == target {
            Operation::LookupOwn
        } else {
            Operation::LookupArbitrary
        }
    }
}

/// Decides whether `role` may perform `operation`. Has no side effects.
///
/// # Errors
/// [`DiplomaError::Authorization`] describing the refused operation.
pub fn authorize(role: Role, operation: Operation) -> Result<(), DiplomaError> {
    match (role, operation) {
        (Role::Issuer, _) => Ok(()),
        (Role::Holder, Operation::LookupOwn) => Ok(()),
        (Role::Holder, Operation::LookupArbitrary) => Err(DiplomaError::Authorization(
            "students can only view their own diplomas".into(),
        )),
        (Role::Holder, op) => Err(DiplomaError::Authorization(format!(
            "only the registry admin can {} diplomas",
            match op {
                Operation::Create => "add",
                Operation::Update => "update",
                _ => "delete",
            }
        ))),
    }
}
