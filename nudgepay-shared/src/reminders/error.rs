//! Dispatch errors

use thiserror::Error;
use uuid::Uuid;

/// Why a claimed reminder could not be dispatched
///
/// Any of these rolls the claim back, so the reminder stays `scheduled` and a
/// later sweep retries it. "Already sent" and "not found" are not errors; see
/// [`DispatchOutcome::NotDispatched`](super::dispatcher::DispatchOutcome::NotDispatched).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invoice {invoice_id} for reminder {reminder_id} not found")]
    InvoiceNotFound { reminder_id: Uuid, invoice_id: Uuid },

    #[error("Organization not found: {0}")]
    OrganizationNotFound(Uuid),

    #[error("No usable template for organization {0}")]
    TemplateUnavailable(Uuid),
}

/// Coarse classification for logs and callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    /// Data the reminder depends on has disappeared
    ReferentialIntegrity,

    /// The store failed or could not produce a template
    Storage,
}

impl DispatchError {
    pub fn kind(&self) -> DispatchErrorKind {
        match self {
            DispatchError::InvoiceNotFound { .. } | DispatchError::OrganizationNotFound(_) => {
                DispatchErrorKind::ReferentialIntegrity
            }
            DispatchError::Database(_) | DispatchError::TemplateUnavailable(_) => {
                DispatchErrorKind::Storage
            }
        }
    }

    /// Message safe to return to a manual-send caller
    ///
    /// Internal details (SQL errors, foreign IDs) are only logged.
    pub fn public_message(&self) -> &'static str {
        "send failed"
    }
}
