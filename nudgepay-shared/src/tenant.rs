//! Tenant scoping
//!
//! Every tenant-owned read and write in this crate takes a [`TenantScope`].
//! The scope is the only way to name an organization to the storage layer,
//! so a query without a tenant predicate cannot be expressed through the
//! model APIs.

use std::fmt;
use uuid::Uuid;

/// Capability naming the organization an operation is confined to
///
/// Constructed once at the boundary (after the caller has been authenticated
/// by the request layer, or from the tenant list in the sweep) and passed down
/// by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantScope {
    org_id: Uuid,
}

impl TenantScope {
    pub fn new(org_id: Uuid) -> Self {
        Self { org_id }
    }

    /// The organization every query made with this scope is filtered by
    pub fn org_id(&self) -> Uuid {
        self.org_id
    }
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.org_id)
    }
}
