//! Multi-tenant identity: identifiers, contexts, memberships, resolution.
//!
//! This module provides the mandatory tenant-context machinery. Every
//! storage and entitlement operation in the core takes a validated
//! [`TenantContext`] as an explicit parameter; the only way to obtain one is
//! through the fail-closed [`ContextResolver`].

mod context;
mod directory;
mod id;
mod membership;
mod resolver;

pub use context::TenantContext;
pub use directory::StoreMembershipDirectory;
pub use id::{TENANT_ID_HEX_LEN, TENANT_ID_PREFIX, TenantId};
pub use membership::{Membership, MembershipDirectory, Role, Tenant};
pub use resolver::{ContextResolver, TenantClaim};
