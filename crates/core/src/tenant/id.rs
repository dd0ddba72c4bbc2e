//! Tenant identifier type.
//!
//! This module defines [`TenantId`], the immutable fixed-format token that
//! identifies a tenant. The format is a fixed prefix plus fixed-length hex
//! (`tn_` followed by 24 lowercase hex characters), and identifiers are never
//! reused. Anything that does not match the format is rejected at parse time,
//! so a `TenantId` in hand is always well-formed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// Fixed prefix for all tenant identifiers.
pub const TENANT_ID_PREFIX: &str = "tn_";

/// Number of hex characters following the prefix.
pub const TENANT_ID_HEX_LEN: usize = 24;

/// An immutable, fixed-format tenant identifier.
///
/// `TenantId` can only be obtained by parsing a string that matches the
/// `tn_<24 lowercase hex>` format or by generating a fresh one. There is no
/// constructor that accepts arbitrary text, which makes a malformed tenant
/// identity unrepresentable downstream of the parse boundary.
///
/// # Examples
///
/// ```
/// use castellan_core::tenant::TenantId;
///
/// let tenant = TenantId::parse("tn_00c0ffee00c0ffee00c0ffee").unwrap();
/// assert_eq!(tenant.as_str(), "tn_00c0ffee00c0ffee00c0ffee");
/// assert!(TenantId::parse("acme").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parses a tenant identifier, validating the immutable-ID format.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::InvalidTenantId`] if the input does not match
    /// the `tn_<24 lowercase hex>` format.
    pub fn parse(s: &str) -> Result<Self, ContextError> {
        if Self::is_valid(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(ContextError::InvalidTenantId)
        }
    }

    /// Generates a fresh tenant identifier.
    ///
    /// Used at tenant provisioning time; identifiers are never reused.
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{}{}", TENANT_ID_PREFIX, &hex[..TENANT_ID_HEX_LEN]))
    }

    /// Returns `true` if the string matches the tenant identifier format.
    pub fn is_valid(s: &str) -> bool {
        match s.strip_prefix(TENANT_ID_PREFIX) {
            Some(rest) => {
                rest.len() == TENANT_ID_HEX_LEN
                    && rest.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
            }
            None => false,
        }
    }

    /// Returns the tenant identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TenantId({})", self.0)
    }
}

impl FromStr for TenantId {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TenantId::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = ContextError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TenantId::parse(&s)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
