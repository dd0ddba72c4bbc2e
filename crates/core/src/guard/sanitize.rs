//! Outbound error sanitization.
//!
//! Anything user-visible must come from a small fixed vocabulary. Raw error
//! text is scanned for leakage-prone phrases and for literal occurrences of
//! the identifiers involved in the request; any hit collapses the whole
//! message to a generic one. The unsanitized text belongs in the audit log
//! only.

use std::sync::LazyLock;

use regex::Regex;

/// The generic denial message.
pub const SAFE_ACCESS_DENIED: &str = "Access denied";

/// The generic not-found message.
pub const SAFE_NOT_FOUND: &str = "Resource not found";

/// The generic infrastructure-failure message.
pub const SAFE_OPERATION_FAILED: &str = "Operation failed";

static LEAKY_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(tenant not found|cross[ -]tenant|permission denied|membership|tenant_id",
        r"|foreign key|constraint|sqlite|syntax error|no such (table|column)|connection refused)",
    ))
    .expect("leaky phrase pattern")
});

/// Collapses a message to a safe fallback if it leaks internal detail.
///
/// `identifiers` are the literal tenant/user/resource identifiers of the
/// current request; their appearance anywhere in the text is a leak
/// regardless of phrasing.
pub fn sanitize_message<'a>(
    message: &'a str,
    identifiers: impl IntoIterator<Item = &'a str>,
    fallback: &'static str,
) -> String {
    if LEAKY_PHRASES.is_match(message) {
        return fallback.to_string();
    }
    for id in identifiers {
        if !id.is_empty() && message.contains(id) {
            return fallback.to_string();
        }
    }
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_message_passes_through() {
        let out = sanitize_message("Validation failed for field 'name'", [], SAFE_OPERATION_FAILED);
        assert_eq!(out, "Validation failed for field 'name'");
    }

    #[test]
    fn test_leaky_phrases_collapse() {
        for message in [
            "Tenant not found in registry",
            "cross-tenant access blocked",
            "Permission denied for row",
            "UNIQUE constraint failed: records.id",
            "no such table: usage_counters",
            "membership row missing",
        ] {
            assert_eq!(
                sanitize_message(message, [], SAFE_ACCESS_DENIED),
                SAFE_ACCESS_DENIED,
                "{message:?} must collapse"
            );
        }
    }

    #[test]
    fn test_literal_identifiers_collapse() {
        let tenant = "tn_0123456789abcdef01234567";
        let message = format!("row belongs to {tenant}");
        assert_eq!(
            sanitize_message(&message, [tenant], SAFE_NOT_FOUND),
            SAFE_NOT_FOUND
        );
    }

    #[test]
    fn test_empty_identifier_is_ignored() {
        let out = sanitize_message("plain failure", [""], SAFE_OPERATION_FAILED);
        assert_eq!(out, "plain failure");
    }
}
