//! Resource identifier shape validation.
//!
//! Only three identifier shapes are ever accepted: content-addressed
//! (`res_` + 40 lowercase hex), UUID, or bounded numeric. Anything else is
//! rejected before it can reach a lookup. Numeric identifiers additionally
//! get an enumeration check: values below a floor, or identifiers that look
//! padded rather than generated, are treated as probe attempts.

use std::sync::LazyLock;

use regex::Regex;

/// Prefix of content-addressed resource identifiers.
pub const RESOURCE_ID_PREFIX: &str = "res_";

/// Hex length of the content-addressed identifier body.
pub const RESOURCE_ID_HEX_LEN: usize = 40;

/// Maximum digits accepted for a numeric identifier.
pub const NUMERIC_ID_MAX_DIGITS: usize = 12;

static UUID_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid shape pattern")
});

/// The accepted identifier shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceIdKind {
    /// `res_` followed by 40 lowercase hex characters.
    ContentAddressed,
    /// Lowercase hyphenated UUID.
    Uuid,
    /// Decimal digits, bounded length.
    Numeric,
}

/// Classifies an identifier, or returns `None` if it matches no accepted
/// shape.
pub fn classify(id: &str) -> Option<ResourceIdKind> {
    if let Some(body) = id.strip_prefix(RESOURCE_ID_PREFIX) {
        if body.len() == RESOURCE_ID_HEX_LEN
            && body.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Some(ResourceIdKind::ContentAddressed);
        }
        return None;
    }
    if UUID_SHAPE.is_match(id) {
        return Some(ResourceIdKind::Uuid);
    }
    if !id.is_empty()
        && id.len() <= NUMERIC_ID_MAX_DIGITS
        && id.chars().all(|c| c.is_ascii_digit())
    {
        return Some(ResourceIdKind::Numeric);
    }
    None
}

/// Parses a numeric identifier's value, if the shape is numeric.
pub fn numeric_value(id: &str) -> Option<u64> {
    matches!(classify(id), Some(ResourceIdKind::Numeric)).then(|| id.parse().ok())?
}

/// Returns `true` if the identifier's variable part looks padded rather
/// than generated.
///
/// Generated hex and UUID bodies are effectively random; a long run of one
/// repeated character is the signature of a hand-built probe
/// (`res_000...01`, nil-adjacent UUIDs).
pub fn looks_padded(id: &str) -> bool {
    let body = id.strip_prefix(RESOURCE_ID_PREFIX).unwrap_or(id);
    let mut run_char = '\0';
    let mut run_len = 0usize;
    for c in body.chars().filter(|c| *c != '-') {
        if c == run_char {
            run_len += 1;
            if run_len >= 8 {
                return true;
            }
        } else {
            run_char = c;
            run_len = 1;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_addressed_shape() {
        let id = format!("res_{}", "a1b2c3d4e5".repeat(4));
        assert_eq!(classify(&id), Some(ResourceIdKind::ContentAddressed));

        // Wrong length, uppercase, or bad chars all fail.
        assert_eq!(classify("res_abc"), None);
        assert_eq!(classify(&format!("res_{}", "A1B2C3D4E5".repeat(4))), None);
        assert_eq!(classify(&format!("res_{}", "z1b2c3d4e5".repeat(4))), None);
    }

    #[test]
    fn test_uuid_shape() {
        assert_eq!(
            classify("550e8400-e29b-41d4-a716-446655440000"),
            Some(ResourceIdKind::Uuid)
        );
        assert_eq!(classify("550E8400-E29B-41D4-A716-446655440000"), None);
        assert_eq!(classify("550e8400e29b41d4a716446655440000"), None);
    }

    #[test]
    fn test_numeric_shape_is_bounded() {
        assert_eq!(classify("12345"), Some(ResourceIdKind::Numeric));
        assert_eq!(classify("123456789012"), Some(ResourceIdKind::Numeric));
        assert_eq!(classify("1234567890123"), None);
        assert_eq!(classify(""), None);
        assert_eq!(classify("12a45"), None);
        assert_eq!(classify("-5"), None);
    }

    #[test]
    fn test_numeric_value() {
        assert_eq!(numeric_value("1000"), Some(1000));
        assert_eq!(numeric_value("abc"), None);
    }

    #[test]
    fn test_injection_strings_rejected() {
        for id in ["1 OR 1=1", "'; DROP TABLE records; --", "../../../etc", "res_"] {
            assert_eq!(classify(id), None, "{id:?} must not classify");
        }
    }

    #[test]
    fn test_padding_detection() {
        assert!(looks_padded(&format!("res_{}1", "0".repeat(39))));
        assert!(looks_padded("00000000-0000-4000-8000-000000000001"));
        assert!(!looks_padded("res_3a7bd3e2360a3d29eea436fcfb7e44c735d117c4"));
        assert!(!looks_padded("550e8400-e29b-41d4-a716-446655440000"));
    }
}
