//! Worksheet naming rules

use crate::error::{RegsheetError, RegsheetResult};

/// Longest sheet name Excel accepts, in UTF-16 code units
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];

/// Check a sheet name against the XLSX naming rules
pub fn validate_sheet_name(name: &str) -> RegsheetResult<()> {
    let invalid = |reason: String| {
        Err(RegsheetError::InvalidSheetName {
            name: name.to_string(),
            reason,
        })
    };

    if name.trim().is_empty() {
        return invalid("name is empty".to_string());
    }
    let len = name.encode_utf16().count();
    if len > MAX_SHEET_NAME_LEN {
        return invalid(format!(
            "{} characters exceeds the {} character limit",
            len, MAX_SHEET_NAME_LEN
        ));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
        return invalid(format!("contains forbidden character {:?}", c));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return invalid("cannot start or end with an apostrophe".to_string());
    }
    if name.eq_ignore_ascii_case("History") {
        return invalid("'History' is reserved".to_string());
    }
    Ok(())
}

/// Excel compares sheet names case-insensitively
pub fn same_sheet_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["Regression1", "Regression 2", "P&L", "Résumé", "a'b"] {
            assert!(validate_sheet_name(name).is_ok(), "{name} should be valid");
        }
        assert!(validate_sheet_name(&"x".repeat(31)).is_ok());
    }

    #[test]
    fn test_empty_name() {
        assert!(matches!(
            validate_sheet_name(""),
            Err(RegsheetError::InvalidSheetName { .. })
        ));
        assert!(validate_sheet_name("   ").is_err());
    }

    #[test]
    fn test_too_long() {
        let err = validate_sheet_name(&"x".repeat(32)).unwrap_err();
        assert!(err.to_string().contains("31"));
    }

    #[test]
    fn test_forbidden_characters() {
        for name in ["a:b", "a\\b", "a/b", "a?b", "a*b", "a[b", "a]b", "a\nb"] {
            assert!(validate_sheet_name(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn test_apostrophe_edges() {
        assert!(validate_sheet_name("'quoted").is_err());
        assert!(validate_sheet_name("quoted'").is_err());
    }

    #[test]
    fn test_reserved_history() {
        assert!(validate_sheet_name("history").is_err());
        assert!(validate_sheet_name("History2").is_ok());
    }

    #[test]
    fn test_same_sheet_name_ignores_case() {
        assert!(same_sheet_name("Regression1", "REGRESSION1"));
        assert!(same_sheet_name("Résumé", "RÉSUMÉ"));
        assert!(!same_sheet_name("Regression1", "Regression2"));
    }
}
