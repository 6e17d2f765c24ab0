//! Merchant and station name lookup.
//!
//! Parsers only ever produce raw location codes. Turning a code into a
//! human-readable name is left to a [`LocationDirectory`] supplied by the
//! caller, so the read path never depends on lookup-table content.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Number of leading characters of a location code used as lookup key.
pub const LOCATION_PREFIX_LEN: usize = 4;

/// Resolves raw location codes to display names.
pub trait LocationDirectory {
    /// Display name for `code`. Always returns something presentable.
    fn resolve(&self, code: &str) -> String;
}

/// Read-only directory backed by an in-memory map.
///
/// Codes are matched on their first four characters (case-insensitive).
/// Unknown codes fall back to a category derived from the first digit,
/// followed by the code prefix so distinct codes stay distinguishable.
///
/// ```
/// use farecard_core::{LocationDirectory, StaticLocationDirectory};
///
/// let directory = StaticLocationDirectory::new()
///     .with_entry("1001", "Central Market")
///     .unwrap();
///
/// assert_eq!(directory.resolve("10019A3F"), "Central Market");
/// assert_eq!(directory.resolve("8F00"), "ATM (8F00)");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticLocationDirectory {
    entries: HashMap<String, String>,
}

impl StaticLocationDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named entry. Only the first four characters of `code` are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLocationCode`] if `code` is shorter than the
    /// lookup prefix.
    pub fn with_entry(mut self, code: &str, name: impl Into<String>) -> Result<Self> {
        let key = prefix(code).ok_or_else(|| Error::InvalidLocationCode(code.to_string()))?;
        self.entries.insert(key, name.into());
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Category used when a code has no explicit entry.
    pub fn category(code: &str) -> &'static str {
        match code.trim().chars().next() {
            Some('0') => "Transit",
            Some('1') => "Market",
            Some('2') => "Restaurant",
            Some('3') => "School",
            Some('4'..='7') => "Store",
            Some('8') => "ATM",
            Some('9') => "Fuel station",
            _ => "Merchant",
        }
    }
}

impl FromIterator<(String, String)> for StaticLocationDirectory {
    /// Build from `(code, name)` pairs, silently dropping codes that are too
    /// short to key on.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let entries = iter
            .into_iter()
            .filter_map(|(code, name)| prefix(&code).map(|key| (key, name)))
            .collect();
        Self { entries }
    }
}

impl LocationDirectory for StaticLocationDirectory {
    fn resolve(&self, code: &str) -> String {
        if let Some(name) = prefix(code).and_then(|key| self.entries.get(&key)) {
            return name.clone();
        }
        let category = Self::category(code);
        let shown: String = code.trim().chars().take(LOCATION_PREFIX_LEN).collect();
        if shown.is_empty() {
            category.to_string()
        } else {
            format!("{category} ({shown})")
        }
    }
}

fn prefix(code: &str) -> Option<String> {
    let trimmed = code.trim();
    let key: String = trimmed.chars().take(LOCATION_PREFIX_LEN).collect();
    (key.chars().count() == LOCATION_PREFIX_LEN).then(|| key.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn directory() -> StaticLocationDirectory {
        StaticLocationDirectory::new()
            .with_entry("0042", "Harbour Station")
            .unwrap()
            .with_entry("ab12", "Corner Kiosk")
            .unwrap()
    }

    #[test]
    fn test_resolve_known_prefix() {
        let directory = directory();
        assert_eq!(directory.resolve("0042"), "Harbour Station");
        assert_eq!(directory.resolve("004201FF"), "Harbour Station");
        assert_eq!(directory.resolve("AB12"), "Corner Kiosk");
    }

    #[rstest]
    #[case("0999", "Transit (0999)")]
    #[case("1234", "Market (1234)")]
    #[case("2000", "Restaurant (2000)")]
    #[case("3000", "School (3000)")]
    #[case("5000", "Store (5000)")]
    #[case("8000", "ATM (8000)")]
    #[case("9000", "Fuel station (9000)")]
    #[case("F000", "Merchant (F000)")]
    #[case("10019A3F", "Market (1001)")]
    #[case("12", "Market (12)")]
    #[case("", "Merchant")]
    fn test_resolve_category_fallback(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(directory().resolve(code), expected);
    }

    #[test]
    fn test_unknown_codes_stay_distinguishable() {
        let directory = directory();
        assert_ne!(directory.resolve("1001"), directory.resolve("1002"));
        assert_eq!(StaticLocationDirectory::category("1001"), "Market");
    }

    #[test]
    fn test_with_entry_rejects_short_code() {
        let result = StaticLocationDirectory::new().with_entry("12", "Too short");
        assert_eq!(result.unwrap_err(), Error::InvalidLocationCode("12".to_string()));
    }

    #[test]
    fn test_from_iter_drops_short_codes() {
        let directory: StaticLocationDirectory = [
            ("1001".to_string(), "Market Hall".to_string()),
            ("7".to_string(), "Ignored".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(directory.len(), 1);
    }
}
