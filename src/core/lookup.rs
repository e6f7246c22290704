//! Versioned lookup table for normalizing free-text state names.
//!
//! Replaces successive text-replacement passes with a single explicit
//! mapping. Unmapped values resolve to an `Unknown` sentinel instead of
//! leaking raw text into downstream encoding.

use std::collections::HashMap;

/// A normalized state code, or the sentinel for unmapped input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateCode {
    /// A canonical two-letter state code.
    Code(String),
    /// Input that no lookup entry matched.
    Unknown,
}

impl StateCode {
    /// The canonical code, or "??" for the unknown sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            StateCode::Code(code) => code,
            StateCode::Unknown => "??",
        }
    }
}

/// A versioned alias table mapping free-text state variants to canonical
/// codes. The version number identifies which revision of the table a run
/// used.
#[derive(Debug, Clone)]
pub struct StateLookup {
    version: u32,
    aliases: HashMap<String, String>,
}

impl StateLookup {
    /// Build a lookup table from (variant, canonical code) pairs.
    ///
    /// Variants are matched case-insensitively after trimming. Canonical
    /// codes map to themselves automatically.
    pub fn new(version: u32, entries: &[(&str, &str)]) -> Self {
        let mut aliases = HashMap::new();
        for (variant, code) in entries {
            aliases.insert(normalize_key(variant), code.to_uppercase());
            aliases.insert(normalize_key(code), code.to_uppercase());
        }
        Self { version, aliases }
    }

    /// Table revision number.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Resolve raw input to a canonical code, or `Unknown` if unmapped.
    pub fn resolve(&self, raw: &str) -> StateCode {
        match self.aliases.get(&normalize_key(raw)) {
            Some(code) => StateCode::Code(code.clone()),
            None => StateCode::Unknown,
        }
    }
}

fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}
