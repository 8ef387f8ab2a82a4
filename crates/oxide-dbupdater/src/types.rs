//! Type-name canonicalization.
//!
//! Operators write short or loose type names in their schema documents
//! (`I`, `int`, `BOOLEAN`) and databases report their own spelling back
//! during introspection. Both sides go through the same translator so that
//! rendered column definitions can be compared textually.

/// Abbreviations and aliases mapped to their canonical type name.
const TRANSLATIONS: &[(&str, &str)] = &[
    ("TI", "TINYINT"),
    ("SI", "SMALLINT"),
    ("I", "INTEGER"),
    ("INT", "INTEGER"),
    ("BI", "BIGINT"),
    ("BOOLEAN", "TINYINT"),
];

/// Types whose length specifier is a numeric precision.
///
/// `B` is a dialect sentinel, not a real SQL type.
const NUMERIC_TYPES: &[&str] = &[
    "TINYINT", "SMALLINT", "INT", "INTEGER", "BIGINT", "DECIMAL", "NUMERIC", "FLOAT", "REAL",
    "DOUBLE", "B",
];

/// Numeric types that also take an explicit scale, e.g. `DECIMAL(40, 4)`.
const SCALE_TYPES: &[&str] = &["DECIMAL", "NUMERIC"];

/// Returns the canonical uppercase name for a type token.
///
/// Unknown tokens are uppercased and otherwise passed through.
#[must_use]
pub fn translate(token: &str) -> String {
    let upper = token.trim().to_ascii_uppercase();
    TRANSLATIONS
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map_or(upper, |(_, canonical)| (*canonical).to_string())
}

/// Returns whether the canonical type takes a precision.
#[must_use]
pub fn is_numeric(canonical: &str) -> bool {
    NUMERIC_TYPES.contains(&canonical)
}

/// Returns whether the canonical type takes a precision and a scale.
#[must_use]
pub fn is_scaled(canonical: &str) -> bool {
    SCALE_TYPES.contains(&canonical)
}

/// Canonicalizes and classifies type names for a dialect.
pub trait TypeTranslator: Send + Sync {
    /// Returns the canonical name for `token`.
    fn translate(&self, token: &str) -> String {
        translate(token)
    }

    /// Returns whether `canonical` is a numeric type.
    fn is_numeric(&self, canonical: &str) -> bool {
        is_numeric(canonical)
    }

    /// Returns whether `canonical` carries a scale.
    fn is_scaled(&self, canonical: &str) -> bool {
        is_scaled(canonical)
    }
}

/// The translator shared by the built-in dialects.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicTypeTranslator;

impl TypeTranslator for BasicTypeTranslator {}
