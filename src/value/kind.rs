//! Kind resolution from a parameter's free-text type description.
//!
//! Descriptions come from an externally maintained catalog ("Texto",
//! "Numérico", "Fecha", "Hora", "Correo electrónico", "Lista", ...), so the
//! match is a case- and accent-insensitive substring test.

use serde::Serialize;
use std::fmt;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Number,
    Date,
    Time,
    Email,
    List,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::Email => "email",
            ValueKind::List => "list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Order matters: "hora" must win over "fecha" for descriptions like
// "Fecha y hora".
const FRAGMENTS: &[(&[&str], ValueKind)] = &[
    (&["hora", "time"], ValueKind::Time),
    (&["correo", "email"], ValueKind::Email),
    (&["lista", "list"], ValueKind::List),
    (&["numer"], ValueKind::Number),
    (&["fecha", "date"], ValueKind::Date),
];

/// Resolve a declared type description into a kind. Unrecognized -> Text.
pub fn resolve_kind(declared_type: &str) -> ValueKind {
    let normalized = fold(declared_type);
    FRAGMENTS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| normalized.contains(n)))
        .map(|(_, kind)| *kind)
        .unwrap_or(ValueKind::Text)
}

/// Lowercase and strip diacritics ("Numérico" -> "numerico").
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
