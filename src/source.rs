//! The common face of every value provider.

use std::fmt;

use toml::Value;

use crate::key::ConfigKey;

/// Which layer a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Flag,
    Env,
    File,
    Default,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provenance::Flag => "flag",
            Provenance::Env => "env",
            Provenance::File => "file",
            Provenance::Default => "default",
        })
    }
}

/// A value as a source holds it, before coercion.
///
/// Flags and environment variables only ever carry text. Files and defaults
/// carry values that already have a type.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Typed(Value),
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) | RawValue::Typed(Value::String(s)) => f.write_str(s),
            RawValue::Typed(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceValue {
    pub raw: RawValue,
    pub provenance: Provenance,
}

impl SourceValue {
    pub fn text(raw: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            raw: RawValue::Text(raw.into()),
            provenance,
        }
    }

    pub fn typed(value: Value, provenance: Provenance) -> Self {
        Self {
            raw: RawValue::Typed(value),
            provenance,
        }
    }
}

/// A provider that can answer "do you have a value for this key?".
///
/// Implementations never fail: a source that could not be read is replaced by
/// an empty one before resolution starts.
pub trait Source {
    fn provenance(&self) -> Provenance;

    fn lookup(&self, key: &ConfigKey) -> Option<SourceValue>;
}
