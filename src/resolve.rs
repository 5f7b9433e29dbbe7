//! Core resolution pipeline: pick a winner per key and build the typed config.
//!
//! Works on already-built sources, so the whole pipeline is testable with
//! synthetic inputs. Steps, for every schema key in order:
//!
//! 1. Ask the flag, environment and file sources, in that fixed order
//! 2. The first present value wins; otherwise the schema default applies
//! 3. Coerce the winner to the key's declared shape
//!
//! The coerced values are then assembled into a nested table and deserialized
//! into `C`. Any failure aborts the pass; no partially filled config is ever
//! returned.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::{debug, info, warn};

use crate::coerce::coerce;
use crate::env::EnvResolver;
use crate::error::{ConfigLoadError, FlagfigError, ValueTypeError};
use crate::file::{self, FileResolver};
use crate::flags::FlagResolver;
use crate::key::ConfigKey;
use crate::schema::{Schema, SchemaEntry};
use crate::source::{Provenance, Source, SourceValue};
use crate::types::ResolutionPolicy;

/// The three sources of one run.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub flags: FlagResolver,
    pub env: EnvResolver,
    pub file: FileResolver,
}

impl Sources {
    pub fn new(flags: FlagResolver, env: EnvResolver, file: FileResolver) -> Self {
        Self { flags, env, file }
    }

    /// First present value for `entry`, asking flags, then the environment,
    /// then the file. Flags and environment are matched by canonical key, the
    /// file by the field's declared name.
    pub fn lookup(&self, entry: &SchemaEntry) -> Option<SourceValue> {
        self.flags
            .lookup(&entry.key)
            .or_else(|| self.env.lookup(&entry.key))
            .or_else(|| self.file.lookup_field(&entry.field))
    }
}

/// Locate and load the config file as the policy allows.
///
/// Under a strict policy any failure (nothing found, unreadable, unparseable,
/// not a mapping) is returned. Otherwise an empty resolver takes the file's
/// place: a search that finds nothing is logged at debug level, anything else
/// (including a missing explicit file) at warn level.
pub fn open_file(policy: &ResolutionPolicy) -> Result<FileResolver, ConfigLoadError> {
    let loaded = file::locate(policy).and_then(|path| {
        debug!(path = %path.display(), "using config file");
        FileResolver::load(&path)
    });
    match loaded {
        Ok(resolver) => Ok(resolver),
        Err(e) if policy.strict => Err(e),
        Err(ConfigLoadError::NotFound { searched }) if policy.config_file.is_none() => {
            debug!(candidates = searched.len(), "no config file found");
            Ok(FileResolver::empty())
        }
        Err(e) => {
            warn!(error = %e, "skipping config file");
            Ok(FileResolver::empty())
        }
    }
}

/// The value chosen for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntry {
    pub key: ConfigKey,
    /// Declared field path, used to rebuild the nested structure.
    pub field: String,
    /// `None` for an optional key nobody set.
    pub value: Option<Value>,
    pub provenance: Provenance,
}

/// Pick and coerce a value for every key of `schema`.
pub fn resolve_entries(
    schema: &Schema,
    sources: &Sources,
) -> Result<Vec<ResolvedEntry>, ValueTypeError> {
    schema
        .iter()
        .map(|entry| {
            let winner = sources.lookup(entry).or_else(|| {
                entry
                    .default
                    .clone()
                    .map(|d| SourceValue::typed(d, Provenance::Default))
            });
            let (value, provenance) = match winner {
                Some(raw) => (Some(coerce(entry, &raw)?), raw.provenance),
                None => (None, Provenance::Default),
            };
            debug!(key = %entry.key, source = %provenance, "resolved");
            Ok(ResolvedEntry {
                key: entry.key.clone(),
                field: entry.field.clone(),
                value,
                provenance,
            })
        })
        .collect()
}

/// Resolve every key and deserialize the result into `C`.
pub fn resolve<C: DeserializeOwned>(
    schema: &Schema,
    sources: &Sources,
) -> Result<Resolved<C>, FlagfigError> {
    for unknown in sources.file.unknown_keys(schema) {
        debug!(key = %unknown, "ignoring unknown config file key");
    }

    let entries = resolve_entries(schema, sources)?;

    let from_file = entries
        .iter()
        .filter(|e| e.provenance == Provenance::File)
        .count();
    if from_file > 0
        && let Some(path) = sources.file.path()
    {
        info!(path = %path.display(), keys = from_file, "config file contributed values");
    }

    let table = entries_to_table(&entries)?;
    let config: C = Value::Table(table)
        .try_into()
        .map_err(|source| FlagfigError::Unmarshal { source })?;

    Ok(Resolved {
        config,
        entries,
        file: sources.file.path().map(Path::to_path_buf),
    })
}

/// Expand resolved entries into the nested table `C` deserializes from.
///
/// `("database.url", "pg://")` becomes `{database = {url = "pg://"}}`. Unset
/// optional keys are left out.
pub fn entries_to_table(entries: &[ResolvedEntry]) -> Result<Table, FlagfigError> {
    let mut table = Table::new();
    for entry in entries {
        if let Some(value) = &entry.value {
            set_nested(&mut table, &entry.field, value.clone())?;
        }
    }
    Ok(table)
}

fn set_nested(table: &mut Table, dotted: &str, value: Value) -> Result<(), FlagfigError> {
    let (parents, leaf) = match dotted.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, dotted),
    };
    let mut current = table;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        current = current
            .entry(segment)
            .or_insert_with(|| Value::Table(Table::new()))
            .as_table_mut()
            .ok_or_else(|| FlagfigError::Unmarshal {
                source: serde::de::Error::custom(format!(
                    "'{dotted}' is nested under a key that already holds a value"
                )),
            })?;
    }
    current.insert(leaf.to_string(), value);
    Ok(())
}

/// A resolved configuration together with where each value came from.
#[derive(Debug, Clone)]
pub struct Resolved<C> {
    config: C,
    entries: Vec<ResolvedEntry>,
    file: Option<PathBuf>,
}

impl<C> Resolved<C> {
    pub fn config(&self) -> &C {
        &self.config
    }

    pub fn into_inner(self) -> C {
        self.config
    }

    pub fn entries(&self) -> &[ResolvedEntry] {
        &self.entries
    }

    /// Which layer supplied `key`, or `None` for a key not in the schema.
    pub fn provenance(&self, key: &str) -> Option<Provenance> {
        let key = ConfigKey::new(key);
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.provenance)
    }

    /// The config file that was loaded, if any.
    pub fn source_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

impl<C> fmt::Display for Resolved<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match &entry.value {
                Some(v) => write!(f, "{} = {v}", entry.key)?,
                None => write!(f, "# {} = (not set)", entry.key)?,
            }
            writeln!(f, "  # {}", entry.provenance)?;
        }
        Ok(())
    }
}
