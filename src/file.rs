//! Config file discovery, parsing, and lookup.
//!
//! # Discovery
//!
//! Each [`SearchPath`] expands into one candidate per supported extension
//! (see [`types`](crate::types)). [`locate`] walks the candidates in order and
//! picks the first one that exists; an explicit file always wins over search.
//!
//! # Parsing
//!
//! TOML, YAML and JSON are all read into a `toml::Table`, so the rest of the
//! crate only ever sees one value model. YAML and JSON `null`s are dropped
//! and count as absent. The top level must be a mapping.
//!
//! # Lookup
//!
//! [`FileResolver`] understands exactly one level of nesting. `port` is read
//! from the top level and `server.port` from table `server`, after first
//! trying a literal top-level `"server.port"` key. A key three or more
//! segments deep is never found in a file, whatever the file contains; such
//! keys can only be set by flag, environment variable or default.
//!
//! Names are matched against the field as serde spells it (`max-conn` under
//! `rename_all = "kebab-case"`), case-sensitively.

use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::error::ConfigLoadError;
use crate::key::ConfigKey;
use crate::schema::Schema;
use crate::source::{Provenance, Source, SourceValue};
use crate::types::{FileFormat, ResolutionPolicy, SearchPath};

/// Expand one [`SearchPath`] into concrete candidate files.
///
/// `app_name` names the `/etc/<app>/` and platform directories; `stem` is the
/// file name (without extension) used in the working directory and flat
/// locations. `Platform` yields nothing when no home directory is known.
pub fn expand_search_path(
    sp: &SearchPath,
    app_name: &str,
    stem: &str,
    formats: &[FileFormat],
) -> Vec<PathBuf> {
    let dir = match sp {
        SearchPath::File(path) => return vec![path.clone()],
        SearchPath::Cwd => Path::new(".").to_path_buf(),
        SearchPath::Dir(dir) => dir.clone(),
        SearchPath::EtcFlat => PathBuf::from("/etc"),
        SearchPath::Etc => Path::new("/etc").join(app_name),
        SearchPath::Platform => {
            match directories::ProjectDirs::from("", "", app_name) {
                Some(proj) => proj.config_dir().to_path_buf(),
                None => return vec![],
            }
        }
    };
    let base = match sp {
        SearchPath::Etc | SearchPath::Platform => "config",
        _ => stem,
    };
    formats
        .iter()
        .flat_map(|f| f.extensions())
        .map(|ext| dir.join(format!("{base}.{ext}")))
        .collect()
}

/// Pick the file to load: the explicit one if given, otherwise the first
/// candidate that exists.
pub fn locate(policy: &ResolutionPolicy) -> Result<PathBuf, ConfigLoadError> {
    if let Some(path) = &policy.config_file {
        return Ok(path.clone());
    }
    policy
        .search_paths
        .iter()
        .find(|p| p.is_file())
        .cloned()
        .ok_or_else(|| ConfigLoadError::NotFound {
            searched: policy.search_paths.clone(),
        })
}

/// Read and parse one file, choosing the format from its extension.
pub fn load_file(path: &Path) -> Result<Table, ConfigLoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigLoadError::NotFound {
                searched: vec![path.to_path_buf()],
            }
        } else {
            ConfigLoadError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    parse_str(&content, FileFormat::from_path(path), path)
}

/// Parse file content. `path` is only used in error messages.
pub fn parse_str(content: &str, format: FileFormat, path: &Path) -> Result<Table, ConfigLoadError> {
    let parse_err = |source: Box<dyn std::error::Error + Send + Sync>| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        format,
        source,
    };
    let not_a_mapping = || ConfigLoadError::NotAMapping {
        path: path.to_path_buf(),
    };

    match format {
        FileFormat::Toml => toml::from_str::<Table>(content).map_err(|e| parse_err(Box::new(e))),
        FileFormat::Yaml => {
            let doc: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| parse_err(Box::new(e)))?;
            match doc {
                // An empty document is an empty mapping.
                serde_yaml::Value::Null => Ok(Table::new()),
                serde_yaml::Value::Mapping(map) => Ok(yaml_mapping(map)),
                _ => Err(not_a_mapping()),
            }
        }
        FileFormat::Json => {
            let doc: serde_json::Value =
                serde_json::from_str(content).map_err(|e| parse_err(Box::new(e)))?;
            match doc {
                serde_json::Value::Object(map) => Ok(map
                    .into_iter()
                    .filter_map(|(k, v)| Some((k, json_value(v)?)))
                    .collect()),
                _ => Err(not_a_mapping()),
            }
        }
    }
}

fn yaml_mapping(map: serde_yaml::Mapping) -> Table {
    map.into_iter()
        .filter_map(|(k, v)| Some((yaml_key(k)?, yaml_value(v)?)))
        .collect()
}

fn yaml_key(key: serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_value(value: serde_yaml::Value) -> Option<Value> {
    use serde_yaml::Value as Y;
    Some(match value {
        Y::Null => return None,
        Y::Bool(b) => Value::Boolean(b),
        Y::Number(n) => number(n.as_i64(), n.as_f64())?,
        Y::String(s) => Value::String(s),
        Y::Sequence(items) => Value::Array(items.into_iter().filter_map(yaml_value).collect()),
        Y::Mapping(map) => Value::Table(yaml_mapping(map)),
        Y::Tagged(tagged) => return yaml_value(tagged.value),
    })
}

fn json_value(value: serde_json::Value) -> Option<Value> {
    use serde_json::Value as J;
    Some(match value {
        J::Null => return None,
        J::Bool(b) => Value::Boolean(b),
        J::Number(n) => number(n.as_i64(), n.as_f64())?,
        J::String(s) => Value::String(s),
        J::Array(items) => Value::Array(items.into_iter().filter_map(json_value).collect()),
        J::Object(map) => Value::Table(
            map.into_iter()
                .filter_map(|(k, v)| Some((k, json_value(v)?)))
                .collect(),
        ),
    })
}

fn number(int: Option<i64>, float: Option<f64>) -> Option<Value> {
    match (int, float) {
        (Some(i), _) => Some(Value::Integer(i)),
        (None, Some(f)) => Some(Value::Float(f)),
        (None, None) => None,
    }
}

/// Values from one parsed config file.
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    path: Option<PathBuf>,
    table: Table,
}

impl FileResolver {
    /// A resolver with no file behind it; every lookup is absent.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        Ok(Self {
            path: Some(path.to_path_buf()),
            table: load_file(path)?,
        })
    }

    pub fn from_table(table: Table) -> Self {
        Self { path: None, table }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Look up a declared field path such as `server.max-conn`.
    pub fn lookup_field(&self, field: &str) -> Option<SourceValue> {
        let mut segments = field.split('.');
        let value = match (segments.next(), segments.next(), segments.next()) {
            (Some(top), None, None) => self.table.get(top)?,
            (Some(section), Some(leaf), None) => match self.table.get(field) {
                Some(flat) => flat,
                None => self.table.get(section)?.as_table()?.get(leaf)?,
            },
            _ => return None,
        };
        Some(SourceValue::typed(value.clone(), Provenance::File))
    }

    /// Dotted paths of file leaves that no schema key reads, including
    /// anything nested deeper than lookups reach.
    pub fn unknown_keys(&self, schema: &Schema) -> Vec<String> {
        let mut leaves = Vec::new();
        collect_leaves(&self.table, "", &mut leaves);
        leaves
            .into_iter()
            .filter(|path| !schema.iter().any(|e| e.field == *path && e.key.depth() <= 2))
            .collect()
    }
}

fn collect_leaves(table: &Table, prefix: &str, out: &mut Vec<String>) {
    for (k, v) in table {
        let dotted = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        match v {
            Value::Table(sub) => collect_leaves(sub, &dotted, out),
            _ => out.push(dotted),
        }
    }
}

impl Source for FileResolver {
    fn provenance(&self) -> Provenance {
        Provenance::File
    }

    fn lookup(&self, key: &ConfigKey) -> Option<SourceValue> {
        self.lookup_field(key.as_str())
    }
}
