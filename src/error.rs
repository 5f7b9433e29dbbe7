use std::path::PathBuf;

use thiserror::Error;

use crate::key::ConfigKey;
use crate::schema::Shape;
use crate::source::Provenance;
use crate::types::FileFormat;

/// Top-level error returned by [`FlagfigBuilder`](crate::FlagfigBuilder).
#[derive(Debug, Error)]
pub enum FlagfigError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Load(#[from] ConfigLoadError),

    #[error(transparent)]
    ValueType(#[from] ValueTypeError),

    #[error("Failed to build configuration from resolved values: {source}")]
    Unmarshal { source: toml::de::Error },

    #[error("App name is required to locate config files: call .app_name() on the builder")]
    AppNameRequired,
}

/// The configuration schema could not be bound.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Configuration schema must be a record (struct or map), got {found}")]
    NotARecord { found: String },

    #[error("Schema fields '{first}' and '{second}' both map to key '{key}'")]
    Collision {
        key: ConfigKey,
        first: String,
        second: String,
    },

    #[error("Could not compute schema defaults: {0}")]
    Defaults(#[from] confique::Error),

    #[error("Could not walk schema: {0}")]
    Unsupported(String),
}

/// A config file was expected but could not be used.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("No config file found (searched: {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path} as {format}: {source}")]
    Parse {
        path: PathBuf,
        format: FileFormat,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Top level of {path} must be a mapping")]
    NotAMapping { path: PathBuf },
}

/// A resolved raw value does not fit the shape declared for its key.
#[derive(Debug, Error)]
#[error("Invalid value '{value}' for '{key}' from {provenance}: expected {expected} ({reason})")]
pub struct ValueTypeError {
    pub key: ConfigKey,
    pub provenance: Provenance,
    pub expected: Shape,
    pub value: String,
    pub reason: String,
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<no search paths>".into();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_type_error_names_key_source_and_shape() {
        let err = ValueTypeError {
            key: ConfigKey::new("server.port"),
            provenance: Provenance::Env,
            expected: Shape::Integer,
            value: "eighty".into(),
            reason: "invalid digit found in string".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("server.port"));
        assert!(msg.contains("env"));
        assert!(msg.contains("integer"));
        assert!(msg.contains("eighty"));
    }

    #[test]
    fn collision_formats_both_fields() {
        let err = SchemaError::Collision {
            key: ConfigKey::new("a.b"),
            first: "a.b".into(),
            second: "A.b".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'a.b'"));
        assert!(msg.contains("'A.b'"));
    }

    #[test]
    fn not_found_lists_searched_paths() {
        let err = ConfigLoadError::NotFound {
            searched: vec!["./app.toml".into(), "/etc/app/config.toml".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("./app.toml"));
        assert!(msg.contains("/etc/app/config.toml"));
    }

    #[test]
    fn not_found_without_paths() {
        let err = ConfigLoadError::NotFound { searched: vec![] };
        assert!(err.to_string().contains("<no search paths>"));
    }

    #[test]
    fn app_name_required_formats() {
        let err = FlagfigError::AppNameRequired;
        assert!(err.to_string().contains("app_name"));
    }

    #[test]
    fn load_error_converts_into_top_level() {
        let err: FlagfigError = ConfigLoadError::NotAMapping {
            path: "/tmp/x.yaml".into(),
        }
        .into();
        assert!(matches!(err, FlagfigError::Load(_)));
        assert!(err.to_string().contains("/tmp/x.yaml"));
    }
}
