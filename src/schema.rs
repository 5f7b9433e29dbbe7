//! The flat table of keys a configuration type exposes.
//!
//! A [`Schema`] is built once per configuration type and is read-only
//! afterwards. Each [`SchemaEntry`] carries the canonical key, the default
//! value, the declared [`Shape`] and the field's doc comment. Nested records
//! never appear as entries; only their leaves do, addressed by dotted path.

use std::collections::HashMap;
use std::fmt;

use confique::Config;
use confique::meta::{FieldKind, Meta};
use serde::Serialize;
use toml::Value;

use crate::error::SchemaError;
use crate::flatten::{self, FlattenError};
use crate::key::ConfigKey;

/// The declared type of a leaf, as far as coercion cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    String,
    Integer,
    Float,
    Boolean,
    Duration,
    List,
    /// No default to learn the type from (an `Option` left at `None`); raw
    /// text is interpreted heuristically.
    Any,
}

impl Shape {
    /// Shape implied by a default value.
    pub fn of(value: &Value) -> Shape {
        match value {
            Value::String(_) | Value::Datetime(_) => Shape::String,
            Value::Integer(_) => Shape::Integer,
            Value::Float(_) => Shape::Float,
            Value::Boolean(_) => Shape::Boolean,
            Value::Array(_) => Shape::List,
            Value::Table(_) => Shape::Any,
        }
    }

    /// Placeholder shown in flag help.
    pub fn value_name(self) -> &'static str {
        match self {
            Shape::String => "STRING",
            Shape::Integer => "INT",
            Shape::Float => "FLOAT",
            Shape::Boolean => "BOOL",
            Shape::Duration => "DURATION",
            Shape::List => "LIST",
            Shape::Any => "VALUE",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::String => "string",
            Shape::Integer => "integer",
            Shape::Float => "float",
            Shape::Boolean => "boolean",
            Shape::Duration => "duration",
            Shape::List => "list",
            Shape::Any => "any",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaEntry {
    pub key: ConfigKey,
    /// The field path as declared, before canonicalization.
    pub field: String,
    pub shape: Shape,
    /// `None` when the field has no default (an optional field).
    pub default: Option<Value>,
    pub doc: Option<String>,
}

/// Ordered, collision-free list of keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    entries: Vec<SchemaEntry>,
    index: HashMap<ConfigKey, usize>,
}

impl Schema {
    /// Bind a confique config type.
    ///
    /// Defaults come from the type's `#[config(default = ...)]` attributes and
    /// docs from its `///` comments. A field that is neither defaulted nor
    /// optional makes binding fail, since there is no value to learn its shape
    /// from.
    pub fn bind<C: Config + Serialize>() -> Result<Self, SchemaError> {
        let initial = C::builder().load()?;
        let docs = collect_docs(&C::META);
        let mut schema = Self::from_record(&initial)?;
        for entry in &mut schema.entries {
            entry.doc = docs.get(&entry.key).cloned();
        }
        Ok(schema)
    }

    /// Bind any serializable record, using its current field values as defaults.
    pub fn from_record<T: Serialize + ?Sized>(record: &T) -> Result<Self, SchemaError> {
        let leaves = flatten::flatten(record).map_err(|e| match e {
            FlattenError::NotARecord(found) => SchemaError::NotARecord {
                found: found.to_string(),
            },
            FlattenError::Custom(msg) => SchemaError::Unsupported(msg),
        })?;

        let mut schema = Schema::default();
        for leaf in leaves {
            let shape = match (&leaf.value, leaf.is_duration) {
                (_, true) => Shape::Duration,
                (Some(v), false) => Shape::of(v),
                (None, false) => Shape::Any,
            };
            schema.push(SchemaEntry {
                key: ConfigKey::new(&leaf.path),
                field: leaf.path,
                shape,
                default: leaf.value,
                doc: None,
            })?;
        }
        Ok(schema)
    }

    /// Register keys by hand.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    fn push(&mut self, entry: SchemaEntry) -> Result<(), SchemaError> {
        if let Some(&i) = self.index.get(&entry.key) {
            return Err(SchemaError::Collision {
                key: entry.key,
                first: self.entries[i].field.clone(),
                second: entry.field,
            });
        }
        self.index.insert(entry.key.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ConfigKey) -> Option<&SchemaEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, key: &ConfigKey) -> bool {
        self.index.contains_key(key)
    }

    /// Find the entry a user-typed flag name refers to, in either spelling.
    pub fn find_by_flag(&self, name: &str) -> Option<&SchemaEntry> {
        self.get(&ConfigKey::from_flag_name(name))
    }
}

/// Manual schema registration. Collisions are reported by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entries: Vec<SchemaEntry>,
}

impl SchemaBuilder {
    pub fn field(mut self, path: &str, shape: Shape, default: impl Into<Option<Value>>) -> Self {
        self.entries.push(SchemaEntry {
            key: ConfigKey::new(path),
            field: path.to_string(),
            shape,
            default: default.into(),
            doc: None,
        });
        self
    }

    /// Attach a doc comment to the most recently added field.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        if let Some(last) = self.entries.last_mut() {
            last.doc = Some(doc.into());
        }
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        let mut schema = Schema::default();
        for entry in self.entries {
            schema.push(entry)?;
        }
        Ok(schema)
    }
}

fn collect_docs(meta: &Meta) -> HashMap<ConfigKey, String> {
    let mut docs = HashMap::new();
    collect_docs_into(meta, "", &mut docs);
    docs
}

fn collect_docs_into(meta: &Meta, prefix: &str, docs: &mut HashMap<ConfigKey, String>) {
    for field in meta.fields {
        let dotted = if prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match &field.kind {
            FieldKind::Leaf { .. } => {
                let text = field
                    .doc
                    .iter()
                    .map(|line| line.trim())
                    .collect::<Vec<_>>()
                    .join("\n");
                if !text.is_empty() {
                    docs.insert(ConfigKey::new(&dotted), text);
                }
            }
            FieldKind::Nested { meta, .. } => collect_docs_into(meta, &dotted, docs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{
        CollidingConfig, KebabConfig, RequiredConfig, ServiceConfig, TestConfig,
    };
    use std::collections::BTreeMap;

    fn keys(schema: &Schema) -> Vec<&str> {
        schema.iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn bind_lists_leaves_in_field_order() {
        let schema = Schema::bind::<TestConfig>().unwrap();
        assert_eq!(
            keys(&schema),
            vec!["host", "port", "debug", "database.url", "database.pool_size"]
        );
    }

    #[test]
    fn bind_takes_defaults_and_shapes() {
        let schema = Schema::bind::<TestConfig>().unwrap();
        let port = schema.get(&ConfigKey::new("port")).unwrap();
        assert_eq!(port.shape, Shape::Integer);
        assert_eq!(port.default, Some(Value::Integer(8080)));

        let debug = schema.get(&ConfigKey::new("debug")).unwrap();
        assert_eq!(debug.shape, Shape::Boolean);
    }

    #[test]
    fn optional_field_without_default_is_any() {
        let schema = Schema::bind::<TestConfig>().unwrap();
        let url = schema.get(&ConfigKey::new("database.url")).unwrap();
        assert_eq!(url.shape, Shape::Any);
        assert_eq!(url.default, None);
    }

    #[test]
    fn bind_attaches_doc_comments() {
        let schema = Schema::bind::<TestConfig>().unwrap();
        let host = schema.get(&ConfigKey::new("host")).unwrap();
        assert_eq!(host.doc.as_deref(), Some("The application host."));
        let pool = schema.get(&ConfigKey::new("database.pool_size")).unwrap();
        assert_eq!(pool.doc.as_deref(), Some("Connection pool size."));
    }

    #[test]
    fn undocumented_field_has_no_doc() {
        let schema = Schema::bind::<ServiceConfig>().unwrap();
        let tags = schema.get(&ConfigKey::new("tags")).unwrap();
        assert_eq!(tags.doc, None);
    }

    #[test]
    fn bind_recognizes_every_shape() {
        let schema = Schema::bind::<ServiceConfig>().unwrap();
        let shape = |k: &str| schema.get(&ConfigKey::new(k)).unwrap().shape;
        assert_eq!(shape("name"), Shape::String);
        assert_eq!(shape("timeout"), Shape::Duration);
        assert_eq!(shape("tags"), Shape::List);
        assert_eq!(shape("ratio"), Shape::Float);
        assert_eq!(shape("label"), Shape::Any);
        assert_eq!(shape("server.max_connections"), Shape::Integer);
        assert_eq!(shape("server.tls.enabled"), Shape::Boolean);
    }

    #[test]
    fn duration_default_is_stored_as_text() {
        let schema = Schema::bind::<ServiceConfig>().unwrap();
        let timeout = schema.get(&ConfigKey::new("timeout")).unwrap();
        assert_eq!(timeout.default, Some(Value::String("30s".into())));
    }

    #[test]
    fn colliding_fields_fail_to_bind() {
        let err = Schema::bind::<CollidingConfig>().unwrap_err();
        match err {
            SchemaError::Collision { key, first, second } => {
                assert_eq!(key.as_str(), "port");
                assert_eq!(first, "Port");
                assert_eq!(second, "port");
            }
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn required_field_without_default_fails_to_bind() {
        let err = Schema::bind::<RequiredConfig>().unwrap_err();
        assert!(matches!(err, SchemaError::Defaults(_)));
    }

    #[test]
    fn primitive_record_is_rejected() {
        let err = Schema::from_record(&42u32).unwrap_err();
        assert!(matches!(err, SchemaError::NotARecord { .. }));
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn map_record_is_accepted() {
        let mut map = BTreeMap::new();
        map.insert("Level", "info");
        let schema = Schema::from_record(&map).unwrap();
        let entry = schema.get(&ConfigKey::new("level")).unwrap();
        assert_eq!(entry.field, "Level");
        assert_eq!(entry.shape, Shape::String);
    }

    #[test]
    fn manual_builder_registers_fields() {
        let schema = Schema::builder()
            .field("server.port", Shape::Integer, Value::Integer(80))
            .doc("Listen port.")
            .field("token", Shape::Any, None)
            .build()
            .unwrap();
        assert_eq!(keys(&schema), vec!["server.port", "token"]);
        let port = schema.get(&ConfigKey::new("server.port")).unwrap();
        assert_eq!(port.doc.as_deref(), Some("Listen port."));
        assert_eq!(schema.get(&ConfigKey::new("token")).unwrap().default, None);
    }

    #[test]
    fn manual_builder_detects_collision() {
        let err = Schema::builder()
            .field("a.b", Shape::String, None)
            .field("A.b", Shape::String, None)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::Collision { .. }));
    }

    #[test]
    fn manual_builder_detects_separator_collision() {
        let err = Schema::builder()
            .field("max_conn", Shape::Integer, Value::Integer(1))
            .field("max-conn", Shape::Integer, Value::Integer(2))
            .build()
            .unwrap_err();
        match err {
            SchemaError::Collision { key, first, second } => {
                assert_eq!(key.as_str(), "max_conn");
                assert_eq!(first, "max_conn");
                assert_eq!(second, "max-conn");
            }
            other => panic!("expected collision, got {other:?}"),
        }
    }

    #[test]
    fn kebab_fields_get_canonical_keys() {
        let schema = Schema::bind::<KebabConfig>().unwrap();
        assert_eq!(keys(&schema), vec!["max_conn", "extra_ports", "pool.idle_secs"]);
        let entry = schema.get(&ConfigKey::new("max_conn")).unwrap();
        assert_eq!(entry.field, "max-conn");
        assert_eq!(entry.doc.as_deref(), Some("Connection limit."));
        assert_eq!(schema.get(&ConfigKey::new("pool.idle_secs")).unwrap().field, "pool.idle-secs");
    }

    #[test]
    fn find_by_flag_accepts_both_spellings() {
        let schema = Schema::bind::<ServiceConfig>().unwrap();
        let expected = ConfigKey::new("server.max_connections");
        assert_eq!(
            schema.find_by_flag("server.max-connections").map(|e| &e.key),
            Some(&expected)
        );
        assert_eq!(
            schema.find_by_flag("--server.max_connections").map(|e| &e.key),
            Some(&expected)
        );
        assert!(schema.find_by_flag("nope").is_none());
    }

    #[test]
    fn schema_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Schema>();
    }
}
