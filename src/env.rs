use std::collections::HashMap;

use crate::key::ConfigKey;
use crate::schema::Schema;
use crate::source::{Provenance, Source, SourceValue};

/// Environment variables, snapshotted when the resolver is built.
///
/// `server.port` with prefix `APP_` is read from `APP_SERVER_PORT`. A variable
/// that is set but empty counts as unset, so `APP_PORT=` falls through to the
/// next layer instead of yielding an empty string.
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
    prefix: String,
    vars: HashMap<String, String>,
}

impl EnvResolver {
    /// Snapshot the process environment. Variables that are not valid UTF-8
    /// (name or value) are skipped.
    pub fn from_env(prefix: &str) -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::from_vars(prefix, vars)
    }

    /// Build from synthetic pairs instead of `std::env::vars()`.
    pub fn from_vars<K, V>(prefix: &str, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _): &(String, String)| k.starts_with(prefix))
            .collect();
        Self {
            prefix: prefix.to_string(),
            vars,
        }
    }

    /// A resolver that never has a value.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefixed, non-empty variables that no schema key reads.
    ///
    /// Useful only as a hint: with an empty prefix every unrelated variable
    /// in the environment is reported.
    pub fn unmatched(&self, schema: &Schema) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .vars
            .iter()
            .filter(|(name, value)| {
                !value.is_empty()
                    && !schema
                        .iter()
                        .any(|e| &e.key.env_name(&self.prefix) == *name)
            })
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl Source for EnvResolver {
    fn provenance(&self) -> Provenance {
        Provenance::Env
    }

    fn lookup(&self, key: &ConfigKey) -> Option<SourceValue> {
        let value = self.vars.get(&key.env_name(&self.prefix))?;
        if value.is_empty() {
            return None;
        }
        Some(SourceValue::text(value.clone(), Provenance::Env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawValue;

    fn resolver(pairs: &[(&str, &str)]) -> EnvResolver {
        EnvResolver::from_vars("APP_", pairs.iter().copied())
    }

    fn text(r: &EnvResolver, key: &str) -> Option<String> {
        r.lookup(&ConfigKey::new(key)).map(|v| match v.raw {
            RawValue::Text(s) => s,
            RawValue::Typed(v) => v.to_string(),
        })
    }

    #[test]
    fn reads_prefixed_upper_snake_name() {
        let r = resolver(&[("APP_PORT", "9000"), ("APP_DATABASE_URL", "pg://")]);
        assert_eq!(text(&r, "port").as_deref(), Some("9000"));
        assert_eq!(text(&r, "database.url").as_deref(), Some("pg://"));
    }

    #[test]
    fn underscores_inside_segments_stay() {
        let r = resolver(&[("APP_SERVER_MAX_CONNECTIONS", "64")]);
        assert_eq!(text(&r, "server.max_connections").as_deref(), Some("64"));
    }

    #[test]
    fn empty_value_is_unset() {
        let r = resolver(&[("APP_PORT", "")]);
        assert_eq!(r.lookup(&ConfigKey::new("port")), None);
    }

    #[test]
    fn other_prefixes_are_ignored() {
        let r = resolver(&[("OTHER_PORT", "1"), ("PORT", "2")]);
        assert_eq!(r.lookup(&ConfigKey::new("port")), None);
    }

    #[test]
    fn empty_prefix_reads_bare_names() {
        let r = EnvResolver::from_vars("", [("PORT", "7")]);
        assert_eq!(text(&r, "port").as_deref(), Some("7"));
    }

    #[test]
    fn provenance_is_env() {
        let r = resolver(&[("APP_PORT", "1")]);
        assert_eq!(r.provenance(), Provenance::Env);
        assert_eq!(
            r.lookup(&ConfigKey::new("port")).unwrap().provenance,
            Provenance::Env
        );
    }

    #[test]
    fn empty_resolver_has_nothing() {
        assert_eq!(EnvResolver::empty().lookup(&ConfigKey::new("port")), None);
    }

    #[test]
    fn unmatched_lists_unknown_prefixed_vars() {
        let schema = Schema::builder()
            .field("port", crate::Shape::Integer, toml::Value::Integer(1))
            .build()
            .unwrap();
        let r = resolver(&[("APP_PORT", "1"), ("APP_PROT", "2"), ("APP_EMPTY", "")]);
        assert_eq!(r.unmatched(&schema), vec!["APP_PROT"]);
    }
}
