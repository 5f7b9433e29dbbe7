use std::collections::HashMap;

use crate::key::ConfigKey;
use crate::source::{Provenance, Source, SourceValue};

/// Values the user explicitly passed on the command line.
///
/// Only flags that were actually given belong here; a flag's default lives in
/// the schema, never in this resolver. Names are normalized on the way in, so
/// `--Server.Max_Connections` and `--server.max-connections` address the same
/// key. When a key is given twice, the later value wins.
#[derive(Debug, Clone, Default)]
pub struct FlagResolver {
    values: HashMap<ConfigKey, String>,
}

impl FlagResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(flag name, raw value)` pairs handed over by any parser.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: AsRef<str>,
        V: Into<String>,
    {
        let mut resolver = Self::new();
        for (name, value) in pairs {
            resolver.set(name.as_ref(), value);
        }
        resolver
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.values
            .insert(ConfigKey::from_flag_name(name), value.into());
    }

    /// Copy every value of `other` over this one.
    pub fn extend(&mut self, other: FlagResolver) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys that were set, sorted.
    pub fn keys(&self) -> Vec<&ConfigKey> {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        keys
    }
}

impl Source for FlagResolver {
    fn provenance(&self) -> Provenance {
        Provenance::Flag
    }

    fn lookup(&self, key: &ConfigKey) -> Option<SourceValue> {
        self.values
            .get(key)
            .map(|v| SourceValue::text(v.clone(), Provenance::Flag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_explicit_value() {
        let r = FlagResolver::from_pairs([("port", "9000")]);
        let v = r.lookup(&ConfigKey::new("port")).unwrap();
        assert_eq!(v, SourceValue::text("9000", Provenance::Flag));
    }

    #[test]
    fn unset_flag_is_absent() {
        let r = FlagResolver::from_pairs([("port", "9000")]);
        assert_eq!(r.lookup(&ConfigKey::new("host")), None);
    }

    #[test]
    fn names_are_normalized() {
        let r = FlagResolver::from_pairs([("--Server.Max_Connections", "8")]);
        assert!(r.lookup(&ConfigKey::new("server.max_connections")).is_some());

        let r = FlagResolver::from_pairs([("server.max-connections", "8")]);
        assert!(r.lookup(&ConfigKey::new("server.max_connections")).is_some());
    }

    #[test]
    fn later_pair_wins() {
        let r = FlagResolver::from_pairs([("--log-level", "info"), ("log_level", "debug")]);
        assert_eq!(r.len(), 1);
        assert_eq!(
            r.lookup(&ConfigKey::new("log_level")),
            Some(SourceValue::text("debug", Provenance::Flag))
        );
    }

    #[test]
    fn extend_overwrites() {
        let mut a = FlagResolver::from_pairs([("port", "1"), ("host", "h")]);
        a.extend(FlagResolver::from_pairs([("port", "2")]));
        assert_eq!(
            a.lookup(&ConfigKey::new("port")),
            Some(SourceValue::text("2", Provenance::Flag))
        );
        let keys: Vec<&str> = a.keys().into_iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["host", "port"]);
    }

    #[test]
    fn empty_resolver() {
        let r = FlagResolver::new();
        assert!(r.is_empty());
        assert_eq!(r.lookup(&ConfigKey::new("port")), None);
    }
}
