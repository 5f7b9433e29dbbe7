//! Canonical configuration keys and their per-source spellings.
//!
//! Every leaf of a schema is addressed by one [`ConfigKey`]: a dot-separated,
//! lower-case path such as `server.max_connections`, where `-` and `_` inside
//! a segment are the same separator (stored as `_`). Each source spells that
//! key its own way, and the spellings are always derived from the key, never
//! stored next to it:
//!
//! | Source | Form | Example |
//! |--------|------|---------|
//! | Flag | dotted, `_` shown as `-` | `--server.max-connections` |
//! | Environment | prefix + upper snake case | `APP_SERVER_MAX_CONNECTIONS` |
//! | File | the field's serde name, nested | `[server]` / `max_connections` |
//!
//! File lookups only understand **one level of nesting**: `a.b` reads table
//! `a` and then key `b` inside it, while `a.b.c` is never found in a file.
//! Flags and environment variables reach keys of any depth.

use std::fmt;

/// A canonical, dot-delimited path to one leaf field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey(String);

impl ConfigKey {
    /// Canonicalize a dotted path. Each segment is lower-cased and its dashes
    /// become underscores, so `Server.Max-Conn` becomes `server.max_conn`.
    pub fn new(path: &str) -> Self {
        let canonical = path
            .split('.')
            .map(|segment| segment.to_lowercase().replace('-', "_"))
            .collect::<Vec<_>>()
            .join(".");
        ConfigKey(canonical)
    }

    /// Recover a key from a user-typed flag name.
    ///
    /// Leading dashes are dropped and the name is lower-cased with `-` turned
    /// back into `_`, so `--Server.Max-Connections` and
    /// `server.max_connections` name the same key.
    pub fn from_flag_name(raw: &str) -> Self {
        ConfigKey::new(raw.trim_start_matches('-'))
    }

    /// Recover a key from an environment variable name.
    ///
    /// Returns `None` when `raw` does not start with `prefix`. The mapping is
    /// lossy: `_` inside a segment cannot be told apart from the nesting
    /// separator, so only underscore-free keys survive a round trip. Lookups
    /// never depend on this direction; they derive [`env_name`](Self::env_name)
    /// from the key instead.
    pub fn from_env_name(prefix: &str, raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(prefix)?;
        if rest.is_empty() {
            return None;
        }
        Some(ConfigKey(rest.to_lowercase().replace('_', ".")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Number of segments: `port` is 1, `server.port` is 2.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Long flag name, without the leading `--`.
    pub fn flag_name(&self) -> String {
        normalize_flag_name(&self.0)
    }

    /// Environment variable name. The prefix is used verbatim, so include a
    /// trailing `_` in it if you want one.
    pub fn env_name(&self, prefix: &str) -> String {
        let body = self.0.replace('.', "_").to_uppercase();
        format!("{prefix}{body}")
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConfigKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Display form of a flag name: underscores become dashes.
pub fn normalize_flag_name(name: &str) -> String {
    name.replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lowercases_segments() {
        assert_eq!(ConfigKey::new("Server.Port").as_str(), "server.port");
    }

    #[test]
    fn new_keeps_underscores() {
        assert_eq!(
            ConfigKey::new("server.max_connections").as_str(),
            "server.max_connections"
        );
    }

    #[test]
    fn new_treats_dash_and_underscore_alike() {
        assert_eq!(ConfigKey::new("max-conn"), ConfigKey::new("max_conn"));
        assert_eq!(ConfigKey::new("Server.Max-Conn").as_str(), "server.max_conn");
    }

    #[test]
    fn kebab_key_meets_its_flag() {
        let key = ConfigKey::new("pool.max-conn");
        assert_eq!(key.flag_name(), "pool.max-conn");
        assert_eq!(ConfigKey::from_flag_name("--pool.max-conn"), key);
        assert_eq!(key.env_name("APP_"), "APP_POOL_MAX_CONN");
    }

    #[test]
    fn flag_name_uses_dashes_inside_segments() {
        let key = ConfigKey::new("server.max_connections");
        assert_eq!(key.flag_name(), "server.max-connections");
    }

    #[test]
    fn flag_name_top_level() {
        assert_eq!(ConfigKey::new("log_level").flag_name(), "log-level");
    }

    #[test]
    fn from_flag_name_accepts_either_separator() {
        let expected = ConfigKey::new("server.max_connections");
        assert_eq!(ConfigKey::from_flag_name("server.max-connections"), expected);
        assert_eq!(ConfigKey::from_flag_name("server.max_connections"), expected);
        assert_eq!(ConfigKey::from_flag_name("--Server.Max-Connections"), expected);
    }

    #[test]
    fn flag_form_round_trips() {
        for raw in ["port", "server.port", "server.max_connections", "a.b.c_d"] {
            let key = ConfigKey::new(raw);
            assert_eq!(ConfigKey::from_flag_name(&key.flag_name()), key);
        }
    }

    #[test]
    fn env_name_prefix_is_verbatim() {
        let key = ConfigKey::new("server.port");
        assert_eq!(key.env_name("APP_"), "APP_SERVER_PORT");
        assert_eq!(key.env_name("APP"), "APPSERVER_PORT");
        assert_eq!(key.env_name(""), "SERVER_PORT");
    }

    #[test]
    fn env_name_keeps_inner_underscores() {
        let key = ConfigKey::new("server.max_connections");
        assert_eq!(key.env_name("APP_"), "APP_SERVER_MAX_CONNECTIONS");
    }

    #[test]
    fn env_form_round_trips() {
        for raw in ["port", "server.port", "database.url", "a.b.c"] {
            let key = ConfigKey::new(raw);
            let env = key.env_name("MYAPP_");
            assert_eq!(ConfigKey::from_env_name("MYAPP_", &env), Some(key));
        }
    }

    #[test]
    fn from_env_name_requires_prefix() {
        assert_eq!(ConfigKey::from_env_name("MYAPP_", "OTHER_PORT"), None);
        assert_eq!(ConfigKey::from_env_name("MYAPP_", "MYAPP_"), None);
    }

    #[test]
    fn depth_counts_segments() {
        assert_eq!(ConfigKey::new("port").depth(), 1);
        assert_eq!(ConfigKey::new("server.port").depth(), 2);
        assert_eq!(ConfigKey::new("a.b.c").depth(), 3);
    }

    #[test]
    fn normalize_flag_name_is_pure() {
        assert_eq!(normalize_flag_name("max_conn_count"), "max-conn-count");
        assert_eq!(normalize_flag_name("already-dashed"), "already-dashed");
    }
}
