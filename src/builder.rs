use std::marker::PhantomData;
use std::path::PathBuf;

use confique::Config;
use serde::Serialize;
use serde::de::DeserializeOwned;
use toml::Value;
use tracing::debug;

use crate::env::EnvResolver;
use crate::error::{FlagfigError, SchemaError};
use crate::file;
use crate::flags::FlagResolver;
use crate::flatten::{self, FlattenError};
use crate::resolve::{self, Resolved, Sources};
use crate::schema::Schema;
use crate::types::{FileFormat, ResolutionPolicy, SearchPath};

/// Entry point for building a flagfig configuration.
pub struct Flagfig;

impl Flagfig {
    pub fn builder<C>() -> FlagfigBuilder<C> {
        FlagfigBuilder::new()
    }
}

/// Builder for one resolution run.
///
/// Everything is optional except an app name, which is needed as soon as a
/// search path or the default environment prefix refers to it:
///
/// - `file_name` → the app name
/// - `search_paths` → `[SearchPath::Cwd, SearchPath::Etc]`
/// - `env_prefix` → upper-snake app name plus `_` (`my-app` → `MY_APP_`)
/// - `strict` → `false`
pub struct FlagfigBuilder<C> {
    app_name: Option<String>,
    file_name: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    formats: Vec<FileFormat>,
    env_prefix: Option<String>,
    env_enabled: bool,
    env_vars: Option<Vec<(String, String)>>,
    strict: bool,
    config_file: Option<PathBuf>,
    flags: FlagResolver,
    flag_error: Option<SchemaError>,
    schema: Option<Schema>,
    _phantom: PhantomData<C>,
}

impl<C> FlagfigBuilder<C> {
    fn new() -> Self {
        Self {
            app_name: None,
            file_name: None,
            search_paths: None,
            formats: FileFormat::ALL.to_vec(),
            env_prefix: None,
            env_enabled: true,
            env_vars: None,
            strict: false,
            config_file: None,
            flags: FlagResolver::new(),
            flag_error: None,
            schema: None,
            _phantom: PhantomData,
        }
    }

    /// Set the application name. It names `/etc/<app>/`, the platform config
    /// directory, the default file name and the default env prefix.
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Override the config file name, without extension (default: the app name).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Replace the default search paths entirely. The first existing file wins.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path after the defaults (or after those already set).
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(default_search_paths)
            .push(path);
        self
    }

    /// Restrict which file formats are searched for, in order of preference.
    pub fn formats(mut self, formats: impl IntoIterator<Item = FileFormat>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    /// Override the environment variable prefix. It is used verbatim, so
    /// `"APP_"` reads `APP_PORT` and `""` reads `PORT`.
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Read these variables instead of the process environment.
    pub fn env_from<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Enable or disable strict mode (default: `false`). In strict mode a
    /// config file that is missing, unreadable or malformed is an error
    /// instead of being skipped.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Load exactly this file instead of searching.
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Record one explicitly set flag. Either spelling of the name works.
    pub fn flag(mut self, name: &str, value: impl Into<String>) -> Self {
        self.flags.set(name, value);
        self
    }

    /// Record flags already collected by a parser. Values given here replace
    /// earlier ones for the same key.
    pub fn flags(mut self, flags: FlagResolver) -> Self {
        self.flags.extend(flags);
        self
    }

    /// Record flags from any serializable source, such as a clap-derived
    /// struct.
    ///
    /// Only `Option` fields holding `Some` count as set: a plain `bool` or
    /// `u16` always carries a value, so nothing tells an explicit `false` from
    /// an untouched one, and such fields are ignored. Fields that match no
    /// config key are never read.
    pub fn flags_from<S: Serialize>(mut self, source: &S) -> Self {
        match flatten::flatten(source) {
            Ok(leaves) => {
                for leaf in leaves.into_iter().filter(|leaf| leaf.is_optional) {
                    if let Some(value) = leaf.value {
                        self.flags.set(&leaf.path, flag_text(&value));
                    }
                }
            }
            Err(FlattenError::NotARecord(found)) => {
                self.flag_error = Some(SchemaError::NotARecord {
                    found: found.to_string(),
                });
            }
            Err(FlattenError::Custom(msg)) => {
                self.flag_error = Some(SchemaError::Unsupported(msg));
            }
        }
        self
    }

    /// Reuse an already bound schema instead of binding `C` again.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    fn effective_app_name(&self) -> Result<&str, FlagfigError> {
        self.app_name
            .as_deref()
            .ok_or(FlagfigError::AppNameRequired)
    }

    fn effective_file_stem(&self) -> Result<&str, FlagfigError> {
        match &self.file_name {
            Some(name) => Ok(name.as_str()),
            None => self.effective_app_name(),
        }
    }

    fn effective_search_paths(&self) -> Vec<SearchPath> {
        self.search_paths
            .clone()
            .unwrap_or_else(default_search_paths)
    }

    fn effective_env_prefix(&self) -> Result<String, FlagfigError> {
        if !self.env_enabled {
            return Ok(String::new());
        }
        if let Some(prefix) = &self.env_prefix {
            return Ok(prefix.clone());
        }
        let app = self.effective_app_name()?;
        Ok(format!(
            "{}_",
            app.replace(['-', '.', ' '], "_").to_uppercase()
        ))
    }

    /// Concrete candidate files. Empty when an explicit file is set.
    fn candidate_files(&self) -> Result<Vec<PathBuf>, FlagfigError> {
        if self.config_file.is_some() {
            return Ok(vec![]);
        }
        let mut files = Vec::new();
        for sp in &self.effective_search_paths() {
            let (app, stem) = match sp {
                SearchPath::File(_) => ("", ""),
                SearchPath::Etc | SearchPath::Platform => (self.effective_app_name()?, ""),
                SearchPath::Cwd | SearchPath::EtcFlat | SearchPath::Dir(_) => {
                    ("", self.effective_file_stem()?)
                }
            };
            files.extend(file::expand_search_path(sp, app, stem, &self.formats));
        }
        Ok(files)
    }

    /// The fixed inputs of a run, as currently configured.
    pub fn policy(&self) -> Result<ResolutionPolicy, FlagfigError> {
        Ok(ResolutionPolicy {
            strict: self.strict,
            env_prefix: self.effective_env_prefix()?,
            use_env: self.env_enabled,
            config_file: self.config_file.clone(),
            search_paths: self.candidate_files()?,
        })
    }

    fn env_resolver(&self, policy: &ResolutionPolicy) -> EnvResolver {
        if !policy.use_env {
            return EnvResolver::empty();
        }
        match &self.env_vars {
            Some(vars) => EnvResolver::from_vars(&policy.env_prefix, vars.iter().cloned()),
            None => EnvResolver::from_env(&policy.env_prefix),
        }
    }
}

impl<C: Config + Serialize + DeserializeOwned> FlagfigBuilder<C> {
    fn bound_schema(&self) -> Result<Schema, FlagfigError> {
        match &self.schema {
            Some(schema) => Ok(schema.clone()),
            None => Ok(Schema::bind::<C>()?),
        }
    }

    /// Resolve every layer and keep per-key provenance.
    pub fn resolve(mut self) -> Result<Resolved<C>, FlagfigError> {
        if let Some(err) = self.flag_error.take() {
            return Err(err.into());
        }
        let schema = self.bound_schema()?;
        let policy = self.policy()?;
        let file = resolve::open_file(&policy)?;
        let env = self.env_resolver(&policy);
        if !policy.env_prefix.is_empty() {
            for name in env.unmatched(&schema) {
                debug!(var = %name, "environment variable matches no config key");
            }
        }
        let sources = Sources::new(self.flags, env, file);
        resolve::resolve(&schema, &sources)
    }

    /// Resolve every layer and return the config.
    pub fn load(self) -> Result<C, FlagfigError> {
        self.resolve().map(Resolved::into_inner)
    }
}

fn default_search_paths() -> Vec<SearchPath> {
    vec![SearchPath::Cwd, SearchPath::Etc]
}

/// Render a serialized field the way a user would have typed it.
fn flag_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(flag_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}
