//! One typed configuration from flags, environment variables and a config
//! file. Define a struct, name your app, and go.
//!
//! ```ignore
//! let config: AppConfig = Flagfig::builder()
//!     .app_name("myapp")
//!     .load()?;
//! ```
//!
//! That single call looks for `./myapp.{toml,yaml,yml,json}` and then
//! `/etc/myapp/config.{toml,yaml,yml,json}`, reads `MYAPP_*` environment
//! variables, fills in `#[config(default)]` values, and hands you a typed
//! struct.
//!
//! # Struct as schema
//!
//! Your config struct derives confique's `Config` (for defaults and docs) and
//! serde's `Serialize`/`Deserialize`. Binding it produces a [`Schema`]: a flat,
//! ordered list of keys, each with a default, a [`Shape`] and a doc comment.
//!
//! - **`#[config(default = ...)]`** gives the default and, through its type,
//!   the key's shape.
//! - **`#[config(nested)]`** models hierarchy. A nested field becomes a dotted
//!   key such as `database.url`.
//! - **`Option<T>` fields** without a default stay unset unless some source
//!   provides a value.
//! - **[`Duration`]** fields read and write `"1h30m"`-style strings.
//!
//! Two fields that normalize to the same key are rejected at bind time.
//!
//! # Precedence
//!
//! ```text
//! Compiled defaults     #[config(default = ...)]
//!        ↑ overridden by
//! Config file           first file found on the search path
//!        ↑ overridden by
//! Environment vars      MYAPP_DATABASE_URL
//!        ↑ overridden by
//! Flags                 --database.url
//! ```
//!
//! The order is fixed. For every key the first source that has a value wins;
//! a flag counts only if the user typed it, and an empty environment variable
//! counts as unset.
//!
//! # Key spellings
//!
//! | Source | `server.max_connections` is spelled |
//! |--------|-------------------------------------|
//! | Flag | `--server.max-connections` (or `--server.max_connections`) |
//! | Environment | `MYAPP_SERVER_MAX_CONNECTIONS` |
//! | File | `max_connections` inside table `server` |
//!
//! Files only resolve **one level of nesting**. `a.b` is table `a`, key `b`;
//! a key three segments deep (`a.b.c`) can be set by flag, environment or
//! default, but never from a file.
//!
//! # Strict and lenient files
//!
//! By default an unreadable or malformed config file is logged at warn level
//! and skipped, and finding no file at all is not worth a warning. With [`.strict(true)`](FlagfigBuilder::strict) any
//! such failure is returned as a [`ConfigLoadError`] and no config is built.
//!
//! # Value coercion
//!
//! Flags and environment variables are text; they are parsed according to
//! the key's shape (booleans accept `true/false/1/0/t/f/yes/no`, lists are
//! comma-separated, durations accept `"90s"` or whole seconds). File values
//! are converted leniently: a whole float fits an integer key, a scalar fits
//! a list key. A value that cannot be converted is a [`ValueTypeError`] naming
//! the key, the source, the expected shape and the raw text.
//!
//! # Clap adapter
//!
//! The `cli` module (behind the `clap` feature, on by default) registers one
//! flag per key plus `--config <PATH>` on your `clap::Command` and reads back
//! only what the user set. Without clap, pass `(name, value)` pairs with
//! [`flag()`](FlagfigBuilder::flag) or a serializable struct with
//! [`flags_from()`](FlagfigBuilder::flags_from):
//!
//! ```toml
//! flagfig = { version = "...", default-features = false }
//! ```
//!
//! # Logging
//!
//! The library emits `tracing` events and never installs a subscriber:
//! `debug` for the chosen file (or for finding none), each key's winning
//! source and ignored file keys, `info` when a file contributes values, `warn`
//! when a lenient run skips a file it could not use.
//!
//! # Errors
//!
//! All fallible operations return [`FlagfigError`]. The library never prints
//! or exits; see the [`error`] module for the full set.

pub mod error;
pub mod types;

mod builder;
#[cfg(feature = "clap")]
pub mod cli;
mod coerce;
mod duration;
mod env;
mod file;
mod flags;
mod flatten;
mod key;
mod resolve;
mod schema;
mod source;

#[cfg(test)]
mod fixtures;

pub use builder::{Flagfig, FlagfigBuilder};
#[cfg(feature = "clap")]
pub use cli::{ConfigFileArgs, augment_command};
pub use duration::{Duration, DurationError, format_duration, parse_duration};
pub use env::EnvResolver;
pub use error::{ConfigLoadError, FlagfigError, SchemaError, ValueTypeError};
pub use file::FileResolver;
pub use flags::FlagResolver;
pub use key::{ConfigKey, normalize_flag_name};
pub use resolve::{Resolved, ResolvedEntry, Sources, open_file, resolve, resolve_entries};
pub use schema::{Schema, SchemaBuilder, SchemaEntry, Shape};
pub use source::{Provenance, RawValue, Source, SourceValue};
pub use types::{FileFormat, ResolutionPolicy, SearchPath};
