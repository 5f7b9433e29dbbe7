//! Clap adapter for flagfig.
//!
//! This module is the optional integration layer between the parser-agnostic
//! core and [clap](https://docs.rs/clap). It is compiled only when the `clap`
//! Cargo feature is enabled (on by default).
//!
//! [`augment_command`] registers one `--<key>` argument per schema key on a
//! caller-supplied `Command`, plus `--config <PATH>`. After parsing,
//! [`FlagResolver::from_matches`] keeps only the values the user actually
//! typed, and [`ConfigFileArgs`] reads back the config path. The builder's
//! [`cli_matches()`](crate::FlagfigBuilder::cli_matches) does both.
//!
//! ```ignore
//! let schema = Schema::bind::<AppConfig>()?;
//! let matches = flagfig::cli::augment_command(Command::new("app"), &schema).get_matches();
//! let config: AppConfig = Flagfig::builder()
//!     .app_name("app")
//!     .schema(schema)
//!     .cli_matches(&matches)
//!     .load()?;
//! ```

use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{ArgAction, ArgMatches, Args, Command};
use tracing::warn;

use crate::flags::FlagResolver;
use crate::schema::{Schema, Shape};

/// Arg id of the config file flag.
pub const CONFIG_ARG: &str = "config";

/// The `--config <PATH>` flag. Embed it in a clap derive with
/// `#[command(flatten)]`, or let [`augment_command`] add it.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct ConfigFileArgs {
    /// Load configuration from this file instead of searching for one.
    #[arg(long = "config", id = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Register `--config` and one flag per schema key on `cmd`.
///
/// Each flag's id is the canonical key, its long name is the flag form
/// (`--server.max-connections`) and, when it differs, the underscore spelling
/// is accepted as an alias. Boolean keys also accept a bare `--flag`. Keys
/// whose id or long name is already taken on `cmd` are skipped with a warning.
pub fn augment_command(cmd: Command, schema: &Schema) -> Command {
    let mut cmd = if has_arg(&cmd, CONFIG_ARG, CONFIG_ARG) {
        cmd
    } else {
        ConfigFileArgs::augment_args(cmd)
    };

    for entry in schema.iter() {
        let id = entry.key.as_str().to_string();
        let long = entry.key.flag_name();
        if has_arg(&cmd, &id, &long) {
            warn!(key = %entry.key, "flag already defined on command, not registering it");
            continue;
        }

        let mut arg = clap::Arg::new(id.clone())
            .long(long.clone())
            .value_name(entry.shape.value_name())
            .action(ArgAction::Set)
            .required(false);
        if long != id {
            arg = arg.alias(id);
        }
        if let Some(doc) = &entry.doc {
            arg = arg.help(doc.clone());
        }
        if entry.shape == Shape::Boolean {
            arg = arg.num_args(0..=1).default_missing_value("true");
        }
        cmd = cmd.arg(arg);
    }
    cmd
}

fn has_arg(cmd: &Command, id: &str, long: &str) -> bool {
    cmd.get_arguments()
        .any(|a| a.get_id().as_str() == id || a.get_long() == Some(long))
}

impl ConfigFileArgs {
    /// Read `--config` back from parsed matches.
    pub fn from_matches(matches: &ArgMatches) -> Self {
        match matches.try_get_one::<PathBuf>(CONFIG_ARG) {
            Ok(Some(path)) => ConfigFileArgs {
                config: Some(path.clone()),
            },
            _ => ConfigFileArgs::default(),
        }
    }
}

impl FlagResolver {
    /// Collect the string-valued args the user explicitly set on the command
    /// line. Values clap filled in from defaults or the environment are
    /// ignored, as is `--config`.
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let mut resolver = FlagResolver::new();
        for id in matches.ids() {
            let name = id.as_str();
            if name == CONFIG_ARG || matches.value_source(name) != Some(ValueSource::CommandLine) {
                continue;
            }
            if let Ok(Some(value)) = matches.try_get_one::<String>(name) {
                resolver.set(name, value.clone());
            }
        }
        resolver
    }
}

impl<C> crate::FlagfigBuilder<C> {
    /// Take explicitly set flags and `--config` from parsed matches.
    pub fn cli_matches(self, matches: &ArgMatches) -> Self {
        let builder = self.flags(FlagResolver::from_matches(matches));
        match ConfigFileArgs::from_matches(matches).config {
            Some(path) => builder.config_file(path),
            None => builder,
        }
    }
}
