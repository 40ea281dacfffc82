//! Agent configuration.
//!
//! An agent's configuration is a YAML file, by default `minion.yaml` in [config_dir]:
//!
//! ```yaml
//! id: web01.example.com
//! log_level: info
//! grains:
//!   os: Debian
//!   roles: [web, cache]
//!   ipv4: [10.0.0.5]
//! pillar:
//!   datacenter: ams1
//! nodegroups:
//!   web: G@roles:web and not L@web13.example.com
//!   db: [db01.example.com, db02.example.com]
//! ```
//!
//! Every field is optional except `id`. `pillar_exact: true` makes `I@` and `J@` compare pillar
//! values for plain equality instead of as globs and regexes.

use crate::context::MatchContext;
use crate::engine::EngineRegistry;
use crate::target::NodegroupTable;
use anyhow::Context;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Returns a [PathBuf] to the directory where herd's configuration should live.
///
/// When compiled for testing, this returns `CARGO_MANIFEST_DIR` plus `resources/etc/herd`.
/// Otherwise, it returns `/etc/herd`.
pub fn config_dir() -> PathBuf {
    // Omit the leading slash so that PathBuf::push appends instead of replacing.
    const CONFIG_DIR: &str = "etc/herd";

    let mut path = PathBuf::new();

    #[cfg(test)]
    {
        path.push(env!("CARGO_MANIFEST_DIR"));
        path.push("resources");
    }
    #[cfg(not(test))]
    path.push("/");

    path.push(CONFIG_DIR);
    path
}

/// The configuration file used when none is named explicitly.
pub fn default_config_path() -> PathBuf {
    config_dir().join("minion.yaml")
}

/// The contents of an agent configuration file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The agent's identity.
    pub id: String,

    #[serde(default = "empty_mapping")]
    pub grains: Value,

    #[serde(default = "empty_mapping")]
    pub pillar: Value,

    #[serde(default)]
    pub nodegroups: NodegroupTable,

    /// A `tracing` filter directive, e.g. `debug` or `herd=debug`.
    #[serde(default)]
    pub log_level: Option<String>,

    /// Whether pillar clauses use [EngineRegistry::with_exact_pillar].
    #[serde(default)]
    pub pillar_exact: bool,
}

fn empty_mapping() -> Value {
    Value::Mapping(Mapping::new())
}

impl Config {
    /// Reads a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open config file {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses configuration from any YAML source.
    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_reader(reader)?;
        if config.id.trim().is_empty() {
            anyhow::bail!("id must not be empty");
        }
        Ok(config)
    }

    /// Builds the [MatchContext] that describes this agent.
    pub fn context(&self) -> MatchContext {
        MatchContext::new(self.id.clone())
            .with_grains(self.grains.clone())
            .with_pillar(self.pillar.clone())
    }

    /// The standard engines, adjusted by this configuration.
    pub fn engines(&self) -> EngineRegistry {
        let engines = EngineRegistry::standard();
        if self.pillar_exact {
            engines.with_exact_pillar()
        } else {
            engines
        }
    }
}
