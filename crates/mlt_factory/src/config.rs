//! Factory configuration
//!
//! The factory reads its overrides through a [`VarSource`] rather than from
//! `std::env` directly, so hosts can layer a config file under the process
//! environment and tests can supply variables without touching global state.
//!
//! Sources, highest precedence first when layered with [`Layered`]:
//! 1. Process environment ([`ProcessEnv`])
//! 2. Config file ([`FactoryConfig`], TOML)
//! 3. Built-in defaults (applied by the environment store)

use crate::error::Result;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Module directory override
pub const MLT_REPOSITORY: &str = "MLT_REPOSITORY";
/// Normalisation (`PAL` / `NTSC`)
pub const MLT_NORMALISATION: &str = "MLT_NORMALISATION";
/// Default producer service
pub const MLT_PRODUCER: &str = "MLT_PRODUCER";
/// Default consumer service
pub const MLT_CONSUMER: &str = "MLT_CONSUMER";
/// Optional test card resource
pub const MLT_TEST_CARD: &str = "MLT_TEST_CARD";
/// Default profile name
pub const MLT_PROFILE: &str = "MLT_PROFILE";
/// Shared data directory
pub const MLT_DATA: &str = "MLT_DATA";

/// Module directory used when neither an argument nor `MLT_REPOSITORY` is given
pub const DEFAULT_DIRECTORY: &str = match option_env!("MLT_LIBDIR") {
    Some(dir) => dir,
    None => "/usr/local/lib/mlt",
};

/// Data directory used when `MLT_DATA` is not given
pub const DEFAULT_DATA_DIRECTORY: &str = match option_env!("MLT_DATADIR") {
    Some(dir) => dir,
    None => "/usr/local/share/mlt",
};

/// Default normalisation
pub const DEFAULT_NORMALISATION: &str = "PAL";
/// Default producer service
pub const DEFAULT_PRODUCER: &str = "fezzik";
/// Default consumer service
pub const DEFAULT_CONSUMER: &str = "sdl";
/// Default profile name
pub const DEFAULT_PROFILE: &str = "dv_pal";

/// Where the factory reads its overrides from
pub trait VarSource: Send + Sync {
    /// Look up a variable; `None` if it is not set
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// An in-memory variable set that can change after the factory is built
#[derive(Debug, Default)]
pub struct MapVars {
    vars: RwLock<HashMap<String, String>>,
}

impl MapVars {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style set
    pub fn with(self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    /// Set a variable
    pub fn set(&self, name: &str, value: &str) {
        self.vars.write().insert(name.to_string(), value.to_string());
    }

    /// Unset a variable
    pub fn remove(&self, name: &str) {
        self.vars.write().remove(name);
    }
}

impl VarSource for MapVars {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.read().get(name).cloned()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let vars = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self {
            vars: RwLock::new(vars),
        }
    }
}

/// Two sources; `primary` wins where both define a variable
#[derive(Debug, Clone)]
pub struct Layered<A, B> {
    pub primary: A,
    pub fallback: B,
}

impl<A, B> Layered<A, B> {
    /// Layer `primary` over `fallback`
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

impl<A: VarSource, B: VarSource> VarSource for Layered<A, B> {
    fn var(&self, name: &str) -> Option<String> {
        self.primary.var(name).or_else(|| self.fallback.var(name))
    }
}

/// File-based factory configuration
///
/// ```toml
/// repository = "/opt/mlt/modules"
/// producer = "colour"
/// consumer = "null"
/// profile = "dv_ntsc"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Module directory
    pub repository: Option<PathBuf>,
    /// Normalisation
    pub normalisation: Option<String>,
    /// Default producer service
    pub producer: Option<String>,
    /// Default consumer service
    pub consumer: Option<String>,
    /// Test card resource
    pub test_card: Option<String>,
    /// Default profile name
    pub profile: Option<String>,
    /// Data directory
    pub data: Option<PathBuf>,
}

impl FactoryConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        log::info!("Loaded factory config from {}", path.as_ref().display());
        Ok(config)
    }
}

impl VarSource for FactoryConfig {
    fn var(&self, name: &str) -> Option<String> {
        let path = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());
        match name {
            MLT_REPOSITORY => path(&self.repository),
            MLT_NORMALISATION => self.normalisation.clone(),
            MLT_PRODUCER => self.producer.clone(),
            MLT_CONSUMER => self.consumer.clone(),
            MLT_TEST_CARD => self.test_card.clone(),
            MLT_PROFILE => self.profile.clone(),
            MLT_DATA => path(&self.data),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_vars() {
        let vars = MapVars::new().with(MLT_PRODUCER, "colour");
        assert_eq!(vars.var(MLT_PRODUCER).as_deref(), Some("colour"));

        vars.set(MLT_PRODUCER, "noise");
        assert_eq!(vars.var(MLT_PRODUCER).as_deref(), Some("noise"));

        vars.remove(MLT_PRODUCER);
        assert_eq!(vars.var(MLT_PRODUCER), None);
    }

    #[test]
    fn test_config_file() {
        let config = FactoryConfig::from_toml_str(
            r#"
            repository = "/opt/mlt/modules"
            producer = "colour"
            test_card = "bars.png"
            "#,
        )
        .unwrap();

        assert_eq!(config.var(MLT_REPOSITORY).as_deref(), Some("/opt/mlt/modules"));
        assert_eq!(config.var(MLT_PRODUCER).as_deref(), Some("colour"));
        assert_eq!(config.var(MLT_TEST_CARD).as_deref(), Some("bars.png"));
        assert_eq!(config.var(MLT_CONSUMER), None);
        assert_eq!(config.var("UNRELATED"), None);
    }

    #[test]
    fn test_bad_config_is_error() {
        assert!(FactoryConfig::from_toml_str("producer = [").is_err());
        assert!(FactoryConfig::load("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn test_layered_precedence() {
        let env: MapVars = [(MLT_PRODUCER, "from-env")].into_iter().collect();
        let file = FactoryConfig {
            producer: Some("from-file".into()),
            consumer: Some("file-consumer".into()),
            ..Default::default()
        };
        let vars = Layered::new(env, file);

        assert_eq!(vars.var(MLT_PRODUCER).as_deref(), Some("from-env"));
        assert_eq!(vars.var(MLT_CONSUMER).as_deref(), Some("file-consumer"));
        assert_eq!(vars.var(MLT_PROFILE), None);
    }
}
