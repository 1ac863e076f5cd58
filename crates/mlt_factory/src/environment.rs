//! Environment store
//!
//! Factory-wide string settings (default services, profile, data path)
//! seeded from a [`VarSource`] on every initialisation.

use crate::config::{self, VarSource};
use mlt_properties::Properties;

/// Keys seeded with a fallback, and the fallback used
const SEEDED: [(&str, &str); 5] = [
    (config::MLT_NORMALISATION, config::DEFAULT_NORMALISATION),
    (config::MLT_PRODUCER, config::DEFAULT_PRODUCER),
    (config::MLT_CONSUMER, config::DEFAULT_CONSUMER),
    (config::MLT_PROFILE, config::DEFAULT_PROFILE),
    (config::MLT_DATA, config::DEFAULT_DATA_DIRECTORY),
];

/// String settings shared by everything the factory creates
#[derive(Debug, Default)]
pub struct Environment {
    properties: Properties,
}

impl Environment {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)read every seeded key from `vars`
    ///
    /// Keys with a fallback take it when the variable is unset or empty.
    /// The test card is copied as-is, so an unset variable clears it.
    pub fn seed(&mut self, vars: &dyn VarSource) {
        for (name, default) in SEEDED {
            let value = vars.var(name);
            self.properties.set_or_default(name, value.as_deref(), default);
        }

        match vars.var(config::MLT_TEST_CARD) {
            Some(card) => self.properties.set(config::MLT_TEST_CARD, card),
            None => self.properties.clear(config::MLT_TEST_CARD),
        }

        log::debug!(
            "Environment seeded: producer '{}', consumer '{}', profile '{}'",
            self.get(config::MLT_PRODUCER).unwrap_or_default(),
            self.get(config::MLT_CONSUMER).unwrap_or_default(),
            self.get(config::MLT_PROFILE).unwrap_or_default()
        );
    }

    /// Read a setting
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get_str(name)
    }

    /// Write a setting; `None` clears it
    pub fn set(&mut self, name: &str, value: Option<&str>) {
        match value {
            Some(value) => self.properties.set(name, value),
            None => self.properties.clear(name),
        }
    }

    /// Underlying property set
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Drop every setting
    pub fn close(&mut self) {
        self.properties.close();
    }
}
