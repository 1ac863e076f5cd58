//! # mlt_factory - Service Creation Broker
//!
//! Turns a `(kind, service name)` pair into a live, tagged service while
//! letting listeners intercept or observe every creation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  request   ┌─────────────────┐
//! │  Factory::      │───────────▶│  ServiceEvents  │ listener may supply
//! │  producer() ... │            │  (mlt_events)   │ the object
//! └────────┬────────┘            └─────────────────┘
//!          │ nothing supplied
//!          ▼
//! ┌─────────────────┐   done     ┌─────────────────┐
//! │   Repository    │───────────▶│  ServiceEvents  │
//! │ (mlt_repository)│            └─────────────────┘
//! └────────┬────────┘
//!          ▼
//! ┌─────────────────┐
//! │ stamp: id, type │
//! │ name, profile   │
//! └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use mlt_factory::prelude::*;
//! use std::sync::Arc;
//!
//! let mut factory = Factory::new();
//! factory.init(None);
//!
//! let profile = Arc::new(Profile::dv_pal());
//! let producer = factory.producer(Some(&profile), Some("colour"), Some("red"));
//!
//! factory.close();
//! ```

pub mod cleanup;
pub mod config;
pub mod environment;
pub mod error;
pub mod factory;
pub mod global;
pub mod stamp;

pub use cleanup::{CleanupKey, CleanupRegistry};
pub use config::{FactoryConfig, Layered, MapVars, ProcessEnv, VarSource};
pub use environment::Environment;
pub use error::{FactoryError, Result};
pub use factory::{Factory, ServiceEvents};
pub use stamp::stamp_common_properties;

/// Prelude
pub mod prelude {
    pub use crate::config::{FactoryConfig, Layered, MapVars, ProcessEnv, VarSource};
    pub use crate::error::{FactoryError, Result};
    pub use crate::factory::{Factory, ServiceEvents};
    pub use mlt_events::{ListenerId, Transmitter};
    pub use mlt_repository::Repository;
    pub use mlt_service::{keys, BasicService, Profile, Service, ServiceType};
}
