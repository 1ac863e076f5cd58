//! # mlt_service - Service Objects
//!
//! Every object the factory hands out (producer, filter, transition or
//! consumer) is a [`Service`]: something that exposes a property set.
//! The factory stamps a few well-known keys onto that set after creation;
//! see [`keys`].

pub mod kind;
pub mod profile;
pub mod service;

pub use kind::{ParseServiceTypeError, ServiceType};
pub use profile::Profile;
pub use service::{keys, BasicService, Service};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::kind::ServiceType;
    pub use crate::profile::Profile;
    pub use crate::service::{BasicService, Service};
    pub use mlt_properties::Properties;
}
