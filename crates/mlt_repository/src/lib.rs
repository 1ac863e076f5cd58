//! # mlt_repository - Service Repository
//!
//! Resolves a `(kind, name)` pair to a constructed service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │ module directory│────▶│   libloading    │
//! │ (*.so / *.dll)  │     │                 │
//! └─────────────────┘     └────────┬────────┘
//!                                  │ mlt_register
//!                                  ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │  in-process     │────▶│   Repository    │──▶ Box<dyn Service>
//! │  register()     │     │ (kind, name)    │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! Closing the repository drops its constructors at once, but a module's
//! library is unloaded only after the last service it built is dropped.

mod error;
mod module;
mod repository;

pub use error::{RepositoryError, Result};
pub use module::{Module, ABI_VERSION_SYMBOL, MLT_MODULE_ABI_VERSION, REGISTER_SYMBOL};
pub use repository::{Constructor, Repository};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{RepositoryError, Result};
    pub use crate::repository::Repository;
    pub use mlt_service::{Profile, Service, ServiceType};
}
