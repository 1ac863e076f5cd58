//! Shared-library service modules
//!
//! A module is a dynamic library exporting two symbols:
//! - `mlt_module_abi_version`: `extern "C" fn() -> u32`
//! - `mlt_register`: `fn(&mut Repository)`
//!
//! `mlt_register` uses the Rust ABI, so modules must be built with the same
//! toolchain and the same version of this crate. Use [`declare_module!`]
//! rather than writing the exports by hand.
//!
//! A library stays mapped while anything built from it is alive: every
//! constructor it registered and every service those constructors returned
//! holds a reference to it.
//!
//! [`declare_module!`]: crate::declare_module

use crate::error::{RepositoryError, Result};
use crate::repository::Repository;
use libloading::{Library, Symbol};
use mlt_properties::Properties;
use mlt_service::{Profile, Service, ServiceType};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// ABI version modules must report
pub const MLT_MODULE_ABI_VERSION: u32 = 1;

/// Symbol reporting the module ABI version
pub const ABI_VERSION_SYMBOL: &[u8] = b"mlt_module_abi_version\0";

/// Symbol registering the module's services
pub const REGISTER_SYMBOL: &[u8] = b"mlt_register\0";

type AbiVersionFn = unsafe extern "C" fn() -> u32;
type RegisterFn = fn(&mut Repository);

/// A loaded service module
pub struct Module {
    /// The underlying library handle, shared with everything built from it
    library: Arc<Library>,
    /// File the module was loaded from
    path: PathBuf,
    /// Module name (file stem)
    name: String,
}

impl Module {
    /// Load a module and check its ABI version
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let library = unsafe {
            Library::new(path).map_err(|e| RepositoryError::load_error(path, e.to_string()))?
        };

        let found = unsafe {
            let abi_version: Symbol<AbiVersionFn> = library
                .get(ABI_VERSION_SYMBOL)
                .map_err(|_| RepositoryError::symbol_not_found(&name, "mlt_module_abi_version"))?;
            abi_version()
        };

        if found != MLT_MODULE_ABI_VERSION {
            return Err(RepositoryError::AbiMismatch {
                module: name,
                found,
                expected: MLT_MODULE_ABI_VERSION,
            });
        }

        Ok(Self {
            library: Arc::new(library),
            path: path.to_path_buf(),
            name,
        })
    }

    /// Let the module register its services
    pub(crate) fn register(&self, repository: &mut Repository) -> Result<()> {
        let register: Symbol<RegisterFn> = unsafe {
            self.library
                .get(REGISTER_SYMBOL)
                .map_err(|_| RepositoryError::symbol_not_found(&self.name, "mlt_register"))?
        };
        repository.begin_module(self.library.clone());
        register(repository);
        repository.end_module();
        Ok(())
    }

    /// File the module was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        let users = Arc::strong_count(&self.library) - 1;
        if users == 0 {
            log::debug!("Unloading module '{}'", self.name);
        } else {
            log::debug!(
                "Releasing module '{}'; {} object(s) still keep it loaded",
                self.name,
                users
            );
        }
    }
}

/// A service built by module code, holding the module's library
///
/// `service` is declared first so its code runs while the library is mapped.
pub(crate) struct ModuleService {
    service: Box<dyn Service>,
    _library: Arc<Library>,
}

impl ModuleService {
    pub(crate) fn wrap(service: Box<dyn Service>, library: Arc<Library>) -> Box<dyn Service> {
        Box::new(Self {
            service,
            _library: library,
        })
    }
}

impl Service for ModuleService {
    fn properties(&self) -> &Properties {
        self.service.properties()
    }

    fn properties_mut(&mut self) -> &mut Properties {
        self.service.properties_mut()
    }

    fn as_any(&self) -> &dyn Any {
        self.service.as_any()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self.service.as_any_mut()
    }

    fn unique_id(&self) -> Option<u64> {
        self.service.unique_id()
    }

    fn service_type(&self) -> Option<ServiceType> {
        self.service.service_type()
    }

    fn service_name(&self) -> Option<&str> {
        self.service.service_name()
    }

    fn profile(&self) -> Option<Arc<Profile>> {
        self.service.profile()
    }

    fn set_hidden_service_name(&mut self, name: &str) {
        self.service.set_hidden_service_name(name)
    }
}

/// Export the symbols a service module needs
///
/// ```ignore
/// fn register(repository: &mut mlt_repository::Repository) {
///     repository.register(ServiceType::Filter, "invert", |_, _, _, _| {
///         Some(Box::new(Invert::new()))
///     });
/// }
///
/// mlt_repository::declare_module!(register);
/// ```
#[macro_export]
macro_rules! declare_module {
    ($register:path) => {
        #[no_mangle]
        pub extern "C" fn mlt_module_abi_version() -> u32 {
            $crate::MLT_MODULE_ABI_VERSION
        }

        #[no_mangle]
        pub fn mlt_register(repository: &mut $crate::Repository) {
            $register(repository)
        }
    };
}
