//! Service repository
//!
//! Maps `(kind, name)` to a constructor. Constructors come from modules
//! found in the repository directory or are registered in-process.

use crate::error::{RepositoryError, Result};
use crate::module::{Module, ModuleService};
use libloading::Library;
use mlt_service::{Profile, Service, ServiceType};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Builds a service; `None` means construction failed
pub type Constructor = Box<
    dyn Fn(Option<&Arc<Profile>>, ServiceType, &str, Option<&str>) -> Option<Box<dyn Service>>
        + Send
        + Sync,
>;

/// A registered constructor and, for module code, the library it lives in
struct Registered {
    // Declared first: the constructor drops while its library is still held
    constructor: Constructor,
    library: Option<Arc<Library>>,
}

/// Registry of constructible services
pub struct Repository {
    services: BTreeMap<(ServiceType, String), Registered>,
    modules: Vec<Module>,
    directory: Option<PathBuf>,
    /// Library of the module currently registering, if any
    loading: Option<Arc<Library>>,
}

impl Repository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            services: BTreeMap::new(),
            modules: Vec::new(),
            directory: None,
            loading: None,
        }
    }

    /// Create a repository from every module in `directory`
    ///
    /// Files that fail to load are logged and skipped; a missing directory
    /// yields an empty repository.
    pub fn init(directory: impl AsRef<Path>) -> Self {
        let directory = directory.as_ref();
        let mut repository = Self::new();
        repository.directory = Some(directory.to_path_buf());

        let paths = match Self::module_paths(directory) {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!("Cannot scan module directory '{}': {}", directory.display(), e);
                return repository;
            }
        };

        for path in paths {
            if let Err(e) = repository.load_module(&path) {
                log::warn!("Skipping module '{}': {}", path.display(), e);
            }
        }

        log::info!(
            "Repository '{}' ready: {} module(s), {} service(s)",
            directory.display(),
            repository.modules.len(),
            repository.services.len()
        );
        repository
    }

    /// Shared libraries directly inside `directory`, sorted by path
    fn module_paths(directory: &Path) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let path = entry?.path();
            let is_module = path.is_file()
                && path
                    .extension()
                    .map_or(false, |ext| ext == std::env::consts::DLL_EXTENSION);
            if is_module {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Load a single module and let it register its services
    pub fn load_module(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.modules.iter().any(|m| m.path() == path) {
            return Err(RepositoryError::AlreadyLoaded(path.to_path_buf()));
        }

        let module = Module::load(path)?;
        let before = self.services.len();
        module.register(self)?;

        log::info!(
            "Loaded module '{}' ({} new service(s))",
            module.name(),
            self.services.len().saturating_sub(before)
        );
        self.modules.push(module);
        Ok(())
    }

    /// Register a constructor, replacing any previous one for the same name
    pub fn register<F>(&mut self, kind: ServiceType, name: &str, constructor: F)
    where
        F: Fn(Option<&Arc<Profile>>, ServiceType, &str, Option<&str>) -> Option<Box<dyn Service>>
            + Send
            + Sync
            + 'static,
    {
        let key = (kind, name.to_string());
        if self.services.contains_key(&key) {
            log::warn!("{} '{}' registered twice; keeping the latest", kind, name);
        }
        self.services.insert(
            key,
            Registered {
                constructor: Box::new(constructor),
                library: self.loading.clone(),
            },
        );
        log::debug!("Registered {} '{}'", kind, name);
    }

    /// Tag constructors registered from now on with `library`
    pub(crate) fn begin_module(&mut self, library: Arc<Library>) {
        self.loading = Some(library);
    }

    pub(crate) fn end_module(&mut self) {
        self.loading = None;
    }

    /// Remove a constructor
    pub fn unregister(&mut self, kind: ServiceType, name: &str) -> bool {
        self.services.remove(&(kind, name.to_string())).is_some()
    }

    /// Construct a service; `None` if the name is absent, unknown, or construction fails
    pub fn create(
        &self,
        profile: Option<&Arc<Profile>>,
        kind: ServiceType,
        name: Option<&str>,
        input: Option<&str>,
    ) -> Option<Box<dyn Service>> {
        let name = name?;
        let Some(registered) = self.services.get(&(kind, name.to_string())) else {
            log::debug!("No {} named '{}'", kind, name);
            return None;
        };

        let Some(service) = (registered.constructor)(profile, kind, name, input) else {
            log::debug!("{} '{}' failed to construct", kind, name);
            return None;
        };

        match &registered.library {
            Some(library) => Some(ModuleService::wrap(service, library.clone())),
            None => Some(service),
        }
    }

    /// Check if a service is registered
    pub fn contains(&self, kind: ServiceType, name: &str) -> bool {
        self.services.contains_key(&(kind, name.to_string()))
    }

    /// Registered names for a kind, sorted
    pub fn services(&self, kind: ServiceType) -> Vec<&str> {
        self.services
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Paths of loaded modules, in load order
    pub fn modules(&self) -> Vec<&Path> {
        self.modules.iter().map(|m| m.path()).collect()
    }

    /// Directory the repository was scanned from
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Drop every constructor, then release modules
    ///
    /// A module's library is unloaded once no service it built is alive.
    pub fn close(&mut self) {
        if self.services.is_empty() && self.modules.is_empty() {
            return;
        }
        self.services.clear();
        for module in self.modules.drain(..) {
            drop(module);
        }
        log::debug!("Repository closed");
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("directory", &self.directory)
            .field("services", &self.services.len())
            .field("modules", &self.modules.len())
            .finish()
    }
}
