//! Factory lifecycle and the creation pipeline

use crate::cleanup::{CleanupKey, CleanupRegistry};
use crate::config::{self, ProcessEnv, VarSource};
use crate::environment::Environment;
use crate::error::{FactoryError, Result};
use crate::stamp::stamp_common_properties;
use mlt_events::{EventHub, Transmitter};
use mlt_repository::Repository;
use mlt_service::{Profile, Service, ServiceType};
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Event hub carrying the `<kind>-create-request` / `<kind>-create-done` slots
pub type ServiceEvents = EventHub<Box<dyn Service>>;

/// Everything that exists only while the factory is initialised
struct FactoryState {
    directory: PathBuf,
    events: ServiceEvents,
    cleanup: CleanupRegistry,
    environment: Environment,
    repository: Repository,
}

/// Service creation broker
///
/// A factory is either uninitialised or initialised. [`init`](Self::init)
/// builds the event hub, environment store and repository; calling it again
/// only reseeds the environment. [`close`](Self::close) tears everything down
/// and returns the factory to its starting state; dropping an initialised
/// factory closes it.
///
/// The factory does no locking of its own. Keep it on one thread or behind a
/// single mutex (see [`crate::global`]).
pub struct Factory {
    vars: Arc<dyn VarSource>,
    state: Option<FactoryState>,
}

impl Factory {
    /// Create an uninitialised factory reading the process environment
    pub fn new() -> Self {
        Self::with_vars(Arc::new(ProcessEnv))
    }

    /// Create an uninitialised factory reading `vars`
    pub fn with_vars(vars: Arc<dyn VarSource>) -> Self {
        Self { vars, state: None }
    }

    /// Initialise, or reseed the environment if already initialised
    ///
    /// `directory` is used only on the first call; an empty path counts as
    /// absent and falls back to `MLT_REPOSITORY`, then [`config::DEFAULT_DIRECTORY`].
    pub fn init(&mut self, directory: Option<&Path>) -> &mut Repository {
        let vars = self.vars.as_ref();
        let state = self
            .state
            .get_or_insert_with(|| Self::start(vars, directory));
        state.environment.seed(vars);
        &mut state.repository
    }

    fn start(vars: &dyn VarSource, directory: Option<&Path>) -> FactoryState {
        let directory = Self::resolve_directory(vars, directory);

        mlt_pool::init();

        let mut events = ServiceEvents::new();
        for kind in ServiceType::ALL {
            events.register(kind.request_event(), Transmitter::Request);
            events.register(kind.done_event(), Transmitter::Done);
        }

        let repository = Repository::init(&directory);
        log::info!(
            "Factory initialised from '{}' ({} service(s))",
            directory.display(),
            repository.len()
        );

        FactoryState {
            directory,
            events,
            cleanup: CleanupRegistry::new(),
            environment: Environment::new(),
            repository,
        }
    }

    fn resolve_directory(vars: &dyn VarSource, directory: Option<&Path>) -> PathBuf {
        if let Some(dir) = directory.filter(|d| !d.as_os_str().is_empty()) {
            return dir.to_path_buf();
        }
        vars.var(config::MLT_REPOSITORY)
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(config::DEFAULT_DIRECTORY))
    }

    /// Tear down; a no-op when not initialised
    ///
    /// Order: event hub, cleanup entries, environment store, repository, pool.
    pub fn close(&mut self) {
        let Some(mut state) = self.state.take() else {
            return;
        };

        state.events.close();
        state.cleanup.drain();
        state.environment.close();
        state.repository.close();
        mlt_pool::close();

        log::info!("Factory closed ('{}')", state.directory.display());
    }

    /// Check whether the factory is initialised
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Module directory in use; `None` when not initialised
    pub fn directory(&self) -> Option<&Path> {
        self.state.as_ref().map(|s| s.directory.as_path())
    }

    /// Creation event hub
    pub fn events(&self) -> Option<&ServiceEvents> {
        self.state.as_ref().map(|s| &s.events)
    }

    /// Creation event hub, for attaching listeners
    pub fn events_mut(&mut self) -> Option<&mut ServiceEvents> {
        self.state.as_mut().map(|s| &mut s.events)
    }

    /// Service repository
    pub fn repository(&self) -> Option<&Repository> {
        self.state.as_ref().map(|s| &s.repository)
    }

    /// Service repository, for in-process registration
    pub fn repository_mut(&mut self) -> Option<&mut Repository> {
        self.state.as_mut().map(|s| &mut s.repository)
    }

    /// Read an environment setting
    pub fn environment(&self, name: &str) -> Option<&str> {
        self.state.as_ref()?.environment.get(name)
    }

    /// Write an environment setting; `None` clears it
    pub fn set_environment(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        let state = self.state.as_mut().ok_or(FactoryError::Uninitialized)?;
        state.environment.set(name, value);
        Ok(())
    }

    /// Hold `value` until the factory closes
    pub fn register_for_clean_up<T: Any + Send>(&mut self, value: T) -> Result<CleanupKey> {
        let state = self.state.as_mut().ok_or(FactoryError::Uninitialized)?;
        Ok(state.cleanup.register(value))
    }

    /// Hold `value` until the factory closes, then pass it to `destructor`
    pub fn register_for_clean_up_with<T, D>(&mut self, value: T, destructor: D) -> Result<CleanupKey>
    where
        T: Any + Send,
        D: FnOnce(T) + Send + 'static,
    {
        let state = self.state.as_mut().ok_or(FactoryError::Uninitialized)?;
        Ok(state.cleanup.register_with(value, destructor))
    }

    /// Create a producer; `None` for `service` selects `MLT_PRODUCER`
    pub fn producer(
        &self,
        profile: Option<&Arc<Profile>>,
        service: Option<&str>,
        input: Option<&str>,
    ) -> Option<Box<dyn Service>> {
        self.create(ServiceType::Producer, profile, service, input)
    }

    /// Create a filter
    pub fn filter(
        &self,
        profile: Option<&Arc<Profile>>,
        service: Option<&str>,
        input: Option<&str>,
    ) -> Option<Box<dyn Service>> {
        self.create(ServiceType::Filter, profile, service, input)
    }

    /// Create a transition
    pub fn transition(
        &self,
        profile: Option<&Arc<Profile>>,
        service: Option<&str>,
        input: Option<&str>,
    ) -> Option<Box<dyn Service>> {
        self.create(ServiceType::Transition, profile, service, input)
    }

    /// Create a consumer; `None` for `service` selects `MLT_CONSUMER`
    pub fn consumer(
        &self,
        profile: Option<&Arc<Profile>>,
        service: Option<&str>,
        input: Option<&str>,
    ) -> Option<Box<dyn Service>> {
        self.create(ServiceType::Consumer, profile, service, input)
    }

    /// Create a service of any kind
    ///
    /// Request listeners get the first chance to supply the object. If none
    /// does, the repository builds it and done listeners are told the result.
    /// Repository-built objects are always stamped; listener-supplied filters
    /// and transitions are stamped too, listener-supplied producers and
    /// consumers are returned untouched.
    pub fn create(
        &self,
        kind: ServiceType,
        profile: Option<&Arc<Profile>>,
        service: Option<&str>,
        input: Option<&str>,
    ) -> Option<Box<dyn Service>> {
        let state = self.state.as_ref()?;

        let service = match (service, kind.default_service_key()) {
            (Some(name), _) => Some(name),
            (None, Some(key)) => state.environment.get(key),
            (None, None) => None,
        };

        let mut created = None;
        state
            .events
            .fire_request(kind.request_event(), service, input, &mut created);

        let supplied = created.is_some();
        if !supplied {
            created = state.repository.create(profile, kind, service, input);
            state
                .events
                .fire_done(kind.done_event(), service, input, created.as_ref());
        }

        if let Some(object) = created.as_mut() {
            if !supplied || stamps_supplied_objects(kind) {
                stamp_common_properties(object.properties_mut(), profile, kind, service);
            }
            log::debug!(
                "Created {} '{}'{}",
                kind,
                service.unwrap_or_default(),
                if supplied { " (from listener)" } else { "" }
            );
        }
        created
    }
}

/// Whether objects handed over by a request listener still get stamped
fn stamps_supplied_objects(kind: ServiceType) -> bool {
    matches!(kind, ServiceType::Filter | ServiceType::Transition)
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Factory {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => f
                .debug_struct("Factory")
                .field("directory", &state.directory)
                .field("repository", &state.repository)
                .field("cleanup", &state.cleanup.len())
                .finish(),
            None => f.debug_struct("Factory").field("initialized", &false).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapVars;
    use mlt_service::BasicService;

    fn factory() -> Factory {
        let vars = MapVars::new().with(config::MLT_REPOSITORY, "/nonexistent/mlt-modules");
        let mut factory = Factory::with_vars(Arc::new(vars));
        factory.init(None);
        factory
    }

    #[test]
    fn test_uninitialised_factory() {
        let mut factory = Factory::with_vars(Arc::new(MapVars::new()));
        assert!(!factory.is_initialized());
        assert!(factory.directory().is_none());
        assert!(factory.events().is_none());
        assert!(factory.environment(config::MLT_PRODUCER).is_none());
        assert!(factory.producer(None, Some("colour"), None).is_none());
        assert!(matches!(
            factory.set_environment("X", Some("y")),
            Err(FactoryError::Uninitialized)
        ));
        assert!(factory.register_for_clean_up(1u8).is_err());

        factory.close();
        assert!(!factory.is_initialized());
    }

    #[test]
    fn test_directory_precedence() {
        let vars = MapVars::new().with(config::MLT_REPOSITORY, "/from/env");
        assert_eq!(
            Factory::resolve_directory(&vars, Some(Path::new("/from/arg"))),
            PathBuf::from("/from/arg")
        );
        assert_eq!(
            Factory::resolve_directory(&vars, Some(Path::new(""))),
            PathBuf::from("/from/env")
        );

        vars.set(config::MLT_REPOSITORY, "");
        assert_eq!(
            Factory::resolve_directory(&vars, None),
            PathBuf::from(config::DEFAULT_DIRECTORY)
        );
    }

    #[test]
    fn test_slots_registered() {
        let factory = factory();
        let events = factory.events().unwrap();
        for kind in ServiceType::ALL {
            assert_eq!(events.transmitter(kind.request_event()), Some(Transmitter::Request));
            assert_eq!(events.transmitter(kind.done_event()), Some(Transmitter::Done));
        }
    }

    #[test]
    fn test_stamping_policy() {
        assert!(stamps_supplied_objects(ServiceType::Filter));
        assert!(stamps_supplied_objects(ServiceType::Transition));
        assert!(!stamps_supplied_objects(ServiceType::Producer));
        assert!(!stamps_supplied_objects(ServiceType::Consumer));
    }

    #[test]
    fn test_repository_create_is_stamped() {
        let mut factory = factory();
        factory
            .repository_mut()
            .unwrap()
            .register(ServiceType::Consumer, "null", |_, _, _, _| {
                Some(BasicService::new().boxed())
            });

        let consumer = factory.consumer(None, Some("null"), None).unwrap();
        assert_eq!(consumer.service_type(), Some(ServiceType::Consumer));
        assert_eq!(consumer.service_name(), Some("null"));
        assert!(consumer.unique_id().is_some());
    }
}
