//! The service object trait

use crate::kind::ServiceType;
use crate::profile::Profile;
use mlt_properties::Properties;
use std::any::Any;
use std::sync::{Arc, Weak};

/// Property keys the factory stamps onto created services
pub mod keys {
    /// Process-unique integer id
    pub const UNIQUE_ID: &str = "_unique_id";
    /// Kind tag (`producer`, `filter`, `transition`, `consumer`)
    pub const TYPE: &str = "mlt_type";
    /// Name the service was resolved by
    pub const SERVICE: &str = "mlt_service";
    /// When non-zero, `mlt_service` is left as the constructor set it
    pub const SERVICE_HIDDEN: &str = "_mlt_service_hidden";
    /// Non-owning reference to the creation profile
    pub const PROFILE: &str = "_profile";
}

/// An object created through the factory
pub trait Service: Any + Send {
    /// Attached property set
    fn properties(&self) -> &Properties;

    /// Attached property set (mutable)
    fn properties_mut(&mut self) -> &mut Properties;

    /// Type erasure
    fn as_any(&self) -> &dyn Any;

    /// Type erasure (mutable)
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Stamped unique id, if the service has been stamped
    fn unique_id(&self) -> Option<u64> {
        let props = self.properties();
        props
            .value(keys::UNIQUE_ID)
            .and_then(|v| v.as_int())
            .map(|id| id as u64)
    }

    /// Stamped kind tag
    fn service_type(&self) -> Option<ServiceType> {
        self.properties().get_str(keys::TYPE)?.parse().ok()
    }

    /// Stamped (or self-assigned) service name
    fn service_name(&self) -> Option<&str> {
        self.properties().get_str(keys::SERVICE)
    }

    /// Profile the service was created with, while it is still alive
    fn profile(&self) -> Option<Arc<Profile>> {
        self.properties()
            .get_data::<Weak<Profile>>(keys::PROFILE)?
            .upgrade()
    }

    /// Assign a specific service name that stamping will not overwrite
    fn set_hidden_service_name(&mut self, name: &str) {
        let props = self.properties_mut();
        props.set(keys::SERVICE, name);
        props.set_int(keys::SERVICE_HIDDEN, 1);
    }
}

impl dyn Service {
    /// Downcast to a concrete type
    pub fn downcast_ref<T: Service>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Downcast to a mutable concrete type
    pub fn downcast_mut<T: Service>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

impl std::fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("properties", self.properties())
            .finish()
    }
}

/// A service that is nothing but its property set
#[derive(Debug, Default)]
pub struct BasicService {
    properties: Properties,
}

impl BasicService {
    /// Create a service with an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a service around an existing property set
    pub fn with_properties(properties: Properties) -> Self {
        Self { properties }
    }

    /// Box as a trait object
    pub fn boxed(self) -> Box<dyn Service> {
        Box::new(self)
    }
}

impl Service for BasicService {
    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstamped_service() {
        let service = BasicService::new();
        assert_eq!(service.unique_id(), None);
        assert_eq!(service.service_type(), None);
        assert_eq!(service.service_name(), None);
        assert!(service.profile().is_none());
    }

    #[test]
    fn test_accessors_read_stamped_keys() {
        let profile = Arc::new(Profile::dv_pal());
        let mut service = BasicService::new();
        {
            let props = service.properties_mut();
            props.set_int(keys::UNIQUE_ID, 12);
            props.set(keys::TYPE, "filter");
            props.set(keys::SERVICE, "greyscale");
            props.set_data(keys::PROFILE, Arc::downgrade(&profile));
        }

        assert_eq!(service.unique_id(), Some(12));
        assert_eq!(service.service_type(), Some(ServiceType::Filter));
        assert_eq!(service.service_name(), Some("greyscale"));
        assert_eq!(service.profile().map(|p| p.width), Some(720));

        // The service never keeps the profile alive
        drop(profile);
        assert!(service.profile().is_none());
    }

    #[test]
    fn test_hidden_name_and_downcast() {
        let mut service: Box<dyn Service> = BasicService::new().boxed();
        service.set_hidden_service_name("avformat-novalidate");

        assert_eq!(service.service_name(), Some("avformat-novalidate"));
        assert_eq!(service.properties().get_int(keys::SERVICE_HIDDEN), 1);
        assert!(service.downcast_ref::<BasicService>().is_some());
    }
}
