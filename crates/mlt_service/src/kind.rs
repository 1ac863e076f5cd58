//! Service kinds

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The category of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceType {
    Producer,
    Filter,
    Transition,
    Consumer,
}

impl ServiceType {
    /// Every kind, in pipeline order
    pub const ALL: [ServiceType; 4] = [
        ServiceType::Producer,
        ServiceType::Filter,
        ServiceType::Transition,
        ServiceType::Consumer,
    ];

    /// Tag written to `mlt_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Producer => "producer",
            ServiceType::Filter => "filter",
            ServiceType::Transition => "transition",
            ServiceType::Consumer => "consumer",
        }
    }

    /// Slot fired before the repository is consulted
    pub fn request_event(&self) -> &'static str {
        match self {
            ServiceType::Producer => "producer-create-request",
            ServiceType::Filter => "filter-create-request",
            ServiceType::Transition => "transition-create-request",
            ServiceType::Consumer => "consumer-create-request",
        }
    }

    /// Slot fired after the repository was consulted
    pub fn done_event(&self) -> &'static str {
        match self {
            ServiceType::Producer => "producer-create-done",
            ServiceType::Filter => "filter-create-done",
            ServiceType::Transition => "transition-create-done",
            ServiceType::Consumer => "consumer-create-done",
        }
    }

    /// Environment key naming the service used when none is given
    pub fn default_service_key(&self) -> Option<&'static str> {
        match self {
            ServiceType::Producer => Some("MLT_PRODUCER"),
            ServiceType::Consumer => Some("MLT_CONSUMER"),
            ServiceType::Filter | ServiceType::Transition => None,
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised service kind
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown service type '{0}'")]
pub struct ParseServiceTypeError(pub String);

impl FromStr for ServiceType {
    type Err = ParseServiceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "producer" => Ok(ServiceType::Producer),
            "filter" => Ok(ServiceType::Filter),
            "transition" => Ok(ServiceType::Transition),
            "consumer" => Ok(ServiceType::Consumer),
            other => Err(ParseServiceTypeError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        for kind in ServiceType::ALL {
            assert_eq!(kind.request_event(), format!("{}-create-request", kind));
            assert_eq!(kind.done_event(), format!("{}-create-done", kind));
            assert_eq!(kind.as_str().parse::<ServiceType>(), Ok(kind));
        }
        assert!("tractor".parse::<ServiceType>().is_err());
    }

    #[test]
    fn test_default_keys() {
        assert_eq!(ServiceType::Producer.default_service_key(), Some("MLT_PRODUCER"));
        assert_eq!(ServiceType::Consumer.default_service_key(), Some("MLT_CONSUMER"));
        assert_eq!(ServiceType::Filter.default_service_key(), None);
        assert_eq!(ServiceType::Transition.default_service_key(), None);
    }
}
