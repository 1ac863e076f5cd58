//! Common properties stamped onto created services

use mlt_properties::Properties;
use mlt_service::{keys, Profile, ServiceType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide id counter; ids start at 1 and are never reused
static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(1);

/// Take the next unique id
pub fn next_unique_id() -> u64 {
    NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Tag a freshly created service
///
/// Assigns a new `_unique_id`, sets `mlt_type`, sets `mlt_service` unless
/// `_mlt_service_hidden` is non-zero, and attaches a non-owning reference to
/// `profile` when one is given.
pub fn stamp_common_properties(
    props: &mut Properties,
    profile: Option<&Arc<Profile>>,
    kind: ServiceType,
    service: Option<&str>,
) {
    let id = next_unique_id();
    props.set_int(keys::UNIQUE_ID, id as i64);
    props.set(keys::TYPE, kind.as_str());

    if props.get_int(keys::SERVICE_HIDDEN) == 0 {
        match service {
            Some(name) => props.set(keys::SERVICE, name),
            None => props.clear(keys::SERVICE),
        }
    }

    if let Some(profile) = profile {
        props.set_data(keys::PROFILE, Arc::downgrade(profile));
    }
}
