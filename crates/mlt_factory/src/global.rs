//! Process-wide factory
//!
//! One [`Factory`] per process behind a single reentrant lock, for hosts
//! that want a shared instance rather than passing one around. The first
//! [`init`] also registers an exit hook (unix) that closes whatever is still
//! open when the process exits; an explicit [`close`] beforehand makes the
//! hook a no-op.
//!
//! Other threads wait for the lock. The thread holding it may call back in:
//! shared access ([`with_ref`], [`create`]) nests freely, so a constructor or
//! listener running inside [`create`] can build further services. Exclusive
//! access ([`with`], [`init`]) is refused with `None` while this thread is
//! already inside any other access.

use crate::factory::Factory;
use mlt_service::{Profile, Service, ServiceType};
use parking_lot::{const_reentrant_mutex, ReentrantMutex};
use std::cell::RefCell;
use std::path::Path;
use std::sync::{Arc, Once};

static FACTORY: ReentrantMutex<RefCell<Option<Factory>>> = const_reentrant_mutex(RefCell::new(None));
static EXIT_HOOK: Once = Once::new();

/// Initialise the shared factory, or reseed its environment
///
/// Returns `false` if called from inside [`with`] or [`with_ref`] on this thread.
pub fn init(directory: Option<&Path>) -> bool {
    let guard = FACTORY.lock();
    let Ok(mut slot) = guard.try_borrow_mut() else {
        log::warn!("Factory init ignored: already in use on this thread");
        return false;
    };
    slot.get_or_insert_with(Factory::new).init(directory);
    drop(slot);
    drop(guard);

    register_exit_hook();
    true
}

/// Run `f` with exclusive access to the shared factory
///
/// `None` if [`init`] has not been called, or if this thread is already
/// inside [`with`], [`with_ref`] or [`create`] (including from a constructor,
/// listener or cleanup destructor they run).
pub fn with<R>(f: impl FnOnce(&mut Factory) -> R) -> Option<R> {
    let guard = FACTORY.lock();
    let Ok(mut slot) = guard.try_borrow_mut() else {
        log::warn!("Nested exclusive use of the shared factory refused");
        return None;
    };
    slot.as_mut().map(f)
}

/// Run `f` with shared access to the shared factory
///
/// Nests inside other shared access on the same thread; `None` if [`init`]
/// has not been called or this thread is inside [`with`].
pub fn with_ref<R>(f: impl FnOnce(&Factory) -> R) -> Option<R> {
    let guard = FACTORY.lock();
    let Ok(slot) = guard.try_borrow() else {
        log::warn!("Shared factory is exclusively borrowed on this thread");
        return None;
    };
    slot.as_ref().map(f)
}

/// Create a service through the shared factory
pub fn create(
    kind: ServiceType,
    profile: Option<&Arc<Profile>>,
    service: Option<&str>,
    input: Option<&str>,
) -> Option<Box<dyn Service>> {
    with_ref(|f| f.create(kind, profile, service, input)).flatten()
}

/// Check whether the shared factory is initialised
///
/// `false` while this thread holds exclusive access through [`with`].
pub fn is_initialized() -> bool {
    with_ref(Factory::is_initialized).unwrap_or(false)
}

/// Close the shared factory; a no-op if it is not open
///
/// Does nothing if called from inside [`with`] or [`with_ref`] on this thread.
pub fn close() {
    let factory = {
        let guard = FACTORY.lock();
        let Ok(mut slot) = guard.try_borrow_mut() else {
            log::warn!("Factory close ignored: still in use on this thread");
            return;
        };
        slot.take()
    };

    // Closed outside the lock so cleanup destructors may call back in
    if let Some(mut factory) = factory {
        factory.close();
    }
}

fn register_exit_hook() {
    EXIT_HOOK.call_once(|| {
        #[cfg(unix)]
        {
            let status = unsafe { libc::atexit(close_at_exit) };
            if status != 0 {
                log::warn!("Could not register factory exit hook");
            }
        }
    });
}

#[cfg(unix)]
extern "C" fn close_at_exit() {
    // Skip rather than wait if another thread still holds the factory
    let Some(guard) = FACTORY.try_lock() else {
        return;
    };
    let factory = match guard.try_borrow_mut() {
        Ok(mut slot) => slot.take(),
        Err(_) => return,
    };
    drop(guard);
    drop(factory);
}
