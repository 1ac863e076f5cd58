//! Tests for the process-wide factory

use mlt_factory::global;
use mlt_factory::prelude::*;
use parking_lot::{const_mutex, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

// Every test here shares one factory
static SERIAL: Mutex<()> = const_mutex(());

#[test]
fn test_with_before_init() {
    let _guard = SERIAL.lock();
    global::close();

    assert!(!global::is_initialized());
    assert!(global::with(|f| f.is_initialized()).is_none());
}

#[test]
fn test_init_use_close() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();

    global::init(Some(dir.path()));
    global::init(None);
    assert!(global::is_initialized());
    assert_eq!(
        global::with(|f| f.directory().map(|d| d.to_path_buf())).flatten(),
        Some(dir.path().to_path_buf())
    );

    let name = global::with(|f| {
        f.repository_mut()
            .unwrap()
            .register(ServiceType::Filter, "invert", |_, _, _, _| {
                Some(BasicService::new().boxed())
            });
        f.filter(None, Some("invert"), None)
            .and_then(|s| s.service_name().map(str::to_string))
    })
    .flatten();
    assert_eq!(name.as_deref(), Some("invert"));

    global::close();
    assert!(!global::is_initialized());
    global::close();
}

#[test]
fn test_close_releases_cleanup_entries() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    global::init(Some(dir.path()));

    let released = Arc::new(AtomicUsize::new(0));
    let r = released.clone();
    global::with(|f| {
        f.register_for_clean_up_with((), move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        })
    })
    .unwrap()
    .unwrap();

    global::close();
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cleanup_destructor_may_reenter() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    global::init(Some(dir.path()));

    let seen = Arc::new(Mutex::new(None));
    let s = seen.clone();
    global::with(|f| {
        f.register_for_clean_up_with((), move |_| {
            *s.lock() = Some(global::is_initialized());
        })
    })
    .unwrap()
    .unwrap();

    global::close();
    assert_eq!(*seen.lock(), Some(false));
}

#[test]
fn test_constructor_builds_through_shared_factory() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    assert!(global::init(Some(dir.path())));

    global::with(|f| {
        let repository = f.repository_mut().unwrap();
        repository.register(ServiceType::Filter, "inner", |_, _, _, _| {
            Some(BasicService::new().boxed())
        });
        repository.register(ServiceType::Producer, "loader", |_, _, _, _| {
            let inner = global::create(ServiceType::Filter, None, Some("inner"), None);
            let inner_id = inner.and_then(|s| s.unique_id()).map_or(-1, |id| id as i64);
            let mut loader = BasicService::new();
            loader.properties_mut().set_int("inner_id", inner_id);
            Some(loader.boxed())
        });
    })
    .unwrap();

    // Run on a worker so a lock-up fails the test instead of hanging it
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let loader = global::create(ServiceType::Producer, None, Some("loader"), None);
        let _ = tx.send(loader.map(|s| (s.unique_id(), s.properties().get_int("inner_id"))));
    });
    let (loader_id, inner_id) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("nested creation did not finish")
        .expect("loader was not created");

    assert!(inner_id > 0);
    assert!(loader_id.unwrap() as i64 > inner_id);
    global::close();
}

#[test]
fn test_nested_exclusive_access_is_refused() {
    let _guard = SERIAL.lock();
    let dir = tempfile::tempdir().unwrap();
    global::init(Some(dir.path()));

    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let inside_with = global::with(|_| {
            (
                global::with(|_| ()).is_none(),
                global::with_ref(|_| ()).is_none(),
                !global::init(None),
            )
        });
        let inside_ref = global::with_ref(|_| {
            (
                global::with(|_| ()).is_none(),
                global::with_ref(|f| f.is_initialized()),
            )
        });
        let _ = tx.send((inside_with, inside_ref));
    });
    let (inside_with, inside_ref) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("nested access did not finish");

    assert_eq!(inside_with, Some((true, true, true)));
    assert_eq!(inside_ref, Some((true, Some(true))));

    // A close attempted mid-use leaves the factory open
    global::with_ref(|_| global::close());
    assert!(global::is_initialized());

    global::close();
    assert!(!global::is_initialized());
}
