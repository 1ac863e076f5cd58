//! Objects released when the factory closes

use mlt_properties::Properties;
use std::any::Any;
use std::fmt;

/// Key of a cleanup entry; strictly increasing, never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CleanupKey(pub u64);

impl fmt::Display for CleanupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

/// Values held until shutdown, each with an optional destructor
///
/// Entries are released in registration order by [`drain`](Self::drain)
/// or when the registry is dropped. A panicking destructor is not caught.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    entries: Properties,
    next_key: u64,
}

impl CleanupRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn next_key(&mut self) -> CleanupKey {
        let key = CleanupKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Hold `value` until drain; it is simply dropped then
    pub fn register<T: Any + Send>(&mut self, value: T) -> CleanupKey {
        let key = self.next_key();
        self.entries.set_data(&key.to_string(), value);
        log::debug!("Registered cleanup entry {}", key);
        key
    }

    /// Hold `value` until drain, then hand it to `destructor`
    pub fn register_with<T, D>(&mut self, value: T, destructor: D) -> CleanupKey
    where
        T: Any + Send,
        D: FnOnce(T) + Send + 'static,
    {
        let key = self.next_key();
        self.entries.set_data_with(&key.to_string(), value, destructor);
        log::debug!("Registered cleanup entry {} with destructor", key);
        key
    }

    /// Check whether an entry is still held
    pub fn contains(&self, key: CleanupKey) -> bool {
        self.entries.contains(&key.to_string())
    }

    /// Number of held entries
    pub fn len(&self) -> usize {
        self.entries.count()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every entry in registration order
    pub fn drain(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        log::debug!("Releasing {} cleanup entries", self.entries.count());
        self.entries.close();
    }
}
