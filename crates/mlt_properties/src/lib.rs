//! # mlt_properties - Property Sets
//!
//! Every service object carries a property set: an ordered, string-keyed
//! collection of scalar values and opaque attached data. The factory uses
//! the same type for its environment store.
//!
//! - Insertion order is preserved; re-setting a key keeps its position
//! - Scalars convert on read (`get_int` parses strings, `get` renders numbers)
//! - Attached data may carry a destructor that runs exactly once

mod value;

pub use value::PropertyValue;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Destructor run when attached data leaves the set
pub type Destructor = Box<dyn FnOnce(Box<dyn Any + Send>) + Send>;

/// Opaque data attached to a property
struct Data {
    value: Option<Box<dyn Any + Send>>,
    destructor: Option<Destructor>,
}

impl Drop for Data {
    fn drop(&mut self) {
        if let (Some(value), Some(destructor)) = (self.value.take(), self.destructor.take()) {
            destructor(value);
        }
    }
}

enum Slot {
    Empty,
    Value(PropertyValue),
    Data(Data),
}

struct Entry {
    name: String,
    slot: Slot,
}

/// Ordered, string-keyed property set
#[derive(Default)]
pub struct Properties {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl Properties {
    /// Create an empty property set
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, name: &str, slot: Slot) {
        match self.index.get(name) {
            Some(&i) => {
                // The old slot drops here, running any destructor
                self.entries[i].slot = slot;
            }
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(Entry {
                    name: name.to_string(),
                    slot,
                });
            }
        }
    }

    fn slot(&self, name: &str) -> Option<&Slot> {
        self.index.get(name).map(|&i| &self.entries[i].slot)
    }

    /// Set a scalar value
    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) {
        self.put(name, Slot::Value(value.into()));
    }

    /// Set an integer value
    pub fn set_int(&mut self, name: &str, value: i64) {
        self.set(name, value);
    }

    /// Set a floating point value
    pub fn set_double(&mut self, name: &str, value: f64) {
        self.set(name, value);
    }

    /// Set `value` unless it is absent or empty, in which case `default` is used
    pub fn set_or_default(&mut self, name: &str, value: Option<&str>, default: &str) {
        match value {
            Some(v) if !v.is_empty() => self.set(name, v),
            _ => self.set(name, default),
        }
    }

    /// Clear a value, keeping the key in place
    pub fn clear(&mut self, name: &str) {
        self.put(name, Slot::Empty);
    }

    /// Attach opaque data; it is dropped normally when it leaves the set
    pub fn set_data<T: Any + Send>(&mut self, name: &str, value: T) {
        self.put(
            name,
            Slot::Data(Data {
                value: Some(Box::new(value)),
                destructor: None,
            }),
        );
    }

    /// Attach opaque data with a destructor that receives it when it leaves the set
    pub fn set_data_with<T, D>(&mut self, name: &str, value: T, destructor: D)
    where
        T: Any + Send,
        D: FnOnce(T) + Send + 'static,
    {
        let destructor: Destructor = Box::new(move |boxed: Box<dyn Any + Send>| {
            if let Ok(value) = boxed.downcast::<T>() {
                destructor(*value);
            }
        });
        self.put(
            name,
            Slot::Data(Data {
                value: Some(Box::new(value)),
                destructor: Some(destructor),
            }),
        );
    }

    /// Get the raw scalar value
    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        match self.slot(name)? {
            Slot::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Get a value rendered as a string
    pub fn get(&self, name: &str) -> Option<String> {
        self.value(name).map(|v| v.to_string())
    }

    /// Get a string value without conversion
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(|v| v.as_str())
    }

    /// Get an integer; absent or unparsable values read as 0
    pub fn get_int(&self, name: &str) -> i64 {
        self.value(name).and_then(|v| v.as_int()).unwrap_or(0)
    }

    /// Get a floating point value; absent or unparsable values read as 0.0
    pub fn get_double(&self, name: &str) -> f64 {
        self.value(name).and_then(|v| v.as_double()).unwrap_or(0.0)
    }

    /// Get attached data by type
    pub fn get_data<T: Any>(&self, name: &str) -> Option<&T> {
        match self.slot(name)? {
            Slot::Data(data) => data.value.as_ref()?.downcast_ref(),
            _ => None,
        }
    }

    /// Get attached data mutably by type
    pub fn get_data_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        let i = *self.index.get(name)?;
        match &mut self.entries[i].slot {
            Slot::Data(data) => data.value.as_mut()?.downcast_mut(),
            _ => None,
        }
    }

    /// Check whether a key is present (even without a value)
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Remove a key, running any destructor. Returns whether it existed
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(i) = self.index.remove(name) else {
            return false;
        };
        self.entries.remove(i);
        for entry in &self.entries[i..] {
            if let Some(slot) = self.index.get_mut(&entry.name) {
                *slot -= 1;
            }
        }
        true
    }

    /// Number of keys
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key at a given position in insertion order
    pub fn name(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|e| e.name.as_str())
    }

    /// Iterate keys and scalar values in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&PropertyValue>)> {
        self.entries.iter().map(|e| {
            let value = match &e.slot {
                Slot::Value(v) => Some(v),
                _ => None,
            };
            (e.name.as_str(), value)
        })
    }

    /// Drop every entry in insertion order, running destructors
    pub fn close(&mut self) {
        self.index.clear();
        for entry in self.entries.drain(..) {
            log::trace!("Releasing property '{}'", entry.name);
            drop(entry);
        }
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for entry in &self.entries {
            match &entry.slot {
                Slot::Empty => map.entry(&entry.name, &"<empty>"),
                Slot::Value(v) => map.entry(&entry.name, v),
                Slot::Data(_) => map.entry(&entry.name, &"<data>"),
            };
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_insertion_order() {
        let mut props = Properties::new();
        props.set("b", "1");
        props.set("a", "2");
        props.set("c", "3");
        props.set("a", "4");

        let names: Vec<_> = props.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(props.get("a").as_deref(), Some("4"));
        assert_eq!(props.name(2), Some("c"));
    }

    #[test]
    fn test_typed_access() {
        let mut props = Properties::new();
        props.set_int("width", 720);
        props.set("height", "576");
        props.set("junk", "abc");
        props.set_double("aspect", 1.25);

        assert_eq!(props.get_int("width"), 720);
        assert_eq!(props.get_int("height"), 576);
        assert_eq!(props.get_int("junk"), 0);
        assert_eq!(props.get_int("missing"), 0);
        assert_eq!(props.get("width").as_deref(), Some("720"));
        assert_eq!(props.get_double("aspect"), 1.25);
        assert_eq!(props.get_str("width"), None);
    }

    #[test]
    fn test_set_or_default() {
        let mut props = Properties::new();
        props.set_or_default("x", None, "fallback");
        props.set_or_default("y", Some(""), "fallback");
        props.set_or_default("z", Some("given"), "fallback");

        assert_eq!(props.get_str("x"), Some("fallback"));
        assert_eq!(props.get_str("y"), Some("fallback"));
        assert_eq!(props.get_str("z"), Some("given"));
    }

    #[test]
    fn test_clear_keeps_key() {
        let mut props = Properties::new();
        props.set("card", "bars");
        props.clear("card");
        props.clear("other");

        assert!(props.contains("card"));
        assert!(props.contains("other"));
        assert_eq!(props.get("card"), None);
        assert_eq!(props.count(), 2);
    }

    #[test]
    fn test_data_destructor_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut props = Properties::new();

        let c = calls.clone();
        props.set_data_with("blob", vec![1u8, 2, 3], move |v| {
            assert_eq!(v.len(), 3);
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(props.get_data::<Vec<u8>>("blob").map(|v| v.len()), Some(3));

        // Replacing the value releases the old data
        props.set("blob", "text");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let c = calls.clone();
        props.set_data_with("other", 5u32, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        drop(props);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_reindexes() {
        let mut props = Properties::new();
        props.set("a", 1i64);
        props.set("b", 2i64);
        props.set("c", 3i64);

        assert!(props.remove("a"));
        assert!(!props.remove("a"));
        props.set("c", 30i64);

        assert_eq!(props.count(), 2);
        assert_eq!(props.name(0), Some("b"));
        assert_eq!(props.get_int("c"), 30);
    }

    #[test]
    fn test_close_in_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut props = Properties::new();
        for name in ["first", "second", "third"] {
            let o = order.clone();
            props.set_data_with(name, name.to_string(), move |n| o.lock().push(n));
        }
        props.close();

        assert!(props.is_empty());
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }
}
