//! # mlt_pool - Process-wide Buffer Pool
//!
//! Fixed size-class pool for the byte buffers that frames and images are
//! built from. Requests are rounded up to a power-of-two class and released
//! buffers are cached per class for reuse.
//!
//! The pool is process-wide and reference counted: every [`init`] must be
//! paired with a [`close`], and cached buffers are purged when the last
//! owner closes. Buffers outstanding at that point are simply freed when
//! they are dropped.

use parking_lot::{const_mutex, Mutex};
use std::ops::{Deref, DerefMut};

/// Smallest size class in bytes
pub const MIN_CLASS_SIZE: usize = 64;

/// Number of size classes; larger requests bypass the pool
pub const CLASS_COUNT: usize = 20;

struct State {
    starts: usize,
    classes: Vec<Vec<Vec<u8>>>,
    outstanding: usize,
}

static POOL: Mutex<State> = const_mutex(State {
    starts: 0,
    classes: Vec::new(),
    outstanding: 0,
});

/// Pool statistics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Whether at least one owner has the pool started
    pub running: bool,
    /// Size classes holding cached buffers
    pub classes: usize,
    /// Cached buffers across all classes
    pub cached_buffers: usize,
    /// Bytes held by cached buffers
    pub cached_bytes: usize,
    /// Buffers handed out and not yet dropped
    pub outstanding: usize,
}

/// Size class for a request, or `None` if it is too large to pool
fn class_of(size: usize) -> Option<usize> {
    let rounded = size.max(MIN_CLASS_SIZE).checked_next_power_of_two()?;
    let class = (rounded.trailing_zeros() - MIN_CLASS_SIZE.trailing_zeros()) as usize;
    (class < CLASS_COUNT).then_some(class)
}

fn class_size(class: usize) -> usize {
    MIN_CLASS_SIZE << class
}

/// Start the pool (or add an owner to a running pool)
pub fn init() {
    let mut state = POOL.lock();
    if state.starts == 0 {
        state.classes = (0..CLASS_COUNT).map(|_| Vec::new()).collect();
        log::debug!("Buffer pool started with {} size classes", CLASS_COUNT);
    }
    state.starts += 1;
}

/// Release one owner; the last one purges the cache
pub fn close() {
    let mut state = POOL.lock();
    match state.starts {
        0 => {}
        1 => {
            state.starts = 0;
            let classes = std::mem::take(&mut state.classes);
            let outstanding = state.outstanding;
            drop(state);
            drop(classes);
            log::debug!("Buffer pool closed ({} buffer(s) still outstanding)", outstanding);
        }
        _ => state.starts -= 1,
    }
}

/// Check whether the pool is running
pub fn is_running() -> bool {
    POOL.lock().starts > 0
}

/// Drop every cached buffer without stopping the pool
pub fn purge() {
    let mut state = POOL.lock();
    for class in state.classes.iter_mut() {
        class.clear();
    }
}

/// Allocate a zeroed buffer of `size` bytes
pub fn alloc(size: usize) -> PoolBuffer {
    let class = class_of(size);
    let mut state = POOL.lock();
    state.outstanding += 1;

    let cached = match class {
        Some(c) if state.starts > 0 => state.classes.get_mut(c).and_then(|v| v.pop()),
        _ => None,
    };
    drop(state);

    let mut data = match (cached, class) {
        (Some(buf), _) => buf,
        (None, Some(c)) => Vec::with_capacity(class_size(c)),
        (None, None) => Vec::with_capacity(size),
    };
    data.clear();
    data.resize(size, 0);

    PoolBuffer { data, class }
}

/// Current pool statistics
pub fn stats() -> PoolStats {
    let state = POOL.lock();
    let cached_buffers = state.classes.iter().map(|c| c.len()).sum();
    let cached_bytes = state
        .classes
        .iter()
        .enumerate()
        .map(|(i, c)| c.len() * class_size(i))
        .sum();
    PoolStats {
        running: state.starts > 0,
        classes: state.classes.iter().filter(|c| !c.is_empty()).count(),
        cached_buffers,
        cached_bytes,
        outstanding: state.outstanding,
    }
}

/// A buffer borrowed from the pool; returned to its class on drop
pub struct PoolBuffer {
    data: Vec<u8>,
    class: Option<usize>,
}

impl PoolBuffer {
    /// Bytes usable without reallocating
    pub fn capacity(&self) -> usize {
        self.class.map_or(self.data.capacity(), class_size)
    }

    /// Resize, keeping existing contents; grows into a larger class if needed
    pub fn resize(&mut self, size: usize) {
        if size <= self.capacity() {
            self.data.resize(size, 0);
            return;
        }

        let mut bigger = alloc(size);
        let len = self.data.len();
        bigger.data[..len].copy_from_slice(&self.data);
        std::mem::swap(self, &mut bigger);
    }
}

impl Deref for PoolBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for PoolBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        let data = std::mem::take(&mut self.data);
        let mut state = POOL.lock();
        state.outstanding = state.outstanding.saturating_sub(1);

        if let Some(c) = self.class {
            if state.starts > 0 {
                if let Some(cache) = state.classes.get_mut(c) {
                    cache.push(data);
                }
            }
        }
    }
}

impl std::fmt::Debug for PoolBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolBuffer")
            .field("len", &self.data.len())
            .field("class", &self.class)
            .finish()
    }
}
