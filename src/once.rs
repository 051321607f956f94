//! Per-build lazily-initialized value cache with single-flight semantics.
//!
//! A `OnceMap` computes each keyed value at most once per map. The first
//! caller for a key runs the computation; concurrent callers for the same
//! key block until it completes and then share the cached value. A failed
//! (or panicking) computation does not wedge the key: its waiters receive a
//! failure result, and later callers get to retry the computation.
//!
//! Configuration-scoped registries (such as the partition directory
//! overrides used by install paths) are built on top of this map.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Condvar, Mutex};

use crate::error::{Error, Result};

/// Key for process-wide once-cache entries. Keys with the same name refer
/// to the same cache slot within one map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OnceKey {
    name: &'static str,
}

impl OnceKey {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl fmt::Display for OnceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug)]
enum Entry<V> {
    /// Some caller is computing the value; waiters block on the condvar.
    InProgress,
    Done(V),
}

/// A keyed compute-once cache with per-key single-flight coordination.
#[derive(Debug)]
pub struct OnceMap<K, V> {
    state: Mutex<HashMap<K, Entry<V>>>,
    ready: Condvar,
}

impl<K, V> Default for OnceMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OnceMap<K, V> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HashMap::new()),
            ready: Condvar::new(),
        }
    }
}

impl<K, V> OnceMap<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    /// Returns the cached value for `key`, computing it with `compute` if
    /// this is the first call. Concurrent callers for the same key block
    /// until the computation finishes. If the computation fails, the
    /// computing caller receives the error, blocked waiters receive
    /// `Error::OnceFailed`, and the key is cleared so later calls retry.
    pub fn once<F>(&self, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        {
            let mut state = self.lock()?;
            let mut waited = false;
            loop {
                match state.get(&key) {
                    Some(Entry::Done(value)) => return Ok(value.clone()),
                    Some(Entry::InProgress) => {
                        waited = true;
                        state = self
                            .ready
                            .wait(state)
                            .map_err(|_| poisoned())?;
                    }
                    None if waited => {
                        // The computation we were waiting on failed. The key
                        // is clear again, so a later call may retry.
                        return Err(Error::OnceFailed {
                            key: format!("{:?}", key),
                        });
                    }
                    None => {
                        state.insert(key.clone(), Entry::InProgress);
                        break;
                    }
                }
            }
        }

        // Compute outside the lock. The guard clears the in-progress marker
        // if `compute` unwinds, so a panic cannot wedge the key.
        let mut guard = ClearOnDrop {
            map: self,
            key: Some(key.clone()),
        };
        let result = compute();

        let mut state = self.lock()?;
        match result {
            Ok(value) => {
                state.insert(key, Entry::Done(value.clone()));
                guard.key = None;
                self.ready.notify_all();
                Ok(value)
            }
            Err(err) => {
                state.remove(&key);
                guard.key = None;
                self.ready.notify_all();
                Err(err)
            }
        }
    }

    /// Returns the cached value for `key` if a computation has completed,
    /// without blocking or computing.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        let state = self.lock()?;
        match state.get(key) {
            Some(Entry::Done(value)) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    /// Number of completed entries.
    pub fn len(&self) -> Result<usize> {
        let state = self.lock()?;
        Ok(state
            .values()
            .filter(|e| matches!(e, Entry::Done(_)))
            .count())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<K, Entry<V>>>> {
        self.state.lock().map_err(|_| poisoned())
    }
}

fn poisoned() -> Error {
    Error::LockPoisoned {
        context: "once cache".to_string(),
    }
}

struct ClearOnDrop<'a, K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    map: &'a OnceMap<K, V>,
    key: Option<K>,
}

impl<K, V> Drop for ClearOnDrop<'_, K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            if let Ok(mut state) = self.map.state.lock() {
                state.remove(&key);
                self.map.ready.notify_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_once_computes_once() {
        let map: OnceMap<OnceKey, u32> = OnceMap::new();
        let key = OnceKey::new("value");
        let calls = AtomicUsize::new(0);

        let first = map
            .once(key, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
            .unwrap();
        let second = map
            .once(key, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .unwrap();

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(map.len().unwrap(), 1);
    }

    #[test]
    fn test_distinct_keys_are_independent() {
        let map: OnceMap<OnceKey, &'static str> = OnceMap::new();
        let a = map.once(OnceKey::new("a"), || Ok("a-value")).unwrap();
        let b = map.once(OnceKey::new("b"), || Ok("b-value")).unwrap();
        assert_eq!(a, "a-value");
        assert_eq!(b, "b-value");
        assert_eq!(map.len().unwrap(), 2);
    }

    #[test]
    fn test_failure_does_not_wedge_key() {
        let map: OnceMap<OnceKey, u32> = OnceMap::new();
        let key = OnceKey::new("flaky");

        let err = map
            .once(key, || {
                Err(Error::GlobExpansion {
                    message: "transient".to_string(),
                })
            })
            .unwrap_err();
        assert!(matches!(err, Error::GlobExpansion { .. }));
        assert_eq!(map.get(&key).unwrap(), None);

        // A later call retries and can succeed.
        let value = map.once(key, || Ok(9)).unwrap();
        assert_eq!(value, 9);
    }

    #[test]
    fn test_panic_does_not_wedge_key() {
        let map: Arc<OnceMap<OnceKey, u32>> = Arc::new(OnceMap::new());
        let key = OnceKey::new("panicky");

        let map_clone = Arc::clone(&map);
        let result = thread::spawn(move || {
            map_clone.once(key, || panic!("computation exploded"))
        })
        .join();
        assert!(result.is_err());

        let value = map.once(key, || Ok(3)).unwrap();
        assert_eq!(value, 3);
    }

    #[test]
    fn test_concurrent_callers_share_one_computation() {
        let map: Arc<OnceMap<OnceKey, u32>> = Arc::new(OnceMap::new());
        let key = OnceKey::new("shared");
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let map = Arc::clone(&map);
            let calls = Arc::clone(&calls);
            handles.push(thread::spawn(move || {
                map.once(key, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // Hold the computation open long enough for the other
                    // threads to pile up as waiters.
                    thread::sleep(Duration::from_millis(20));
                    Ok(11)
                })
                .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 11);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_waiters_of_failed_computation_get_failure() {
        let map: Arc<OnceMap<OnceKey, u32>> = Arc::new(OnceMap::new());
        let key = OnceKey::new("doomed");
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let computing = {
            let map = Arc::clone(&map);
            thread::spawn(move || {
                map.once(key, || {
                    release_rx.recv().ok();
                    Err(Error::GlobExpansion {
                        message: "boom".to_string(),
                    })
                })
            })
        };

        // Give the computing thread time to claim the key, then pile on a
        // waiter before releasing the failure.
        thread::sleep(Duration::from_millis(20));
        let waiter = {
            let map = Arc::clone(&map);
            thread::spawn(move || map.once(key, || Ok(1)))
        };
        thread::sleep(Duration::from_millis(20));
        release_tx.send(()).unwrap();

        let computed = computing.join().unwrap();
        assert!(matches!(computed, Err(Error::GlobExpansion { .. })));

        let waited = waiter.join().unwrap();
        assert!(matches!(waited, Err(Error::OnceFailed { .. })));

        // The key is clear for a fresh caller.
        assert_eq!(map.once(key, || Ok(5)).unwrap(), 5);
    }
}
