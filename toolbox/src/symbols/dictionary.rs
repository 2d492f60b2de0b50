use hashbrown::HashMap;
use std::sync::Mutex;
use tracing::warn;

struct Inner<V> {
    names: Vec<String>,
    map: HashMap<String, V>,
}

/// A string-keyed map with a deterministic, insertion-ordered key list.
///
/// `add_value_with_name` is thread-safe through one internal mutex; it is
/// the only mutation path used while sweeps are running. The first value
/// stored under a name wins; later additions warn and are dropped.
pub struct Dictionary<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> Default for Dictionary<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Dictionary<V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                names: Vec::new(),
                map: HashMap::new(),
            }),
        }
    }

    /// Stores `value` under `name` unless the name is already present.
    pub fn add_value_with_name(&self, name: &str, value: V) {
        let mut inner = self.inner.lock().unwrap();
        if inner.map.contains_key(name) {
            warn!(name, "dictionary name already present; keeping first value");
            return;
        }
        inner.names.push(name.to_string());
        inner.map.insert(name.to_string(), value);
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.inner.lock().unwrap().map.contains_key(name)
    }

    /// Keys in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.inner.lock().unwrap().names.clone()
    }
}

impl<V: Clone> Dictionary<V> {
    pub fn value_for_name(&self, name: &str) -> Option<V> {
        self.inner.lock().unwrap().map.get(name).cloned()
    }

    /// `(name, value)` pairs in insertion order.
    pub fn entries(&self) -> Vec<(String, V)> {
        let inner = self.inner.lock().unwrap();
        inner
            .names
            .iter()
            .map(|n| (n.clone(), inner.map[n].clone()))
            .collect()
    }
}

impl<V: Clone> Clone for Dictionary<V> {
    fn clone(&self) -> Self {
        let inner = self.inner.lock().unwrap();
        Self {
            inner: Mutex::new(Inner {
                names: inner.names.clone(),
                map: inner.map.clone(),
            }),
        }
    }
}

impl<V> std::fmt::Debug for Dictionary<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("names", &self.names())
            .finish()
    }
}
