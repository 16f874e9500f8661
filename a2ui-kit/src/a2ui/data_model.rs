//! A2UI Data Model
//!
//! The DataModel is a reactive data store using JSON Pointer paths for access.
//! Components subscribe to paths and are automatically notified when data changes.

use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Unescapes one JSON Pointer segment (`~1` -> `/`, then `~0` -> `~`).
pub fn unescape_segment(segment: &str) -> String {
    if !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace("~1", "/").replace("~0", "~")
}

/// Escapes one JSON Pointer segment.
pub fn escape_segment(segment: &str) -> String {
    if !segment.contains('/') && !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace('~', "~0").replace('/', "~1")
}

/// Parse a JSON Pointer path into unescaped segments.
///
/// The empty string and `/` both address the root. A missing leading `/` is
/// tolerated (`a/b` is read as `/a/b`).
pub fn parse_pointer(path: &str) -> Vec<String> {
    if path.is_empty() || path == "/" {
        return Vec::new();
    }
    path.strip_prefix('/')
        .unwrap_or(path)
        .split('/')
        .map(unescape_segment)
        .collect()
}

/// Format unescaped segments back into a JSON Pointer path.
pub fn format_pointer(segments: &[String]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&escape_segment(segment));
    }
    out
}

/// Normalize a path for use as a subscription key.
pub fn normalize_path(path: &str) -> String {
    format_pointer(&parse_pointer(path))
}

fn is_array_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn empty_container_for(next_segment: &str) -> Value {
    if is_array_index(next_segment) {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

/// A JSON document addressed by JSON Pointer paths.
///
/// # Path Format
///
/// Paths follow JSON Pointer (RFC 6901) format:
/// - `/` - root
/// - `/foo` - property "foo"
/// - `/foo/bar` - nested property
/// - `/items/0` - array element at index 0
/// - `/a~1b` - property "a/b"
///
/// # Example
///
/// ```rust,ignore
/// let mut model = DataModel::new();
///
/// model.set("/user/name", json!("Alice"));
/// model.set("/items/0/id", json!(1));
///
/// assert_eq!(model.get("/user/name"), Some(&json!("Alice")));
/// assert_eq!(model.get("/items"), Some(&json!([{"id": 1}])));
/// ```
#[derive(Debug, Clone)]
pub struct DataModel {
    /// The root data value
    data: Value,

    /// Version counter, bumped on every write
    version: u64,
}

impl Default for DataModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DataModel {
    /// Create a new empty data model
    pub fn new() -> Self {
        DataModel {
            data: Value::Object(Map::new()),
            version: 0,
        }
    }

    /// Create a data model with initial data
    pub fn with_data(data: Value) -> Self {
        DataModel { data, version: 0 }
    }

    /// Get the current version number
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Get a value at the given path
    ///
    /// Returns `None` when any segment along the way is missing.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.data;
        for segment in parse_pointer(path) {
            current = match current {
                Value::Object(map) => map.get(&segment)?,
                Value::Array(arr) => {
                    let index: usize = segment.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set a value at the given path
    ///
    /// Creates intermediate objects/arrays as needed: a missing, `null` or
    /// scalar intermediate becomes an array when the following segment is
    /// numeric, an object otherwise. Returns `false` when the path cannot
    /// hold a value (a non-numeric segment under an array).
    pub fn set(&mut self, path: &str, value: Value) -> bool {
        let segments = parse_pointer(path);
        self.version += 1;

        let Some((last, parents)) = segments.split_last() else {
            self.data = value;
            return true;
        };

        let mut current = &mut self.data;
        for (i, segment) in parents.iter().enumerate() {
            let next_segment = segments[i + 1].as_str();
            if !current.is_object() && !current.is_array() {
                *current = Value::Object(Map::new());
            }
            current = match current {
                Value::Object(map) => {
                    let slot = map
                        .entry(segment.clone())
                        .or_insert_with(|| empty_container_for(next_segment));
                    if !slot.is_object() && !slot.is_array() {
                        *slot = empty_container_for(next_segment);
                    }
                    slot
                }
                Value::Array(arr) => {
                    let Ok(index) = segment.parse::<usize>() else {
                        return false;
                    };
                    while arr.len() <= index {
                        arr.push(Value::Null);
                    }
                    let slot = &mut arr[index];
                    if !slot.is_object() && !slot.is_array() {
                        *slot = empty_container_for(next_segment);
                    }
                    slot
                }
                _ => return false,
            };
        }

        if !current.is_object() && !current.is_array() {
            *current = empty_container_for(last);
        }
        match current {
            Value::Object(map) => {
                map.insert(last.clone(), value);
                true
            }
            Value::Array(arr) => {
                let Ok(index) = last.parse::<usize>() else {
                    return false;
                };
                while arr.len() <= index {
                    arr.push(Value::Null);
                }
                arr[index] = value;
                true
            }
            _ => false,
        }
    }

    /// Get the entire data as a Value
    pub fn as_value(&self) -> &Value {
        &self.data
    }

    /// Replace the entire data model
    pub fn replace(&mut self, data: Value) {
        self.data = data;
        self.version += 1;
    }
}

type PathListener = Rc<dyn Fn(Option<&Value>)>;
type ChangeListener = Rc<dyn Fn()>;

#[derive(Default)]
struct StoreInner {
    model: RefCell<DataModel>,
    path_listeners: RefCell<BTreeMap<String, Vec<(u64, PathListener)>>>,
    change_listeners: RefCell<Vec<(u64, ChangeListener)>>,
    next_listener_id: Cell<u64>,
}

impl StoreInner {
    fn next_id(&self) -> u64 {
        let id = self.next_listener_id.get();
        self.next_listener_id.set(id + 1);
        id
    }
}

/// Shared, observable handle to a surface's [`DataModel`].
///
/// Cloning the handle shares the same document. Every [`set`](Self::set)
/// notifies all path subscribers with the freshly resolved value at their
/// path, then all change listeners. Notification runs after the write has
/// completed and with no internal borrow held, so listeners may read or
/// write the store again.
#[derive(Clone, Default)]
pub struct DataModelStore {
    inner: Rc<StoreInner>,
}

impl fmt::Debug for DataModelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataModelStore")
            .field("data", self.inner.model.borrow().as_value())
            .field("version", &self.version())
            .finish()
    }
}

impl DataModelStore {
    /// Create a store over an empty object document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with initial data.
    pub fn with_data(data: Value) -> Self {
        let store = Self::default();
        *store.inner.model.borrow_mut() = DataModel::with_data(data);
        store
    }

    /// Read the value at `path`. `None` means the path does not exist.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.inner.model.borrow().get(path).cloned()
    }

    /// Write `value` at `path` and notify every subscriber.
    pub fn set(&self, path: &str, value: Value) {
        let written = self.inner.model.borrow_mut().set(path, value);
        if !written {
            log::debug!("data model write to {path:?} had no effect");
        }
        self.notify();
    }

    /// Snapshot of the full document.
    pub fn get_all(&self) -> Value {
        self.inner.model.borrow().as_value().clone()
    }

    /// Number of writes applied so far.
    pub fn version(&self) -> u64 {
        self.inner.model.borrow().version()
    }

    /// Subscribe to the value at `path`.
    ///
    /// The callback fires after every write anywhere in the document.
    #[must_use = "dropping the subscription handle makes it impossible to unsubscribe"]
    pub fn subscribe(&self, path: &str, callback: impl Fn(Option<&Value>) + 'static) -> Subscription {
        let key = normalize_path(path);
        let id = self.inner.next_id();
        self.inner
            .path_listeners
            .borrow_mut()
            .entry(key.clone())
            .or_default()
            .push((id, Rc::new(callback)));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
            key: Some(key),
        }
    }

    /// Register a callback fired after every write, once path subscribers ran.
    #[must_use = "dropping the subscription handle makes it impossible to unsubscribe"]
    pub fn on_change(&self, callback: impl Fn() + 'static) -> Subscription {
        let id = self.inner.next_id();
        self.inner
            .change_listeners
            .borrow_mut()
            .push((id, Rc::new(callback)));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
            key: None,
        }
    }

    fn notify(&self) {
        let path_round: Vec<(String, PathListener)> = self
            .inner
            .path_listeners
            .borrow()
            .iter()
            .flat_map(|(path, listeners)| {
                listeners
                    .iter()
                    .map(move |(_, listener)| (path.clone(), Rc::clone(listener)))
            })
            .collect();
        for (path, listener) in path_round {
            let value = self.get(&path);
            listener(value.as_ref());
        }

        let change_round: Vec<ChangeListener> = self
            .inner
            .change_listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in change_round {
            listener();
        }
    }
}

/// Handle returned by [`DataModelStore::subscribe`] and
/// [`DataModelStore::on_change`].
#[derive(Debug)]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
    key: Option<String>,
}

impl Subscription {
    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let Some(inner) = self.store.upgrade() else {
            return;
        };
        match &self.key {
            Some(key) => {
                let mut listeners = inner.path_listeners.borrow_mut();
                if let Some(entries) = listeners.get_mut(key) {
                    entries.retain(|(id, _)| *id != self.id);
                    if entries.is_empty() {
                        listeners.remove(key);
                    }
                }
            }
            None => inner
                .change_listeners
                .borrow_mut()
                .retain(|(id, _)| *id != self.id),
        }
    }
}
