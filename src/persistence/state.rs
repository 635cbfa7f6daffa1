//! Versioned node state.
//!
//! Each node persists a flat JSON object that the host stores with the
//! graph. Extensions read and write their own keys through the helpers in
//! this module; the object as a whole carries a `stateVersion` so newer
//! layouts can be told apart from older ones.
//!
//! A graph-level [`GraphDocument`] bundles the per-node objects for
//! saving a whole canvas to disk.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::host::NodeMode;
use crate::reorder::{OrderedList, ReorderError};

/// Current node state layout version.
/// Increment this when making breaking changes to the layout.
pub const STATE_VERSION: u32 = 1;

pub const KEY_STATE_VERSION: &str = "stateVersion";
pub const KEY_ITEM_ORDER: &str = "itemOrder";
pub const KEY_FLAGS: &str = "flags";
pub const KEY_COLLAPSED: &str = "collapsedSlots";
pub const KEY_EXPANDED_HEIGHT: &str = "expandedHeight";
pub const KEY_CROP_DATA: &str = "cropData";

/// A node's persisted state.
pub type StateMap = Map<String, Value>;

/// Error type for state operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("incompatible state version: found {found}, expected <= {expected}")]
    IncompatibleVersion { found: u64, expected: u32 },
    #[error("field '{key}' has the wrong type, expected {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("field '{key}': {source}")]
    InvalidOrder {
        key: String,
        #[source]
        source: ReorderError,
    },
}

fn wrong_type(key: &str, expected: &'static str) -> StateError {
    StateError::WrongType {
        key: key.to_string(),
        expected,
    }
}

/// Version stored in `state`. A missing version means a legacy (v0) blob.
pub fn state_version(state: &StateMap) -> Result<u64, StateError> {
    match state.get(KEY_STATE_VERSION) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .ok_or_else(|| wrong_type(KEY_STATE_VERSION, "a non-negative integer")),
    }
}

/// Checks that `state` can be read by this build.
pub fn check_version(state: &StateMap) -> Result<u64, StateError> {
    let found = state_version(state)?;
    if found > u64::from(STATE_VERSION) {
        return Err(StateError::IncompatibleVersion {
            found,
            expected: STATE_VERSION,
        });
    }
    Ok(found)
}

/// Whether `state` should be applied. Incompatible blobs are logged and
/// the caller keeps its defaults.
pub fn is_readable(state: &StateMap, owner: &str) -> bool {
    match check_version(state) {
        Ok(_) => true,
        Err(err) => {
            log::warn!("{}: ignoring saved state: {}", owner, err);
            false
        }
    }
}

pub fn write_version(state: &mut StateMap) {
    state.insert(KEY_STATE_VERSION.to_string(), Value::from(STATE_VERSION));
}

/// Reads the item display order for a list of `len` items.
///
/// Accepts a JSON integer array or the comma-separated form the host's
/// hidden text widget uses. Returns `Ok(None)` if the key is absent.
pub fn read_item_order(state: &StateMap, len: usize) -> Result<Option<OrderedList>, StateError> {
    let invalid = |source| StateError::InvalidOrder {
        key: KEY_ITEM_ORDER.to_string(),
        source,
    };
    match state.get(KEY_ITEM_ORDER) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => OrderedList::parse_csv(text, len).map(Some).map_err(invalid),
        Some(Value::Array(entries)) => {
            let order = entries
                .iter()
                .map(|entry| {
                    entry
                        .as_u64()
                        .map(|i| i as usize)
                        .ok_or_else(|| ReorderError::InvalidIndex(entry.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(invalid)?;
            if order.len() != len {
                return Err(invalid(ReorderError::LengthMismatch {
                    found: order.len(),
                    expected: len,
                }));
            }
            OrderedList::from_order(order).map(Some).map_err(invalid)
        }
        Some(_) => Err(wrong_type(KEY_ITEM_ORDER, "an array or a comma-separated string")),
    }
}

/// Like [`read_item_order`], but falls back to the identity order on any
/// problem.
pub fn item_order_or_identity(state: &StateMap, len: usize) -> OrderedList {
    match read_item_order(state, len) {
        Ok(Some(order)) => order,
        Ok(None) => OrderedList::identity(len),
        Err(err) => {
            log::warn!("malformed item order, using identity: {}", err);
            OrderedList::identity(len)
        }
    }
}

pub fn write_item_order(state: &mut StateMap, order: &OrderedList) {
    let entries = order.as_slice().iter().map(|&i| Value::from(i)).collect();
    state.insert(KEY_ITEM_ORDER.to_string(), Value::Array(entries));
}

/// Reads the flag table stored under `flags`, in stored order.
pub fn read_flags(state: &StateMap) -> Result<Vec<(String, bool)>, StateError> {
    match state.get(KEY_FLAGS) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Object(flags)) => flags
            .iter()
            .map(|(name, value)| {
                value
                    .as_bool()
                    .map(|v| (name.clone(), v))
                    .ok_or_else(|| wrong_type(&format!("{}.{}", KEY_FLAGS, name), "a boolean"))
            })
            .collect(),
        Some(_) => Err(wrong_type(KEY_FLAGS, "an object")),
    }
}

pub fn write_flags<'a, I>(state: &mut StateMap, flags: I)
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    let table: Map<String, Value> = flags
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::Bool(value)))
        .collect();
    state.insert(KEY_FLAGS.to_string(), Value::Object(table));
}

pub fn read_bool(state: &StateMap, key: &str) -> Result<Option<bool>, StateError> {
    match state.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_bool().map(Some).ok_or_else(|| wrong_type(key, "a boolean")),
    }
}

pub fn read_f32(state: &StateMap, key: &str) -> Result<Option<f32>, StateError> {
    match state.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_f64()
            .map(|v| Some(v as f32))
            .ok_or_else(|| wrong_type(key, "a number")),
    }
}

pub fn read_strings(state: &StateMap, key: &str) -> Result<Option<Vec<String>>, StateError> {
    match state.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|e| e.as_str().map(str::to_string).ok_or_else(|| wrong_type(key, "an array of strings")))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(wrong_type(key, "an array of strings")),
    }
}

pub fn write_strings<I, S>(state: &mut StateMap, key: &str, values: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let entries = values.into_iter().map(|s| Value::String(s.into())).collect();
    state.insert(key.to_string(), Value::Array(entries));
}

/// Reads a serde-deserializable value stored under `key`.
pub fn read_value<T>(state: &StateMap, key: &str) -> Result<Option<T>, StateError>
where
    T: for<'de> Deserialize<'de>,
{
    match state.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(T::deserialize(value.clone())?)),
    }
}

pub fn write_value<T: Serialize>(state: &mut StateMap, key: &str, value: &T) -> Result<(), StateError> {
    state.insert(key.to_string(), serde_json::to_value(value)?);
    Ok(())
}

/// A saved canvas: every node with its extension state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Layout version of the document itself.
    pub version: u32,
    pub nodes: Vec<NodeRecord>,
}

impl GraphDocument {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            nodes: Vec::new(),
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.version <= STATE_VERSION
    }
}

/// One node of a [`GraphDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    pub node_type: String,
    pub title: String,
    pub size: (f32, f32),
    #[serde(default)]
    pub mode: NodeMode,
    #[serde(default)]
    pub state: StateMap,
}

/// Save a document to a JSON file.
pub fn save_to_file(document: &GraphDocument, path: &Path) -> Result<(), StateError> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json)?;
    log::debug!("saved {} nodes to {}", document.nodes.len(), path.display());
    Ok(())
}

/// Load a document from a JSON file.
pub fn load_from_file(path: &Path) -> Result<GraphDocument, StateError> {
    let json = std::fs::read_to_string(path)?;
    from_json(&json)
}

/// Parse a document, rejecting versions newer than this build.
pub fn from_json(json: &str) -> Result<GraphDocument, StateError> {
    let document: GraphDocument = serde_json::from_str(json)?;
    if !document.is_compatible() {
        return Err(StateError::IncompatibleVersion {
            found: u64::from(document.version),
            expected: STATE_VERSION,
        });
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> StateMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_missing_version_is_legacy() {
        let state = map(json!({ "itemOrder": [0, 1] }));
        assert_eq!(state_version(&state).unwrap(), 0);
        assert!(is_readable(&state, "test"));
    }

    #[test]
    fn test_future_version_rejected() {
        let state = map(json!({ "stateVersion": STATE_VERSION + 1 }));
        assert!(matches!(
            check_version(&state),
            Err(StateError::IncompatibleVersion { .. })
        ));
        assert!(!is_readable(&state, "test"));
    }

    #[test]
    fn test_item_order_array_and_csv() {
        let state = map(json!({ "itemOrder": [2, 0, 1, 3] }));
        let order = read_item_order(&state, 4).unwrap().unwrap();
        assert_eq!(order.as_slice(), &[2, 0, 1, 3]);

        let state = map(json!({ "itemOrder": "2,0,1,3" }));
        let order = read_item_order(&state, 4).unwrap().unwrap();
        assert_eq!(order.to_csv(), "2,0,1,3");

        assert!(read_item_order(&StateMap::new(), 4).unwrap().is_none());
    }

    #[test]
    fn test_malformed_order_falls_back() {
        for bad in [json!([0, 0, 1, 2]), json!([0, 1]), json!("a,b"), json!(7), json!([-1, 0, 1, 2])] {
            let mut state = StateMap::new();
            state.insert(KEY_ITEM_ORDER.to_string(), bad);
            assert!(read_item_order(&state, 4).is_err());
            assert_eq!(item_order_or_identity(&state, 4).as_slice(), &[0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_write_item_order() {
        let mut state = StateMap::new();
        write_item_order(&mut state, &OrderedList::from_order(vec![1, 0]).unwrap());
        write_version(&mut state);
        assert_eq!(Value::Object(state), json!({ "itemOrder": [1, 0], "stateVersion": 1 }));
    }

    #[test]
    fn test_flags() {
        let mut state = StateMap::new();
        write_flags(&mut state, [("enable_a", true), ("enable_b", false)]);
        let flags = read_flags(&state).unwrap();
        assert!(flags.contains(&("enable_a".to_string(), true)));
        assert!(flags.contains(&("enable_b".to_string(), false)));

        let state = map(json!({ "flags": { "a": 1 } }));
        assert!(matches!(read_flags(&state), Err(StateError::WrongType { .. })));
    }

    #[test]
    fn test_scalar_helpers() {
        let state = map(json!({ "collapsedSlots": true, "value": 0.25, "texts": ["a", "b"] }));
        assert_eq!(read_bool(&state, KEY_COLLAPSED).unwrap(), Some(true));
        assert_eq!(read_f32(&state, "value").unwrap(), Some(0.25));
        assert_eq!(read_strings(&state, "texts").unwrap(), Some(vec!["a".to_string(), "b".to_string()]));
        assert!(read_bool(&state, "value").is_err());
        assert_eq!(read_bool(&state, "missing").unwrap(), None);
    }

    #[test]
    fn test_document_version_check() {
        let mut document = GraphDocument::new();
        document.nodes.push(NodeRecord {
            id: 1,
            node_type: "A1r Draggable List".to_string(),
            title: "List".to_string(),
            size: (300.0, 280.0),
            mode: NodeMode::Bypass,
            state: StateMap::new(),
        });
        let json = serde_json::to_string(&document).unwrap();
        let loaded = from_json(&json).unwrap();
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.nodes[0].mode, NodeMode::Bypass);

        let future = json!({ "version": STATE_VERSION + 1, "nodes": [] }).to_string();
        assert!(matches!(from_json(&future), Err(StateError::IncompatibleVersion { .. })));
    }
}
