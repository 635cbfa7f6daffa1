//! Persistence module
//!
//! Versioned per-node state and whole-canvas save/load using serde and JSON.

pub mod state;

pub use state::{
    from_json, is_readable, item_order_or_identity, load_from_file, read_item_order,
    save_to_file, write_item_order, write_version, GraphDocument, NodeRecord, StateError,
    StateMap, STATE_VERSION,
};
