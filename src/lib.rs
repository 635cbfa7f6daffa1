//! Node Graph Widgets Library
//!
//! Interaction extensions for node-graph canvases: pointer gesture
//! classification, drag-to-reorder lists and tags, and boolean toggle
//! panels kept consistent by a rule engine.

pub mod app;
pub mod constraints;
pub mod extensions;
pub mod gesture;
pub mod host;
pub mod persistence;
pub mod reorder;
