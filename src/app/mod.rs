//! Application module
//!
//! Contains the demo egui application and the theme shared by every
//! extension's drawing code.

pub mod demo_app;
pub mod theme;

pub use demo_app::DemoApp;
