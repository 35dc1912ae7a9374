//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `helpers` - Spawning fetches for the current view
//! - `render` - Layout and overlay dispatch
//! - `catalog` - Section and row list for the current feed
//! - `facets` - Filter menu overlay
//! - `detail` - Publication detail overlay
//! - `help` - Keybinding help overlay
//! - `status` - Status bar widget

mod catalog;
mod detail;
mod events;
mod facets;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod status;

// Re-export the public API
pub use loop_runner::{run, Action};
