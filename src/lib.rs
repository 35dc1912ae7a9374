//! Terminal browser for OPDS publication catalogs.
//!
//! - [`catalog`] parses OPDS 1.x (Atom) and OPDS 2.0 (JSON) documents into one model
//! - [`fetch`] downloads and parses catalogs over HTTP
//! - [`browser`] classifies feeds, lays them out, and handles paging and navigation
//! - [`ui`] is the ratatui front end

pub mod app;
pub mod browser;
pub mod catalog;
pub mod config;
pub mod fetch;
pub mod keybindings;
pub mod ui;
pub mod util;
