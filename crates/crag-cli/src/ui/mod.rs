//! # CLI UI Module
//!
//! Styling and formatting layer for `crag` output.
//!
//! ## Design Principles
//!
//! 1. **Scannable**: the gate decision is visible at a glance
//! 2. **Accessible**: works without colors (respects `NO_COLOR`)
//! 3. **Scriptable**: `--json` output carries everything the text view shows
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection and terminal capability checks
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Utility formatters (time, truncation)
//! - `table`: Evidence and log tables with comfy-table
//! - `tree`: Resolution trace rendering
//! - `progress`: Spinners for slow judge and search calls

pub mod color;
pub mod format;
pub mod progress;
pub mod style;
pub mod table;
pub mod tree;

pub use color::ColorMode;
pub use progress::{Progress, ProgressMode};
pub use style::{MessageType, Style};
