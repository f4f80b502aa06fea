//! Terminal UI components
//!
//! Built with ratatui. Keyboard-first navigation throughout.

pub mod browser;
pub mod detail;
pub mod filters;
pub mod theme;

pub use browser::{BrowserItem, BrowserView};
pub use theme::Theme;
