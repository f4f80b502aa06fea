//! Streaming infrastructure
//!
//! - Servers: catalog of embed servers and URL resolution
//! - Player: opening resolved URLs in a browser or mpv

pub mod player;
pub mod servers;

pub use player::{LocalPlayer, PlayerError, PlayerType};
pub use servers::{resolve, Catalog, ServerDescriptor, StreamTarget};
