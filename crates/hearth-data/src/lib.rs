//! Data-file loading for hearth.
//!
//! Reads items, fluids, traits, fuels, sealed barrel recipes and tuning
//! config from a directory of RON, TOML or JSON files and produces a frozen
//! [`hearth_core::registry::Registry`] plus a [`hearth_core::config::HearthConfig`].

pub mod loader;
pub mod resolve;
pub mod schema;

pub use loader::{DataLoadError, GameData, load_game_data};
