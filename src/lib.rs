//! Tactics Abilities - per-unit ability management for a real-time tactics game
//!
//! The `abilities` module is the engine-agnostic core (slots, targeting,
//! casting, cooldowns, move-to-range, paused command queue). `combat` hosts it
//! in a Bevy app; `headless` drives that app from scripted scenarios.
//!
//! This library exposes the modules for testing and reuse.

pub mod abilities;
pub mod cli;
pub mod combat;
pub mod headless;
pub mod keybindings;
pub mod sandbox;
pub mod settings;

// Re-export commonly used types
pub use abilities::{AbilityCore, AbilityDefinitions, AbilityWorld};
pub use combat::log::{AbilityLog, AbilityLogEventType};
pub use combat::{AbilityPlugin, SimulationSpeed};
pub use headless::{ScenarioConfig, ScenarioResult};
