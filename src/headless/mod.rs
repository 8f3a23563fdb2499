//! Headless mode for scripted testing
//!
//! Runs a scenario (units plus a timeline of player inputs) without any
//! graphical output, suitable for automated testing.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --scenario scenarios/demo.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "name": "firebolt_duel",
//!   "units": [
//!     { "name": "Mage", "faction": "Player", "position": [0, 0], "loadout": ["firebolt"] },
//!     { "name": "Brute", "faction": "Hostile", "position": [20, 0] }
//!   ],
//!   "steps": [
//!     { "at": 0.0, "action": "Select", "unit": "Mage" },
//!     { "at": 0.1, "action": "UseSlot", "slot": 0 },
//!     { "at": 0.2, "action": "ConfirmOnUnit", "unit": "Brute" }
//!   ],
//!   "max_duration_secs": 10
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::{ScenarioAction, ScenarioConfig, ScenarioStep, UnitSpawn};
pub use runner::{
    build_scenario_app, run_headless_scenario, run_scenario, save_scenario_log, AbilityUse, ScenarioResult,
    UnitResult,
};
