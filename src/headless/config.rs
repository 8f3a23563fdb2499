//! JSON configuration parsing for headless mode
//!
//! A scenario lists the units to spawn and a timeline of player inputs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::abilities::{AbilityDefinitions, Faction, MAX_SLOTS};

/// Headless scenario loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Label used in the summary and the saved log
    #[serde(default = "default_name")]
    pub name: String,
    pub units: Vec<UnitSpawn>,
    /// Player inputs, applied once wall-clock time reaches `at`
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
    /// Simulation frames per second (default: 60)
    #[serde(default = "default_tick_rate")]
    pub tick_rate: f32,
    /// Wall-clock length of the run in seconds (default: 30)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Custom output path for the ability log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

fn default_name() -> String {
    "scenario".to_string()
}

fn default_tick_rate() -> f32 {
    60.0
}

fn default_max_duration() -> f32 {
    30.0
}

/// A unit placed at the start of the scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSpawn {
    /// Unique name, used by steps to refer to the unit
    pub name: String,
    pub faction: Faction,
    /// [x, z] on the ground plane
    pub position: [f32; 2],
    #[serde(default = "default_pool")]
    pub health: f32,
    #[serde(default = "default_pool")]
    pub resource: f32,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Ability ids in slot order
    #[serde(default)]
    pub loadout: Vec<String>,
}

fn default_pool() -> f32 {
    100.0
}

fn default_move_speed() -> f32 {
    5.0
}

/// One timeline entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Seconds since the start of the run, paused time included
    pub at: f32,
    #[serde(flatten)]
    pub action: ScenarioAction,
}

/// Player inputs a scenario can script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ScenarioAction {
    Select { unit: String },
    Deselect,
    UseSlot { slot: usize },
    /// Move the pointer over empty ground
    PointAt { x: f32, z: f32 },
    /// Move the pointer over a unit
    HoverUnit { unit: String },
    /// Confirm at wherever the pointer is
    Confirm,
    ConfirmAt { x: f32, z: f32 },
    /// Hover a unit and confirm on it
    ConfirmOnUnit { unit: String },
    CancelTargeting,
    CancelCasting {
        #[serde(default)]
        slot: Option<usize>,
    },
    Pause,
    Resume,
    SetSpeed { multiplier: f32 },
    Move { unit: String, x: f32, z: f32 },
    Guard { unit: String, x: f32, z: f32 },
    Patrol { unit: String, waypoints: Vec<[f32; 2]> },
    Attack { unit: String, target: String },
    Stop { unit: String },
    /// Remove a unit from the world
    Despawn { unit: String },
}

impl ScenarioAction {
    /// Unit names the action refers to
    pub fn unit_names(&self) -> Vec<&str> {
        match self {
            ScenarioAction::Select { unit }
            | ScenarioAction::HoverUnit { unit }
            | ScenarioAction::ConfirmOnUnit { unit }
            | ScenarioAction::Move { unit, .. }
            | ScenarioAction::Guard { unit, .. }
            | ScenarioAction::Patrol { unit, .. }
            | ScenarioAction::Stop { unit }
            | ScenarioAction::Despawn { unit } => vec![unit.as_str()],
            ScenarioAction::Attack { unit, target } => vec![unit.as_str(), target.as_str()],
            _ => Vec::new(),
        }
    }
}

impl ScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read scenario file: {}", e))?;

        serde_json::from_str(&contents).map_err(|e| format!("Failed to parse JSON: {}", e))
    }

    /// Validate the scenario against the ability catalog
    pub fn validate(&self, definitions: &AbilityDefinitions) -> Result<(), String> {
        if self.units.is_empty() {
            return Err("scenario must spawn at least one unit".to_string());
        }
        if self.tick_rate <= 0.0 {
            return Err(format!("tick_rate must be positive, got {}", self.tick_rate));
        }
        if self.max_duration_secs <= 0.0 {
            return Err(format!(
                "max_duration_secs must be positive, got {}",
                self.max_duration_secs
            ));
        }

        let mut names = HashSet::new();
        for unit in &self.units {
            if !names.insert(unit.name.as_str()) {
                return Err(format!("duplicate unit name '{}'", unit.name));
            }
            if unit.loadout.len() > MAX_SLOTS {
                return Err(format!(
                    "unit '{}' has {} abilities (max {})",
                    unit.name,
                    unit.loadout.len(),
                    MAX_SLOTS
                ));
            }
            for id in &unit.loadout {
                if definitions.get(id).is_none() {
                    return Err(format!("unit '{}' uses unknown ability '{}'", unit.name, id));
                }
            }
        }

        for step in &self.steps {
            if step.at < 0.0 {
                return Err(format!("step {:?} has a negative time", step.action));
            }
            for name in step.action.unit_names() {
                if !names.contains(name) {
                    return Err(format!("step at {:.2}s refers to unknown unit '{}'", step.at, name));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"{
        "name": "duel",
        "units": [
            { "name": "Mage", "faction": "Player", "position": [0, 0], "loadout": ["bolt"] },
            { "name": "Brute", "faction": "Hostile", "position": [5, 0], "health": 60 }
        ],
        "steps": [
            { "at": 0.0, "action": "Select", "unit": "Mage" },
            { "at": 0.1, "action": "UseSlot", "slot": 0 },
            { "at": 0.2, "action": "ConfirmOnUnit", "unit": "Brute" },
            { "at": 0.3, "action": "CancelCasting" }
        ]
    }"#;

    fn catalog() -> AbilityDefinitions {
        crate::abilities::config::parse_ability_definitions(
            r#"(abilities: {
                "bolt": (name: "Bolt", target: Enemy, range: 10.0, effect: Damage(amount: 10.0)),
            })"#,
            "test",
        )
        .expect("catalog")
    }

    #[test]
    fn test_parse_scenario() {
        let config: ScenarioConfig = serde_json::from_str(SCENARIO).expect("parse");
        assert_eq!(config.name, "duel");
        assert_eq!(config.tick_rate, 60.0);
        assert_eq!(config.units[1].health, 60.0);
        assert_eq!(config.units[1].resource, 100.0);
        assert!(matches!(config.steps[1].action, ScenarioAction::UseSlot { slot: 0 }));
        assert!(matches!(config.steps[3].action, ScenarioAction::CancelCasting { slot: None }));
        assert!(config.validate(&catalog()).is_ok());
    }

    #[test]
    fn test_unknown_unit_in_step() {
        let mut config: ScenarioConfig = serde_json::from_str(SCENARIO).expect("parse");
        config.steps.push(ScenarioStep {
            at: 1.0,
            action: ScenarioAction::Stop {
                unit: "Nobody".to_string(),
            },
        });
        let err = config.validate(&catalog()).unwrap_err();
        assert!(err.contains("Nobody"));
    }

    #[test]
    fn test_unknown_ability_in_loadout() {
        let mut config: ScenarioConfig = serde_json::from_str(SCENARIO).expect("parse");
        config.units[0].loadout.push("meteor".to_string());
        let err = config.validate(&catalog()).unwrap_err();
        assert!(err.contains("meteor"));
    }
}
