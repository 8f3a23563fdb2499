//! Keybinding system for remappable controls
//!
//! Maps keys to sandbox actions (ability slots, targeting, simulation speed)
//! and stores the player's choices in the settings file.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::abilities::MAX_SLOTS;

/// All possible actions that can be bound to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameAction {
    // Abilities
    AbilitySlot1,
    AbilitySlot2,
    AbilitySlot3,
    AbilitySlot4,
    AbilitySlot5,
    AbilitySlot6,
    ConfirmTarget,
    CancelTargeting,
    CancelCasting,

    // Selection
    SelectNextUnit,

    // Simulation
    PausePlay,
    SpeedSlow,
    SpeedNormal,
    SpeedFast,
    SpeedVeryFast,
}

const SLOT_ACTIONS: [GameAction; MAX_SLOTS] = [
    GameAction::AbilitySlot1,
    GameAction::AbilitySlot2,
    GameAction::AbilitySlot3,
    GameAction::AbilitySlot4,
    GameAction::AbilitySlot5,
    GameAction::AbilitySlot6,
];

impl GameAction {
    pub fn description(&self) -> &'static str {
        match self {
            GameAction::AbilitySlot1 => "Ability 1",
            GameAction::AbilitySlot2 => "Ability 2",
            GameAction::AbilitySlot3 => "Ability 3",
            GameAction::AbilitySlot4 => "Ability 4",
            GameAction::AbilitySlot5 => "Ability 5",
            GameAction::AbilitySlot6 => "Ability 6",
            GameAction::ConfirmTarget => "Confirm Target",
            GameAction::CancelTargeting => "Cancel Targeting",
            GameAction::CancelCasting => "Cancel Casting",
            GameAction::SelectNextUnit => "Select Next Unit",
            GameAction::PausePlay => "Pause / Play",
            GameAction::SpeedSlow => "Speed: 0.5x",
            GameAction::SpeedNormal => "Speed: 1x",
            GameAction::SpeedFast => "Speed: 2x",
            GameAction::SpeedVeryFast => "Speed: 3x",
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            GameAction::AbilitySlot1
            | GameAction::AbilitySlot2
            | GameAction::AbilitySlot3
            | GameAction::AbilitySlot4
            | GameAction::AbilitySlot5
            | GameAction::AbilitySlot6
            | GameAction::ConfirmTarget
            | GameAction::CancelTargeting
            | GameAction::CancelCasting => "Abilities",
            GameAction::SelectNextUnit => "Selection",
            GameAction::PausePlay
            | GameAction::SpeedSlow
            | GameAction::SpeedNormal
            | GameAction::SpeedFast
            | GameAction::SpeedVeryFast => "Simulation",
        }
    }

    pub fn all() -> Vec<GameAction> {
        let mut actions = SLOT_ACTIONS.to_vec();
        actions.extend([
            GameAction::ConfirmTarget,
            GameAction::CancelTargeting,
            GameAction::CancelCasting,
            GameAction::SelectNextUnit,
            GameAction::PausePlay,
            GameAction::SpeedSlow,
            GameAction::SpeedNormal,
            GameAction::SpeedFast,
            GameAction::SpeedVeryFast,
        ]);
        actions
    }

    /// The slot-press action for `index`
    pub fn for_slot(index: usize) -> Option<GameAction> {
        SLOT_ACTIONS.get(index).copied()
    }

    /// Slot index for the slot-press actions
    pub fn ability_slot(&self) -> Option<usize> {
        SLOT_ACTIONS.iter().position(|action| action == self)
    }

    /// Speed multiplier for the speed actions
    pub fn speed_multiplier(&self) -> Option<f32> {
        match self {
            GameAction::SpeedSlow => Some(0.5),
            GameAction::SpeedNormal => Some(1.0),
            GameAction::SpeedFast => Some(2.0),
            GameAction::SpeedVeryFast => Some(3.0),
            _ => None,
        }
    }
}

/// Keys the settings file understands: (key, stored name, display name)
const KNOWN_KEYS: &[(KeyCode, &str, &str)] = &[
    (KeyCode::Escape, "Escape", "ESC"),
    (KeyCode::Enter, "Enter", "ENTER"),
    (KeyCode::Space, "Space", "SPACE"),
    (KeyCode::Tab, "Tab", "TAB"),
    (KeyCode::Backspace, "Backspace", "BACKSPACE"),
    (KeyCode::Delete, "Delete", "DEL"),
    (KeyCode::KeyA, "KeyA", "A"),
    (KeyCode::KeyB, "KeyB", "B"),
    (KeyCode::KeyC, "KeyC", "C"),
    (KeyCode::KeyD, "KeyD", "D"),
    (KeyCode::KeyE, "KeyE", "E"),
    (KeyCode::KeyF, "KeyF", "F"),
    (KeyCode::KeyG, "KeyG", "G"),
    (KeyCode::KeyH, "KeyH", "H"),
    (KeyCode::KeyI, "KeyI", "I"),
    (KeyCode::KeyJ, "KeyJ", "J"),
    (KeyCode::KeyK, "KeyK", "K"),
    (KeyCode::KeyL, "KeyL", "L"),
    (KeyCode::KeyM, "KeyM", "M"),
    (KeyCode::KeyN, "KeyN", "N"),
    (KeyCode::KeyO, "KeyO", "O"),
    (KeyCode::KeyP, "KeyP", "P"),
    (KeyCode::KeyQ, "KeyQ", "Q"),
    (KeyCode::KeyR, "KeyR", "R"),
    (KeyCode::KeyS, "KeyS", "S"),
    (KeyCode::KeyT, "KeyT", "T"),
    (KeyCode::KeyU, "KeyU", "U"),
    (KeyCode::KeyV, "KeyV", "V"),
    (KeyCode::KeyW, "KeyW", "W"),
    (KeyCode::KeyX, "KeyX", "X"),
    (KeyCode::KeyY, "KeyY", "Y"),
    (KeyCode::KeyZ, "KeyZ", "Z"),
    (KeyCode::Digit1, "Digit1", "1"),
    (KeyCode::Digit2, "Digit2", "2"),
    (KeyCode::Digit3, "Digit3", "3"),
    (KeyCode::Digit4, "Digit4", "4"),
    (KeyCode::Digit5, "Digit5", "5"),
    (KeyCode::Digit6, "Digit6", "6"),
    (KeyCode::Digit7, "Digit7", "7"),
    (KeyCode::Digit8, "Digit8", "8"),
    (KeyCode::Digit9, "Digit9", "9"),
    (KeyCode::Digit0, "Digit0", "0"),
    (KeyCode::F1, "F1", "F1"),
    (KeyCode::F2, "F2", "F2"),
    (KeyCode::F3, "F3", "F3"),
    (KeyCode::F4, "F4", "F4"),
    (KeyCode::F5, "F5", "F5"),
    (KeyCode::F6, "F6", "F6"),
    (KeyCode::F7, "F7", "F7"),
    (KeyCode::F8, "F8", "F8"),
    (KeyCode::Minus, "Minus", "-"),
    (KeyCode::Equal, "Equal", "="),
    (KeyCode::ArrowUp, "ArrowUp", "UP"),
    (KeyCode::ArrowDown, "ArrowDown", "DOWN"),
    (KeyCode::ArrowLeft, "ArrowLeft", "LEFT"),
    (KeyCode::ArrowRight, "ArrowRight", "RIGHT"),
];

/// Parse a stored key name (`"KeyQ"`, `"Digit1"`, `"F2"`, ...)
pub fn parse_key(name: &str) -> Option<KeyCode> {
    KNOWN_KEYS
        .iter()
        .find(|(_, stored, _)| *stored == name)
        .map(|(key, _, _)| *key)
}

fn stored_name(key: KeyCode) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .find(|(known, _, _)| *known == key)
        .map(|(_, stored, _)| *stored)
}

/// Key binding with primary and optional secondary key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyBinding {
    #[serde(with = "keycode_serde")]
    pub primary: KeyCode,
    #[serde(default, with = "option_keycode_serde")]
    pub secondary: Option<KeyCode>,
}

mod keycode_serde {
    use super::*;
    use serde::de::Error;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(key: &KeyCode, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match stored_name(*key) {
            Some(name) => serializer.serialize_str(name),
            None => Err(<S::Error as serde::ser::Error>::custom(format!("unsupported key {:?}", key))),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<KeyCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        parse_key(&name).ok_or_else(|| D::Error::custom(format!("unknown key '{}'", name)))
    }
}

mod option_keycode_serde {
    use super::*;
    use serde::de::Error;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(key: &Option<KeyCode>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match key.and_then(stored_name) {
            Some(name) => serializer.serialize_some(name),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<KeyCode>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name: Option<String> = Option::deserialize(deserializer)?;
        name.map(|name| parse_key(&name).ok_or_else(|| D::Error::custom(format!("unknown key '{}'", name))))
            .transpose()
    }
}

impl KeyBinding {
    pub fn new(primary: KeyCode) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(primary: KeyCode, secondary: KeyCode) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }

    pub fn matches(&self, key: KeyCode) -> bool {
        self.primary == key || self.secondary == Some(key)
    }
}

/// Complete keybindings configuration
#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
pub struct Keybindings {
    bindings: HashMap<GameAction, KeyBinding>,
}

impl Default for Keybindings {
    fn default() -> Self {
        Self::create_defaults()
    }
}

impl Keybindings {
    /// Create default keybindings
    pub fn create_defaults() -> Self {
        let mut bindings = HashMap::new();

        // Abilities on the number row
        let digits = [
            KeyCode::Digit1,
            KeyCode::Digit2,
            KeyCode::Digit3,
            KeyCode::Digit4,
            KeyCode::Digit5,
            KeyCode::Digit6,
        ];
        for (action, key) in SLOT_ACTIONS.into_iter().zip(digits) {
            bindings.insert(action, KeyBinding::new(key));
        }
        bindings.insert(GameAction::ConfirmTarget, KeyBinding::new(KeyCode::Enter));
        bindings.insert(
            GameAction::CancelTargeting,
            KeyBinding::with_secondary(KeyCode::Escape, KeyCode::Backspace),
        );
        bindings.insert(GameAction::CancelCasting, KeyBinding::new(KeyCode::KeyX));

        bindings.insert(GameAction::SelectNextUnit, KeyBinding::new(KeyCode::Tab));

        // Simulation
        bindings.insert(GameAction::PausePlay, KeyBinding::new(KeyCode::Space));
        bindings.insert(GameAction::SpeedSlow, KeyBinding::new(KeyCode::F1));
        bindings.insert(GameAction::SpeedNormal, KeyBinding::new(KeyCode::F2));
        bindings.insert(GameAction::SpeedFast, KeyBinding::new(KeyCode::F3));
        bindings.insert(GameAction::SpeedVeryFast, KeyBinding::new(KeyCode::F4));

        Self { bindings }
    }

    /// Get the binding for an action
    pub fn get(&self, action: GameAction) -> Option<&KeyBinding> {
        self.bindings.get(&action)
    }

    /// Set a new binding for an action
    pub fn set(&mut self, action: GameAction, binding: KeyBinding) {
        self.bindings.insert(action, binding);
    }

    /// Check if an action was just pressed this frame
    pub fn action_just_pressed(&self, action: GameAction, keyboard: &ButtonInput<KeyCode>) -> bool {
        self.get(action).is_some_and(|binding| {
            keyboard.just_pressed(binding.primary)
                || binding.secondary.is_some_and(|key| keyboard.just_pressed(key))
        })
    }

    /// Check if a key is already bound to any action (for conflict detection)
    pub fn is_key_bound(&self, key: KeyCode, exclude_action: Option<GameAction>) -> Option<GameAction> {
        self.bindings
            .iter()
            .find(|(action, binding)| Some(**action) != exclude_action && binding.matches(key))
            .map(|(action, _)| *action)
    }

    /// Get a human-readable string for a key
    pub fn key_name(key: KeyCode) -> &'static str {
        KNOWN_KEYS
            .iter()
            .find(|(known, _, _)| *known == key)
            .map_or("???", |(_, _, display)| *display)
    }

    /// Get display string for a binding
    pub fn binding_display(&self, action: GameAction) -> String {
        match self.get(action) {
            Some(binding) => {
                let primary = Self::key_name(binding.primary);
                match binding.secondary {
                    Some(secondary) => format!("{} / {}", primary, Self::key_name(secondary)),
                    None => primary.to_string(),
                }
            }
            None => "Unbound".to_string(),
        }
    }
}
