//! Collaborator interface
//!
//! Everything the ability core needs from the rest of the game goes through
//! [`AbilityWorld`]: selection, unit queries, the pointer, the pause flag,
//! unit resources, default loadouts, and the two outputs (unit orders and
//! ability effects). The core never stores a world; callers pass one into every
//! operation.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::descriptor::{AbilityRef, CastTarget};

/// Coarse team affiliation used for Ally/Enemy validation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Faction {
    /// Units controlled by the player
    Player,
    /// Units opposing the player
    Hostile,
    /// Units nobody may target offensively
    Neutral,
}

impl Faction {
    /// Ally targeting requires an identical faction tag.
    pub fn is_allied_with(self, other: Faction) -> bool {
        self == other
    }

    /// Enemy targeting requires one of the two opposing pairs.
    pub fn is_hostile_to(self, other: Faction) -> bool {
        matches!(
            (self, other),
            (Faction::Player, Faction::Hostile) | (Faction::Hostile, Faction::Player)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Faction::Player => "Player",
            Faction::Hostile => "Hostile",
            Faction::Neutral => "Neutral",
        }
    }
}

/// Movement and combat intents handed to the unit controller.
#[derive(Clone, Debug, PartialEq)]
pub enum UnitOrder {
    /// Walk to a point
    Move { destination: Vec3 },
    /// Walk towards a point until within `range` of it
    MoveToRange { destination: Vec3, range: f32 },
    /// Hold a position
    Guard { position: Vec3 },
    /// Walk a loop of waypoints
    Patrol { waypoints: Vec<Vec3> },
    /// Engage a unit
    Attack { target: Entity },
    /// Drop whatever the unit was doing
    Stop,
}

impl UnitOrder {
    pub fn name(&self) -> &'static str {
        match self {
            UnitOrder::Move { .. } => "Move",
            UnitOrder::MoveToRange { .. } => "MoveToRange",
            UnitOrder::Guard { .. } => "Guard",
            UnitOrder::Patrol { .. } => "Patrol",
            UnitOrder::Attack { .. } => "Attack",
            UnitOrder::Stop => "Stop",
        }
    }
}

/// Output of an executed ability. How these are resolved (damage formulas,
/// healing caps, teleport rules) is up to the game.
#[derive(Clone, Debug, PartialEq)]
pub enum AbilityEffect {
    Damage {
        source: Entity,
        ability: String,
        target: CastTarget,
        amount: f32,
        /// 0 = single target
        radius: f32,
    },
    Heal {
        source: Entity,
        ability: String,
        target: CastTarget,
        amount: f32,
        /// 0 = single target
        radius: f32,
    },
    Blink {
        source: Entity,
        ability: String,
        destination: Vec3,
        max_distance: f32,
    },
    Reveal {
        source: Entity,
        ability: String,
        position: Vec3,
        radius: f32,
    },
}

impl AbilityEffect {
    pub fn source(&self) -> Entity {
        match self {
            AbilityEffect::Damage { source, .. }
            | AbilityEffect::Heal { source, .. }
            | AbilityEffect::Blink { source, .. }
            | AbilityEffect::Reveal { source, .. } => *source,
        }
    }
}

/// The game as seen by the ability core.
pub trait AbilityWorld {
    // === Selection ===
    /// The single selected unit, or `None` when zero or several are selected
    fn selected_unit(&self) -> Option<Entity>;

    // === Units ===
    fn exists(&self, unit: Entity) -> bool;
    fn is_alive(&self, unit: Entity) -> bool;
    /// Whether the unit can take damage/healing at all (props and markers can't)
    fn has_health(&self, unit: Entity) -> bool;
    fn faction(&self, unit: Entity) -> Option<Faction>;
    fn position(&self, unit: Entity) -> Option<Vec3>;

    // === Pointer ===
    /// Ground point under the pointer
    fn pointer_ground(&self) -> Option<Vec3>;
    /// Unit under the pointer
    fn entity_under_pointer(&self) -> Option<Entity>;

    // === Simulation ===
    fn is_paused(&self) -> bool;

    // === Loadout ===
    /// Abilities a unit starts with, in slot order
    fn default_loadout(&self, unit: Entity) -> Vec<AbilityRef>;

    // === Resources (mana/rage/stamina) ===
    fn resource(&self, unit: Entity) -> f32;
    /// Deducts `amount`; returns false (and spends nothing) if the unit can't afford it
    fn spend_resource(&mut self, unit: Entity, amount: f32) -> bool;

    // === Outputs ===
    fn issue_order(&mut self, unit: Entity, order: UnitOrder);
    fn apply_effect(&mut self, effect: AbilityEffect);
}
