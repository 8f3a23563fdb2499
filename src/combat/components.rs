//! Unit components and shared resources

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::abilities::{Faction, UnitOrder};

/// A controllable or hostile unit in the sandbox.
#[derive(Component, Clone, Debug)]
pub struct Unit {
    pub name: String,
    pub faction: Faction,
    pub max_health: f32,
    pub current_health: f32,
    /// Mana/rage/stamina pool spent by abilities
    pub max_resource: f32,
    pub current_resource: f32,
    /// Units per second
    pub move_speed: f32,
}

impl Unit {
    pub fn new(name: impl Into<String>, faction: Faction) -> Self {
        Self {
            name: name.into(),
            faction,
            max_health: 100.0,
            current_health: 100.0,
            max_resource: 100.0,
            current_resource: 100.0,
            move_speed: 5.0,
        }
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.max_health = health;
        self.current_health = health;
        self
    }

    pub fn with_resource(mut self, resource: f32) -> Self {
        self.max_resource = resource;
        self.current_resource = resource;
        self
    }

    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.current_health > 0.0
    }

    /// Apply damage, returns the amount actually removed
    pub fn take_damage(&mut self, amount: f32) -> f32 {
        let before = self.current_health;
        self.current_health = (self.current_health - amount).max(0.0);
        before - self.current_health
    }

    /// Apply healing, returns the amount actually restored (no overhealing)
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_alive() {
            return 0.0;
        }
        let before = self.current_health;
        self.current_health = (self.current_health + amount).min(self.max_health);
        self.current_health - before
    }
}

/// Catalog ids a unit starts with, in slot order.
#[derive(Component, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Loadout {
    pub abilities: Vec<String>,
}

impl Loadout {
    pub fn new<S: Into<String>>(abilities: impl IntoIterator<Item = S>) -> Self {
        Self {
            abilities: abilities.into_iter().map(Into::into).collect(),
        }
    }
}

/// Marker for the player's selection. The ability core only follows it when
/// exactly one unit carries it.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Selected;

/// Order the unit is currently carrying out.
#[derive(Component, Clone, Debug, Default)]
pub struct ActiveOrder {
    pub order: Option<UnitOrder>,
    /// Next waypoint of a patrol
    pub patrol_index: usize,
}

impl ActiveOrder {
    pub fn set(&mut self, order: UnitOrder) {
        self.order = match order {
            UnitOrder::Stop => None,
            other => Some(other),
        };
        self.patrol_index = 0;
    }

    pub fn clear(&mut self) {
        self.order = None;
        self.patrol_index = 0;
    }

    pub fn is_idle(&self) -> bool {
        self.order.is_none()
    }
}

/// What the pointer is over, written by the input layer (or a scenario).
#[derive(Resource, Clone, Copy, Debug, Default)]
pub struct PointerState {
    /// Ground point under the pointer
    pub ground: Option<Vec3>,
    /// Unit under the pointer
    pub hovered: Option<Entity>,
}
