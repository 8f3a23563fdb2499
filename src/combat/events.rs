//! Ability events
//!
//! Player input arrives as [`PlayerCommand`]s. Everything the ability core
//! produces leaves as the other events here.

use bevy::prelude::*;

use crate::abilities::{AbilityEffect, UnitOrder};

/// Player intent, from the keyboard/mouse layer or a scripted scenario.
#[derive(Event, Clone, Debug)]
pub enum PlayerCommand {
    /// Replace the selection (`None` clears it)
    Select(Option<Entity>),
    /// Press an ability slot of the selected unit
    UseSlot(usize),
    /// Confirm the live targeting session, optionally at an explicit ground point
    ConfirmTarget { point: Option<Vec3> },
    CancelTargeting,
    /// Cancel one casting slot, or all of them
    CancelCasting(Option<usize>),
    SetPaused(bool),
    TogglePause,
    /// Simulation speed multiplier (0 pauses)
    SetSpeed(f32),
    PointerMoved {
        ground: Option<Vec3>,
        hovered: Option<Entity>,
    },
    /// Direct unit order (move, guard, patrol, attack, stop)
    Order { unit: Entity, order: UnitOrder },
}

/// Fired once per completed cast
#[derive(Event, Clone, Debug)]
pub struct AbilityUsedEvent {
    /// Entity using the ability
    pub caster: Entity,
    /// Target of the ability (if any)
    pub target: Option<Entity>,
    pub target_position: Vec3,
    /// Catalog id of the ability
    pub ability_id: String,
    /// Name of the ability
    pub ability_name: String,
    pub slot_index: usize,
}

/// Fired right after [`AbilityUsedEvent`]
#[derive(Event, Clone, Debug)]
pub struct CooldownStartedEvent {
    pub caster: Entity,
    pub ability_id: String,
    pub slot_index: usize,
    /// Cooldown length in seconds
    pub duration: f32,
}

/// Order handed to the movement layer
#[derive(Event, Clone, Debug)]
pub struct UnitOrderEvent {
    pub unit: Entity,
    pub order: UnitOrder,
}

/// Effect produced by an executed ability
#[derive(Event, Clone, Debug)]
pub struct AbilityEffectEvent(pub AbilityEffect);
