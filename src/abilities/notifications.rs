//! Notifications emitted by the ability core
//!
//! The core buffers these while it runs; the integration layer drains them into
//! engine events and the ability log.

use bevy::prelude::*;

use super::descriptor::{AbilityRef, CastTarget};

/// Why a timed cast ended without executing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CastCancelReason {
    /// Slot left the `Casting` state (re-equipped, reset, forgotten)
    Interrupted,
    /// Caster destroyed or dead
    CasterLost,
    /// Unit target destroyed or dead
    TargetLost,
    /// Explicit `cancel_casting`
    Cancelled,
}

/// Why a targeting session ended without a cast.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TargetingCancelReason {
    /// The player backed out
    Escaped,
    SelectionChanged,
    /// A new targeting session replaced this one
    Superseded,
    /// Nothing (valid) under the pointer
    NoTarget,
    /// Dead, no health, or wrong faction
    InvalidTarget,
    /// Caster disappeared while targeting
    CasterLost,
    /// No ground point under the pointer
    NoGroundPoint,
}

/// Everything observable the core does.
#[derive(Clone, Debug)]
pub enum AbilityNotification {
    /// Fired exactly once per completed cast, instant or timed
    AbilityUsed {
        caster: Entity,
        ability: AbilityRef,
        slot_index: usize,
        target: CastTarget,
    },
    /// Fired right after `AbilityUsed`
    CooldownStarted {
        caster: Entity,
        ability: AbilityRef,
        slot_index: usize,
        duration: f32,
    },
    CastStarted {
        caster: Entity,
        ability: AbilityRef,
        slot_index: usize,
        cast_time: f32,
    },
    CastCancelled {
        caster: Entity,
        ability: AbilityRef,
        slot_index: usize,
        reason: CastCancelReason,
    },
    TargetingStarted {
        caster: Entity,
        ability: AbilityRef,
        slot_index: usize,
    },
    TargetingCancelled {
        caster: Entity,
        ability: AbilityRef,
        reason: TargetingCancelReason,
    },
    /// Target was out of range; the caster was sent to close the distance
    MoveToRange {
        caster: Entity,
        ability: AbilityRef,
        destination: Vec3,
        distance: f32,
    },
    /// Deferred cast dropped before the caster reached range
    DeferredCastDropped {
        caster: Entity,
        ability: AbilityRef,
    },
    CommandQueued {
        unit: Entity,
        command: &'static str,
    },
    CommandReplayed {
        unit: Entity,
        command: &'static str,
    },
}

impl AbilityNotification {
    /// Unit the notification is about
    pub fn unit(&self) -> Entity {
        match self {
            AbilityNotification::AbilityUsed { caster, .. }
            | AbilityNotification::CooldownStarted { caster, .. }
            | AbilityNotification::CastStarted { caster, .. }
            | AbilityNotification::CastCancelled { caster, .. }
            | AbilityNotification::TargetingStarted { caster, .. }
            | AbilityNotification::TargetingCancelled { caster, .. }
            | AbilityNotification::MoveToRange { caster, .. }
            | AbilityNotification::DeferredCastDropped { caster, .. } => *caster,
            AbilityNotification::CommandQueued { unit, .. }
            | AbilityNotification::CommandReplayed { unit, .. } => *unit,
        }
    }
}
