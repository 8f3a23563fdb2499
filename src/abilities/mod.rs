//! Ability management core
//!
//! Engine-agnostic state machines for equipping, targeting, casting and
//! cooling down abilities. Everything here talks to the game through
//! [`AbilityWorld`]; the `combat` module adapts that trait to the ECS.

pub mod casting;
pub mod command_queue;
pub mod config;
pub mod cooldown;
pub mod core;
pub mod descriptor;
pub mod notifications;
pub mod range;
pub mod selection;
pub mod slots;
pub mod targeting;
pub mod world;

#[doc(hidden)]
pub mod test_support;

pub use casting::{CastProgress, CastStart};
pub use command_queue::{CommandPayload, QueuedCommand};
pub use config::{AbilityCatalogPlugin, AbilityDefinitions, EffectSpec};
pub use self::core::{AbilityCore, CommandDisposition};
pub use descriptor::{AbilityBehavior, AbilityDescriptor, AbilityRef, CastTarget, PreviewShape, TargetKind};
pub use notifications::{AbilityNotification, CastCancelReason, TargetingCancelReason};
pub use slots::{AbilitySlotState, SlotState, SlotTable, MAX_SLOTS};
pub use targeting::{PreviewPlacement, TargetingPreview};
pub use world::{AbilityEffect, AbilityWorld, Faction, UnitOrder};
