//! Tactics sandbox
//!
//! Hosts the ability core inside a Bevy app:
//! - Unit stats, selection and movement orders
//! - Player commands routed into [`AbilityCore`]
//! - Effect resolution (damage, healing, blinks)
//! - Ability logging
//!
//! ## System Phases
//!
//! 1. **Input** - Selection, pause, speed and pointer updates
//! 2. **Abilities** - Ability commands, core tick, notification publishing
//! 3. **Resolution** - Effects, unit orders, movement
//! 4. **Cleanup** - Forget despawned units
//!
//! Graphical and headless modes both use [`AbilityPlugin`] and
//! [`add_ability_systems`].

use bevy::prelude::*;

use crate::abilities::{AbilityCatalogPlugin, AbilityCore};

pub mod components;
pub mod events;
pub mod input;
pub mod log;
pub mod systems;
pub mod world;

use components::PointerState;
use events::*;
use systems::*;

/// Registers the ability events and resources and loads the ability catalog.
/// Systems are added separately with [`add_ability_systems`] so each mode can
/// pick its own run condition.
#[derive(Default)]
pub struct AbilityPlugin {
    /// Catalog file; `None` uses the default path
    pub catalog_path: Option<String>,
}

impl Plugin for AbilityPlugin {
    fn build(&self, app: &mut App) {
        app
            // Events
            .add_event::<PlayerCommand>()
            .add_event::<AbilityUsedEvent>()
            .add_event::<CooldownStartedEvent>()
            .add_event::<UnitOrderEvent>()
            .add_event::<AbilityEffectEvent>()
            // Resources
            .init_resource::<AbilityCore>()
            .init_resource::<log::AbilityLog>()
            .init_resource::<SimulationSpeed>()
            .init_resource::<PointerState>()
            .add_plugins(AbilityCatalogPlugin {
                path: self.catalog_path.clone(),
            });
    }
}

/// System set labels for sandbox system ordering.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbilitySystemPhase {
    /// Phase 1: Selection, pause, speed, pointer
    Input,
    /// Phase 2: Ability commands, core tick, notifications
    Abilities,
    /// Phase 3: Effects, orders, movement
    Resolution,
    /// Phase 4: Despawn bookkeeping
    Cleanup,
}

/// Configures the ordering between sandbox phases.
///
/// Call this once during app setup before adding the systems.
pub fn configure_ability_system_ordering(app: &mut App) {
    app.configure_sets(
        Update,
        (
            AbilitySystemPhase::Input,
            AbilitySystemPhase::Abilities,
            AbilitySystemPhase::Resolution,
            AbilitySystemPhase::Cleanup,
        )
            .chain(),
    );
}

/// Adds the sandbox systems to the app.
///
/// # Example
/// ```ignore
/// // Headless mode (always run)
/// add_ability_systems(&mut app, || true);
/// ```
pub fn add_ability_systems<M>(app: &mut App, run_condition: impl Condition<M> + Clone)
where
    M: 'static,
{
    configure_ability_system_ordering(app);

    app.add_systems(
        Update,
        (advance_log_clock, apply_control_commands)
            .chain()
            .in_set(AbilitySystemPhase::Input)
            .run_if(run_condition.clone()),
    );

    // Selection markers must land before the core syncs its active unit
    app.add_systems(
        Update,
        apply_deferred
            .after(AbilitySystemPhase::Input)
            .before(AbilitySystemPhase::Abilities)
            .run_if(run_condition.clone()),
    );

    app.add_systems(
        Update,
        (handle_ability_commands, tick_ability_core, publish_ability_notifications)
            .chain()
            .in_set(AbilitySystemPhase::Abilities)
            .run_if(run_condition.clone()),
    );

    app.add_systems(
        Update,
        (apply_ability_effects, apply_unit_orders, move_units)
            .chain()
            .in_set(AbilitySystemPhase::Resolution)
            .run_if(run_condition.clone()),
    );

    app.add_systems(
        Update,
        forget_despawned_units
            .in_set(AbilitySystemPhase::Cleanup)
            .run_if(run_condition),
    );
}

/// Controls the speed of the simulation
#[derive(Resource, Debug, Clone, Copy)]
pub struct SimulationSpeed {
    /// Speed multiplier (0.0 = paused, 0.5 = half speed, 1.0 = normal, ...)
    pub multiplier: f32,
    /// Multiplier restored by [`SimulationSpeed::resume`]
    resume_multiplier: f32,
}

impl Default for SimulationSpeed {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            resume_multiplier: 1.0,
        }
    }
}

impl SimulationSpeed {
    pub fn pause(&mut self) {
        if !self.is_paused() {
            self.resume_multiplier = self.multiplier;
        }
        self.multiplier = 0.0;
    }

    /// Continue at the speed in effect before the pause
    pub fn resume(&mut self) {
        if self.is_paused() {
            self.multiplier = self.resume_multiplier;
        }
    }

    /// Returns whether the simulation is now paused
    pub fn toggle_pause(&mut self) -> bool {
        if self.is_paused() {
            self.resume();
        } else {
            self.pause();
        }
        self.is_paused()
    }

    /// Negative values clamp to 0, which pauses.
    pub fn set_multiplier(&mut self, multiplier: f32) {
        let multiplier = multiplier.max(0.0);
        if multiplier == 0.0 {
            self.pause();
        } else {
            self.multiplier = multiplier;
            self.resume_multiplier = multiplier;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.multiplier == 0.0
    }
}
