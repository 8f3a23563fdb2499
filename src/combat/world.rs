//! ECS side of the ability core's collaborator interface
//!
//! [`AbilityWorldParams`] bundles the queries, resources and event writers the
//! core needs and implements [`AbilityWorld`] over them, so a system can hand
//! `&mut params` straight to [`AbilityCore`](crate::abilities::AbilityCore).

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::abilities::{AbilityDefinitions, AbilityEffect, AbilityRef, AbilityWorld, Faction, UnitOrder};

use super::components::{Loadout, PointerState, Selected, Unit};
use super::events::{AbilityEffectEvent, UnitOrderEvent};
use super::SimulationSpeed;

#[derive(SystemParam)]
pub struct AbilityWorldParams<'w, 's> {
    units: Query<'w, 's, (&'static Transform, &'static mut Unit, Option<&'static Loadout>)>,
    selected: Query<'w, 's, Entity, (With<Selected>, With<Unit>)>,
    pointer: Res<'w, PointerState>,
    speed: Res<'w, SimulationSpeed>,
    definitions: Res<'w, AbilityDefinitions>,
    orders: EventWriter<'w, UnitOrderEvent>,
    effects: EventWriter<'w, AbilityEffectEvent>,
}

impl AbilityWorldParams<'_, '_> {
    /// Current simulation speed multiplier (0 while paused)
    pub fn time_scale(&self) -> f32 {
        self.speed.multiplier
    }
}

impl AbilityWorld for AbilityWorldParams<'_, '_> {
    fn selected_unit(&self) -> Option<Entity> {
        // Errors when nothing or more than one unit is selected
        self.selected.get_single().ok()
    }

    fn exists(&self, unit: Entity) -> bool {
        self.units.contains(unit)
    }

    fn is_alive(&self, unit: Entity) -> bool {
        self.units
            .get(unit)
            .is_ok_and(|(_, stats, _)| stats.is_alive())
    }

    fn has_health(&self, unit: Entity) -> bool {
        self.units
            .get(unit)
            .is_ok_and(|(_, stats, _)| stats.max_health > 0.0)
    }

    fn faction(&self, unit: Entity) -> Option<Faction> {
        self.units.get(unit).ok().map(|(_, stats, _)| stats.faction)
    }

    fn position(&self, unit: Entity) -> Option<Vec3> {
        self.units
            .get(unit)
            .ok()
            .map(|(transform, _, _)| transform.translation)
    }

    fn pointer_ground(&self) -> Option<Vec3> {
        self.pointer.ground
    }

    fn entity_under_pointer(&self) -> Option<Entity> {
        self.pointer.hovered
    }

    fn is_paused(&self) -> bool {
        self.speed.is_paused()
    }

    fn default_loadout(&self, unit: Entity) -> Vec<AbilityRef> {
        match self.units.get(unit) {
            Ok((_, _, Some(loadout))) => self.definitions.resolve_loadout(&loadout.abilities),
            _ => Vec::new(),
        }
    }

    fn resource(&self, unit: Entity) -> f32 {
        self.units
            .get(unit)
            .map_or(0.0, |(_, stats, _)| stats.current_resource)
    }

    fn spend_resource(&mut self, unit: Entity, amount: f32) -> bool {
        let Ok((_, mut unit, _)) = self.units.get_mut(unit) else {
            return false;
        };
        if unit.current_resource < amount {
            return false;
        }
        unit.current_resource -= amount;
        true
    }

    fn issue_order(&mut self, unit: Entity, order: UnitOrder) {
        self.orders.send(UnitOrderEvent { unit, order });
    }

    fn apply_effect(&mut self, effect: AbilityEffect) {
        self.effects.send(AbilityEffectEvent(effect));
    }
}
