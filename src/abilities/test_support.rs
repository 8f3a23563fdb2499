//! In-memory world and scripted abilities for tests.
//!
//! Shared by the unit tests and the integration tests under `tests/`. Every
//! order and effect that reaches [`StubWorld`] is written to a journal stamped
//! with a monotonic sequence number, so tests can assert on the relative order
//! of things across units.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bevy::prelude::*;

use super::descriptor::{AbilityBehavior, AbilityDescriptor, AbilityRef, CastTarget, TargetKind};
use super::notifications::AbilityNotification;
use super::world::{AbilityEffect, AbilityWorld, Faction, UnitOrder};

#[derive(Default)]
pub struct CallCounts {
    pub start_cast: AtomicUsize,
    pub execute: AtomicUsize,
    pub cancel: AtomicUsize,
    pub blocked: AtomicBool,
}

impl CallCounts {
    pub fn executes(&self) -> usize {
        self.execute.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.start_cast.load(Ordering::SeqCst)
    }

    /// Make `can_use` fail until unblocked
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }
}

/// Counts its callbacks and emits a zero-radius `Reveal` when executed.
pub struct Scripted(pub Arc<CallCounts>);

impl AbilityBehavior for Scripted {
    fn can_use(&self, _: &AbilityDescriptor, caster: Entity, world: &dyn AbilityWorld) -> bool {
        world.is_alive(caster) && !self.0.blocked.load(Ordering::SeqCst)
    }

    fn start_cast(&self, _: &AbilityDescriptor, _: Entity, _: CastTarget, _: &mut dyn AbilityWorld) {
        self.0.start_cast.fetch_add(1, Ordering::SeqCst);
    }

    fn execute(&self, ability: &AbilityDescriptor, caster: Entity, target: CastTarget, world: &mut dyn AbilityWorld) {
        self.0.execute.fetch_add(1, Ordering::SeqCst);
        world.apply_effect(AbilityEffect::Reveal {
            source: caster,
            ability: ability.id.clone(),
            position: target.position,
            radius: 0.0,
        });
    }

    fn cancel(&self, _: &AbilityDescriptor, _: Entity, _: &mut dyn AbilityWorld) {
        self.0.cancel.fetch_add(1, Ordering::SeqCst);
    }
}

/// Self-targeted scripted ability
pub fn scripted(id: &str, cast_time: f32, cooldown: f32) -> (AbilityRef, Arc<CallCounts>) {
    scripted_kind(id, TargetKind::Caster, cast_time, cooldown, 0.0)
}

pub fn scripted_kind(
    id: &str,
    kind: TargetKind,
    cast_time: f32,
    cooldown: f32,
    range: f32,
) -> (AbilityRef, Arc<CallCounts>) {
    let counts = Arc::new(CallCounts::default());
    let ability = AbilityDescriptor::new(id, id, kind, Scripted(counts.clone()))
        .with_cast_time(cast_time)
        .with_cooldown(cooldown)
        .with_range(range)
        .into_ref();
    (ability, counts)
}

pub fn count_used(notes: &[AbilityNotification]) -> usize {
    notes
        .iter()
        .filter(|note| matches!(note, AbilityNotification::AbilityUsed { .. }))
        .count()
}

pub struct StubUnit {
    pub alive: bool,
    pub has_health: bool,
    pub faction: Faction,
    pub position: Vec3,
    pub resource: f32,
}

/// What reached the world, in arrival order
#[derive(Clone, Debug, PartialEq)]
pub enum Journal {
    Order { seq: u64, unit: Entity, order: UnitOrder },
    Effect { seq: u64, source: Entity, ability: String },
}

impl Journal {
    pub fn seq(&self) -> u64 {
        match self {
            Journal::Order { seq, .. } | Journal::Effect { seq, .. } => *seq,
        }
    }

    pub fn unit(&self) -> Entity {
        match self {
            Journal::Order { unit, .. } => *unit,
            Journal::Effect { source, .. } => *source,
        }
    }
}

#[derive(Default)]
pub struct StubWorld {
    next_id: u32,
    next_seq: u64,
    pub units: HashMap<Entity, StubUnit>,
    pub loadouts: HashMap<Entity, Vec<AbilityRef>>,
    pub selected: Option<Entity>,
    pub pointer: Option<Vec3>,
    pub hovered: Option<Entity>,
    pub paused: bool,
    pub journal: Vec<Journal>,
}

impl StubWorld {
    pub fn spawn_unit(&mut self) -> Entity {
        self.spawn_at(Faction::Player, Vec3::ZERO)
    }

    pub fn spawn_at(&mut self, faction: Faction, position: Vec3) -> Entity {
        self.next_id += 1;
        let entity = Entity::from_raw(self.next_id);
        self.units.insert(
            entity,
            StubUnit {
                alive: true,
                has_health: true,
                faction,
                position,
                resource: 100.0,
            },
        );
        entity
    }

    pub fn spawn_with(&mut self, faction: Faction, position: Vec3, loadout: Vec<AbilityRef>) -> Entity {
        let unit = self.spawn_at(faction, position);
        self.loadouts.insert(unit, loadout);
        unit
    }

    /// Remove a unit. A selected unit is deselected as well.
    pub fn despawn(&mut self, unit: Entity) {
        self.units.remove(&unit);
        if self.selected == Some(unit) {
            self.selected = None;
        }
    }

    pub fn move_unit(&mut self, unit: Entity, position: Vec3) {
        if let Some(u) = self.units.get_mut(&unit) {
            u.position = position;
        }
    }

    /// Every order issued, in arrival order
    pub fn orders(&self) -> Vec<(Entity, UnitOrder)> {
        self.journal
            .iter()
            .filter_map(|entry| match entry {
                Journal::Order { unit, order, .. } => Some((*unit, order.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn orders_for(&self, unit: Entity) -> Vec<UnitOrder> {
        self.orders()
            .into_iter()
            .filter(|(u, _)| *u == unit)
            .map(|(_, order)| order)
            .collect()
    }

    /// Source and ability id of every effect applied
    pub fn effects(&self) -> Vec<(Entity, String)> {
        self.journal
            .iter()
            .filter_map(|entry| match entry {
                Journal::Effect { source, ability, .. } => Some((*source, ability.clone())),
                _ => None,
            })
            .collect()
    }

    fn stamp(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

impl AbilityWorld for StubWorld {
    fn selected_unit(&self) -> Option<Entity> {
        self.selected
    }

    fn exists(&self, unit: Entity) -> bool {
        self.units.contains_key(&unit)
    }

    fn is_alive(&self, unit: Entity) -> bool {
        self.units.get(&unit).is_some_and(|u| u.alive)
    }

    fn has_health(&self, unit: Entity) -> bool {
        self.units.get(&unit).is_some_and(|u| u.has_health)
    }

    fn faction(&self, unit: Entity) -> Option<Faction> {
        self.units.get(&unit).map(|u| u.faction)
    }

    fn position(&self, unit: Entity) -> Option<Vec3> {
        self.units.get(&unit).map(|u| u.position)
    }

    fn pointer_ground(&self) -> Option<Vec3> {
        self.pointer
    }

    fn entity_under_pointer(&self) -> Option<Entity> {
        self.hovered
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn default_loadout(&self, unit: Entity) -> Vec<AbilityRef> {
        self.loadouts.get(&unit).cloned().unwrap_or_default()
    }

    fn resource(&self, unit: Entity) -> f32 {
        self.units.get(&unit).map_or(0.0, |u| u.resource)
    }

    fn spend_resource(&mut self, unit: Entity, amount: f32) -> bool {
        match self.units.get_mut(&unit) {
            Some(u) if u.resource >= amount => {
                u.resource -= amount;
                true
            }
            _ => false,
        }
    }

    fn issue_order(&mut self, unit: Entity, order: UnitOrder) {
        let seq = self.stamp();
        self.journal.push(Journal::Order { seq, unit, order });
    }

    fn apply_effect(&mut self, effect: AbilityEffect) {
        let seq = self.stamp();
        let source = effect.source();
        let ability = match effect {
            AbilityEffect::Damage { ability, .. }
            | AbilityEffect::Heal { ability, .. }
            | AbilityEffect::Blink { ability, .. }
            | AbilityEffect::Reveal { ability, .. } => ability,
        };
        self.journal.push(Journal::Effect { seq, source, ability });
    }
}
