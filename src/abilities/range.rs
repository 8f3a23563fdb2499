//! Move-then-cast
//!
//! A confirmed cast whose target is out of range is parked here while the
//! caster walks towards it. Each unpaused tick the parked cast is re-validated,
//! and once the caster is close enough it is handed back to the core for
//! dispatch. One deferred cast per caster.

use std::collections::BTreeMap;

use bevy::prelude::*;

use super::descriptor::{AbilityRef, CastTarget};
use super::notifications::AbilityNotification;
use super::selection::SelectionContext;
use super::slots::SlotState;
use super::world::{AbilityWorld, UnitOrder};

/// A unit target that moved further than this gets a fresh move order.
const REPATH_DISTANCE: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct DeferredCast {
    pub caster: Entity,
    pub slot_index: usize,
    pub ability: AbilityRef,
    pub target: CastTarget,
    /// Destination of the last move order issued for this cast
    ordered_to: Vec3,
}

#[derive(Debug, Default)]
pub struct DeferredCasts {
    pending: BTreeMap<Entity, DeferredCast>,
}

impl DeferredCasts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a cast and send its caster towards the target. Replaces (and
    /// drops) any cast the caster already had parked.
    pub fn defer(
        &mut self,
        caster: Entity,
        slot_index: usize,
        ability: AbilityRef,
        target: CastTarget,
        distance: f32,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) {
        self.supersede(caster, world, notes);

        world.issue_order(
            caster,
            UnitOrder::MoveToRange {
                destination: target.position,
                range: ability.range,
            },
        );
        info!(
            "{:?} moving into range for {} ({:.1} > {:.1})",
            caster, ability.name, distance, ability.range
        );
        notes.push(AbilityNotification::MoveToRange {
            caster,
            ability: ability.clone(),
            destination: target.position,
            distance,
        });
        self.pending.insert(
            caster,
            DeferredCast {
                caster,
                slot_index,
                ability,
                target,
                ordered_to: target.position,
            },
        );
    }

    /// Drop the caster's parked cast because something newer replaced it.
    pub fn supersede(
        &mut self,
        caster: Entity,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) -> bool {
        let Some(cast) = self.pending.remove(&caster) else {
            return false;
        };
        drop_cast(cast, world, notes);
        true
    }

    /// Forget a destroyed caster's parked cast without any callbacks.
    pub fn forget(&mut self, caster: Entity) -> bool {
        self.pending.remove(&caster).is_some()
    }

    pub fn pending_for(&self, caster: Entity) -> Option<&DeferredCast> {
        self.pending.get(&caster)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Re-validate every parked cast and return the ones now in range.
    pub fn tick(
        &mut self,
        selection: &SelectionContext,
        world: &mut dyn AbilityWorld,
        notes: &mut Vec<AbilityNotification>,
    ) -> Vec<DeferredCast> {
        let mut ready = Vec::new();
        if world.is_paused() {
            return ready;
        }

        let casters: Vec<Entity> = self.pending.keys().copied().collect();
        for caster in casters {
            let Some(mut cast) = self.pending.remove(&caster) else {
                continue;
            };
            if !still_valid(&mut cast, selection, world) {
                drop_cast(cast, world, notes);
                continue;
            }
            let Some(caster_position) = world.position(caster) else {
                drop_cast(cast, world, notes);
                continue;
            };

            if caster_position.distance(cast.target.position) <= cast.ability.range {
                ready.push(cast);
                continue;
            }

            if cast.ordered_to.distance(cast.target.position) > REPATH_DISTANCE {
                cast.ordered_to = cast.target.position;
                world.issue_order(
                    caster,
                    UnitOrder::MoveToRange {
                        destination: cast.target.position,
                        range: cast.ability.range,
                    },
                );
            }
            self.pending.insert(caster, cast);
        }
        ready
    }
}

/// Caster alive, slot unchanged and ready, unit target alive. Refreshes the
/// target position from a unit target.
fn still_valid(cast: &mut DeferredCast, selection: &SelectionContext, world: &dyn AbilityWorld) -> bool {
    if !(world.exists(cast.caster) && world.is_alive(cast.caster)) {
        return false;
    }

    let slot_ready = selection
        .slots_for(cast.caster)
        .and_then(|slots| slots.get(cast.slot_index))
        .is_some_and(|slot| slot.holds(&cast.ability) && slot.state == SlotState::Ready);
    if !slot_ready || !cast.ability.can_use(cast.caster, world) {
        return false;
    }

    if let Some(target) = cast.target.entity {
        if !(world.exists(target) && world.is_alive(target)) {
            return false;
        }
        if let Some(position) = world.position(target) {
            cast.target.position = position;
        }
    }
    true
}

fn drop_cast(cast: DeferredCast, world: &mut dyn AbilityWorld, notes: &mut Vec<AbilityNotification>) {
    debug!("{:?} dropped deferred {}", cast.caster, cast.ability.name);
    cast.ability.cancel(cast.caster, world);
    notes.push(AbilityNotification::DeferredCastDropped {
        caster: cast.caster,
        ability: cast.ability,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abilities::descriptor::TargetKind;
    use crate::abilities::test_support::{scripted_kind, StubWorld};
    use crate::abilities::world::Faction;

    fn setup() -> (StubWorld, SelectionContext, Entity, Entity, AbilityRef) {
        let mut world = StubWorld::default();
        let caster = world.spawn_at(Faction::Player, Vec3::ZERO);
        let enemy = world.spawn_at(Faction::Hostile, Vec3::new(10.0, 0.0, 0.0));
        let (bolt, _) = scripted_kind("bolt", TargetKind::Enemy, 1.0, 3.0, 4.0);
        world.loadouts.insert(caster, vec![bolt.clone()]);
        let mut selection = SelectionContext::new();
        selection.switch_to(Some(caster), &world);
        (world, selection, caster, enemy, bolt)
    }

    #[test]
    fn test_defer_issues_move_order() {
        let (mut world, _selection, caster, enemy, bolt) = setup();
        let mut deferred = DeferredCasts::new();
        let mut notes = Vec::new();

        let target = CastTarget::unit(enemy, Vec3::new(10.0, 0.0, 0.0));
        deferred.defer(caster, 0, bolt, target, 10.0, &mut world, &mut notes);

        assert_eq!(
            world.orders(),
            vec![(
                caster,
                UnitOrder::MoveToRange {
                    destination: Vec3::new(10.0, 0.0, 0.0),
                    range: 4.0
                }
            )]
        );
        assert!(matches!(notes[0], AbilityNotification::MoveToRange { .. }));
        assert!(deferred.pending_for(caster).is_some());
    }

    #[test]
    fn test_ready_once_in_range() {
        let (mut world, selection, caster, enemy, bolt) = setup();
        let mut deferred = DeferredCasts::new();
        let mut notes = Vec::new();

        deferred.defer(caster, 0, bolt, CastTarget::unit(enemy, Vec3::new(10.0, 0.0, 0.0)), 10.0, &mut world, &mut notes);
        assert!(deferred.tick(&selection, &mut world, &mut notes).is_empty());

        world.units.get_mut(&caster).unwrap().position = Vec3::new(7.0, 0.0, 0.0);
        let ready = deferred.tick(&selection, &mut world, &mut notes);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].slot_index, 0);
        assert!(deferred.is_empty());
    }

    #[test]
    fn test_moving_target_gets_new_order() {
        let (mut world, selection, caster, enemy, bolt) = setup();
        let mut deferred = DeferredCasts::new();
        let mut notes = Vec::new();

        deferred.defer(caster, 0, bolt, CastTarget::unit(enemy, Vec3::new(10.0, 0.0, 0.0)), 10.0, &mut world, &mut notes);
        world.units.get_mut(&enemy).unwrap().position = Vec3::new(10.0, 0.0, 5.0);
        deferred.tick(&selection, &mut world, &mut notes);

        assert_eq!(world.orders().len(), 2);
        assert_eq!(
            deferred.pending_for(caster).unwrap().target.position,
            Vec3::new(10.0, 0.0, 5.0)
        );
    }

    #[test]
    fn test_dead_target_drops_cast() {
        let (mut world, selection, caster, enemy, bolt) = setup();
        let mut deferred = DeferredCasts::new();
        let mut notes = Vec::new();

        deferred.defer(caster, 0, bolt, CastTarget::unit(enemy, Vec3::new(10.0, 0.0, 0.0)), 10.0, &mut world, &mut notes);
        world.units.get_mut(&enemy).unwrap().alive = false;

        assert!(deferred.tick(&selection, &mut world, &mut notes).is_empty());
        assert!(deferred.is_empty());
        assert!(matches!(notes.last(), Some(AbilityNotification::DeferredCastDropped { .. })));
    }

    #[test]
    fn test_paused_tick_keeps_cast_parked() {
        let (mut world, selection, caster, enemy, bolt) = setup();
        let mut deferred = DeferredCasts::new();
        let mut notes = Vec::new();

        deferred.defer(caster, 0, bolt, CastTarget::unit(enemy, Vec3::new(10.0, 0.0, 0.0)), 10.0, &mut world, &mut notes);
        world.units.get_mut(&caster).unwrap().position = Vec3::new(9.0, 0.0, 0.0);
        world.paused = true;

        assert!(deferred.tick(&selection, &mut world, &mut notes).is_empty());
        assert_eq!(deferred.len(), 1);
    }

    #[test]
    fn test_supersede_calls_cancel() {
        let mut world = StubWorld::default();
        let caster = world.spawn_unit();
        let (flare, counts) = scripted_kind("flare", TargetKind::Point, 0.0, 0.0, 2.0);
        let mut deferred = DeferredCasts::new();
        let mut notes = Vec::new();

        deferred.defer(caster, 1, flare, CastTarget::at(Vec3::new(9.0, 0.0, 0.0)), 9.0, &mut world, &mut notes);
        assert!(deferred.supersede(caster, &mut world, &mut notes));
        assert!(!deferred.supersede(caster, &mut world, &mut notes));
        assert_eq!(counts.cancels(), 1);
    }
}
