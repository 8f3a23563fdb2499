//! Sandbox systems
//!
//! Feed player commands into the [`AbilityCore`], advance it, publish what it
//! reports, then resolve effects and unit orders.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::abilities::{
    AbilityCore, AbilityEffect, AbilityNotification, AbilityWorld, CastTarget, Faction, QueuedCommand,
    UnitOrder,
};

use super::components::{ActiveOrder, PointerState, Selected, Unit};
use super::events::*;
use super::log::{AbilityLog, AbilityLogEventType};
use super::world::AbilityWorldParams;
use super::SimulationSpeed;

/// Fraction of the ability range a move-to-range order walks into, so the
/// caster ends up strictly inside it.
const MOVE_TO_RANGE_FACTOR: f32 = 0.9;
/// How close an attack order walks to its target.
const ATTACK_DISTANCE: f32 = 1.5;

// ============================================================================
// Input phase
// ============================================================================

/// Advance the log clock by scaled time (frozen while paused).
pub fn advance_log_clock(time: Res<Time>, speed: Res<SimulationSpeed>, mut log: ResMut<AbilityLog>) {
    log.match_time += time.delta_secs() * speed.multiplier;
}

/// Handle the commands that don't go through the ability core: selection,
/// pause, speed and the pointer. The last `Select` of a frame wins.
pub fn apply_control_commands(
    mut commands: Commands,
    mut events: EventReader<PlayerCommand>,
    mut speed: ResMut<SimulationSpeed>,
    mut pointer: ResMut<PointerState>,
    mut log: ResMut<AbilityLog>,
    selected: Query<Entity, With<Selected>>,
    units: Query<(), With<Unit>>,
) {
    let mut selection = None;

    for command in events.read() {
        match command {
            PlayerCommand::Select(target) => selection = Some(*target),
            PlayerCommand::SetPaused(paused) => set_paused(&mut speed, &mut log, *paused),
            PlayerCommand::TogglePause => {
                let paused = !speed.is_paused();
                set_paused(&mut speed, &mut log, paused);
            }
            PlayerCommand::SetSpeed(multiplier) => {
                let was_paused = speed.is_paused();
                speed.set_multiplier(*multiplier);
                if speed.is_paused() != was_paused {
                    log_pause_change(&mut log, speed.is_paused());
                } else if !speed.is_paused() {
                    log.log(
                        AbilityLogEventType::Simulation,
                        format!("Simulation speed set to {:.1}x", speed.multiplier),
                    );
                }
            }
            PlayerCommand::PointerMoved { ground, hovered } => {
                pointer.ground = *ground;
                pointer.hovered = *hovered;
            }
            _ => {}
        }
    }

    let Some(target) = selection else {
        return;
    };
    let target = target.filter(|entity| units.contains(*entity));
    for entity in selected.iter() {
        if Some(entity) != target {
            commands.entity(entity).remove::<Selected>();
        }
    }
    if let Some(entity) = target {
        commands.entity(entity).insert(Selected);
    }
}

fn set_paused(speed: &mut SimulationSpeed, log: &mut AbilityLog, paused: bool) {
    if speed.is_paused() == paused {
        return;
    }
    if paused {
        speed.pause();
    } else {
        speed.resume();
    }
    log_pause_change(log, paused);
}

fn log_pause_change(log: &mut AbilityLog, paused: bool) {
    let message = if paused { "Simulation paused" } else { "Simulation resumed" };
    info!("{}", message);
    log.log(AbilityLogEventType::Simulation, message.to_string());
}

// ============================================================================
// Abilities phase
// ============================================================================

/// Route ability commands into the core. Selection is synced first so a
/// `Select` + `UseSlot` in the same frame acts on the new unit.
pub fn handle_ability_commands(
    mut events: EventReader<PlayerCommand>,
    mut ability_core: ResMut<AbilityCore>,
    mut world: AbilityWorldParams,
) {
    ability_core.sync_selection(&mut world);

    for command in events.read() {
        match command {
            PlayerCommand::UseSlot(slot_index) => {
                ability_core.try_use_ability(*slot_index, &mut world);
            }
            PlayerCommand::ConfirmTarget { point } => {
                ability_core.confirm_targeting(*point, &mut world);
            }
            PlayerCommand::CancelTargeting => {
                ability_core.cancel_targeting(&mut world);
            }
            PlayerCommand::CancelCasting(slot_index) => {
                ability_core.cancel_casting(*slot_index, &mut world);
            }
            PlayerCommand::Order { unit, order } => {
                if world.is_paused() && is_order_queued(&ability_core, *unit, order) {
                    debug!("{:?} already has this order queued; ignored", unit);
                    continue;
                }
                ability_core.issue_command(QueuedCommand::order(*unit, order.clone()), &mut world);
            }
            _ => {}
        }
    }
}

/// Whether the paused queue already holds this exact order for `unit`
fn is_order_queued(ability_core: &AbilityCore, unit: Entity, order: &UnitOrder) -> bool {
    ability_core.has_queued_for(unit)
        && ability_core
            .queued_commands()
            .iter()
            .any(|queued| queued.unit == unit && queued.to_order().as_ref() == Some(order))
}

pub fn tick_ability_core(
    time: Res<Time>,
    mut ability_core: ResMut<AbilityCore>,
    mut world: AbilityWorldParams,
) {
    let dt = time.delta_secs() * world.time_scale();
    ability_core.tick(dt, &mut world);
}

/// Drain core notifications into the log and the public events.
pub fn publish_ability_notifications(
    mut ability_core: ResMut<AbilityCore>,
    mut log: ResMut<AbilityLog>,
    units: Query<&Unit>,
    mut used_events: EventWriter<AbilityUsedEvent>,
    mut cooldown_events: EventWriter<CooldownStartedEvent>,
) {
    for note in ability_core.drain_notifications() {
        log.record_notification(&note, |entity| unit_name(&units, entity));

        match &note {
            AbilityNotification::AbilityUsed {
                caster,
                ability,
                slot_index,
                target,
            } => {
                used_events.send(AbilityUsedEvent {
                    caster: *caster,
                    target: target.entity,
                    target_position: target.position,
                    ability_id: ability.id.clone(),
                    ability_name: ability.name.clone(),
                    slot_index: *slot_index,
                });
            }
            AbilityNotification::CooldownStarted {
                caster,
                ability,
                slot_index,
                duration,
            } => {
                cooldown_events.send(CooldownStartedEvent {
                    caster: *caster,
                    ability_id: ability.id.clone(),
                    slot_index: *slot_index,
                    duration: *duration,
                });
            }
            _ => {}
        }
    }
}

fn unit_name(units: &Query<&Unit>, entity: Entity) -> String {
    units
        .get(entity)
        .map(|unit| unit.name.clone())
        .unwrap_or_else(|_| format!("{:?}", entity))
}

// ============================================================================
// Resolution phase
// ============================================================================

/// Resolve ability effects against unit stats and transforms.
///
/// Single-target effects (radius 0) hit the cast target. Area damage hits
/// units hostile to the source, area healing hits its allies.
pub fn apply_ability_effects(
    mut effects: EventReader<AbilityEffectEvent>,
    mut units: Query<(Entity, &mut Transform, &mut Unit)>,
    mut log: ResMut<AbilityLog>,
) {
    for AbilityEffectEvent(effect) in effects.read() {
        let source = effect.source();
        let (source_name, source_faction) = match units.get(source) {
            Ok((_, _, unit)) => (unit.name.clone(), Some(unit.faction)),
            Err(_) => (format!("{:?}", source), None),
        };

        match effect {
            AbilityEffect::Damage {
                ability,
                target,
                amount,
                radius,
                ..
            } => {
                let victims = affected_units(&units, target, *radius, |faction| {
                    source_faction.is_some_and(|own| own.is_hostile_to(faction))
                });
                for victim in victims {
                    let Ok((_, _, mut unit)) = units.get_mut(victim) else {
                        continue;
                    };
                    if !unit.is_alive() {
                        continue;
                    }
                    let dealt = unit.take_damage(*amount);
                    log.log_damage(source_name.clone(), unit.name.clone(), ability.clone(), dealt);
                    if !unit.is_alive() {
                        info!("{} has died", unit.name);
                        log.log_death(&unit.name, &source_name);
                    }
                }
            }
            AbilityEffect::Heal {
                ability,
                target,
                amount,
                radius,
                ..
            } => {
                let recipients = affected_units(&units, target, *radius, |faction| {
                    source_faction.is_some_and(|own| own.is_allied_with(faction))
                });
                for recipient in recipients {
                    let Ok((_, _, mut unit)) = units.get_mut(recipient) else {
                        continue;
                    };
                    let healed = unit.heal(*amount);
                    if healed > 0.0 {
                        log.log_healing(source_name.clone(), unit.name.clone(), ability.clone(), healed);
                    }
                }
            }
            AbilityEffect::Blink {
                ability,
                destination,
                max_distance,
                ..
            } => {
                let Ok((_, mut transform, _)) = units.get_mut(source) else {
                    continue;
                };
                let from = transform.translation;
                let mut offset = *destination - from;
                offset.y = 0.0;
                let offset = offset.clamp_length_max(*max_distance);
                transform.translation = from + offset;
                log.log(
                    AbilityLogEventType::Movement,
                    format!(
                        "{}'s {} moves them to ({:.1}, {:.1})",
                        source_name, ability, transform.translation.x, transform.translation.z
                    ),
                );
            }
            AbilityEffect::Reveal {
                ability,
                position,
                radius,
                ..
            } => {
                log.log(
                    AbilityLogEventType::Simulation,
                    format!(
                        "{}'s {} reveals {:.1} around ({:.1}, {:.1})",
                        source_name, ability, radius, position.x, position.z
                    ),
                );
            }
        }
    }
}

fn affected_units(
    units: &Query<(Entity, &mut Transform, &mut Unit)>,
    target: &CastTarget,
    radius: f32,
    include: impl Fn(Faction) -> bool,
) -> Vec<Entity> {
    if radius <= 0.0 {
        return target.entity.into_iter().collect();
    }
    units
        .iter()
        .filter(|(_, transform, unit)| {
            unit.is_alive()
                && include(unit.faction)
                && transform.translation.distance(target.position) <= radius
        })
        .map(|(entity, _, _)| entity)
        .collect()
}

/// Hand orders from the core (and direct player orders) to the units.
pub fn apply_unit_orders(mut orders: EventReader<UnitOrderEvent>, mut units: Query<&mut ActiveOrder>) {
    for event in orders.read() {
        if let Ok(mut active) = units.get_mut(event.unit) {
            active.set(event.order.clone());
        }
    }
}

/// Walk units along their current order. Nothing moves while paused.
pub fn move_units(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut movers: Query<(Entity, &mut Transform, &mut ActiveOrder, &Unit)>,
) {
    let dt = time.delta_secs() * speed.multiplier;
    if dt <= 0.0 {
        return;
    }

    // Snapshot positions so attack orders can chase other movers
    let positions: HashMap<Entity, Vec3> = movers
        .iter()
        .map(|(entity, transform, _, _)| (entity, transform.translation))
        .collect();

    for (_, mut transform, mut active, unit) in movers.iter_mut() {
        if !unit.is_alive() {
            active.clear();
            continue;
        }
        let Some(order) = active.order.clone() else {
            continue;
        };
        let step = unit.move_speed * dt;
        let position = &mut transform.translation;

        match order {
            UnitOrder::Move { destination } => {
                if step_towards(position, destination, step, 0.0) {
                    active.clear();
                }
            }
            UnitOrder::MoveToRange { destination, range } => {
                if step_towards(position, destination, step, range * MOVE_TO_RANGE_FACTOR) {
                    active.clear();
                }
            }
            UnitOrder::Guard { position: post } => {
                step_towards(position, post, step, 0.0);
            }
            UnitOrder::Patrol { waypoints } => {
                if waypoints.is_empty() {
                    active.clear();
                    continue;
                }
                let index = active.patrol_index % waypoints.len();
                if step_towards(position, waypoints[index], step, 0.0) {
                    active.patrol_index = (index + 1) % waypoints.len();
                }
            }
            UnitOrder::Attack { target } => match positions.get(&target) {
                Some(target_position) => {
                    step_towards(position, *target_position, step, ATTACK_DISTANCE);
                }
                None => active.clear(),
            },
            UnitOrder::Stop => active.clear(),
        }
    }
}

/// Move `position` up to `step` towards `destination`, stopping
/// `stop_distance` short. Returns true once there.
fn step_towards(position: &mut Vec3, destination: Vec3, step: f32, stop_distance: f32) -> bool {
    let offset = destination - *position;
    let distance = offset.length();
    if distance <= stop_distance + f32::EPSILON {
        return true;
    }
    let travel = (distance - stop_distance).min(step);
    *position += offset / distance * travel;
    distance - travel <= stop_distance + 1e-4
}

// ============================================================================
// Cleanup phase
// ============================================================================

/// Drop core state for units that were despawned this frame.
pub fn forget_despawned_units(
    mut removed: RemovedComponents<Unit>,
    mut ability_core: ResMut<AbilityCore>,
    mut world: AbilityWorldParams,
) {
    for entity in removed.read() {
        if ability_core.forget_unit(entity, &mut world) {
            debug!("Forgot ability state for despawned {:?}", entity);
        }
    }
}
