//! Keyboard and mouse input
//!
//! Turns raw input into [`PlayerCommand`]s. Only used by the windowed
//! sandbox; headless runs write commands directly.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::abilities::{AbilityCore, Faction, UnitOrder};
use crate::keybindings::{GameAction, Keybindings};

use super::components::{PointerState, Selected, Unit};
use super::events::PlayerCommand;
use super::AbilitySystemPhase;

/// How far from a unit's centre the pointer still counts as over it
const HOVER_RADIUS: f32 = 1.0;

/// Adds the input systems ahead of the sandbox's input phase.
pub fn add_input_systems(app: &mut App) {
    app.add_systems(
        Update,
        (update_pointer_from_cursor, send_keyboard_commands, send_mouse_commands)
            .chain()
            .before(AbilitySystemPhase::Input)
            .run_if(resource_exists::<ButtonInput<KeyCode>>),
    );
}

/// Raycast the cursor onto the ground plane and find the unit under it.
pub fn update_pointer_from_cursor(
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    units: Query<(Entity, &Transform), With<Unit>>,
    mut commands: EventWriter<PlayerCommand>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Ok((camera, camera_transform)) = cameras.get_single() else {
        return;
    };

    let ground = window
        .cursor_position()
        .and_then(|cursor| camera.viewport_to_world(camera_transform, cursor).ok())
        .and_then(|ray| {
            ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Y))
                .map(|distance| ray.get_point(distance))
        });

    let hovered = ground.and_then(|point| {
        units
            .iter()
            .map(|(entity, transform)| {
                let offset = transform.translation - point;
                (entity, Vec2::new(offset.x, offset.z).length())
            })
            .filter(|(_, distance)| *distance <= HOVER_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity)
    });

    commands.send(PlayerCommand::PointerMoved { ground, hovered });
}

pub fn send_keyboard_commands(
    keyboard: Res<ButtonInput<KeyCode>>,
    keybindings: Res<Keybindings>,
    ability_core: Res<AbilityCore>,
    player_units: Query<(Entity, &Unit)>,
    selected: Query<Entity, With<Selected>>,
    mut commands: EventWriter<PlayerCommand>,
) {
    for action in GameAction::all() {
        if !keybindings.action_just_pressed(action, &keyboard) {
            continue;
        }

        if let Some(slot_index) = action.ability_slot() {
            commands.send(PlayerCommand::UseSlot(slot_index));
            continue;
        }
        if let Some(multiplier) = action.speed_multiplier() {
            commands.send(PlayerCommand::SetSpeed(multiplier));
            continue;
        }

        match action {
            GameAction::ConfirmTarget => {
                commands.send(PlayerCommand::ConfirmTarget { point: None });
            }
            GameAction::CancelTargeting => {
                commands.send(PlayerCommand::CancelTargeting);
            }
            GameAction::CancelCasting => {
                commands.send(PlayerCommand::CancelCasting(None));
            }
            GameAction::PausePlay => {
                commands.send(PlayerCommand::TogglePause);
            }
            GameAction::SelectNextUnit => {
                let mut candidates: Vec<Entity> = player_units
                    .iter()
                    .filter(|(_, unit)| unit.faction == Faction::Player && unit.is_alive())
                    .map(|(entity, _)| entity)
                    .collect();
                candidates.sort();
                if candidates.is_empty() {
                    continue;
                }
                let current = ability_core
                    .active_unit()
                    .or_else(|| selected.iter().next())
                    .and_then(|active| candidates.iter().position(|e| *e == active));
                let next = current.map_or(0, |index| (index + 1) % candidates.len());
                commands.send(PlayerCommand::Select(Some(candidates[next])));
            }
            _ => {}
        }
    }
}

/// Left click confirms targeting or selects, right click cancels targeting or
/// moves the selected unit.
pub fn send_mouse_commands(
    mouse: Res<ButtonInput<MouseButton>>,
    pointer: Res<PointerState>,
    ability_core: Res<AbilityCore>,
    mut commands: EventWriter<PlayerCommand>,
) {
    let targeting = ability_core.targeting_session().is_some();

    if mouse.just_pressed(MouseButton::Left) {
        if targeting {
            commands.send(PlayerCommand::ConfirmTarget { point: None });
        } else {
            commands.send(PlayerCommand::Select(pointer.hovered));
        }
    }

    if mouse.just_pressed(MouseButton::Right) {
        if targeting {
            commands.send(PlayerCommand::CancelTargeting);
        } else if let (Some(unit), Some(destination)) = (ability_core.active_unit(), pointer.ground) {
            commands.send(PlayerCommand::Order {
                unit,
                order: UnitOrder::Move { destination },
            });
        }
    }
}
