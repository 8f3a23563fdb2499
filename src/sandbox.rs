//! Windowed sandbox
//!
//! A small ground plane with a handful of units. Gizmos show the selection,
//! the targeting preview, health and cast progress.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use crate::abilities::{AbilityCore, CastProgress, Faction, PreviewPlacement, PreviewShape, MAX_SLOTS};
use crate::combat::components::{ActiveOrder, Loadout, Unit};
use crate::combat::{input, AbilitySystemPhase};

const GROUND_SIZE: f32 = 60.0;
const BAR_WIDTH: f32 = 1.6;
const BAR_HEIGHT: f32 = 2.6;

/// Scene setup and gizmo drawing for the windowed mode
pub struct SandboxPlugin;

impl Plugin for SandboxPlugin {
    fn build(&self, app: &mut App) {
        input::add_input_systems(app);
        app.add_systems(Startup, setup_sandbox).add_systems(
            Update,
            (draw_unit_gizmos, draw_targeting_preview).after(AbilitySystemPhase::Resolution),
        );
    }
}

struct SandboxUnit {
    name: &'static str,
    faction: Faction,
    position: Vec3,
    loadout: &'static [&'static str],
}

const SANDBOX_UNITS: &[SandboxUnit] = &[
    SandboxUnit {
        name: "Mage",
        faction: Faction::Player,
        position: Vec3::new(-8.0, 0.0, 0.0),
        loadout: &["firebolt", "flame_wave", "dash", "flare", "war_cry"],
    },
    SandboxUnit {
        name: "Cleric",
        faction: Faction::Player,
        position: Vec3::new(-8.0, 0.0, 4.0),
        loadout: &["mend", "second_wind", "war_cry"],
    },
    SandboxUnit {
        name: "Brute",
        faction: Faction::Hostile,
        position: Vec3::new(10.0, 0.0, 0.0),
        loadout: &[],
    },
    SandboxUnit {
        name: "Skirmisher",
        faction: Faction::Hostile,
        position: Vec3::new(12.0, 0.0, -5.0),
        loadout: &[],
    },
    SandboxUnit {
        name: "Merchant",
        faction: Faction::Neutral,
        position: Vec3::new(0.0, 0.0, 10.0),
        loadout: &[],
    },
];

fn faction_color(faction: Faction) -> Color {
    match faction {
        Faction::Player => Color::srgb(0.2, 0.5, 1.0),
        Faction::Hostile => Color::srgb(0.9, 0.2, 0.2),
        Faction::Neutral => Color::srgb(0.8, 0.8, 0.3),
    }
}

fn setup_sandbox(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 32.0, 24.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(10.0, 20.0, 10.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.35, 0.3))),
    ));

    let body = meshes.add(Capsule3d::new(0.5, 1.0));
    for spawn in SANDBOX_UNITS {
        let material = materials.add(faction_color(spawn.faction));
        commands
            .spawn((
                Transform::from_translation(spawn.position),
                Visibility::default(),
                Unit::new(spawn.name, spawn.faction),
                Loadout::new(spawn.loadout.iter().copied()),
                ActiveOrder::default(),
            ))
            .with_children(|parent| {
                parent.spawn((
                    Mesh3d(body.clone()),
                    MeshMaterial3d(material),
                    Transform::from_xyz(0.0, 1.0, 0.0),
                ));
            });
    }

    info!("Sandbox ready: Tab selects, 1-6 use abilities, left click confirms, Esc cancels");
}

fn flat(position: Vec3) -> Isometry3d {
    Isometry3d::new(position + Vec3::Y * 0.05, Quat::from_rotation_x(FRAC_PI_2))
}

fn draw_unit_gizmos(mut gizmos: Gizmos, ability_core: Res<AbilityCore>, units: Query<(Entity, &Transform, &Unit)>) {
    let active = ability_core.active_unit();

    for (entity, transform, unit) in units.iter() {
        let position = transform.translation;

        if Some(entity) == active {
            gizmos.circle(flat(position), 1.0, Color::srgb(0.2, 1.0, 0.2));
        }

        // Health bar
        let left = position + Vec3::new(-BAR_WIDTH / 2.0, BAR_HEIGHT, 0.0);
        let fraction = if unit.max_health > 0.0 {
            unit.current_health / unit.max_health
        } else {
            0.0
        };
        gizmos.line(left, left + Vec3::X * BAR_WIDTH, Color::srgb(0.3, 0.0, 0.0));
        gizmos.line(left, left + Vec3::X * BAR_WIDTH * fraction, Color::srgb(0.0, 0.9, 0.0));

        // Cast bars
        let mut row = 1.0;
        for slot_index in 0..MAX_SLOTS {
            let progress = ability_core.cast_progress_for(entity, slot_index);
            if progress == CastProgress::NotCasting {
                continue;
            }
            let start = left + Vec3::Y * 0.25 * row;
            gizmos.line(
                start,
                start + Vec3::X * BAR_WIDTH * progress.fraction(),
                Color::srgb(1.0, 0.85, 0.1),
            );
            row += 1.0;
        }
    }
}

fn draw_targeting_preview(mut gizmos: Gizmos, ability_core: Res<AbilityCore>) {
    let Some(preview) = ability_core.targeting_preview() else {
        return;
    };

    match (preview.placement, preview.shape) {
        (PreviewPlacement::Hidden, _) => {}
        (PreviewPlacement::At(point), PreviewShape::Circle { radius } | PreviewShape::Marker { radius }) => {
            gizmos.circle(flat(point), radius, preview.color);
        }
        (PreviewPlacement::At(point), PreviewShape::Segment { .. }) => {
            gizmos.circle(flat(point), 0.3, preview.color);
        }
        (PreviewPlacement::Segment { from, to }, _) => {
            gizmos.line(from + Vec3::Y * 0.05, to + Vec3::Y * 0.05, preview.color);
            gizmos.circle(flat(to), 0.3, preview.color);
        }
    }
}
