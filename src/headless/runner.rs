//! Headless scenario execution
//!
//! Runs a scripted scenario without any graphical output. Frames are stepped
//! manually with a fixed delta so runs are reproducible.

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::collections::HashMap;
use std::time::Duration;

use crate::abilities::{AbilityDefinitions, UnitOrder};
use crate::combat::components::{ActiveOrder, Loadout, Unit};
use crate::combat::events::{AbilityUsedEvent, PlayerCommand};
use crate::combat::log::{AbilityLog, AbilityLogEventType, RunMetadata, UnitMetadata};
use crate::combat::{self, AbilityPlugin, AbilitySystemPhase};

use super::config::{ScenarioAction, ScenarioConfig, ScenarioStep};

/// Result of a completed scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: String,
    /// Wall-clock length of the run (paused time included)
    pub elapsed: f32,
    /// Simulated time (paused time excluded, speed applied)
    pub simulated_time: f32,
    pub units: Vec<UnitResult>,
    /// Completed casts in order
    pub ability_uses: Vec<AbilityUse>,
    pub log: AbilityLog,
    /// Where the log was written, if it was saved
    pub log_path: Option<String>,
}

impl ScenarioResult {
    pub fn unit(&self, name: &str) -> Option<&UnitResult> {
        self.units.iter().find(|unit| unit.name == name)
    }

    pub fn uses_of(&self, ability_id: &str) -> usize {
        self.ability_uses
            .iter()
            .filter(|cast| cast.ability_id == ability_id)
            .count()
    }

    /// Multi-line summary for the console
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Scenario '{}' finished after {:.1}s ({:.1}s simulated)",
            self.name, self.elapsed, self.simulated_time
        )];
        for unit in &self.units {
            let state = if unit.despawned {
                "despawned".to_string()
            } else if unit.survived {
                format!("{:.0}/{:.0} HP", unit.final_health, unit.max_health)
            } else {
                "dead".to_string()
            };
            lines.push(format!(
                "  {} ({}): {}, resource {:.0}, at ({:.1}, {:.1})",
                unit.name,
                unit.faction,
                state,
                unit.final_resource,
                unit.final_position.x,
                unit.final_position.z
            ));
        }
        lines.push(format!("  {} abilities used", self.ability_uses.len()));
        for cast in &self.ability_uses {
            let target = cast
                .target
                .as_deref()
                .map(|target| format!(" on {}", target))
                .unwrap_or_default();
            lines.push(format!("    [{:>6.2}s] {} used {}{}", cast.time, cast.caster, cast.ability_id, target));
        }
        lines.join("\n")
    }
}

/// State of one unit after the run
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub name: String,
    pub faction: String,
    pub max_health: f32,
    pub final_health: f32,
    pub final_resource: f32,
    pub final_position: Vec3,
    pub survived: bool,
    /// Removed by a `Despawn` step
    pub despawned: bool,
}

/// One completed cast
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityUse {
    /// Simulated time of the cast
    pub time: f32,
    pub caster: String,
    pub ability_id: String,
    pub slot_index: usize,
    /// Unit target, if the cast had one other than the caster
    pub target: Option<String>,
}

/// Resource driving the scenario timeline
#[derive(Resource)]
pub struct ScenarioState {
    steps: Vec<ScenarioStep>,
    next_step: usize,
    /// Wall-clock time since start
    pub elapsed: f32,
    /// Unit names to entities
    pub units: HashMap<String, Entity>,
    pub ability_uses: Vec<AbilityUse>,
}

impl ScenarioState {
    fn entity(&self, name: &str) -> Option<Entity> {
        self.units.get(name).copied()
    }

    fn name_of(&self, entity: Entity) -> Option<&str> {
        self.units
            .iter()
            .find(|(_, e)| **e == entity)
            .map(|(name, _)| name.as_str())
    }
}

/// Plugin for headless scenario execution
pub struct HeadlessPlugin {
    pub config: ScenarioConfig,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let mut steps = self.config.steps.clone();
        // Stable: steps sharing a timestamp keep file order
        steps.sort_by(|a, b| a.at.total_cmp(&b.at));

        app.insert_resource(ScenarioState {
            steps,
            next_step: 0,
            elapsed: 0.0,
            units: HashMap::new(),
            ability_uses: Vec::new(),
        })
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(
            1.0 / self.config.tick_rate,
        )));

        combat::add_ability_systems(app, || true);

        app.add_systems(
            Update,
            run_scenario_steps.before(AbilitySystemPhase::Input),
        )
        .add_systems(
            Update,
            record_ability_uses.after(AbilitySystemPhase::Abilities),
        );

        let world = app.world_mut();
        for spawn in &self.config.units {
            let entity = world
                .spawn((
                    Transform::from_xyz(spawn.position[0], 0.0, spawn.position[1]),
                    Unit::new(spawn.name.clone(), spawn.faction)
                        .with_health(spawn.health)
                        .with_resource(spawn.resource)
                        .with_move_speed(spawn.move_speed),
                    Loadout::new(spawn.loadout.iter().cloned()),
                    ActiveOrder::default(),
                ))
                .id();
            world
                .resource_mut::<ScenarioState>()
                .units
                .insert(spawn.name.clone(), entity);
        }
    }
}

/// Send the player commands for every step that is due.
fn run_scenario_steps(
    time: Res<Time>,
    mut state: ResMut<ScenarioState>,
    mut commands: Commands,
    transforms: Query<&Transform, With<Unit>>,
    mut player: EventWriter<PlayerCommand>,
) {
    state.elapsed += time.delta_secs();

    while let Some(step) = state.steps.get(state.next_step) {
        if step.at > state.elapsed + 1e-4 {
            break;
        }
        let action = step.action.clone();
        state.next_step += 1;

        let position_of = |name: &str| {
            state
                .entity(name)
                .and_then(|entity| transforms.get(entity).ok())
                .map(|transform| transform.translation)
        };
        let ground = |x: f32, z: f32| Vec3::new(x, 0.0, z);

        match action {
            ScenarioAction::Select { unit } => {
                player.send(PlayerCommand::Select(state.entity(&unit)));
            }
            ScenarioAction::Deselect => {
                player.send(PlayerCommand::Select(None));
            }
            ScenarioAction::UseSlot { slot } => {
                player.send(PlayerCommand::UseSlot(slot));
            }
            ScenarioAction::PointAt { x, z } => {
                player.send(PlayerCommand::PointerMoved {
                    ground: Some(ground(x, z)),
                    hovered: None,
                });
            }
            ScenarioAction::HoverUnit { unit } => {
                player.send(PlayerCommand::PointerMoved {
                    ground: position_of(unit.as_str()),
                    hovered: state.entity(&unit),
                });
            }
            ScenarioAction::Confirm => {
                player.send(PlayerCommand::ConfirmTarget { point: None });
            }
            ScenarioAction::ConfirmAt { x, z } => {
                player.send(PlayerCommand::ConfirmTarget {
                    point: Some(ground(x, z)),
                });
            }
            ScenarioAction::ConfirmOnUnit { unit } => {
                player.send(PlayerCommand::PointerMoved {
                    ground: position_of(unit.as_str()),
                    hovered: state.entity(&unit),
                });
                player.send(PlayerCommand::ConfirmTarget { point: None });
            }
            ScenarioAction::CancelTargeting => {
                player.send(PlayerCommand::CancelTargeting);
            }
            ScenarioAction::CancelCasting { slot } => {
                player.send(PlayerCommand::CancelCasting(slot));
            }
            ScenarioAction::Pause => {
                player.send(PlayerCommand::SetPaused(true));
            }
            ScenarioAction::Resume => {
                player.send(PlayerCommand::SetPaused(false));
            }
            ScenarioAction::SetSpeed { multiplier } => {
                player.send(PlayerCommand::SetSpeed(multiplier));
            }
            ScenarioAction::Move { unit, x, z } => {
                send_order(&state, &mut player, &unit, UnitOrder::Move { destination: ground(x, z) });
            }
            ScenarioAction::Guard { unit, x, z } => {
                send_order(&state, &mut player, &unit, UnitOrder::Guard { position: ground(x, z) });
            }
            ScenarioAction::Patrol { unit, waypoints } => {
                let waypoints = waypoints.iter().map(|[x, z]| ground(*x, *z)).collect();
                send_order(&state, &mut player, &unit, UnitOrder::Patrol { waypoints });
            }
            ScenarioAction::Attack { unit, target } => {
                if let Some(target) = state.entity(&target) {
                    send_order(&state, &mut player, &unit, UnitOrder::Attack { target });
                }
            }
            ScenarioAction::Stop { unit } => {
                send_order(&state, &mut player, &unit, UnitOrder::Stop);
            }
            ScenarioAction::Despawn { unit } => {
                if let Some(entity) = state.entity(&unit) {
                    info!("Despawning {}", unit);
                    commands.entity(entity).despawn();
                }
            }
        }
    }
}

fn send_order(state: &ScenarioState, player: &mut EventWriter<PlayerCommand>, unit: &str, order: UnitOrder) {
    if let Some(unit) = state.entity(unit) {
        player.send(PlayerCommand::Order { unit, order });
    }
}

fn record_ability_uses(
    mut events: EventReader<AbilityUsedEvent>,
    log: Res<AbilityLog>,
    mut state: ResMut<ScenarioState>,
) {
    for event in events.read() {
        let caster = state.name_of(event.caster).unwrap_or("?").to_string();
        let target = event
            .target
            .filter(|target| *target != event.caster)
            .and_then(|target| state.name_of(target))
            .map(str::to_string);
        state.ability_uses.push(AbilityUse {
            time: log.match_time,
            caster,
            ability_id: event.ability_id.clone(),
            slot_index: event.slot_index,
            target,
        });
    }
}

/// Build the app for a scenario without running it
pub fn build_scenario_app(config: &ScenarioConfig, definitions: AbilityDefinitions) -> Result<App, String> {
    config.validate(&definitions)?;

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        // Already-loaded catalog; AbilityPlugin won't read the file
        .insert_resource(definitions)
        .add_plugins(AbilityPlugin::default())
        .add_plugins(HeadlessPlugin { config: config.clone() });
    app.finish();
    app.cleanup();

    app.world_mut().resource_mut::<AbilityLog>().log(
        AbilityLogEventType::Simulation,
        format!("Scenario '{}' started (headless mode)", config.name),
    );
    Ok(app)
}

/// Run a scenario to completion and collect its results. The log is saved when
/// the scenario names an output path.
pub fn run_scenario(config: &ScenarioConfig, definitions: AbilityDefinitions) -> Result<ScenarioResult, String> {
    let mut app = build_scenario_app(config, definitions)?;

    loop {
        app.update();
        let elapsed = app.world().resource::<ScenarioState>().elapsed;
        if elapsed + 1e-4 >= config.max_duration_secs {
            break;
        }
    }

    let mut result = collect_result(&app, config);
    if let Some(path) = config.output_path.as_deref() {
        result.log_path = Some(save_scenario_log(&result, Some(path))?);
    }
    Ok(result)
}

fn collect_result(app: &App, config: &ScenarioConfig) -> ScenarioResult {
    let world = app.world();
    let state = world.resource::<ScenarioState>();
    let entities: Vec<(String, Entity)> = config
        .units
        .iter()
        .filter_map(|spawn| state.entity(&spawn.name).map(|entity| (spawn.name.clone(), entity)))
        .collect();
    let ability_uses = state.ability_uses.clone();
    let elapsed = state.elapsed;
    let log = world.resource::<AbilityLog>().clone();

    let mut units = Vec::new();
    for (name, entity) in entities {
        let spawn = config.units.iter().find(|spawn| spawn.name == name);
        let live = world
            .get::<Unit>(entity)
            .zip(world.get::<Transform>(entity))
            .map(|(unit, transform)| (unit.clone(), transform.translation));
        let result = match live {
            Some((unit, position)) => UnitResult {
                name,
                faction: unit.faction.name().to_string(),
                max_health: unit.max_health,
                final_health: unit.current_health,
                final_resource: unit.current_resource,
                final_position: position,
                survived: unit.is_alive(),
                despawned: false,
            },
            None => UnitResult {
                name,
                faction: spawn.map_or("?", |spawn| spawn.faction.name()).to_string(),
                max_health: spawn.map_or(0.0, |spawn| spawn.health),
                final_health: 0.0,
                final_resource: 0.0,
                final_position: Vec3::ZERO,
                survived: false,
                despawned: true,
            },
        };
        units.push(result);
    }

    ScenarioResult {
        name: config.name.clone(),
        elapsed,
        simulated_time: log.match_time,
        units,
        ability_uses,
        log,
        log_path: None,
    }
}

/// Save the ability log with per-unit metadata
pub fn save_scenario_log(result: &ScenarioResult, path: Option<&str>) -> Result<String, String> {
    let metadata = RunMetadata {
        scenario: result.name.clone(),
        duration: result.simulated_time,
        units: result
            .units
            .iter()
            .map(|unit| UnitMetadata {
                name: unit.name.clone(),
                faction: unit.faction.clone(),
                max_health: unit.max_health,
                final_health: unit.final_health,
                final_resource: unit.final_resource,
                final_position: (unit.final_position.x, unit.final_position.y, unit.final_position.z),
            })
            .collect(),
    };
    result.log.save_to_file(&metadata, path)
}

/// Run a scenario from the command line and print a summary
pub fn run_headless_scenario(config: ScenarioConfig, definitions: AbilityDefinitions) -> Result<(), String> {
    println!("Starting headless scenario '{}'...", config.name);
    println!("  Units: {}", config.units.len());
    println!("  Steps: {}", config.steps.len());
    println!("  Max duration: {:.0}s", config.max_duration_secs);

    let result = run_scenario(&config, definitions)?;
    println!("{}", result.summary());
    match &result.log_path {
        Some(path) => println!("Scenario complete. Log saved to: {}", path),
        None => {
            let path = save_scenario_log(&result, None)?;
            println!("Scenario complete. Log saved to: {}", path);
        }
    }
    Ok(())
}
