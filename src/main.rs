//! Tactics ability sandbox
//!
//! Windowed by default; `--scenario` runs a scripted scenario headless.

use std::path::Path;

use bevy::prelude::*;

use tactics_abilities::abilities::config::{load_ability_definitions_from, ABILITIES_CONFIG_PATH};
use tactics_abilities::cli::{self, Args};
use tactics_abilities::combat::{self, AbilityPlugin};
use tactics_abilities::headless::{run_headless_scenario, ScenarioConfig};
use tactics_abilities::sandbox::SandboxPlugin;
use tactics_abilities::settings::{GameSettings, SettingsPlugin};

fn main() {
    let args = cli::parse_args();

    if let Some(scenario) = args.scenario.as_deref() {
        if let Err(e) = run_headless(&args, scenario) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
        return;
    }

    run_windowed(&args);
}

fn catalog_path(args: &Args) -> String {
    args.abilities
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| ABILITIES_CONFIG_PATH.to_string())
}

fn run_headless(args: &Args, scenario: &Path) -> Result<(), String> {
    let mut config = ScenarioConfig::load_from_file(scenario)?;
    if let Some(max_duration) = args.max_duration {
        config.max_duration_secs = max_duration;
    }
    if let Some(output) = &args.output {
        config.output_path = Some(output.display().to_string());
    }

    let definitions = load_ability_definitions_from(&catalog_path(args))?;
    run_headless_scenario(config, definitions)
}

fn run_windowed(args: &Args) {
    let settings = GameSettings::load();

    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(settings.window("Tactics Ability Sandbox")),
        ..default()
    }))
    .add_plugins(SettingsPlugin)
    .add_plugins(AbilityPlugin {
        catalog_path: Some(catalog_path(args)),
    })
    .add_plugins(SandboxPlugin);

    combat::add_ability_systems(&mut app, || true);

    app.run();
}
