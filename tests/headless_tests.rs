//! Integration tests for headless scenario execution
//!
//! These tests verify that:
//! - Scenarios run to completion and report per-unit results
//! - Pausing freezes casts while the scenario clock keeps running
//! - Out-of-range casts walk the caster in before firing
//! - Invalid scenarios are rejected before anything runs

use tactics_abilities::abilities::config::parse_ability_definitions;
use tactics_abilities::abilities::AbilityDefinitions;
use tactics_abilities::headless::{build_scenario_app, run_scenario, ScenarioConfig};
use tactics_abilities::AbilityLogEventType;

const CATALOG: &str = r#"(
    abilities: {
        "bolt": (
            name: "Bolt",
            target: Enemy,
            cooldown: 3.0,
            range: 10.0,
            effect: Damage(amount: 30.0),
        ),
        "slow_bolt": (
            name: "Slow Bolt",
            target: Enemy,
            cast_time: 1.0,
            cooldown: 3.0,
            range: 10.0,
            effect: Damage(amount: 30.0),
        ),
    },
)"#;

fn catalog() -> AbilityDefinitions {
    parse_ability_definitions(CATALOG, "test catalog").expect("test catalog should parse")
}

/// Helper to build a scenario from JSON
fn scenario(json: &str) -> ScenarioConfig {
    serde_json::from_str(json).expect("scenario JSON should parse")
}

fn slow_bolt_with_pause(max_duration: f32) -> ScenarioConfig {
    let mut config = scenario(
        r#"{
            "name": "paused_cast",
            "units": [
                { "name": "Mage", "faction": "Player", "position": [0, 0], "loadout": ["slow_bolt"] },
                { "name": "Brute", "faction": "Hostile", "position": [5, 0] }
            ],
            "steps": [
                { "at": 0.0, "action": "Select", "unit": "Mage" },
                { "at": 0.1, "action": "UseSlot", "slot": 0 },
                { "at": 0.2, "action": "ConfirmOnUnit", "unit": "Brute" },
                { "at": 0.5, "action": "Pause" },
                { "at": 3.5, "action": "Resume" }
            ]
        }"#,
    );
    config.max_duration_secs = max_duration;
    config
}

// =============================================================================
// Running scenarios
// =============================================================================

#[test]
fn test_instant_cast_damages_target() {
    let config = scenario(
        r#"{
            "name": "instant_bolt",
            "units": [
                { "name": "Mage", "faction": "Player", "position": [0, 0], "loadout": ["bolt"] },
                { "name": "Brute", "faction": "Hostile", "position": [5, 0] }
            ],
            "steps": [
                { "at": 0.0, "action": "Select", "unit": "Mage" },
                { "at": 0.1, "action": "UseSlot", "slot": 0 },
                { "at": 0.2, "action": "ConfirmOnUnit", "unit": "Brute" }
            ],
            "max_duration_secs": 1.0
        }"#,
    );

    let result = run_scenario(&config, catalog()).expect("scenario should run");

    assert_eq!(result.name, "instant_bolt");
    assert!(result.elapsed >= 1.0);
    assert_eq!(result.uses_of("bolt"), 1);
    assert_eq!(result.ability_uses[0].caster, "Mage");
    assert_eq!(result.ability_uses[0].target.as_deref(), Some("Brute"));

    let brute = result.unit("Brute").expect("Brute should be reported");
    assert_eq!(brute.final_health, 70.0);
    assert!(brute.survived);
    assert_eq!(result.log.damage_by_ability("Mage").get("bolt"), Some(&30.0));
    assert!(result.log_path.is_none());
}

#[test]
fn test_pause_delays_timed_cast() {
    // Cast starts at 0.2s and has 0.3s done when the pause lands; the
    // remaining 0.7s only runs after the resume at 3.5s.
    let early = run_scenario(&slow_bolt_with_pause(4.0), catalog()).expect("scenario should run");
    assert_eq!(early.uses_of("slow_bolt"), 0);
    assert_eq!(early.unit("Brute").map(|unit| unit.final_health), Some(100.0));

    let late = run_scenario(&slow_bolt_with_pause(5.0), catalog()).expect("scenario should run");
    assert_eq!(late.uses_of("slow_bolt"), 1);
    assert_eq!(late.unit("Brute").map(|unit| unit.final_health), Some(70.0));

    // Three paused seconds don't count as simulated time
    assert!((late.simulated_time - 2.0).abs() < 0.1, "simulated {}", late.simulated_time);
    let pauses = late
        .log
        .filter_by_type(AbilityLogEventType::Simulation)
        .iter()
        .filter(|entry| entry.message == "Simulation paused")
        .count();
    assert_eq!(pauses, 1);
}

#[test]
fn test_out_of_range_caster_walks_in_then_casts() {
    let config = scenario(
        r#"{
            "name": "walk_in",
            "units": [
                { "name": "Mage", "faction": "Player", "position": [0, 0], "loadout": ["bolt"] },
                { "name": "Brute", "faction": "Hostile", "position": [20, 0] }
            ],
            "steps": [
                { "at": 0.0, "action": "Select", "unit": "Mage" },
                { "at": 0.1, "action": "UseSlot", "slot": 0 },
                { "at": 0.2, "action": "ConfirmOnUnit", "unit": "Brute" }
            ],
            "max_duration_secs": 4.0
        }"#,
    );

    let result = run_scenario(&config, catalog()).expect("scenario should run");

    assert_eq!(result.uses_of("bolt"), 1);
    assert_eq!(result.unit("Brute").map(|unit| unit.final_health), Some(70.0));

    let mage = result.unit("Mage").expect("Mage should be reported");
    assert!(
        mage.final_position.x > 9.5 && mage.final_position.x < 11.0,
        "Mage stopped at {:?}",
        mage.final_position
    );
    assert!(result
        .log
        .filter_by_type(AbilityLogEventType::Movement)
        .iter()
        .any(|entry| entry.message.starts_with("Mage moves into range for Bolt")));
}

#[test]
fn test_orders_issued_while_paused_run_on_resume() {
    let config = scenario(
        r#"{
            "name": "paused_orders",
            "units": [
                { "name": "Mage", "faction": "Player", "position": [0, 0] },
                { "name": "Cleric", "faction": "Player", "position": [0, 4] }
            ],
            "steps": [
                { "at": 0.1, "action": "Pause" },
                { "at": 0.2, "action": "Move", "unit": "Mage", "x": 5, "z": 0 },
                { "at": 0.3, "action": "Move", "unit": "Cleric", "x": 0, "z": 9 },
                { "at": 1.0, "action": "Resume" }
            ],
            "max_duration_secs": 1.5
        }"#,
    );

    let result = run_scenario(&config, catalog()).expect("scenario should run");

    let commands: Vec<&str> = result
        .log
        .filter_by_type(AbilityLogEventType::Command)
        .iter()
        .map(|entry| entry.message.as_str())
        .collect();
    assert_eq!(
        commands,
        vec![
            "Move for Mage queued while paused",
            "Move for Cleric queued while paused",
            "Move for Mage replayed",
            "Move for Cleric replayed",
        ]
    );

    // Half a second of movement at 5 units/s since the resume
    let mage = result.unit("Mage").expect("Mage should be reported");
    assert!(mage.final_position.x > 2.0 && mage.final_position.x < 3.0, "{:?}", mage.final_position);
}

#[test]
fn test_repeated_paused_order_is_queued_once() {
    let config = scenario(
        r#"{
            "name": "repeated_orders",
            "units": [{ "name": "Mage", "faction": "Player", "position": [0, 0] }],
            "steps": [
                { "at": 0.1, "action": "Pause" },
                { "at": 0.2, "action": "Move", "unit": "Mage", "x": 5, "z": 0 },
                { "at": 0.3, "action": "Move", "unit": "Mage", "x": 5, "z": 0 },
                { "at": 0.5, "action": "Resume" }
            ],
            "max_duration_secs": 1.0
        }"#,
    );

    let result = run_scenario(&config, catalog()).expect("scenario should run");

    let commands: Vec<&str> = result
        .log
        .filter_by_type(AbilityLogEventType::Command)
        .iter()
        .map(|entry| entry.message.as_str())
        .collect();
    assert_eq!(
        commands,
        vec!["Move for Mage queued while paused", "Move for Mage replayed"]
    );
}

#[test]
fn test_despawned_caster_cancels_cast() {
    let config = scenario(
        r#"{
            "name": "despawn",
            "units": [
                { "name": "Mage", "faction": "Player", "position": [0, 0], "loadout": ["slow_bolt"] },
                { "name": "Brute", "faction": "Hostile", "position": [5, 0] }
            ],
            "steps": [
                { "at": 0.0, "action": "Select", "unit": "Mage" },
                { "at": 0.1, "action": "UseSlot", "slot": 0 },
                { "at": 0.2, "action": "ConfirmOnUnit", "unit": "Brute" },
                { "at": 0.6, "action": "Despawn", "unit": "Mage" }
            ],
            "max_duration_secs": 2.0
        }"#,
    );

    let result = run_scenario(&config, catalog()).expect("scenario should run");

    assert_eq!(result.uses_of("slow_bolt"), 0);
    assert!(result.unit("Mage").is_some_and(|unit| unit.despawned));
    assert_eq!(result.unit("Brute").map(|unit| unit.final_health), Some(100.0));
    assert!(result
        .log
        .entries
        .iter()
        .any(|entry| entry.message.ends_with("cast was cancelled (CasterLost)")));
}

#[test]
fn test_log_saved_to_output_path() {
    let path = std::env::temp_dir().join(format!("tactics_headless_{}.json", std::process::id()));
    let mut config = slow_bolt_with_pause(1.0);
    config.output_path = Some(path.display().to_string());

    let result = run_scenario(&config, catalog()).expect("scenario should run");

    assert_eq!(result.log_path.as_deref(), Some(path.display().to_string().as_str()));
    let contents = std::fs::read_to_string(&path).expect("log file should exist");
    assert!(contents.contains("\"scenario\": \"paused_cast\""));
    let _ = std::fs::remove_file(&path);
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_unknown_step_unit_is_rejected() {
    let config = scenario(
        r#"{
            "units": [{ "name": "Mage", "faction": "Player", "position": [0, 0] }],
            "steps": [{ "at": 0.5, "action": "Select", "unit": "Ghost" }]
        }"#,
    );
    let error = build_scenario_app(&config, catalog()).err().expect("scenario should be rejected");
    assert!(error.contains("Ghost"), "{}", error);
}

#[test]
fn test_unknown_ability_is_rejected() {
    let config = scenario(
        r#"{
            "units": [{ "name": "Mage", "faction": "Player", "position": [0, 0], "loadout": ["meteor"] }]
        }"#,
    );
    let error = run_scenario(&config, catalog()).err().expect("scenario should be rejected");
    assert!(error.contains("meteor"), "{}", error);
}

#[test]
fn test_defaults_are_applied() {
    let config = scenario(r#"{ "units": [{ "name": "Mage", "faction": "Player", "position": [1, 2] }] }"#);
    assert_eq!(config.name, "scenario");
    assert_eq!(config.tick_rate, 60.0);
    assert_eq!(config.max_duration_secs, 30.0);
    assert!(config.steps.is_empty());
    assert_eq!(config.units[0].health, 100.0);
    assert_eq!(config.units[0].move_speed, 5.0);
}
