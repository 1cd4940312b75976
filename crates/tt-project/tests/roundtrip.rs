use tt_project::schema::*;
use tt_project::{load, load_json, load_yaml, save_json, save_yaml, validate_scenario};

fn scenario_with_events() -> Scenario {
    Scenario {
        name: "Events".to_string(),
        controller: ControllerDef {
            active: ControllerChoice::Fuzzy,
            setpoint_cm: 22.5,
            ..ControllerDef::default()
        },
        simulation: SimulationDef {
            integrator: IntegratorChoice::Rk4,
            duration_s: 120.0,
            ..SimulationDef::default()
        },
        events: vec![
            EventDef {
                time_s: 30.0,
                action: ActionDef::TriggerDisturbance,
            },
            EventDef {
                time_s: 60.0,
                action: ActionDef::SetValveOpenings {
                    valve_1_pct: 100.0,
                    valve_2_pct: 40.0,
                },
            },
            EventDef {
                time_s: 90.0,
                action: ActionDef::SetActiveController {
                    kind: ControllerChoice::Pid,
                },
            },
        ],
        ..Scenario::default()
    }
}

#[test]
fn roundtrip_yaml_default_scenario() {
    let scenario = Scenario::default();
    validate_scenario(&scenario).unwrap();

    let path = std::env::temp_dir().join("tt_project_roundtrip_default.yaml");
    save_yaml(&path, &scenario).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(scenario, loaded);
}

#[test]
fn roundtrip_yaml_with_events() {
    let scenario = scenario_with_events();
    let path = std::env::temp_dir().join("tt_project_roundtrip_events.yaml");
    save_yaml(&path, &scenario).unwrap();
    assert_eq!(load(&path).unwrap(), scenario);
}

#[test]
fn roundtrip_json_with_events() {
    let scenario = scenario_with_events();
    let path = std::env::temp_dir().join("tt_project_roundtrip_events.json");
    save_json(&path, &scenario).unwrap();
    assert_eq!(load_json(&path).unwrap(), scenario);
    assert_eq!(load(&path).unwrap(), scenario);
}

#[test]
fn save_refuses_invalid_scenario() {
    let mut scenario = Scenario::default();
    scenario.simulation.dt_s = 0.0;
    let path = std::env::temp_dir().join("tt_project_invalid.yaml");
    assert!(save_yaml(&path, &scenario).is_err());
}

#[test]
fn load_migrates_version_zero() {
    let yaml = "version: 0\nname: old\nevents:\n  - time_s: 20\n    action: { type: TriggerDisturbance }\n  - time_s: 5\n    action: { type: SetSetpoint, value_cm: 15 }\n";
    let path = std::env::temp_dir().join("tt_project_v0.yaml");
    std::fs::write(&path, yaml).unwrap();

    let scenario = load_yaml(&path).unwrap();
    assert_eq!(scenario.version, tt_project::LATEST_VERSION);
    assert_eq!(scenario.events[0].time_s, 5.0);
}
