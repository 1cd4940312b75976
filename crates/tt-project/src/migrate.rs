//! Schema migration framework.

use crate::ProjectError;
use crate::schema::Scenario;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut scenario: Scenario) -> Result<Scenario, ProjectError> {
    while scenario.version < LATEST_VERSION {
        scenario = migrate_one_version(scenario)?;
    }
    Ok(scenario)
}

fn migrate_one_version(scenario: Scenario) -> Result<Scenario, ProjectError> {
    match scenario.version {
        0 => migrate_v0_to_v1(scenario),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 0 files allowed events in any order; version 1 requires them
/// sorted by time.
fn migrate_v0_to_v1(mut scenario: Scenario) -> Result<Scenario, ProjectError> {
    if scenario.events.iter().any(|e| e.time_s.is_nan()) {
        return Err(ProjectError::Migration {
            what: "event time is NaN".to_string(),
        });
    }
    scenario
        .events
        .sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
    scenario.version = 1;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ActionDef, EventDef};

    #[test]
    fn migrate_latest_is_noop() {
        let scenario = Scenario::default();
        let migrated = migrate_to_latest(scenario.clone()).unwrap();
        assert_eq!(migrated, scenario);
    }

    #[test]
    fn migrate_v0_sorts_events() {
        let scenario = Scenario {
            version: 0,
            events: vec![
                EventDef {
                    time_s: 40.0,
                    action: ActionDef::SetSetpoint { value_cm: 20.0 },
                },
                EventDef {
                    time_s: 10.0,
                    action: ActionDef::TriggerDisturbance,
                },
            ],
            ..Scenario::default()
        };

        let migrated = migrate_to_latest(scenario).unwrap();
        assert_eq!(migrated.version, LATEST_VERSION);
        assert_eq!(migrated.events[0].time_s, 10.0);
        assert_eq!(migrated.events[1].time_s, 40.0);
    }
}
