//! Content-based hashing for run IDs.

use sha2::{Digest, Sha256};
use tt_project::Scenario;

/// Run id derived from everything that determines the run's output.
pub fn compute_run_id(
    scenario: &Scenario,
    run_type: &crate::types::RunType,
    engine_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    let scenario_json = serde_json::to_string(scenario).unwrap_or_default();
    hasher.update(scenario_json.as_bytes());

    let run_type_json = serde_json::to_string(run_type).unwrap_or_default();
    hasher.update(run_type_json.as_bytes());

    hasher.update(engine_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}
