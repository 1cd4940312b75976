//! Scenario loading, saving and validation.

use std::path::Path;
use tt_project::Scenario;

use crate::error::{AppError, AppResult};

/// Load, migrate and validate a scenario (YAML, or JSON by extension).
pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    Ok(tt_project::load(path)?)
}

pub fn save_scenario(path: &Path, scenario: &Scenario) -> AppResult<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => tt_project::save_json(path, scenario)?,
        _ => tt_project::save_yaml(path, scenario)?,
    }
    Ok(())
}

pub fn validate_scenario(scenario: &Scenario) -> AppResult<()> {
    Ok(tt_project::validate_scenario(scenario)?)
}

/// Write the default scenario to `path`. Never overwrites.
pub fn init_scenario(path: &Path) -> AppResult<Scenario> {
    if path.exists() {
        return Err(AppError::ScenarioExists {
            path: path.to_path_buf(),
        });
    }
    let scenario = Scenario::default();
    save_scenario(path, &scenario)?;
    Ok(scenario)
}
