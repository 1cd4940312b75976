//! Run storage API.
//!
//! Layout: `<root>/<run_id>/manifest.json` plus `timeseries.jsonl`, one
//! record per line.

use crate::types::{RunManifest, TimeseriesRecord};
use crate::{ResultsError, ResultsResult};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";
const SERIES_FILE: &str = "timeseries.jsonl";

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Store next to a scenario file, under `.twintank/runs`.
    pub fn for_scenario(scenario_path: &Path) -> ResultsResult<Self> {
        let scenario_dir = scenario_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: format!("{} has no parent directory", scenario_path.display()),
            })?;
        Self::new(scenario_dir.join(".twintank").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn run_file(&self, run_id: &str, name: &str) -> PathBuf {
        self.root_dir.join(run_id).join(name)
    }

    /// Path of an existing run file, or `RunNotFound`.
    fn existing(&self, run_id: &str, name: &str) -> ResultsResult<PathBuf> {
        let path = self.run_file(run_id, name);
        if path.exists() {
            Ok(path)
        } else {
            Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            })
        }
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_file(run_id, MANIFEST_FILE).exists()
    }

    /// Write the series, then the manifest; a run without a manifest is
    /// invisible to `has_run` and `list_runs`.
    pub fn save_run(
        &self,
        manifest: &RunManifest,
        records: &[TimeseriesRecord],
    ) -> ResultsResult<()> {
        fs::create_dir_all(self.root_dir.join(&manifest.run_id))?;

        let mut series = BufWriter::new(File::create(
            self.run_file(&manifest.run_id, SERIES_FILE),
        )?);
        for record in records {
            serde_json::to_writer(&mut series, record)?;
            series.write_all(b"\n")?;
        }
        series.flush()?;

        fs::write(
            self.run_file(&manifest.run_id, MANIFEST_FILE),
            serde_json::to_string_pretty(manifest)?,
        )?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let content = fs::read_to_string(self.existing(run_id, MANIFEST_FILE)?)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_timeseries(&self, run_id: &str) -> ResultsResult<Vec<TimeseriesRecord>> {
        let reader = BufReader::new(File::open(self.existing(run_id, SERIES_FILE)?)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }

    /// Runs of one scenario, oldest first. Unreadable run directories are skipped.
    pub fn list_runs(&self, scenario_name: &str) -> ResultsResult<Vec<RunManifest>> {
        if !self.root_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs: Vec<RunManifest> = fs::read_dir(&self.root_dir)?
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| self.load_manifest(&entry.file_name().to_string_lossy()).ok())
            .filter(|manifest| manifest.scenario_name == scenario_name)
            .collect();

        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        match fs::remove_dir_all(self.root_dir.join(run_id)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
