//! File-backed experiment tracking.
//!
//! A run lives at `<root>/<experiment>/<run_id>/` with:
//!   `meta.json`          run metadata and final status
//!   `params/<name>`      one file per logged parameter
//!   `artifacts/<name>`   copies of logged files and serialized models
//!
//! Runs start out `Running` and `finish` marks them `Finished`. A run
//! dropped without finishing is marked `Failed` on a best-effort basis.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Metadata persisted as `meta.json` in every run folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: Uuid,
    pub experiment: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunMeta {
    /// Load the metadata stored in a run folder.
    pub fn load(run_dir: &Path) -> Result<Self> {
        let path = run_dir.join("meta.json");
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

/// A named collection of runs under one tracking root.
pub struct Experiment {
    dir: PathBuf,
    name: String,
}

impl Experiment {
    /// Open (or create) the experiment folder under `root`.
    pub fn new(root: impl AsRef<Path>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let dir = root.as_ref().join(&name);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create experiment folder {}", dir.display()))?;
        Ok(Self { dir, name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Create a fresh run folder in `Running` state.
    pub fn start_run(&self) -> Result<Run> {
        let run_id = Uuid::new_v4();
        let dir = self.dir.join(run_id.to_string());
        std::fs::create_dir_all(dir.join("params"))
            .with_context(|| format!("Failed to create run folder {}", dir.display()))?;
        std::fs::create_dir_all(dir.join("artifacts"))
            .with_context(|| format!("Failed to create run folder {}", dir.display()))?;

        let run = Run {
            meta: RunMeta {
                run_id,
                experiment: self.name.clone(),
                status: RunStatus::Running,
                started_at: Utc::now(),
                ended_at: None,
            },
            dir,
            finished: false,
        };
        run.write_meta()?;
        tracing::info!("Started run {} of experiment '{}'", run_id, self.name);
        Ok(run)
    }
}

/// An in-progress run. Log parameters and artifacts against it, then
/// `finish` it to record the terminal state.
pub struct Run {
    dir: PathBuf,
    meta: RunMeta,
    finished: bool,
}

impl Run {
    pub fn id(&self) -> Uuid {
        self.meta.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record one key/value parameter as `params/<key>`. Parameters are
    /// append-only: re-logging a key with the same value is accepted,
    /// re-logging it with a different value is an error.
    pub fn log_param(&self, key: &str, value: &str) -> Result<()> {
        anyhow::ensure!(
            !key.is_empty() && !key.contains(['/', '\\']),
            "Parameter key '{}' must be a plain file name",
            key
        );
        let path = self.dir.join("params").join(key);
        if path.exists() {
            let existing = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read parameter {}", path.display()))?;
            anyhow::ensure!(
                existing == value,
                "Parameter '{}' is already logged with value '{}'",
                key,
                existing
            );
            return Ok(());
        }
        std::fs::write(&path, value)
            .with_context(|| format!("Failed to write parameter {}", path.display()))
    }

    /// Copy a file into the run's artifact folder.
    pub fn log_artifact(&self, source: &Path) -> Result<PathBuf> {
        let file_name = source
            .file_name()
            .with_context(|| format!("Artifact {} has no file name", source.display()))?;
        let dest = self.dir.join("artifacts").join(file_name);
        std::fs::copy(source, &dest)
            .with_context(|| format!("Failed to copy artifact {}", source.display()))?;
        tracing::info!("Logged artifact {}", dest.display());
        Ok(dest)
    }

    /// Serialize a model as `artifacts/<name>/model.json`.
    pub fn log_model<M: Serialize>(&self, model: &M, name: &str) -> Result<PathBuf> {
        anyhow::ensure!(
            !name.is_empty() && !name.contains(['/', '\\']),
            "Model name '{}' must be a plain folder name",
            name
        );
        let model_dir = self.dir.join("artifacts").join(name);
        std::fs::create_dir_all(&model_dir)
            .with_context(|| format!("Failed to create {}", model_dir.display()))?;

        let path = model_dir.join("model.json");
        let json = serde_json::to_vec_pretty(model).context("Failed to serialize the model")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Logged model to {}", path.display());
        Ok(path)
    }

    /// Mark the run `Finished` and write the final metadata.
    pub fn finish(mut self) -> Result<()> {
        self.meta.status = RunStatus::Finished;
        self.meta.ended_at = Some(Utc::now());
        self.finished = true;
        self.write_meta()
    }

    fn write_meta(&self) -> Result<()> {
        let path = self.dir.join("meta.json");
        let json =
            serde_json::to_vec_pretty(&self.meta).context("Failed to serialize run metadata")?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl Drop for Run {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.meta.status = RunStatus::Failed;
        self.meta.ended_at = Some(Utc::now());
        if self.write_meta().is_err() {
            tracing::warn!("Could not record the failed state of run {}", self.meta.run_id);
        }
    }
}
