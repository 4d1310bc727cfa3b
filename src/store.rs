//! Read-only case store backed by a JSON file (`{ "tasks": [ ... ] }`).
//!
//! The file is re-read on every lookup: it is small and local, and edits show up
//! without a restart. Concurrent readers share nothing but the path.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::{Case, CaseSummary};
use crate::error::StoreError;

#[derive(Debug, Deserialize, Default)]
struct CasesFile {
  #[serde(default)]
  tasks: Vec<Case>,
}

#[derive(Clone, Debug)]
pub struct CaseStore {
  path: PathBuf,
}

impl CaseStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  async fn load(&self) -> Result<Vec<Case>, StoreError> {
    let path = self.path.display().to_string();
    let raw = match tokio::fs::read_to_string(&self.path).await {
      Ok(s) => s,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StoreError::FileNotFound { path }),
      Err(source) => return Err(StoreError::Io { path, source }),
    };
    let file: CasesFile = serde_json::from_str(&raw).map_err(|source| StoreError::Parse { path, source })?;
    debug!(target: "clinical_grader", cases = file.tasks.len(), "Loaded cases file");
    Ok(file.tasks)
  }

  /// All cases as `{id, title}` in file order.
  #[instrument(level = "debug", skip(self))]
  pub async fn list_cases(&self) -> Result<Vec<CaseSummary>, StoreError> {
    Ok(self.load().await?.iter().map(CaseSummary::from).collect())
  }

  /// First case whose id matches.
  #[instrument(level = "debug", skip(self), fields(%id))]
  pub async fn get_case(&self, id: i64) -> Result<Case, StoreError> {
    self.load()
      .await?
      .into_iter()
      .find(|c| c.id == id)
      .ok_or(StoreError::CaseNotFound { id })
  }
}
