//! Application state: settings, the case store, and the Gemini grader (or why it is unavailable).
//!
//! Everything here is immutable after startup; handlers share it through an `Arc`
//! and grading requests run concurrently without locks.

use std::path::PathBuf;

use tracing::{error, info, instrument, warn};

use crate::config::{Prompts, Settings};
use crate::error::GradingError;
use crate::gemini::Gemini;
use crate::store::CaseStore;

#[derive(Clone)]
pub struct AppState {
    pub store: CaseStore,
    /// Err when no API key is configured or the HTTP client failed to build;
    /// grading then answers with that error.
    pub grader: Result<Gemini, GradingError>,
    pub prompts: Prompts,
    pub static_dir: PathBuf,
}

impl AppState {
    /// Build state from settings: case store path, prompts, Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn new(settings: &Settings) -> Self {
        let store = CaseStore::new(settings.tasks_file.clone());
        if !store.path().exists() {
            warn!(target: "clinical_grader", path = %store.path().display(), "Cases file not found; case endpoints will answer 404 until it exists");
        }

        let grader = Gemini::from_settings(&settings.grader);
        match &grader {
            Ok(g) => info!(target: "clinical_grader", base_url = %g.base_url, models = ?g.models, temperature = g.temperature, timeout = ?settings.grader.timeout, "Gemini grading enabled."),
            Err(GradingError::NotConfigured) => warn!(target: "clinical_grader", "GEMINI_API_KEY / GOOGLE_API_KEY not set; answer checking will fail until configured."),
            Err(e) => error!(target: "clinical_grader", error = %e, "Gemini grading unavailable; answer checking will fail."),
        }

        Self {
            store,
            grader,
            prompts: settings.prompts.clone(),
            static_dir: settings.static_dir.clone(),
        }
    }
}
