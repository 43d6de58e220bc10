//! Application state management

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self { config })
    }

    /// Find the model a client asked for: absolute paths as given, relative
    /// paths against the working directory first and the data directory
    /// second. Returns every location tried on failure.
    pub fn resolve_model(&self, requested: &str) -> Result<PathBuf, Vec<PathBuf>> {
        let requested_path = Path::new(requested);
        let candidates = if requested_path.is_absolute() {
            vec![requested_path.to_path_buf()]
        } else {
            vec![
                requested_path.to_path_buf(),
                Path::new(&self.config.slicing.data_dir).join(requested_path),
            ]
        };

        for candidate in &candidates {
            if candidate.is_file() {
                debug!(requested = %requested, resolved = %candidate.display(), "Resolved model path");
                return Ok(candidate.clone());
            }
        }
        Err(candidates)
    }

    pub fn output_dir(&self) -> &Path {
        Path::new(&self.config.slicing.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_data_dir(dir: &Path) -> Arc<AppState> {
        let mut config = Config::default();
        config.slicing.data_dir = dir.display().to_string();
        AppState::new(config)
    }

    #[test]
    fn test_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("part.obj");
        std::fs::write(&model, "").unwrap();

        let state = AppState::new(Config::default());
        assert_eq!(state.resolve_model(&model.display().to_string()), Ok(model));
    }

    #[test]
    fn test_falls_back_to_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("weldmap-test-part.obj"), "").unwrap();

        let state = state_with_data_dir(dir.path());
        assert_eq!(
            state.resolve_model("weldmap-test-part.obj"),
            Ok(dir.path().join("weldmap-test-part.obj"))
        );
    }

    #[test]
    fn test_missing_model_lists_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_data_dir(dir.path());

        let tried = state.resolve_model("nowhere/missing.obj").unwrap_err();
        assert_eq!(tried.len(), 2);
        assert_eq!(tried[1], dir.path().join("nowhere/missing.obj"));
    }

    #[test]
    fn test_directory_is_not_a_model() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(Config::default());
        assert!(state.resolve_model(&dir.path().display().to_string()).is_err());
    }
}
