use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/keystride`, falling back to the platform data dir.
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("keystride"),
            )
        } else {
            ProjectDirs::from("", "", "keystride").map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn results_db_path() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("results.db"))
    }

    pub fn log_dir() -> Option<PathBuf> {
        Self::state_dir().map(|d| d.join("logs"))
    }
}
