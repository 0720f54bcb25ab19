use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

/// Default marker capability: declarations must descend from it to be tracked.
pub const DEFAULT_MARKER: &str = "core/Loadable";

/// Configuration file name looked up in the project root.
pub const CONFIG_FILE: &str = "source-graph.toml";

/// Configuration loaded from `source-graph.toml` at the project root.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceGraphConfig {
    /// Qualified name of the marker capability.
    pub marker: String,
    /// Artifacts merged, in order, when a command is given none. Relative paths are
    /// resolved against the project root.
    pub artifacts: Vec<PathBuf>,
    /// Default log filter when `RUST_LOG` is unset (e.g. `"source_graph=debug"`).
    pub log: Option<String>,
}

impl Default for SourceGraphConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_owned(),
            artifacts: Vec::new(),
            log: None,
        }
    }
}

impl SourceGraphConfig {
    /// Load configuration from `source-graph.toml` in the given root directory.
    ///
    /// Returns a default configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    /// The configured artifact paths, resolved against `root`.
    pub fn artifact_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.artifacts.iter().map(|p| root.join(p)).collect()
    }
}
