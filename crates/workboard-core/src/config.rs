use crate::error::{BoardError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// OrchestratorConfig
// ---------------------------------------------------------------------------

/// Tunables for the run orchestrator's poll loop and trigger window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Seconds between poll calls while a job is running.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Wall-clock budget for a single run; past it the run fails with a
    /// timeout and polling stops (the external job is not force-cancelled).
    #[serde(default = "default_run_timeout")]
    pub run_timeout_minutes: u64,
    /// Consecutive transport failures tolerated before a run fails.
    #[serde(default = "default_poll_retries")]
    pub poll_retry_limit: u32,
    /// Rolling window inside which a repeated trigger signature is a
    /// duplicate.
    #[serde(default = "default_trigger_window")]
    pub trigger_window_ms: u64,
}

fn default_poll_interval() -> u64 {
    3
}

fn default_run_timeout() -> u64 {
    15
}

fn default_poll_retries() -> u32 {
    3
}

fn default_trigger_window() -> u64 {
    2000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            run_timeout_minutes: default_run_timeout(),
            poll_retry_limit: default_poll_retries(),
            trigger_window_ms: default_trigger_window(),
        }
    }
}

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

/// Where the external agent runtime's job API lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub base_url: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7878".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            orchestrator: OrchestratorConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BoardError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.orchestrator.poll_interval_seconds == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "poll_interval_seconds must be at least 1".to_string(),
            });
        }

        if self.orchestrator.run_timeout_minutes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "run_timeout_minutes must be at least 1".to_string(),
            });
        }

        if self.orchestrator.poll_retry_limit > 10 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "poll_retry_limit={} (>10 is unusual)",
                    self.orchestrator.poll_retry_limit
                ),
            });
        }

        if self.orchestrator.trigger_window_ms > 60_000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "trigger_window_ms={} is over a minute; distinct clicks will collapse",
                    self.orchestrator.trigger_window_ms
                ),
            });
        }

        if self.runtime.base_url.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "runtime.base_url is empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::new("my-board");
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.project.name, "my-board");
        assert_eq!(parsed.orchestrator, OrchestratorConfig::default());
    }

    #[test]
    fn minimal_yaml_gets_defaults() {
        let yaml = "version: 1\nproject:\n  name: my-board\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.orchestrator.poll_interval_seconds, 3);
        assert_eq!(cfg.orchestrator.run_timeout_minutes, 15);
        assert_eq!(cfg.orchestrator.poll_retry_limit, 3);
        assert_eq!(cfg.orchestrator.trigger_window_ms, 2000);
        assert_eq!(cfg.runtime.base_url, "http://localhost:7878");
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::new("roundtrip");
        cfg.save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.project.name, "roundtrip");
    }

    #[test]
    fn load_uninitialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(BoardError::NotInitialized)
        ));
    }

    #[test]
    fn validate_clean_config() {
        let cfg = Config::new("ok");
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_zero_interval() {
        let mut cfg = Config::new("bad");
        cfg.orchestrator.poll_interval_seconds = 0;
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("poll_interval_seconds")));
    }

    #[test]
    fn validate_excessive_retries() {
        let mut cfg = Config::new("odd");
        cfg.orchestrator.poll_retry_limit = 50;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.message.contains(">10 is unusual")));
    }

    #[test]
    fn validate_empty_base_url() {
        let mut cfg = Config::new("bad");
        cfg.runtime.base_url = "  ".into();
        assert!(cfg
            .validate()
            .iter()
            .any(|w| w.message.contains("base_url")));
    }
}
