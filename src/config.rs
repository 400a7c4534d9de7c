use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::generator::sentences::MAX_CANDIDATES;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_daily_goal")]
    pub daily_goal: u32,
    #[serde(default = "default_session_size")]
    pub session_size: usize,
    #[serde(default = "default_adaptive")]
    pub adaptive: bool,
    #[serde(default = "default_question_time_secs")]
    pub question_time_secs: u32,
    #[serde(default = "default_min_draft_chars")]
    pub min_draft_chars: usize,
    #[serde(default = "default_draft_limit")]
    pub draft_limit: usize,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_daily_goal() -> u32 {
    20
}
fn default_session_size() -> usize {
    10
}
fn default_adaptive() -> bool {
    true
}
fn default_question_time_secs() -> u32 {
    30
}
fn default_min_draft_chars() -> usize {
    40
}
fn default_draft_limit() -> usize {
    MAX_CANDIDATES
}
fn default_data_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quizdeck")
        .to_string_lossy()
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daily_goal: default_daily_goal(),
            session_size: default_session_size(),
            adaptive: default_adaptive(),
            question_time_secs: default_question_time_secs(),
            min_draft_chars: default_min_draft_chars(),
            draft_limit: default_draft_limit(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quizdeck")
            .join("config.toml")
    }

    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// Clamp values into usable ranges. Call after deserialization or CLI overrides.
    pub fn validate(&mut self) {
        self.daily_goal = self.daily_goal.clamp(1, 1000);
        self.session_size = self.session_size.clamp(1, 100);
        self.question_time_secs = self.question_time_secs.min(3600);
        self.min_draft_chars = self.min_draft_chars.max(1);
        self.draft_limit = self.draft_limit.clamp(1, MAX_CANDIDATES);
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daily_goal, 20);
        assert_eq!(config.session_size, 10);
        assert!(config.adaptive);
        assert_eq!(config.question_time_secs, 30);
        assert_eq!(config.draft_limit, 40);
        assert!(config.data_dir.contains("quizdeck"));
    }

    #[test]
    fn test_config_serde_partial_file() {
        let toml_str = r#"
daily_goal = 5
adaptive = false
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.daily_goal, 5);
        assert!(!config.adaptive);
        assert_eq!(config.session_size, 10);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.daily_goal, deserialized.daily_goal);
        assert_eq!(config.data_dir, deserialized.data_dir);
        assert_eq!(config.question_time_secs, deserialized.question_time_secs);
    }

    #[test]
    fn test_config_validate_clamps_values() {
        let mut config = Config::default();
        config.daily_goal = 0;
        config.session_size = 999;
        config.draft_limit = 500;
        config.data_dir = "  ".to_string();
        config.validate();
        assert_eq!(config.daily_goal, 1);
        assert_eq!(config.session_size, 100);
        assert_eq!(config.draft_limit, 40);
        assert!(config.data_dir.contains("quizdeck"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "session_size = 0\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.session_size, 1);

        let missing = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(missing.session_size, 10);
    }
}
