use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{Player, DEFAULT_COLS, DEFAULT_ROWS, MAX_DIM, MIN_DIM};
use crate::error::ConfigError;
use crate::player::ai::{AiConfig, MAX_DEPTH, MIN_DEPTH};

pub const CONFIG_FILE: &str = "connect4_config.json";

/// Top-level application configuration, loadable from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub board: BoardConfig,
    pub ai: AiConfig,
    pub timing: TimingConfig,
    pub network: NetworkConfig,
    pub save_dir: PathBuf,
    pub store_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub rows: usize,
    pub cols: usize,
    pub starting_player: Player,
}

/// Delays between scheduled units, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Before a machine turn starts.
    pub robot_delay: u64,
    /// Between consecutive machine moves in machine-vs-machine games.
    pub chain_delay: u64,
    /// Between two scored search columns.
    pub step_delay: u64,
    /// After a full column was skipped.
    pub skip_delay: u64,
    /// Between analysis columns on a human turn.
    pub analysis_step: u64,
    /// Remote state polling.
    pub poll_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            board: BoardConfig::default(),
            ai: AiConfig::default(),
            timing: TimingConfig::default(),
            network: NetworkConfig::default(),
            save_dir: PathBuf::from("saves"),
            store_dir: PathBuf::from("store"),
        }
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        BoardConfig {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            starting_player: Player::A,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            robot_delay: 140,
            chain_delay: 250,
            step_delay: 26,
            skip_delay: 18,
            analysis_step: 30,
            poll_interval: 800,
        }
    }
}

impl TimingConfig {
    /// Zero delays, for headless runs.
    pub fn instant() -> Self {
        TimingConfig {
            robot_delay: 0,
            chain_delay: 0,
            step_delay: 0,
            skip_delay: 0,
            analysis_step: 0,
            poll_interval: 0,
        }
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file. An out-of-range AI depth is clamped.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: AppConfig = serde_json::from_str(&content)?;
        let clamped = config.ai.depth.clamp(MIN_DEPTH, MAX_DEPTH);
        if clamped != config.ai.depth {
            tracing::warn!("ai.depth {} clamped to {}", config.ai.depth, clamped);
            config.ai.depth = clamped;
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("board.rows", self.board.rows), ("board.cols", self.board.cols)] {
            if !(MIN_DIM..=MAX_DIM).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "{name} must be in [{MIN_DIM}, {MAX_DIM}], got {value}"
                )));
            }
        }
        if self.network.addr.trim().is_empty() {
            return Err(ConfigError::Validation("network.addr must not be empty".into()));
        }
        if self.timing.poll_interval == 0 {
            return Err(ConfigError::Validation(
                "timing.poll_interval must be > 0".into(),
            ));
        }
        self.ai.validate()
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ai::AiMode;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!((cfg.board.rows, cfg.board.cols), (8, 9));
        assert_eq!(cfg.timing.robot_delay, 140);
        assert_eq!(cfg.network.addr, "127.0.0.1:8080");
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_or_default(&dir.path().join("nope.json")).unwrap();
        assert_eq!(cfg.ai.mode, AiMode::Minimax);
    }

    #[test]
    fn partial_file_fills_defaults_and_clamps_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"board": {"rows": 6, "cols": 7}, "ai": {"depth": 12}}"#).unwrap();
        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!((cfg.board.rows, cfg.board.cols), (6, 7));
        assert_eq!(cfg.board.starting_player, Player::A);
        assert_eq!(cfg.ai.depth, 8);
        assert_eq!(cfg.timing.step_delay, 26);
    }

    #[test]
    fn rejects_small_board() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"board": {"cols": 3}}"#).unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "{err}");
    }

    #[test]
    fn rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        let mut cfg = AppConfig::default();
        cfg.ai.mode = AiMode::Random;
        cfg.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap().ai.mode, AiMode::Random);
    }
}
