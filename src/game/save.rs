//! Saved-game documents.
//!
//! [`SavePayload`] mirrors the JSON on disk and is deliberately loose: every
//! numeric field is read as a plain integer so that validation can report
//! *which* value is wrong. [`SavePayload::validate`] turns it into a
//! [`GameSnapshot`] without touching any live state.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::{EventKind, Scheduler, Session};
use crate::config::BoardConfig;
use crate::core::{MoveLog, Player, MAX_DIM, MIN_DIM};
use crate::error::{LoadError, StoreError};
use crate::logic::reconstruct;
use crate::player::ai::{clamp_depth, AiMode};
use crate::player::GameMode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerNames {
    #[serde(default)]
    pub a: Option<String>,
    #[serde(default)]
    pub b: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavePayload {
    #[serde(default)]
    pub save_name: Option<String>,
    #[serde(alias = "rows_count")]
    pub rows: i64,
    #[serde(alias = "cols_count")]
    pub cols: i64,
    #[serde(alias = "starting_color")]
    pub starting_player: String,
    #[serde(default)]
    pub moves: Vec<i64>,
    /// Missing means "at the end of the log".
    #[serde(default, alias = "view_index")]
    pub view_cursor: Option<i64>,
    #[serde(default, alias = "mode")]
    pub game_mode: Option<i64>,
    #[serde(default)]
    pub game_index: Option<i64>,
    #[serde(default)]
    pub ai_mode: Option<String>,
    #[serde(default)]
    pub ai_depth: Option<i64>,
    #[serde(default)]
    pub player_names: PlayerNames,
    #[serde(default, skip_serializing)]
    pub player_red: Option<String>,
    #[serde(default, skip_serializing)]
    pub player_yellow: Option<String>,
}

/// A validated saved game, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    pub save_name: Option<String>,
    pub rows: usize,
    pub cols: usize,
    pub starting: Player,
    pub moves: Vec<usize>,
    pub cursor: usize,
    pub mode: GameMode,
    pub game_index: u32,
    pub ai_mode: AiMode,
    pub ai_depth: u8,
    pub names: PlayerNames,
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl SavePayload {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Checks every field and converts. Optional fields fall back to
    /// lenient defaults, and a missing cursor views the empty board.
    /// Dimensions, starting player, moves and cursor must be valid.
    pub fn validate(&self) -> Result<GameSnapshot, LoadError> {
        let dim_ok = |v: i64| (MIN_DIM as i64..=MAX_DIM as i64).contains(&v);
        if !dim_ok(self.rows) {
            return Err(LoadError::Rows(self.rows));
        }
        if !dim_ok(self.cols) {
            return Err(LoadError::Cols(self.cols));
        }
        let starting = Player::from_symbol(&self.starting_player)
            .ok_or_else(|| LoadError::StartingPlayer(self.starting_player.clone()))?;

        let moves = self
            .moves
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                usize::try_from(value).map_err(|_| LoadError::Move { index, value })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cursor = match self.view_cursor {
            None => 0,
            Some(c) if c >= 0 && (c as usize) <= moves.len() => c as usize,
            Some(c) => {
                return Err(LoadError::ViewCursor {
                    cursor: c,
                    len: moves.len(),
                })
            }
        };

        let mode = self
            .game_mode
            .and_then(GameMode::from_index)
            .unwrap_or(GameMode::HumanVsHuman);
        let game_index = self
            .game_index
            .and_then(|i| u32::try_from(i).ok())
            .unwrap_or(1);
        let ai_mode = self
            .ai_mode
            .as_deref()
            .map(AiMode::parse_lenient)
            .unwrap_or(AiMode::Random);

        let names = PlayerNames {
            a: non_blank(&self.player_names.a).or_else(|| non_blank(&self.player_red)),
            b: non_blank(&self.player_names.b).or_else(|| non_blank(&self.player_yellow)),
        };

        Ok(GameSnapshot {
            save_name: non_blank(&self.save_name),
            rows: self.rows as usize,
            cols: self.cols as usize,
            starting,
            moves,
            cursor,
            mode,
            game_index,
            ai_mode,
            ai_depth: clamp_depth(self.ai_depth),
            names,
        })
    }
}

impl From<&GameSnapshot> for SavePayload {
    fn from(s: &GameSnapshot) -> Self {
        SavePayload {
            save_name: s.save_name.clone(),
            rows: s.rows as i64,
            cols: s.cols as i64,
            starting_player: s.starting.symbol().to_string(),
            moves: s.moves.iter().map(|&m| m as i64).collect(),
            view_cursor: Some(s.cursor as i64),
            game_mode: Some(s.mode.index() as i64),
            game_index: Some(s.game_index as i64),
            ai_mode: Some(s.ai_mode.as_str().to_string()),
            ai_depth: Some(s.ai_depth as i64),
            player_names: s.names.clone(),
            player_red: None,
            player_yellow: None,
        }
    }
}

/// `game_YYYYMMDD_HHMMSS` in local time.
pub fn default_save_name() -> String {
    Local::now().format("game_%Y%m%d_%H%M%S").to_string()
}

/// Keeps letters, digits, `-` and `_`; everything else becomes `_`.
fn file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        default_save_name()
    } else {
        stem
    }
}

/// Writes `payload` as `<dir>/<save_name>.json`, creating `dir` if needed.
pub fn write_payload(dir: &Path, payload: &SavePayload) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| StoreError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let name = payload.save_name.clone().unwrap_or_else(default_save_name);
    let path = dir.join(format!("{}.json", file_stem(&name)));
    let text = payload.to_json()?;
    std::fs::write(&path, text).map_err(|e| StoreError::Io {
        path: path.clone(),
        source: e,
    })?;
    Ok(path)
}

pub fn read_payload(path: &Path) -> Result<SavePayload, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    SavePayload::from_json(&text)
}

/// Saved games in `dir`, sorted by file name.
pub fn list_saves(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    files.sort();
    files
}

impl<S: Scheduler> Session<S> {
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            save_name: Some(self.save_name.clone()),
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            starting: self.log.starting_player(),
            moves: self.log.moves().to_vec(),
            cursor: self.cursor,
            mode: self.mode,
            game_index: self.game_index,
            ai_mode: self.ai.mode,
            ai_depth: self.ai.depth,
            names: self.names.clone(),
        }
    }

    pub fn save_payload(&self) -> SavePayload {
        SavePayload::from(&self.snapshot())
    }

    /// Writes the current game into `dir` and returns the file written.
    pub fn save_to_dir(&mut self, dir: &Path) -> Result<PathBuf, StoreError> {
        let path = write_payload(dir, &self.save_payload())?;
        self.history.record(
            "system",
            EventKind::Save,
            self.game_index,
            self.log.len(),
            "file",
        );
        tracing::info!("saved game #{} to {}", self.game_index, path.display());
        Ok(path)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), LoadError> {
        let payload = read_payload(path)?;
        self.load_payload(&payload, "file")
    }

    /// Validates `payload` and, only if it is valid, replaces the whole game with it.
    pub fn load_payload(&mut self, payload: &SavePayload, source: &str) -> Result<(), LoadError> {
        if self.online.is_some() {
            return Err(LoadError::OnlineActive);
        }
        let snapshot = payload.validate().map_err(|e| {
            tracing::warn!("rejected saved game from {source}: {e}");
            e
        })?;
        self.apply_snapshot(snapshot, source);
        Ok(())
    }

    fn apply_snapshot(&mut self, snap: GameSnapshot, source: &str) {
        self.cancel_machine_work();

        let (rows, cols) = (snap.rows, snap.cols);
        let mut log = MoveLog::from_moves(snap.starting, snap.moves);
        let mut cursor = snap.cursor;
        let full = reconstruct(rows, cols, log.moves(), log.len(), snap.starting);
        if full.applied < log.len() {
            tracing::warn!(
                "saved game has an unplayable move at #{}, keeping the first {}",
                full.applied,
                full.applied
            );
            log.truncate(full.applied);
            cursor = cursor.min(full.applied);
        }

        self.board = BoardConfig {
            rows,
            cols,
            starting_player: snap.starting,
        };
        self.mode = snap.mode;
        self.ai.mode = snap.ai_mode;
        self.ai.depth = snap.ai_depth;
        self.names = snap.names;
        self.save_name = snap.save_name.unwrap_or_else(default_save_name);
        self.game_index = snap.game_index;
        let total = log.len();
        self.reset_board(rows, cols, log, cursor);

        self.history
            .record("system", EventKind::Load, self.game_index, total, source);
        tracing::info!(
            "loaded game #{} from {source}: {rows}x{cols}, {total} moves, view at {cursor}",
            self.game_index
        );
        self.after_state_change(self.robot_delay());
    }
}
