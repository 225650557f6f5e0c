use std::path::{Path, PathBuf};

use chrono::Local;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::save::SavePayload;
use super::{EventKind, Scheduler, Session};
use crate::error::StoreError;
use crate::logic::WinnerTag;
use crate::player::ai::AiMode;
use crate::player::GameMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Completed,
    InProgress,
}

/// Summary fields stored next to the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub status: GameStatus,
    pub winner: Option<WinnerTag>,
    pub distinct_columns: usize,
    pub total_moves: usize,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGame {
    #[serde(flatten)]
    pub payload: SavePayload,
    #[serde(flatten)]
    pub summary: Summary,
}

/// List entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub id: String,
    pub game: StoredGame,
}

/// How much a stored game says about good play, from 1 (random moves) to 5.
pub fn confidence(mode: GameMode, ai_mode: AiMode, depth: u8) -> u8 {
    if mode == GameMode::HumanVsHuman {
        return 5;
    }
    match ai_mode {
        AiMode::Random => 1,
        AiMode::Minimax => match depth {
            0..=2 => 2,
            3..=4 => 3,
            5..=6 => 4,
            _ => 5,
        },
    }
}

pub trait GameStore {
    /// Stored games, newest first.
    fn list(&self) -> Result<Vec<StoredEntry>, StoreError>;

    /// Stores `game` and returns its id.
    fn create(&mut self, game: &StoredGame) -> Result<String, StoreError>;

    fn fetch(&self, id: &str) -> Result<StoredGame, StoreError>;
}

/// One JSON document per game in a directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn new_id() -> String {
        let suffix: u16 = rand::thread_rng().gen();
        format!("{}-{suffix:04x}", Local::now().format("%Y%m%d%H%M%S%3f"))
    }

    fn read(&self, path: &Path) -> Result<StoredGame, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl GameStore for DirStore {
    fn list(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.dir.clone(),
                    source: e,
                })
            }
        };

        let mut out = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match self.read(&path) {
                Ok(game) => out.push(StoredEntry { id, game }),
                Err(e) => tracing::warn!("skipping unreadable stored game {}: {e}", path.display()),
            }
        }
        out.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(out)
    }

    fn create(&mut self, game: &StoredGame) -> Result<String, StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.clone(),
            source: e,
        })?;
        let mut id = Self::new_id();
        while self.path_for(&id).exists() {
            id = Self::new_id();
        }
        let path = self.path_for(&id);
        let text = serde_json::to_string_pretty(game)?;
        std::fs::write(&path, text).map_err(|e| StoreError::Io { path, source: e })?;
        tracing::info!("stored game {id}");
        Ok(id)
    }

    fn fetch(&self, id: &str) -> Result<StoredGame, StoreError> {
        let path = self.path_for(id);
        if !is_valid_id(id) || !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.read(&path)
    }
}

impl<S: Scheduler> Session<S> {
    pub fn summary(&self) -> Summary {
        let over = self.is_over();
        Summary {
            status: if over {
                GameStatus::Completed
            } else {
                GameStatus::InProgress
            },
            // A stopped game has no winner and counts as drawn.
            winner: if over {
                Some(self.result.winner_tag().unwrap_or(WinnerTag::Draw))
            } else {
                None
            },
            distinct_columns: self.log.distinct_columns(),
            total_moves: self.log.len(),
            confidence: confidence(self.mode, self.ai.mode, self.ai.depth),
        }
    }

    pub fn save_to_store(&mut self, store: &mut dyn GameStore) -> Result<String, StoreError> {
        let game = StoredGame {
            payload: self.save_payload(),
            summary: self.summary(),
        };
        let id = store.create(&game)?;
        self.history
            .record("system", EventKind::Save, self.game_index, self.log.len(), "store");
        Ok(id)
    }

    /// Fetches `id` and loads it through the same validation as a file.
    /// A stored game without a cursor opens at the end of its log.
    pub fn load_from_store(&mut self, store: &dyn GameStore, id: &str) -> Result<(), StoreError> {
        let mut payload = store.fetch(id)?.payload;
        if payload.view_cursor.is_none() {
            payload.view_cursor = Some(payload.moves.len() as i64);
        }
        self.load_payload(&payload, "store")?;
        Ok(())
    }
}
