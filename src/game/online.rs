//! Plain-data boundary between a session and a remote room.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Scheduler, Session};
use crate::core::{player_at, MoveLog, Player, MAX_DIM, MIN_DIM};
use crate::error::RemoteError;
use crate::logic::{reconstruct, GameResult, Replayed, WinnerTag};

/// Seat held in a remote room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(alias = "R")]
    A,
    #[serde(alias = "Y")]
    B,
    #[serde(rename = "S", alias = "Spectator")]
    Spectator,
}

impl Role {
    pub fn player(self) -> Option<Player> {
        match self {
            Role::A => Some(Player::A),
            Role::B => Some(Player::B),
            Role::Spectator => None,
        }
    }
}

impl From<Player> for Role {
    fn from(p: Player) -> Self {
        match p {
            Player::A => Role::A,
            Player::B => Role::B,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::A => write!(f, "A"),
            Role::B => write!(f, "B"),
            Role::Spectator => write!(f, "spectator"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

/// Answer to create / join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinInfo {
    pub code: String,
    pub secret: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMove {
    pub index: usize,
    pub player: Player,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub role: Role,
    pub name: String,
}

/// Authoritative room snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    pub code: String,
    pub rows: usize,
    pub cols: usize,
    pub starting_player: Player,
    pub current_turn: Player,
    pub status: RoomStatus,
    pub winner: Option<WinnerTag>,
    pub moves: Vec<RemoteMove>,
    #[serde(default)]
    pub players: Vec<SeatInfo>,
}

/// A remote snapshot that replays cleanly.
#[derive(Debug, Clone)]
pub struct RemoteSnapshot {
    pub columns: Vec<usize>,
    pub replayed: Replayed,
    pub result: GameResult,
    pub starting: Player,
}

impl RemoteState {
    /// Replays the snapshot and checks it is self-consistent.
    pub fn validate(&self) -> Result<RemoteSnapshot, RemoteError> {
        let dim_ok = |v: usize| (MIN_DIM..=MAX_DIM).contains(&v);
        if !dim_ok(self.rows) || !dim_ok(self.cols) {
            return Err(RemoteError::Dimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }
        for (position, mv) in self.moves.iter().enumerate() {
            if mv.index != position || mv.player != player_at(self.starting_player, position) {
                return Err(RemoteError::OutOfOrder { position });
            }
        }

        let columns: Vec<usize> = self.moves.iter().map(|m| m.column).collect();
        let replayed = reconstruct(
            self.rows,
            self.cols,
            &columns,
            columns.len(),
            self.starting_player,
        );
        if replayed.applied < columns.len() {
            return Err(RemoteError::BadMove {
                index: replayed.applied,
                column: columns[replayed.applied],
            });
        }

        let mut result = replayed.result();
        if !result.is_over() && self.status == RoomStatus::Finished {
            // The room may end a game we cannot see a line for; trust its verdict.
            result = match self.winner.and_then(WinnerTag::player) {
                Some(player) => GameResult::Win {
                    player,
                    cells: Vec::new(),
                },
                None => GameResult::Draw,
            };
        }

        Ok(RemoteSnapshot {
            columns,
            replayed,
            result,
            starting: self.starting_player,
        })
    }
}

/// Credentials of the seat this session holds in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineLink {
    pub code: String,
    pub secret: String,
    pub role: Role,
}

impl From<JoinInfo> for OnlineLink {
    fn from(j: JoinInfo) -> Self {
        OnlineLink {
            code: j.code,
            secret: j.secret,
            role: j.role,
        }
    }
}

impl<S: Scheduler> Session<S> {
    pub fn online_link(&self) -> Option<&OnlineLink> {
        self.online.as_ref()
    }

    pub fn is_online(&self) -> bool {
        self.online.is_some()
    }

    /// Hands the game over to a remote room. Local state is cleared until the
    /// first snapshot arrives.
    pub fn enter_online(&mut self, link: OnlineLink) {
        self.cancel_machine_work();
        tracing::info!("joined room {} as {}", link.code, link.role);
        let (rows, cols) = (self.grid.rows(), self.grid.cols());
        self.reset_board(rows, cols, MoveLog::new(self.log.starting_player()), 0);
        self.online = Some(link);
    }

    /// Replaces grid, log, cursor and result with the room's snapshot, or
    /// changes nothing when the snapshot does not validate.
    pub fn apply_remote_state(&mut self, state: &RemoteState) -> Result<(), RemoteError> {
        if self.online.is_none() {
            return Err(RemoteError::NotOnline);
        }
        if self.move_lock {
            return Err(RemoteError::Rejected("a local move is in progress".into()));
        }
        let snap = state.validate().map_err(|e| {
            tracing::warn!("ignoring remote state: {e}");
            e
        })?;
        self.cancel_machine_work();

        let len = snap.columns.len();
        if len != self.log.len() {
            tracing::debug!("remote state at move {len}");
        }
        self.grid = snap.replayed.grid;
        self.log = MoveLog::from_moves(snap.starting, snap.columns);
        self.cursor = len;
        self.result = snap.result;
        self.halted = false;
        self.scores.clear();
        Ok(())
    }

    /// Drops the room link and starts a local game.
    pub fn leave_online(&mut self) {
        if self.online.is_some() {
            self.new_game();
        }
    }
}
