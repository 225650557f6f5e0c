use crate::core::Player;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who fills a seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Human,
    Machine,
}

/// Seating arrangement. Stored as 0 / 1 / 2 in saved games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameMode {
    MachineVsMachine,
    /// The human always plays A.
    HumanVsMachine,
    #[default]
    HumanVsHuman,
}

impl GameMode {
    pub fn index(self) -> u8 {
        match self {
            GameMode::MachineVsMachine => 0,
            GameMode::HumanVsMachine => 1,
            GameMode::HumanVsHuman => 2,
        }
    }

    pub fn from_index(index: i64) -> Option<GameMode> {
        match index {
            0 => Some(GameMode::MachineVsMachine),
            1 => Some(GameMode::HumanVsMachine),
            2 => Some(GameMode::HumanVsHuman),
            _ => None,
        }
    }

    pub fn seat(self, player: Player) -> Seat {
        match (self, player) {
            (GameMode::MachineVsMachine, _) => Seat::Machine,
            (GameMode::HumanVsMachine, Player::A) => Seat::Human,
            (GameMode::HumanVsMachine, Player::B) => Seat::Machine,
            (GameMode::HumanVsHuman, _) => Seat::Human,
        }
    }

    pub fn is_machine(self, player: Player) -> bool {
        self.seat(player) == Seat::Machine
    }

    pub fn next(self) -> GameMode {
        match self {
            GameMode::MachineVsMachine => GameMode::HumanVsMachine,
            GameMode::HumanVsMachine => GameMode::HumanVsHuman,
            GameMode::HumanVsHuman => GameMode::MachineVsMachine,
        }
    }

    /// Default seat names.
    pub fn default_names(self) -> (&'static str, &'static str) {
        match self {
            GameMode::MachineVsMachine => ("Robot A", "Robot B"),
            GameMode::HumanVsMachine => ("Human", "Robot"),
            GameMode::HumanVsHuman => ("Player A", "Player B"),
        }
    }
}

impl TryFrom<u8> for GameMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        GameMode::from_index(value as i64).ok_or_else(|| format!("unknown game mode {value}"))
    }
}

impl From<GameMode> for u8 {
    fn from(mode: GameMode) -> u8 {
        mode.index()
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            GameMode::MachineVsMachine => "machine vs machine",
            GameMode::HumanVsMachine => "human vs machine",
            GameMode::HumanVsHuman => "human vs human",
        };
        write!(f, "{label}")
    }
}
