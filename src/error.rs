use std::path::PathBuf;

/// A drop that the grid refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("column {col} is outside the board (0..{cols})")]
    OutOfRange { col: usize, cols: usize },

    #[error("column {0} is full")]
    ColumnFull(usize),
}

/// Errors raised while validating a saved game before it is applied.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read save file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed save document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("rows must be an integer in [4, 20], got {0}")]
    Rows(i64),

    #[error("cols must be an integer in [4, 20], got {0}")]
    Cols(i64),

    #[error("starting_player must be \"A\" or \"B\", got {0:?}")]
    StartingPlayer(String),

    #[error("move #{index} is not a column index: {value}")]
    Move { index: usize, value: i64 },

    #[error("view_cursor {cursor} is outside [0, {len}]")]
    ViewCursor { cursor: i64, len: usize },

    #[error("cannot load a saved game while an online session is active")]
    OnlineActive,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Problems with a remote session snapshot or a rejected remote request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("remote board {rows}x{cols} is outside the supported range")]
    Dimensions { rows: usize, cols: usize },

    #[error("remote move #{index} (column {column}) cannot be replayed")]
    BadMove { index: usize, column: usize },

    #[error("remote move list is out of order at position {position}")]
    OutOfOrder { position: usize },

    #[error("no online session is active")]
    NotOnline,

    #[error("server rejected the request: {0}")]
    Rejected(String),
}

/// Errors from a saved-game store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("stored game is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no stored game with id {0:?}")]
    NotFound(String),

    #[error("stored game failed validation: {0}")]
    Invalid(#[from] LoadError),
}

/// Why a room refused a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("no room with code {0:?}")]
    NotFound(String),

    #[error("unknown player secret")]
    BadSecret,

    #[error("spectators cannot play")]
    Spectator,

    #[error("not your turn")]
    NotYourTurn,

    #[error("game is finished")]
    Finished,

    #[error(transparent)]
    Move(#[from] MoveError),
}
