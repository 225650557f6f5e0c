use crate::core::Player;
use crate::game::online::{JoinInfo, RemoteState, RoomStatus};
use serde::{Deserialize, Serialize};

/// Client -> server, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Create {
        rows: usize,
        cols: usize,
        starting_player: Player,
        player_name: String,
    },
    Join {
        code: String,
        player_name: String,
    },
    State {
        code: String,
    },
    Move {
        code: String,
        secret: String,
        column: usize,
    },
}

/// Server -> client, exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Joined {
        info: JoinInfo,
    },
    State {
        state: RemoteState,
    },
    Moved {
        next_turn: Player,
        status: RoomStatus,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let req = Request::Move {
            code: "ABC123".into(),
            secret: "s".into(),
            column: 4,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"Move":{"code":"ABC123","secret":"s","column":4}}"#);
        assert_eq!(serde_json::from_str::<Request>(&json).unwrap(), req);
    }
}
