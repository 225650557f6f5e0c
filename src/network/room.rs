//! Authoritative room logic, free of any I/O.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;

use super::protocol::{Request, Response};
use crate::core::{Grid, Player, MAX_DIM, MIN_DIM};
use crate::error::RoomError;
use crate::game::online::{JoinInfo, RemoteMove, RemoteState, Role, RoomStatus, SeatInfo};
use crate::logic::{result_after, GameResult, WinnerTag};

const CODE_LEN: usize = 6;
const SECRET_LEN: usize = 24;
/// How long a finished room stays readable before it is dropped.
pub const FINISHED_GRACE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone)]
struct Seat {
    role: Role,
    name: String,
    secret: String,
}

#[derive(Debug, Clone)]
pub struct Room {
    code: String,
    grid: Grid,
    starting: Player,
    current_turn: Player,
    status: RoomStatus,
    winner: Option<WinnerTag>,
    moves: Vec<RemoteMove>,
    seats: Vec<Seat>,
    last_activity: Instant,
}

impl Room {
    /// Dimensions are clamped into the supported range.
    pub fn new(code: impl Into<String>, rows: usize, cols: usize, starting: Player) -> Self {
        let rows = rows.clamp(MIN_DIM, MAX_DIM);
        let cols = cols.clamp(MIN_DIM, MAX_DIM);
        Room {
            code: code.into(),
            grid: Grid::new(rows, cols),
            starting,
            current_turn: starting,
            status: RoomStatus::Waiting,
            winner: None,
            moves: Vec::new(),
            seats: Vec::new(),
            last_activity: Instant::now(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// Finished and untouched for at least `grace` as of `now`.
    pub fn is_stale(&self, now: Instant, grace: Duration) -> bool {
        self.status == RoomStatus::Finished
            && now.saturating_duration_since(self.last_activity) >= grace
    }

    fn seat_taken(&self, role: Role) -> bool {
        self.seats.iter().any(|s| s.role == role)
    }

    /// Seats a newcomer: `preferred` if free, else A, then B, then spectator.
    pub fn join(&mut self, name: &str, secret: String, preferred: Option<Role>) -> Role {
        let role = preferred
            .into_iter()
            .chain([Role::A, Role::B])
            .find(|r| *r != Role::Spectator && !self.seat_taken(*r))
            .unwrap_or(Role::Spectator);
        self.seats.push(Seat {
            role,
            name: name.trim().to_string(),
            secret,
        });
        if self.status == RoomStatus::Waiting
            && self.seat_taken(Role::A)
            && self.seat_taken(Role::B)
        {
            self.status = RoomStatus::Playing;
        }
        self.last_activity = Instant::now();
        role
    }

    /// Plays `column` for the seat holding `secret`.
    pub fn submit(&mut self, secret: &str, column: usize) -> Result<Player, RoomError> {
        if self.status == RoomStatus::Finished || self.winner.is_some() {
            return Err(RoomError::Finished);
        }
        let seat = self
            .seats
            .iter()
            .find(|s| s.secret == secret)
            .ok_or(RoomError::BadSecret)?;
        let player = seat.role.player().ok_or(RoomError::Spectator)?;
        if player != self.current_turn {
            return Err(RoomError::NotYourTurn);
        }

        let pos = self.grid.drop_token(column, player)?;
        self.last_activity = Instant::now();
        self.moves.push(RemoteMove {
            index: self.moves.len(),
            player,
            column,
        });

        match result_after(&self.grid, pos, player) {
            GameResult::InProgress => {
                self.current_turn = player.other();
                self.status = RoomStatus::Playing;
            }
            finished => {
                self.winner = finished.winner_tag();
                self.status = RoomStatus::Finished;
            }
        }
        Ok(self.current_turn)
    }

    pub fn state(&self) -> RemoteState {
        RemoteState {
            code: self.code.clone(),
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            starting_player: self.starting,
            current_turn: self.current_turn,
            status: self.status,
            winner: self.winner,
            moves: self.moves.clone(),
            players: self
                .seats
                .iter()
                .map(|s| SeatInfo {
                    role: s.role,
                    name: s.name.clone(),
                })
                .collect(),
        }
    }
}

fn random_string<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric).take(len).map(char::from).collect()
}

/// All rooms of one server.
#[derive(Debug)]
pub struct Lobby {
    rooms: HashMap<String, Room>,
    grace: Duration,
}

impl Default for Lobby {
    fn default() -> Self {
        Self::with_grace(FINISHED_GRACE)
    }
}

impl Lobby {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace(grace: Duration) -> Self {
        Lobby {
            rooms: HashMap::new(),
            grace,
        }
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Drops finished rooms idle for longer than the grace period.
    pub fn evict_finished(&mut self, now: Instant) -> usize {
        let before = self.rooms.len();
        let grace = self.grace;
        self.rooms.retain(|code, room| {
            let stale = room.is_stale(now, grace);
            if stale {
                tracing::info!("room {code} finished, evicting");
            }
            !stale
        });
        before - self.rooms.len()
    }

    pub fn create<R: Rng + ?Sized>(
        &mut self,
        rows: usize,
        cols: usize,
        starting: Player,
        name: &str,
        rng: &mut R,
    ) -> JoinInfo {
        let mut code = random_string(rng, CODE_LEN).to_uppercase();
        while self.rooms.contains_key(&code) {
            code = random_string(rng, CODE_LEN).to_uppercase();
        }
        let mut room = Room::new(code.clone(), rows, cols, starting);
        let secret = random_string(rng, SECRET_LEN);
        let role = room.join(name, secret.clone(), Some(Role::from(starting)));
        tracing::info!(
            "room {code} created {}x{} by {name}",
            room.grid.rows(),
            room.grid.cols()
        );
        self.rooms.insert(code.clone(), room);
        JoinInfo { code, secret, role }
    }

    pub fn join<R: Rng + ?Sized>(
        &mut self,
        code: &str,
        name: &str,
        rng: &mut R,
    ) -> Result<JoinInfo, RoomError> {
        let code = code.trim().to_uppercase();
        let room = self
            .rooms
            .get_mut(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let secret = random_string(rng, SECRET_LEN);
        let role = room.join(name, secret.clone(), None);
        tracing::info!("{name} joined room {code} as {role}");
        Ok(JoinInfo { code, secret, role })
    }

    pub fn state(&self, code: &str) -> Result<RemoteState, RoomError> {
        let code = code.trim().to_uppercase();
        self.rooms
            .get(&code)
            .map(Room::state)
            .ok_or(RoomError::NotFound(code))
    }

    pub fn submit(
        &mut self,
        code: &str,
        secret: &str,
        column: usize,
    ) -> Result<(Player, RoomStatus), RoomError> {
        let code = code.trim().to_uppercase();
        let room = self
            .rooms
            .get_mut(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let next = room.submit(secret, column)?;
        Ok((next, room.status()))
    }

    /// Answers one request, after dropping stale finished rooms.
    pub fn handle<R: Rng + ?Sized>(&mut self, request: Request, rng: &mut R) -> Response {
        self.evict_finished(Instant::now());
        let result = match request {
            Request::Create {
                rows,
                cols,
                starting_player,
                player_name,
            } => Ok(Response::Joined {
                info: self.create(rows, cols, starting_player, &player_name, rng),
            }),
            Request::Join { code, player_name } => self
                .join(&code, &player_name, rng)
                .map(|info| Response::Joined { info }),
            Request::State { code } => self.state(&code).map(|state| Response::State { state }),
            Request::Move {
                code,
                secret,
                column,
            } => self
                .submit(&code, &secret, column)
                .map(|(next_turn, status)| Response::Moved { next_turn, status }),
        };
        result.unwrap_or_else(|e| Response::Error {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MoveError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn seats_fill_in_order() {
        let mut room = Room::new("ROOM", 6, 7, Player::B);
        assert_eq!(room.join("host", "s1".into(), Some(Role::B)), Role::B);
        assert_eq!(room.status(), RoomStatus::Waiting);
        assert_eq!(room.join("guest", "s2".into(), None), Role::A);
        assert_eq!(room.status(), RoomStatus::Playing);
        assert_eq!(room.join("watcher", "s3".into(), None), Role::Spectator);
    }

    #[test]
    fn submit_checks_everything() {
        let mut room = Room::new("ROOM", 4, 4, Player::A);
        room.join("a", "sa".into(), Some(Role::A));
        room.join("b", "sb".into(), None);
        room.join("s", "ss".into(), None);

        assert_eq!(room.submit("nope", 0), Err(RoomError::BadSecret));
        assert_eq!(room.submit("ss", 0), Err(RoomError::Spectator));
        assert_eq!(room.submit("sb", 0), Err(RoomError::NotYourTurn));
        assert_eq!(
            room.submit("sa", 7),
            Err(RoomError::Move(MoveError::OutOfRange { col: 7, cols: 4 }))
        );
        assert_eq!(room.submit("sa", 0), Ok(Player::B));
        assert_eq!(room.state().moves.len(), 1);
    }

    #[test]
    fn win_finishes_the_room() {
        let mut room = Room::new("ROOM", 6, 7, Player::A);
        room.join("a", "sa".into(), Some(Role::A));
        room.join("b", "sb".into(), None);
        for (secret, col) in [
            ("sa", 0),
            ("sb", 0),
            ("sa", 1),
            ("sb", 1),
            ("sa", 2),
            ("sb", 2),
            ("sa", 3),
        ] {
            room.submit(secret, col).unwrap();
        }
        let state = room.state();
        assert_eq!(state.status, RoomStatus::Finished);
        assert_eq!(state.winner, Some(WinnerTag::A));
        assert_eq!(room.submit("sb", 3), Err(RoomError::Finished));
        assert!(state.validate().is_ok());
    }

    #[test]
    fn lobby_handles_requests() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut lobby = Lobby::new();
        let Response::Joined { info: host } = lobby.handle(
            Request::Create {
                rows: 2,
                cols: 30,
                starting_player: Player::A,
                player_name: "host".into(),
            },
            &mut rng,
        ) else {
            panic!("create failed");
        };
        assert_eq!(host.role, Role::A);
        assert_eq!(host.code.len(), CODE_LEN);

        let guest = lobby.join(&host.code.to_lowercase(), "guest", &mut rng).unwrap();
        assert_eq!(guest.role, Role::B);

        let state = lobby.state(&host.code).unwrap();
        assert_eq!((state.rows, state.cols), (MIN_DIM, MAX_DIM));
        assert_eq!(state.status, RoomStatus::Playing);

        let reply = lobby.handle(
            Request::Move {
                code: host.code.clone(),
                secret: guest.secret.clone(),
                column: 0,
            },
            &mut rng,
        );
        assert_eq!(
            reply,
            Response::Error {
                message: "not your turn".into()
            }
        );
        assert!(matches!(
            lobby.handle(Request::State { code: "ZZZZZZ".into() }, &mut rng),
            Response::Error { .. }
        ));
    }

    #[test]
    fn finished_rooms_are_evicted_after_the_grace_period() {
        let grace = Duration::from_secs(60);
        let mut rng = StdRng::seed_from_u64(9);
        let mut lobby = Lobby::with_grace(grace);
        let host = lobby.create(6, 7, Player::A, "host", &mut rng);
        let guest = lobby.join(&host.code, "guest", &mut rng).unwrap();
        let open = lobby.create(6, 7, Player::A, "other", &mut rng);

        for col in [0, 0, 1, 1, 2, 2, 3] {
            let secret = if lobby.state(&host.code).unwrap().current_turn == Player::A {
                &host.secret
            } else {
                &guest.secret
            };
            lobby.submit(&host.code, secret, col).unwrap();
        }
        assert_eq!(lobby.state(&host.code).unwrap().status, RoomStatus::Finished);

        let now = Instant::now();
        assert_eq!(lobby.evict_finished(now), 0);
        assert!(lobby.state(&host.code).is_ok());

        assert_eq!(lobby.evict_finished(now + grace), 1);
        assert_eq!(lobby.len(), 1);
        assert_eq!(
            lobby.state(&host.code),
            Err(RoomError::NotFound(host.code.clone()))
        );
        assert!(lobby.state(&open.code).is_ok());
        assert_eq!(lobby.evict_finished(now + grace * 10), 0);
    }
}
