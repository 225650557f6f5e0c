use crate::core::Player;
use crate::error::RemoteError;
use crate::game::online::{JoinInfo, RemoteState, RoomStatus};
use crate::network::protocol::{Request, Response};
use crate::network::server::send_msg;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Request/response connection to a room server.
pub struct RoomClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl RoomClient {
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        tracing::info!("connected to room server {addr}");
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
        })
    }

    /// Sends one request and waits for its answer. Server-side refusals
    /// come back as [`RemoteError::Rejected`].
    pub async fn request(&mut self, request: &Request) -> anyhow::Result<Response> {
        send_msg(&mut self.writer, request).await?;
        let line = self
            .lines
            .next_line()
            .await?
            .ok_or_else(|| anyhow::anyhow!("room server closed the connection"))?;
        match serde_json::from_str(&line)? {
            Response::Error { message } => Err(RemoteError::Rejected(message).into()),
            response => Ok(response),
        }
    }

    pub async fn create(
        &mut self,
        rows: usize,
        cols: usize,
        starting_player: Player,
        player_name: &str,
    ) -> anyhow::Result<JoinInfo> {
        let request = Request::Create {
            rows,
            cols,
            starting_player,
            player_name: player_name.to_string(),
        };
        match self.request(&request).await? {
            Response::Joined { info } => Ok(info),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn join(&mut self, code: &str, player_name: &str) -> anyhow::Result<JoinInfo> {
        let request = Request::Join {
            code: code.to_string(),
            player_name: player_name.to_string(),
        };
        match self.request(&request).await? {
            Response::Joined { info } => Ok(info),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn state(&mut self, code: &str) -> anyhow::Result<RemoteState> {
        let request = Request::State {
            code: code.to_string(),
        };
        match self.request(&request).await? {
            Response::State { state } => Ok(state),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn submit_move(
        &mut self,
        code: &str,
        secret: &str,
        column: usize,
    ) -> anyhow::Result<(Player, RoomStatus)> {
        let request = Request::Move {
            code: code.to_string(),
            secret: secret.to_string(),
            column,
        };
        match self.request(&request).await? {
            Response::Moved { next_turn, status } => Ok((next_turn, status)),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &Response) -> anyhow::Error {
    anyhow::anyhow!("unexpected response from room server: {response:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::online::Role;
    use crate::network::room::Lobby;
    use crate::network::server::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    async fn spawn_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(serve(listener, Arc::new(Mutex::new(Lobby::new()))));
        addr
    }

    #[tokio::test]
    async fn two_clients_play_through_the_server() {
        let addr = spawn_server().await;
        let mut host = RoomClient::connect(&addr).await.unwrap();
        let mut guest = RoomClient::connect(&addr).await.unwrap();

        let a = host.create(6, 7, Player::A, "host").await.unwrap();
        assert_eq!(a.role, Role::A);
        let b = guest.join(&a.code, "guest").await.unwrap();
        assert_eq!(b.role, Role::B);

        let (next, status) = host.submit_move(&a.code, &a.secret, 3).await.unwrap();
        assert_eq!((next, status), (Player::B, RoomStatus::Playing));

        let err = host.submit_move(&a.code, &a.secret, 3).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<RemoteError>(),
            Some(&RemoteError::Rejected("not your turn".into()))
        );

        guest.submit_move(&b.code, &b.secret, 2).await.unwrap();
        let state = guest.state(&a.code).await.unwrap();
        assert_eq!(state.moves.len(), 2);
        assert_eq!(state.players.len(), 2);
        let snapshot = state.validate().unwrap();
        assert_eq!(snapshot.columns, vec![3, 2]);
    }

    #[tokio::test]
    async fn malformed_line_gets_an_error() {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        let addr = spawn_server().await;
        let mut stream = TcpStream::connect(&addr).await.unwrap();
        stream.write_all(b"not json\n").await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        let line = lines.next_line().await.unwrap().unwrap();
        assert!(matches!(
            serde_json::from_str::<Response>(&line).unwrap(),
            Response::Error { .. }
        ));
    }
}
