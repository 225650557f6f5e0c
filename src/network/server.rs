use crate::network::protocol::{Request, Response};
use crate::network::room::Lobby;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

pub type SharedLobby = Arc<Mutex<Lobby>>;

pub async fn start_server(addr: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("room server listening on {}", listener.local_addr()?);
    serve(listener, Arc::new(Mutex::new(Lobby::new()))).await
}

/// Accepts connections forever, one task per client.
pub async fn serve(listener: TcpListener, lobby: SharedLobby) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        let lobby = Arc::clone(&lobby);

        tokio::spawn(async move {
            tracing::debug!("client {peer} connected");
            if let Err(e) = handle_connection(socket, lobby).await {
                tracing::warn!("connection {peer} failed: {e}");
            }
            tracing::debug!("client {peer} disconnected");
        });
    }
}

async fn handle_connection(mut socket: TcpStream, lobby: SharedLobby) -> anyhow::Result<()> {
    let (reader, mut writer) = socket.split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let mut lobby = lobby.lock().await;
                let mut rng = rand::thread_rng();
                lobby.handle(request, &mut rng)
            }
            Err(e) => Response::Error {
                message: format!("malformed request: {e}"),
            },
        };
        if let Response::Error { message } = &response {
            tracing::debug!("request refused: {message}");
        }
        send_msg(&mut writer, &response).await?;
    }
    Ok(())
}

pub(crate) async fn send_msg<W, T>(writer: &mut W, msg: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let json = serde_json::to_string(msg)? + "\n";
    writer.write_all(json.as_bytes()).await?;
    Ok(())
}
