pub mod client;
pub mod protocol;
pub mod room;
pub mod server;

pub use client::RoomClient;
pub use protocol::{Request, Response};
pub use room::{Lobby, Room};
