pub mod ai;
pub mod controller;

pub use controller::{GameMode, Seat};
