//! Room domain model and durable room storage.

pub mod model;
pub mod store;

pub use model::{
    GameResult, GameState, Player, PlayerRole, PlayerUpdate, Room, RoomPhase, RoomSettings,
};
pub use store::{MemoryRoomStore, PublicRoom, RemovePlayerOutcome, RoomStore};
