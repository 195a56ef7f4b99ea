//! In-memory presence and room registries

mod presence;
mod rooms;

pub use presence::PresenceRegistry;
pub use rooms::RoomRegistry;
