//! Example node programs for the simulator.

pub mod chat;
pub mod heartbeat;
pub mod journal;
pub mod ping_pong;

pub use chat::Chat;
pub use heartbeat::Heartbeat;
pub use journal::Journal;
pub use ping_pong::PingPong;

use lockstep_core::NodeFactory;

/// The program names `factory` recognizes.
pub const NAMES: [&str; 4] = ["chat", "heartbeat", "journal", "ping-pong"];

/// Builds the factory for a program selected by name.
pub fn factory(name: &str) -> Option<NodeFactory> {
    match name {
        "chat" => Some(Chat::factory()),
        "heartbeat" => Some(Heartbeat::factory(5)),
        "journal" => Some(Journal::factory()),
        "ping-pong" => Some(PingPong::factory()),
        _ => None,
    }
}
