//! Events dispatched by the tick loop, and the timeouts that feed it.

use crate::message::Message;
use crate::packet::{Address, Packet};
use std::fmt::{self, Display};

/// Handle returned by [`Runtime::set_timeout`](crate::Runtime::set_timeout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutId(pub(crate) u64);

/// A registered timeout waiting to fire.
///
/// Invariant: a timeout whose owner crashes is cancelled and must not fire,
/// even if the owner later restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeout {
    pub id: TimeoutId,
    pub addr: Address,
    pub fire_tick: u64,
    pub payload: Message,
}

/// One unit of work for a tick's execute phase.
///
/// Arms carry only the fields their handler needs. `TimeAdvance` is the tick
/// boundary marker in scripts and prompts; it never enters a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Tick boundary marker.
    TimeAdvance,
    /// Deliver a command string to a node.
    Command { node: Address, command: String },
    /// Print a message when the event executes.
    Echo { message: String },
    /// Fail a live node.
    Failure { node: Address },
    /// Start or restart a node.
    Start { node: Address },
    /// Terminate the simulation.
    Exit,
    /// Hand an in-transit packet to its destination.
    Delivery { packet: Packet },
    /// Fire a registered timeout.
    Timeout { timeout: Timeout },
}

impl Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::TimeAdvance => write!(f, "TIME"),
            Event::Command { node, command } => write!(f, "COMMAND {node}: {command}"),
            Event::Echo { message } => write!(f, "ECHO {message}"),
            Event::Failure { node } => write!(f, "FAILURE {node}"),
            Event::Start { node } => write!(f, "START {node}"),
            Event::Exit => write!(f, "EXIT"),
            Event::Delivery { packet } => write!(f, "DELIVERY {packet}"),
            Event::Timeout { timeout } => write!(
                f,
                "TIMEOUT {} (set for tick {}) {}",
                timeout.addr, timeout.fire_tick, timeout.payload
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_text() {
        let command = Event::Command {
            node: Address::new(1),
            command: "send 2 hi".into(),
        };
        assert_eq!(command.to_string(), "COMMAND 1: send 2 hi");

        let delivery = Event::Delivery {
            packet: Packet::new(Address::new(1), Address::new(2), 3, Message::new("hi")),
        };
        assert_eq!(delivery.to_string(), "DELIVERY 1 -> 2 [proto 3] hi");

        let timeout = Event::Timeout {
            timeout: Timeout {
                id: TimeoutId(0),
                addr: Address::new(4),
                fire_tick: 9,
                payload: Message::new("beat"),
            },
        };
        assert_eq!(timeout.to_string(), "TIMEOUT 4 (set for tick 9) beat");
    }
}
