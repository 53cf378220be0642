//! Node addresses and the packets that travel between them.

use crate::message::Message;
use std::fmt::{self, Display};

/// The address of a simulated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u8);

impl Address {
    /// Send-time destination meaning "every other live node". Never appears
    /// on an in-transit packet.
    pub const BROADCAST: Self = Self(255);

    /// The highest address an individual node may occupy.
    pub const MAX_SIMULATED: Self = Self(254);

    /// Creates a new address.
    pub const fn new(address: u8) -> Self {
        Self(address)
    }

    /// Gets the address as a `u8`.
    pub fn to_u8(self) -> u8 {
        self.0
    }

    /// Whether this address may identify a node.
    pub fn is_valid(self) -> bool {
        self.0 <= Self::MAX_SIMULATED.0
    }

    /// Whether this is the broadcast sentinel.
    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for Address {
    fn from(address: u8) -> Self {
        Self(address)
    }
}

impl From<Address> for u8 {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// A packet in flight between two nodes.
///
/// Packets are value objects; once enqueued on the in-transit queue they are
/// never mutated. `src` and `dest` are concrete addresses; broadcasts are
/// expanded into per-destination packets at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub src: Address,
    pub dest: Address,
    pub protocol: u8,
    pub payload: Message,
}

impl Packet {
    /// The largest payload a packet may carry.
    pub const MAX_PAYLOAD_SIZE: usize = 123;

    /// Creates a new packet.
    pub fn new(src: Address, dest: Address, protocol: u8, payload: Message) -> Self {
        Self {
            src,
            dest,
            protocol,
            payload,
        }
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} [proto {}] {}",
            self.src, self.dest, self.protocol, self.payload
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_validity() {
        assert!(Address::new(0).is_valid());
        assert!(Address::MAX_SIMULATED.is_valid());
        assert!(!Address::BROADCAST.is_valid());
        assert!(Address::BROADCAST.is_broadcast());
        assert!(!Address::new(7).is_broadcast());
    }

    #[test]
    fn address_conversions() {
        let address: Address = 9u8.into();
        assert_eq!(address.to_u8(), 9);
        assert_eq!(u8::from(address), 9);
        assert_eq!(address.to_string(), "9");
    }

    #[test]
    fn packet_display() {
        let packet = Packet::new(Address::new(1), Address::new(2), 0, Message::new("hi"));
        assert_eq!(packet.to_string(), "1 -> 2 [proto 0] hi");
    }
}
