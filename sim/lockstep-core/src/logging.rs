//! Contains basic logging functions.
//!
//! Each function corresponds to a type of logging (packet movement, node
//! lifecycle, etc.). These functions are meant to be called from inside the
//! simulator core as events happen, so that a run can be reconstructed from
//! its trace.

use crate::packet::{Address, Packet};
use tracing::{event, Level};

/// Send packet event handler. Logs a packet entering the in-transit queue.
pub fn send_packet_event(packet: &Packet) {
    event!(
        target: "SEND_PACKET",
        Level::INFO,
        src = %packet.src,
        dest = %packet.dest,
        protocol = packet.protocol,
        payload = %packet.payload,
    );
}

/// Deliver packet event handler. Logs a packet handed to its destination.
pub fn deliver_packet_event(packet: &Packet) {
    event!(
        target: "DELIVER_PACKET",
        Level::INFO,
        src = %packet.src,
        dest = %packet.dest,
        protocol = packet.protocol,
        payload = %packet.payload,
    );
}

/// Drop packet event handler.
pub fn drop_packet_event(packet: &Packet) {
    event!(
        target: "DROP_PACKET",
        Level::INFO,
        packet = %packet,
    );
}

/// Delay packet event handler. The packet returns to the in-transit queue.
pub fn delay_packet_event(packet: &Packet) {
    event!(
        target: "DELAY_PACKET",
        Level::INFO,
        packet = %packet,
    );
}

/// Node failure event handler.
pub fn node_failure_event(addr: Address) {
    event!(
        target: "NODE_FAILURE",
        Level::INFO,
        node = %addr,
    );
}

/// Node start event handler. Fires for both fresh starts and restarts.
pub fn node_start_event(addr: Address) {
    event!(
        target: "NODE_START",
        Level::INFO,
        node = %addr,
    );
}
