//! The bridge node programs use to talk back to the simulator.

use crate::console::Console;
use crate::events::{Timeout, TimeoutId};
use crate::failure::FailureController;
use crate::logging;
use crate::message::Message;
use crate::node::Crashed;
use crate::node_table::NodeTable;
use crate::packet::{Address, Packet};

/// A send could not be carried out.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("invalid destination address: {0}")]
    InvalidAddress(Address),
    #[error("payload of {0} bytes exceeds the packet limit")]
    BadPacket(usize),
}

/// Handle given to a node for the duration of one callback.
///
/// The node it belongs to is detached from the table while its callback
/// runs, so everything the runtime borrows from the simulator is free of
/// aliasing. All effects (packets entering the in-transit queue, timeouts
/// entering the waiting set, a self-crash) take hold through this handle
/// and nowhere else.
pub struct Runtime<'a> {
    pub(crate) addr: Address,
    pub(crate) now: u64,
    pub(crate) crashed: bool,
    pub(crate) table: &'a NodeTable,
    pub(crate) in_transit: &'a mut Vec<Packet>,
    pub(crate) timeouts: &'a mut Vec<Timeout>,
    pub(crate) next_timeout_id: &'a mut u64,
    pub(crate) controller: &'a mut FailureController,
    pub(crate) console: &'a mut Console,
}

impl Runtime<'_> {
    /// This node's own address.
    pub fn addr(&self) -> Address {
        self.addr
    }

    /// The current tick.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Enqueues a packet for `dest`, or one packet per other live node when
    /// `dest` is [`Address::BROADCAST`].
    ///
    /// A node that has already crashed during this callback sends nothing,
    /// silently. Delivery is at the failure controller's mercy: the packet
    /// may be dropped or delayed, and the destination may be gone by the
    /// time it would arrive.
    pub fn send(&mut self, dest: Address, protocol: u8, payload: Message) -> Result<(), SendError> {
        if self.crashed {
            return Ok(());
        }
        if payload.len() > Packet::MAX_PAYLOAD_SIZE {
            tracing::error!(
                src = %self.addr,
                size = payload.len(),
                "bad packet: payload exceeds the limit"
            );
            return Err(SendError::BadPacket(payload.len()));
        }

        if dest.is_broadcast() {
            for peer in self.table.live_addresses() {
                if peer != self.addr {
                    let packet = Packet::new(self.addr, peer, protocol, payload.clone());
                    logging::send_packet_event(&packet);
                    self.in_transit.push(packet);
                }
            }
            Ok(())
        } else if !dest.is_valid() {
            tracing::error!(src = %self.addr, dest = %dest, "send to invalid address");
            Err(SendError::InvalidAddress(dest))
        } else {
            let packet = Packet::new(self.addr, dest, protocol, payload);
            logging::send_packet_event(&packet);
            self.in_transit.push(packet);
            Ok(())
        }
    }

    /// Sends to every other live node.
    pub fn broadcast(&mut self, protocol: u8, payload: Message) -> Result<(), SendError> {
        self.send(Address::BROADCAST, protocol, payload)
    }

    /// Registers a timeout that fires `delta_ticks` from now, delivering
    /// `payload` to this node's `on_timeout`. The timeout is cancelled if
    /// this node fails first.
    ///
    /// A delta of zero is bumped to one: the current tick's timeouts have
    /// already been resolved by the time node code runs.
    pub fn set_timeout(&mut self, delta_ticks: u64, payload: Message) -> TimeoutId {
        let id = TimeoutId(*self.next_timeout_id);
        *self.next_timeout_id += 1;
        let fire_tick = self.now.saturating_add(delta_ticks.max(1));
        self.timeouts.push(Timeout {
            id,
            addr: self.addr,
            fire_tick,
            payload,
        });
        id
    }

    /// Crashes this node. The returned sentinel should be propagated out of
    /// the current callback: `return Err(rt.crash())`.
    pub fn crash(&mut self) -> Crashed {
        self.crashed = true;
        Crashed
    }

    /// The write barrier: call immediately before an observable persistent
    /// write. The failure controller may inject a crash here; if it does,
    /// the node must propagate the error so the write never happens.
    pub fn check_write_crash(&mut self, description: &str) -> Result<(), Crashed> {
        if self.crashed {
            return Err(Crashed);
        }
        if self
            .controller
            .write_crash(self.addr, description, self.console)
        {
            self.crashed = true;
            Err(Crashed)
        } else {
            Ok(())
        }
    }

    /// Whether this node crashed during the current callback.
    pub(crate) fn crash_pending(&self) -> bool {
        self.crashed
    }
}
