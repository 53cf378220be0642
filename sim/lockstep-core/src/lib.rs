//! Lockstep, a library for simulating networks of message-passing node
//! programs under controlled failure.
//!
//! A simulation runs a set of user-written node programs against a virtual
//! clock that advances in unit ticks. Each tick, the simulator decides which
//! in-flight packets are dropped, delayed, or delivered, which live nodes
//! crash, which crashed nodes recover, and which registered timeouts fire,
//! then executes the resulting events in a controlled order.
//!
//! # Uses
//!
//! - Educators can use lockstep to let students run distributed algorithms
//!   against reproducible packet loss, reordering, and crash-restart
//!   schedules without any real networking.
//! - Protocol authors can drive their node programs interactively, choosing
//!   exactly which packets to drop or delay and in what order a round's
//!   events execute.
//!
//! # Organization
//!
//! - [`Message`] and [`Packet`](packet::Packet) are the units of
//!   communication between nodes
//! - [`Node`] is the contract a user program implements; [`Runtime`] is the
//!   handle it uses to talk back to the simulator
//! - [`FailureController`](failure::FailureController) decides drops,
//!   delays, crashes, recoveries, and event order in one of four escalating
//!   modes
//! - [`Simulator`] owns the tick loop and drives everything above

mod logging;

pub mod command;

pub mod console;
pub use console::Console;

pub mod events;
pub use events::{Event, Timeout, TimeoutId};

pub mod failure;
pub use failure::{FailureController, FailureLevel, SimConfig};

pub mod message;
pub use message::Message;

pub mod node;
pub use node::{Crashed, FactoryError, Node, NodeFactory};

pub mod node_table;
pub use node_table::{NodeState, NodeTable};

pub mod packet;
pub use packet::{Address, Packet};

pub mod runtime;
pub use runtime::{Runtime, SendError};

pub mod simulator;
pub use simulator::{Outcome, Simulator};
