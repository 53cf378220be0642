//! The contract between the simulator and user-written node programs.

use crate::message::Message;
use crate::packet::Address;
use crate::runtime::Runtime;

/// The cooperative crash signal.
///
/// A node callback returns `Err(Crashed)` to terminate itself; the sentinel
/// unwinds the node's own call stack via `?` and is absorbed at the event
/// dispatch boundary. Obtain one from [`Runtime::crash`] or by propagating
/// [`Runtime::check_write_crash`]; both record the crash with the simulator
/// before returning, so a node must never construct the signal on its own
/// without going through the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crashed;

/// A user-written node program.
///
/// One instance exists per live address; the factory builds a fresh instance
/// on every start or restart, so no state survives a crash. Every callback
/// receives the [`Runtime`] handle it may use to send packets, register
/// timeouts, or crash itself.
pub trait Node {
    /// Called once when the node comes up, freshly constructed.
    fn start(&mut self, rt: &mut Runtime) -> Result<(), Crashed>;

    /// Called when the node is failed, before the instance is discarded.
    fn stop(&mut self, rt: &mut Runtime) -> Result<(), Crashed> {
        let _ = rt;
        Ok(())
    }

    /// A packet addressed to this node survived the failure controller.
    fn on_receive(
        &mut self,
        rt: &mut Runtime,
        src: Address,
        protocol: u8,
        payload: Message,
    ) -> Result<(), Crashed>;

    /// A command string arrived from the script or the prompt.
    fn on_command(&mut self, rt: &mut Runtime, command: &str) -> Result<(), Crashed>;

    /// A timeout this node registered came due.
    fn on_timeout(&mut self, rt: &mut Runtime, payload: Message) -> Result<(), Crashed> {
        let _ = (rt, payload);
        Ok(())
    }
}

/// Node construction failed.
#[derive(Debug, thiserror::Error)]
#[error("node construction failed: {0}")]
pub struct FactoryError(pub String);

/// Builds a fresh node instance for an address.
///
/// Replaces runtime reflection over a program class: the simulator calls the
/// factory whenever a node starts, and the factory may capture shared state
/// (counters, test recorders) across instances.
pub type NodeFactory = Box<dyn FnMut(Address) -> Result<Box<dyn Node>, FactoryError>>;
