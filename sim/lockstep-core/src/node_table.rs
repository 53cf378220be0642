//! Bookkeeping for which addresses are live, crashed, or absent.

use crate::node::Node;
use crate::packet::Address;
use std::collections::{HashMap, HashSet};

/// Where an address currently stands in the node lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Live,
    Crashed,
    Absent,
}

/// Owns the node objects and tracks every address's lifecycle state.
///
/// Invariant: an address is live, crashed, or absent, never two at once.
/// Address listings are returned sorted so that callers drawing from the RNG
/// per node do so in a reproducible order.
#[derive(Default)]
pub struct NodeTable {
    live: HashMap<Address, Box<dyn Node>>,
    crashed: HashSet<Address>,
    created: u64,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, addr: Address) -> NodeState {
        if self.live.contains_key(&addr) {
            NodeState::Live
        } else if self.crashed.contains(&addr) {
            NodeState::Crashed
        } else {
            NodeState::Absent
        }
    }

    pub fn is_live(&self, addr: Address) -> bool {
        self.live.contains_key(&addr)
    }

    /// Live addresses in ascending order.
    pub fn live_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.live.keys().copied().collect();
        addresses.sort_unstable();
        addresses
    }

    /// Crashed addresses in ascending order.
    pub fn crashed_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.crashed.iter().copied().collect();
        addresses.sort_unstable();
        addresses
    }

    /// How many node instances have ever been constructed for brand-new
    /// addresses. Restarts of crashed addresses do not count.
    pub fn created(&self) -> u64 {
        self.created
    }

    pub(crate) fn note_created(&mut self) {
        self.created += 1;
    }

    /// Takes a live node out of the table for the duration of a dispatch.
    pub(crate) fn detach(&mut self, addr: Address) -> Option<Box<dyn Node>> {
        self.live.remove(&addr)
    }

    /// Returns a detached node after a dispatch that did not crash it.
    pub(crate) fn reattach(&mut self, addr: Address, node: Box<dyn Node>) {
        debug_assert!(!self.crashed.contains(&addr));
        self.live.insert(addr, node);
    }

    /// Inserts a freshly constructed node as live.
    pub(crate) fn insert_live(&mut self, addr: Address, node: Box<dyn Node>) {
        debug_assert!(!self.crashed.contains(&addr));
        self.live.insert(addr, node);
    }

    /// Moves an address into the crashed set.
    pub(crate) fn mark_crashed(&mut self, addr: Address) {
        self.live.remove(&addr);
        self.crashed.insert(addr);
    }

    /// Removes an address from the crashed set, reporting whether it was
    /// there.
    pub(crate) fn clear_crashed(&mut self, addr: Address) -> bool {
        self.crashed.remove(&addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Crashed;
    use crate::runtime::Runtime;
    use crate::Message;

    struct Inert;

    impl Node for Inert {
        fn start(&mut self, _rt: &mut Runtime) -> Result<(), Crashed> {
            Ok(())
        }

        fn on_receive(
            &mut self,
            _rt: &mut Runtime,
            _src: Address,
            _protocol: u8,
            _payload: Message,
        ) -> Result<(), Crashed> {
            Ok(())
        }

        fn on_command(&mut self, _rt: &mut Runtime, _command: &str) -> Result<(), Crashed> {
            Ok(())
        }
    }

    #[test]
    fn lifecycle_states_are_exclusive() {
        let mut table = NodeTable::new();
        let addr = Address::new(3);
        assert_eq!(table.state(addr), NodeState::Absent);

        table.insert_live(addr, Box::new(Inert));
        table.note_created();
        assert_eq!(table.state(addr), NodeState::Live);
        assert_eq!(table.created(), 1);

        table.mark_crashed(addr);
        assert_eq!(table.state(addr), NodeState::Crashed);
        assert!(!table.is_live(addr));

        assert!(table.clear_crashed(addr));
        assert_eq!(table.state(addr), NodeState::Absent);
        assert!(!table.clear_crashed(addr));
    }

    #[test]
    fn listings_are_sorted() {
        let mut table = NodeTable::new();
        for n in [5u8, 1, 3] {
            table.insert_live(Address::new(n), Box::new(Inert));
        }
        table.mark_crashed(Address::new(3));
        assert_eq!(
            table.live_addresses(),
            vec![Address::new(1), Address::new(5)]
        );
        assert_eq!(table.crashed_addresses(), vec![Address::new(3)]);
    }

    #[test]
    fn detach_and_reattach() {
        let mut table = NodeTable::new();
        let addr = Address::new(0);
        table.insert_live(addr, Box::new(Inert));

        let node = table.detach(addr).unwrap();
        assert_eq!(table.state(addr), NodeState::Absent);
        table.reattach(addr, node);
        assert_eq!(table.state(addr), NodeState::Live);
    }
}
