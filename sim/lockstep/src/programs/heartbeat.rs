//! Liveness tracking over a lossy network.
//!
//! Each node broadcasts a beat when it starts and again on a recurring
//! timeout. Peers remember the last tick they heard from each address in a
//! shared table, so a harness can see how failures and delays distort the
//! cluster's view of itself.
//!
//! The recurring timeout never drains, so scripted runs need an `EXIT`
//! event or a tick limit.

use lockstep_core::{Address, Crashed, Message, Node, NodeFactory, Runtime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// (listener, source) -> last tick the listener heard that source.
pub type LastHeard = Arc<Mutex<HashMap<(Address, Address), u64>>>;

pub struct Heartbeat {
    period: u64,
    last_heard: LastHeard,
}

impl Heartbeat {
    const PROTOCOL: u8 = 2;

    pub fn new(period: u64, last_heard: LastHeard) -> Self {
        Self { period, last_heard }
    }

    pub fn factory(period: u64) -> NodeFactory {
        Self::factory_with(period, LastHeard::default())
    }

    pub fn factory_with(period: u64, last_heard: LastHeard) -> NodeFactory {
        Box::new(move |_addr| {
            Ok(Box::new(Heartbeat::new(period, last_heard.clone())) as Box<dyn Node>)
        })
    }

    fn beat(&self, rt: &mut Runtime) {
        if let Err(e) = rt.broadcast(Self::PROTOCOL, Message::new("beat")) {
            tracing::error!(node = %rt.addr(), "heartbeat broadcast failed: {e}");
        }
        rt.set_timeout(self.period, Message::default());
    }
}

impl Node for Heartbeat {
    fn start(&mut self, rt: &mut Runtime) -> Result<(), Crashed> {
        self.beat(rt);
        Ok(())
    }

    fn on_receive(
        &mut self,
        rt: &mut Runtime,
        src: Address,
        _protocol: u8,
        _payload: Message,
    ) -> Result<(), Crashed> {
        self.last_heard
            .lock()
            .unwrap()
            .insert((rt.addr(), src), rt.now());
        Ok(())
    }

    fn on_command(&mut self, rt: &mut Runtime, command: &str) -> Result<(), Crashed> {
        tracing::error!(node = %rt.addr(), "heartbeat takes no commands: {command}");
        Ok(())
    }

    fn on_timeout(&mut self, rt: &mut Runtime, _payload: Message) -> Result<(), Crashed> {
        self.beat(rt);
        Ok(())
    }
}
