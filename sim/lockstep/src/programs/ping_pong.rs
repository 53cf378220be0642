//! A volley between two nodes.
//!
//! The serving node sends a TTL to its peer; each hop decrements it and
//! sends it back. Once the TTL reaches 0 the volley is over and the final
//! receiver records the completion. Start a volley with the command
//! `serve <addr> <ttl>`.

use lockstep_core::{Address, Crashed, Message, Node, NodeFactory, Runtime};
use std::sync::{Arc, Mutex};

/// Completions observed across all instances: (node, tick).
pub type Completions = Arc<Mutex<Vec<(Address, u64)>>>;

pub struct PingPong {
    completions: Completions,
}

impl PingPong {
    const PROTOCOL: u8 = 1;

    pub fn new(completions: Completions) -> Self {
        Self { completions }
    }

    pub fn factory() -> NodeFactory {
        Self::factory_with(Completions::default())
    }

    pub fn factory_with(completions: Completions) -> NodeFactory {
        Box::new(move |_addr| Ok(Box::new(PingPong::new(completions.clone())) as Box<dyn Node>))
    }
}

impl Node for PingPong {
    fn start(&mut self, _rt: &mut Runtime) -> Result<(), Crashed> {
        Ok(())
    }

    fn on_receive(
        &mut self,
        rt: &mut Runtime,
        src: Address,
        _protocol: u8,
        payload: Message,
    ) -> Result<(), Crashed> {
        let Some(ttl) = payload.iter().next() else {
            tracing::error!(node = %rt.addr(), "volley message carried no TTL");
            return Ok(());
        };
        if ttl % 2 == 0 {
            tracing::info!("Pong {ttl}");
        } else {
            tracing::info!("Ping {ttl}");
        }

        if ttl == 0 {
            tracing::info!(node = %rt.addr(), "volley complete");
            self.completions.lock().unwrap().push((rt.addr(), rt.now()));
        } else if let Err(e) = rt.send(src, Self::PROTOCOL, Message::new(vec![ttl - 1])) {
            tracing::error!(node = %rt.addr(), "volley return failed: {e}");
        }
        Ok(())
    }

    fn on_command(&mut self, rt: &mut Runtime, command: &str) -> Result<(), Crashed> {
        let mut words = command.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("serve"), Some(dest), Some(ttl)) => {
                let (Ok(dest), Ok(ttl)) = (dest.parse::<u8>(), ttl.parse::<u8>()) else {
                    tracing::error!(node = %rt.addr(), "serve needs an address and a TTL");
                    return Ok(());
                };
                if let Err(e) = rt.send(Address::new(dest), Self::PROTOCOL, Message::new(vec![ttl]))
                {
                    tracing::error!(node = %rt.addr(), "serve failed: {e}");
                }
            }
            _ => tracing::error!(node = %rt.addr(), "unknown ping-pong command: {command}"),
        }
        Ok(())
    }
}
