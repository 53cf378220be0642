//! A command-driven messaging program.
//!
//! `chat` nodes do nothing on their own; the script or prompt drives them:
//!
//! ```text
//! send <addr> <text…>    send text to one node
//! broadcast <text…>      send text to every other live node
//! ```
//!
//! Every received message is appended to a log shared across all instances,
//! so a harness can assert on exactly who heard what, and when.

use lockstep_core::{Address, Crashed, Message, Node, NodeFactory, Runtime};
use std::sync::{Arc, Mutex};

/// One received message: (receiver, tick, sender, text).
pub type ChatEntry = (Address, u64, Address, String);

/// The log every `Chat` instance records into.
pub type ChatLog = Arc<Mutex<Vec<ChatEntry>>>;

pub struct Chat {
    log: ChatLog,
}

impl Chat {
    const PROTOCOL: u8 = 0;

    pub fn new(log: ChatLog) -> Self {
        Self { log }
    }

    /// A factory whose instances share a fresh log.
    pub fn factory() -> NodeFactory {
        Self::factory_with(ChatLog::default())
    }

    /// A factory whose instances record into the given log.
    pub fn factory_with(log: ChatLog) -> NodeFactory {
        Box::new(move |_addr| Ok(Box::new(Chat::new(log.clone())) as Box<dyn Node>))
    }
}

impl Node for Chat {
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
        let text = payload.as_text().into_owned();
        tracing::info!(node = %rt.addr(), from = %src, "chat received: {text}");
        self.log
            .lock()
            .unwrap()
            .push((rt.addr(), rt.now(), src, text));
        Ok(())
    }

    fn on_command(&mut self, rt: &mut Runtime, command: &str) -> Result<(), Crashed> {
        let mut words = command.split_whitespace();
        match words.next() {
            Some("send") => {
                let Some(dest) = words.next().and_then(|w| w.parse::<u8>().ok()) else {
                    tracing::error!(node = %rt.addr(), "send needs a destination address");
                    return Ok(());
                };
                let text = words.collect::<Vec<_>>().join(" ");
                if let Err(e) = rt.send(Address::new(dest), Self::PROTOCOL, Message::new(text)) {
                    tracing::error!(node = %rt.addr(), "chat send failed: {e}");
                }
            }
            Some("broadcast") => {
                let text = words.collect::<Vec<_>>().join(" ");
                if let Err(e) = rt.broadcast(Self::PROTOCOL, Message::new(text)) {
                    tracing::error!(node = %rt.addr(), "chat broadcast failed: {e}");
                }
            }
            other => {
                tracing::error!(node = %rt.addr(), "unknown chat command: {other:?}");
            }
        }
        Ok(())
    }
}
