//! An append-only journal guarded by the write barrier.
//!
//! Commands of the form `append <text…>` are committed to a shared
//! in-memory journal. Immediately before each commit the node calls
//! [`Runtime::check_write_crash`], so under the crash-capable failure modes
//! an append can be lost to an injected crash, but never half-written.

use lockstep_core::{Address, Crashed, Message, Node, NodeFactory, Runtime};
use std::sync::{Arc, Mutex};

/// Committed entries across all instances: (node, tick, text).
pub type Entries = Arc<Mutex<Vec<(Address, u64, String)>>>;

pub struct Journal {
    entries: Entries,
}

impl Journal {
    pub fn new(entries: Entries) -> Self {
        Self { entries }
    }

    pub fn factory() -> NodeFactory {
        Self::factory_with(Entries::default())
    }

    pub fn factory_with(entries: Entries) -> NodeFactory {
        Box::new(move |_addr| Ok(Box::new(Journal::new(entries.clone())) as Box<dyn Node>))
    }

    fn commit(&self, rt: &mut Runtime, text: String) -> Result<(), Crashed> {
        rt.check_write_crash("journal append")?;
        self.entries.lock().unwrap().push((rt.addr(), rt.now(), text));
        Ok(())
    }
}

impl Node for Journal {
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
        let text = format!("from {}: {}", src, payload.as_text());
        self.commit(rt, text)
    }

    fn on_command(&mut self, rt: &mut Runtime, command: &str) -> Result<(), Crashed> {
        match command.split_once(char::is_whitespace) {
            Some(("append", text)) => self.commit(rt, text.trim().to_owned()),
            _ => {
                tracing::error!(node = %rt.addr(), "unknown journal command: {command}");
                Ok(())
            }
        }
    }
}
