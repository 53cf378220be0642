use crate::programs::journal::{Entries, Journal};
use crate::script;
use lockstep_core::{Address, Console, FailureLevel, NodeState, Outcome, SimConfig, Simulator};

/// Runs a journal node into an injected write-barrier crash.
///
/// The first append passes its barrier and commits; the second is answered
/// with an injected crash, so the entry is lost whole and the node ends the
/// run crashed. Nothing is ever half-written.
pub fn journal_barrier() {
    let entries = Entries::default();
    let config = SimConfig {
        level: FailureLevel::Everything,
        ..Default::default()
    };
    // Tick 0: crash prompt, then "n" at the write barrier.
    // Tick 1: crash prompt, then "y" at the write barrier.
    let console = Console::scripted("\nn\n\ny\n");
    let mut sim = Simulator::new(&config, Journal::factory_with(entries.clone()), console);
    sim.boot(1);

    let script = script::parse("0 append alpha\nTIME\n0 append beta\nTIME\n").unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::Drained);
    assert_eq!(
        *entries.lock().unwrap(),
        vec![(Address::new(0), 0, "alpha".to_string())]
    );
    assert_eq!(sim.node_state(Address::new(0)), NodeState::Crashed);
}

#[cfg(test)]
mod tests {
    #[test]
    fn journal_barrier() {
        super::journal_barrier()
    }
}
