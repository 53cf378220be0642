use crate::programs::heartbeat::{Heartbeat, LastHeard};
use crate::script;
use lockstep_core::{Address, Console, Outcome, SimConfig, Simulator};

/// Runs a heartbeat cluster through a crash.
///
/// Three nodes beat every three ticks. Node 1 fails on tick 1, which
/// cancels its pending timeout: the rest of the cluster never hears from it
/// again, while the survivors keep updating each other's liveness view.
pub fn heartbeat_crash() {
    let last_heard = LastHeard::default();
    let config = SimConfig {
        seed: Some(1),
        ..Default::default()
    };
    let mut sim = Simulator::new(
        &config,
        Heartbeat::factory_with(3, last_heard.clone()),
        Console::scripted(""),
    );
    sim.boot(3);

    // Boot beats land on tick 0; node 1 dies on tick 1; survivors beat on
    // ticks 3 and 6, heard on ticks 4 and 7; EXIT ends the run on tick 8.
    let script =
        script::parse("TIME\nFAIL 1\nTIME\nTIME\nTIME\nTIME\nTIME\nTIME\nTIME\nEXIT\n").unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::Exited);
    let heard = |listener: u8, source: u8| {
        last_heard
            .lock()
            .unwrap()
            .get(&(Address::new(listener), Address::new(source)))
            .copied()
    };
    assert_eq!(heard(0, 2), Some(7));
    assert_eq!(heard(2, 0), Some(7));
    // The dead node's boot beat is the last anyone heard of it.
    assert_eq!(heard(0, 1), Some(0));
    assert_eq!(heard(2, 1), Some(0));
    assert_eq!(sim.waiting_timeout_count(), 2);
}

#[cfg(test)]
mod tests {
    #[test]
    fn heartbeat_crash() {
        super::heartbeat_crash()
    }
}
