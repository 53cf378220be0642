use crate::programs::ping_pong::{Completions, PingPong};
use crate::script;
use lockstep_core::{Address, Console, Outcome, SimConfig, Simulator};

/// Runs a ping-pong volley to completion.
///
/// Node 0 serves a TTL of 3 to node 1; the nodes return it back and forth,
/// decrementing each hop, until it reaches 0 back at node 0 on tick 4. The
/// run drains on its own once the last packet lands.
pub fn ping_pong_volley() {
    let completions = Completions::default();
    let config = SimConfig {
        seed: Some(1),
        ..Default::default()
    };
    let mut sim = Simulator::new(
        &config,
        PingPong::factory_with(completions.clone()),
        Console::scripted(""),
    );
    sim.boot(2);

    let script = script::parse("0 serve 1 3\nTIME\n").unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::Drained);
    assert_eq!(*completions.lock().unwrap(), vec![(Address::new(0), 4)]);
}

#[cfg(test)]
mod tests {
    #[test]
    fn ping_pong_volley() {
        super::ping_pong_volley()
    }
}
