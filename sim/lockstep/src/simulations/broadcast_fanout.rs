use crate::programs::chat::{Chat, ChatLog};
use crate::script;
use lockstep_core::{Address, Console, Outcome, SimConfig, Simulator};

/// Runs a broadcast fan-out simulation.
///
/// With three live nodes, a broadcast from node 0 expands into exactly one
/// packet per other node at send time; with no drops or delays each peer
/// hears it exactly once on the next tick, and the sender hears nothing.
pub fn broadcast_fanout() {
    let log = ChatLog::default();
    let config = SimConfig {
        seed: Some(1),
        ..Default::default()
    };
    let mut sim = Simulator::new(&config, Chat::factory_with(log.clone()), Console::scripted(""));
    sim.boot(3);

    let script = script::parse("0 broadcast hail\nTIME\nTIME\n").unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::Drained);
    let log = log.lock().unwrap();
    for peer in [1u8, 2] {
        let copies = log
            .iter()
            .filter(|(receiver, tick, src, text)| {
                *receiver == Address::new(peer)
                    && *tick == 1
                    && *src == Address::new(0)
                    && text == "hail"
            })
            .count();
        assert_eq!(copies, 1, "node {peer} should hear the broadcast once");
    }
    assert!(log.iter().all(|(receiver, ..)| *receiver != Address::new(0)));
}
