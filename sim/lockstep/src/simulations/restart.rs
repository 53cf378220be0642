use crate::programs::chat::{Chat, ChatLog};
use crate::script;
use lockstep_core::{Address, Console, NodeState, Outcome, SimConfig, Simulator};

/// Runs a crash-and-restart simulation.
///
/// Node 1 fails on tick 1 and is restarted with a freshly constructed
/// instance on tick 3. A message sent to it while crashed is lost silently;
/// one sent after the restart arrives.
pub fn restart() {
    let log = ChatLog::default();
    let config = SimConfig {
        seed: Some(1),
        ..Default::default()
    };
    let mut sim = Simulator::new(&config, Chat::factory_with(log.clone()), Console::scripted(""));
    sim.boot(2);

    let script = script::parse(
        "TIME\n\
         FAIL 1\n\
         0 send 1 lost\n\
         TIME\n\
         TIME\n\
         START 1\n\
         TIME\n\
         0 send 1 found\n\
         TIME\n\
         TIME\n",
    )
    .unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::Drained);
    assert_eq!(sim.node_state(Address::new(1)), NodeState::Live);
    assert_eq!(sim.nodes_created(), 2);
    let log = log.lock().unwrap();
    assert_eq!(
        *log,
        vec![(Address::new(1), 5, Address::new(0), "found".to_string())]
    );
}

#[cfg(test)]
mod tests {
    #[test]
    fn restart() {
        super::restart()
    }
}
