use crate::programs::chat::{Chat, ChatLog};
use crate::script;
use lockstep_core::{Console, FailureLevel, Outcome, SimConfig, Simulator};

/// Runs a simulation where every packet is dropped.
///
/// With a drop rate of 1 the greeting vanishes from the in-transit queue
/// and the receiver never hears it.
pub fn drop_all() {
    let log = ChatLog::default();
    let config = SimConfig {
        level: FailureLevel::Drop,
        drop_rate: 1.0,
        seed: Some(1),
        ..Default::default()
    };
    let mut sim = Simulator::new(&config, Chat::factory_with(log.clone()), Console::scripted(""));
    sim.boot(2);

    let script = script::parse("0 send 1 hello\nTIME\nTIME\n").unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::Drained);
    assert!(log.lock().unwrap().is_empty());
}
