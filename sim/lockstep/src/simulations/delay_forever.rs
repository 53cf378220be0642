use crate::programs::chat::{Chat, ChatLog};
use crate::script;
use lockstep_core::{Console, FailureLevel, Outcome, SimConfig, Simulator};

/// Runs a simulation where every packet is delayed, forever.
///
/// The greeting stays in transit tick after tick; the run only ends because
/// of the tick limit.
pub fn delay_forever() {
    let log = ChatLog::default();
    let config = SimConfig {
        level: FailureLevel::Delay,
        drop_rate: 0.0,
        delay_rate: 1.0,
        seed: Some(1),
        tick_limit: Some(12),
        ..Default::default()
    };
    let mut sim = Simulator::new(&config, Chat::factory_with(log.clone()), Console::scripted(""));
    sim.boot(2);

    let script = script::parse("0 send 1 hello\nTIME\nTIME\n").unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::TickLimit);
    assert_eq!(sim.in_transit_len(), 1);
    assert!(log.lock().unwrap().is_empty());
}
