use crate::programs::chat::{Chat, ChatLog};
use crate::script;
use lockstep_core::{Address, Console, FailureLevel, Outcome, SimConfig, Simulator};

/// Runs a basic simulation.
///
/// One chat node sends a greeting to another over a lossless network. The
/// packet goes in transit on tick 0 and arrives on tick 1.
pub fn basic() {
    let log = ChatLog::default();
    let config = SimConfig {
        level: FailureLevel::Drop,
        drop_rate: 0.0,
        seed: Some(1),
        ..Default::default()
    };
    let mut sim = Simulator::new(&config, Chat::factory_with(log.clone()), Console::scripted(""));
    sim.boot(2);

    let script = script::parse("0 send 1 hello\nTIME\nTIME\n").unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::Drained);
    let log = log.lock().unwrap();
    assert_eq!(
        *log,
        vec![(Address::new(1), 1, Address::new(0), "hello".to_string())]
    );
}

#[cfg(test)]
mod tests {
    #[test]
    fn basic() {
        super::basic()
    }
}
