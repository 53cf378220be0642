use crate::programs::chat::{Chat, ChatLog};
use crate::script;
use lockstep_core::{Address, Console, FailureLevel, Outcome, SimConfig, Simulator};

/// Runs an EVERYTHING-mode simulation from a scripted console.
///
/// The user (here, a canned input buffer) reverses the order of two send
/// commands on tick 0, waves both resulting packets through the drop and
/// delay prompts on tick 1, and leaves the deliveries in queue order. The
/// receiver hears "b" before "a".
pub fn everything_order() {
    let log = ChatLog::default();
    let config = SimConfig {
        level: FailureLevel::Everything,
        ..Default::default()
    };
    // Tick 0: crash prompt, then the event permutation.
    // Tick 1: drop list, delay list, crash prompt, then the event order.
    let console = Console::scripted("\n1 0\n\n\n\n\n");
    let mut sim = Simulator::new(&config, Chat::factory_with(log.clone()), console);
    sim.boot(2);

    let script = script::parse("0 send 1 a\n0 send 1 b\nTIME\nTIME\n").unwrap();
    let outcome = sim.run_script(script);

    assert_eq!(outcome, Outcome::Drained);
    let log = log.lock().unwrap();
    let texts: Vec<&str> = log.iter().map(|(_, _, _, text)| text.as_str()).collect();
    assert_eq!(texts, vec!["b", "a"]);
    assert!(log
        .iter()
        .all(|(receiver, tick, src, _)| *receiver == Address::new(1)
            && *tick == 1
            && *src == Address::new(0)));
}

#[cfg(test)]
mod tests {
    #[test]
    fn everything_order() {
        super::everything_order()
    }
}
