//! Decides which packets drop or delay, which nodes crash or recover, and
//! what order a round's events execute in.

use crate::console::Console;
use crate::events::Event;
use crate::logging;
use crate::packet::{Address, Packet};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Escalating levels of user control over the failure generator.
///
/// Each level enables one more failure class and takes interactive control
/// of the classes below it: `Crash` moves drop and delay decisions from the
/// RNG to the prompt while crashes stay probabilistic; `Everything` puts the
/// user in charge of every decision, including event order, and disables
/// the RNG entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureLevel {
    Nothing,
    Drop,
    Delay,
    Crash,
    Everything,
}

/// Knobs for a simulation run.
///
/// All rates are probabilities in `[0, 1]`, applied per packet (`drop_rate`,
/// `delay_rate`) or per node per tick (`failure_rate`, `recovery_rate`).
/// A missing `seed` is drawn from entropy and reported at startup. The
/// optional `tick_limit` bounds runs that would otherwise never drain, such
/// as a packet delayed forever.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub level: FailureLevel,
    pub drop_rate: f64,
    pub delay_rate: f64,
    pub failure_rate: f64,
    pub recovery_rate: f64,
    pub seed: Option<u64>,
    pub tick_limit: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            level: FailureLevel::Nothing,
            drop_rate: 0.0,
            delay_rate: 0.0,
            failure_rate: 0.0,
            recovery_rate: 0.0,
            seed: None,
            tick_limit: None,
        }
    }
}

/// What became of the in-transit queue this tick.
#[derive(Debug, Default)]
pub struct InTransitOutcome {
    /// Packets that become Delivery events this tick.
    pub deliver: Vec<Packet>,
    /// Packets returned to the in-transit queue.
    pub delayed: Vec<Packet>,
}

/// Which nodes fail and which recover this tick.
#[derive(Debug, Default)]
pub struct CrashOutcome {
    pub fail: Vec<Address>,
    pub start: Vec<Address>,
}

/// The failure generator: one of four escalating modes, constant for the
/// run.
///
/// All RNG draws happen in a fixed order (packets in queue order, node
/// addresses in ascending order) so that two runs with the same seed make
/// identical decisions.
pub struct FailureController {
    level: FailureLevel,
    drop_rate: f64,
    delay_rate: f64,
    failure_rate: f64,
    recovery_rate: f64,
    seed: u64,
    rng: Option<StdRng>,
}

impl FailureController {
    pub fn new(config: &SimConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        // EVERYTHING mode is fully interactive; the RNG is never consulted.
        let rng = (config.level != FailureLevel::Everything)
            .then(|| StdRng::seed_from_u64(seed));
        Self {
            level: config.level,
            drop_rate: config.drop_rate,
            delay_rate: config.delay_rate,
            failure_rate: config.failure_rate,
            recovery_rate: config.recovery_rate,
            seed,
            rng,
        }
    }

    pub fn level(&self) -> FailureLevel {
        self.level
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn rng(&mut self) -> &mut StdRng {
        self.rng
            .as_mut()
            .expect("the RNG is only absent in EVERYTHING mode")
    }

    /// Splits the tick's in-transit queue into deliveries and packets that
    /// stay in transit. Dropped packets simply disappear.
    pub fn resolve_in_transit(
        &mut self,
        packets: Vec<Packet>,
        console: &mut Console,
    ) -> InTransitOutcome {
        let mut outcome = InTransitOutcome::default();
        if packets.is_empty() {
            return outcome;
        }

        if self.level >= FailureLevel::Crash {
            return self.resolve_in_transit_interactive(packets, console);
        }

        let mut current = packets;
        if self.level >= FailureLevel::Drop {
            let drop_rate = self.drop_rate;
            let rng = self.rng();
            current.retain(|packet| {
                if rng.gen::<f64>() < drop_rate {
                    logging::drop_packet_event(packet);
                    false
                } else {
                    true
                }
            });
        }

        if self.level >= FailureLevel::Delay {
            // The delay test is conditional on not being dropped, so the
            // marginal probabilities the user configured compose: drop 0.5
            // and delay 0.5 means nothing gets through.
            let adjusted = if self.drop_rate < 1.0 {
                self.delay_rate / (1.0 - self.drop_rate)
            } else {
                1.0
            };
            let rng = self.rng();
            for packet in current.drain(..) {
                if rng.gen::<f64>() < adjusted {
                    logging::delay_packet_event(&packet);
                    outcome.delayed.push(packet);
                } else {
                    outcome.deliver.push(packet);
                }
            }
        } else {
            outcome.deliver.append(&mut current);
        }
        outcome
    }

    fn resolve_in_transit_interactive(
        &mut self,
        packets: Vec<Packet>,
        console: &mut Console,
    ) -> InTransitOutcome {
        let mut outcome = InTransitOutcome::default();

        console.println("The following messages are in transit:");
        for (i, packet) in packets.iter().enumerate() {
            console.println(format!("{i}: {packet}"));
        }

        let mut dropped = vec![false; packets.len()];
        for i in prompt_index_list(
            console,
            "Which should be dropped? (space-delimited list or just press enter to drop none)",
            packets.len(),
        ) {
            dropped[i] = true;
        }

        let mut delayed = vec![false; packets.len()];
        // When everything was dropped there is nothing left to delay.
        if !dropped.iter().all(|&d| d) {
            for i in prompt_index_list(
                console,
                "Which should be delayed? (space-delimited list or just press enter to delay none)",
                packets.len(),
            ) {
                delayed[i] = true;
            }
        }

        for (i, packet) in packets.into_iter().enumerate() {
            // A packet listed in both sets is delayed, not dropped.
            if delayed[i] {
                logging::delay_packet_event(&packet);
                outcome.delayed.push(packet);
            } else if dropped[i] {
                logging::drop_packet_event(&packet);
            } else {
                outcome.deliver.push(packet);
            }
        }
        outcome
    }

    /// Which live nodes fail and which crashed nodes come back this tick.
    pub fn resolve_crashes(
        &mut self,
        live: &[Address],
        crashed: &[Address],
        console: &mut Console,
    ) -> CrashOutcome {
        let mut outcome = CrashOutcome::default();
        if self.level < FailureLevel::Crash {
            return outcome;
        }

        if self.level == FailureLevel::Everything {
            if !live.is_empty() {
                console.println(format!("Live nodes: {}", join_addresses(live)));
            }
            if !crashed.is_empty() {
                console.println(format!("Dead nodes: {}", join_addresses(crashed)));
            }
            if !live.is_empty() {
                outcome.fail = prompt_address_list(
                    console,
                    "Crash which nodes? (space-delimited list of addresses or just press enter)",
                );
            }
            if !crashed.is_empty() {
                outcome.start = prompt_address_list(
                    console,
                    "Restart which nodes? (space-delimited list of addresses or just press enter)",
                );
            }
        } else {
            let failure_rate = self.failure_rate;
            let recovery_rate = self.recovery_rate;
            let rng = self.rng();
            for &addr in live {
                if rng.gen::<f64>() < failure_rate {
                    outcome.fail.push(addr);
                }
            }
            for &addr in crashed {
                if rng.gen::<f64>() < recovery_rate {
                    outcome.start.push(addr);
                }
            }
        }
        outcome
    }

    /// Orders a round's events for execution: a random permutation under the
    /// RNG modes, a user-supplied permutation under EVERYTHING.
    pub fn order_events(&mut self, events: Vec<Event>, console: &mut Console) -> Vec<Event> {
        if events.len() < 2 {
            return events;
        }

        if self.level == FailureLevel::Everything {
            loop {
                for (i, event) in events.iter().enumerate() {
                    console.println(format!("{i}: {event}"));
                }
                console.println("In what order should the events happen? (enter for in-order)");
                let Some(line) = console.read_line() else {
                    return events;
                };
                if line.is_empty() {
                    return events;
                }
                match parse_index_list(&line, events.len()) {
                    Ok(order) => {
                        let distinct: HashSet<usize> = order.iter().copied().collect();
                        if order.len() != events.len() || distinct.len() != events.len() {
                            console.println("Not all of the events were specified!");
                            continue;
                        }
                        return order.into_iter().map(|i| events[i].clone()).collect();
                    }
                    Err(bad) => console.println(format!("Bad event index: {bad}")),
                }
            }
        } else {
            let mut events = events;
            let rng = self.rng();
            events.shuffle(rng);
            events
        }
    }

    /// Whether to inject a crash at a node's write barrier.
    pub fn write_crash(
        &mut self,
        addr: Address,
        description: &str,
        console: &mut Console,
    ) -> bool {
        match self.level {
            FailureLevel::Nothing | FailureLevel::Drop | FailureLevel::Delay => false,
            FailureLevel::Crash => {
                let fired = {
                    let failure_rate = self.failure_rate;
                    self.rng().gen::<f64>() < failure_rate
                };
                if fired {
                    tracing::info!(node = %addr, "randomly failing before write");
                }
                fired
            }
            FailureLevel::Everything => {
                console.println(format!("Crash node {addr} before {description}? (y/n)"));
                console
                    .read_line()
                    .map(|line| line.starts_with('y'))
                    .unwrap_or(false)
            }
        }
    }
}

fn join_addresses(addresses: &[Address]) -> String {
    addresses
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Prompts until the user supplies a well-formed (possibly empty) list of
/// indices below `len`.
fn prompt_index_list(console: &mut Console, prompt: &str, len: usize) -> Vec<usize> {
    loop {
        console.println(prompt);
        let Some(line) = console.read_line() else {
            return Vec::new();
        };
        if line.is_empty() {
            return Vec::new();
        }
        match parse_index_list(&line, len) {
            Ok(list) => return list,
            Err(bad) => console.println(format!("Bad index: {bad}")),
        }
    }
}

fn parse_index_list(line: &str, len: usize) -> Result<Vec<usize>, String> {
    line.split_whitespace()
        .map(|token| match token.parse::<usize>() {
            Ok(i) if i < len => Ok(i),
            _ => Err(token.to_owned()),
        })
        .collect()
}

/// Prompts until the user supplies a well-formed (possibly empty) list of
/// node addresses. Addresses that name no node are allowed; the resulting
/// events no-op at dispatch.
fn prompt_address_list(console: &mut Console, prompt: &str) -> Vec<Address> {
    loop {
        console.println(prompt);
        let Some(line) = console.read_line() else {
            return Vec::new();
        };
        if line.is_empty() {
            return Vec::new();
        }
        let parsed: Result<Vec<Address>, &str> = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<u8>()
                    .map(Address::new)
                    .ok()
                    .filter(|a| a.is_valid())
                    .ok_or(token)
            })
            .collect();
        match parsed {
            Ok(list) => return list,
            Err(bad) => console.println(format!("Bad address: {bad}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn packets(n: usize) -> Vec<Packet> {
        (0..n)
            .map(|i| {
                Packet::new(
                    Address::new(0),
                    Address::new(1),
                    0,
                    Message::new(format!("p{i}")),
                )
            })
            .collect()
    }

    fn controller(level: FailureLevel, drop: f64, delay: f64) -> FailureController {
        FailureController::new(&SimConfig {
            level,
            drop_rate: drop,
            delay_rate: delay,
            seed: Some(7),
            ..Default::default()
        })
    }

    #[test]
    fn nothing_mode_delivers_everything() {
        let mut controller = controller(FailureLevel::Nothing, 1.0, 1.0);
        let mut console = Console::scripted("");
        let outcome = controller.resolve_in_transit(packets(4), &mut console);
        assert_eq!(outcome.deliver.len(), 4);
        assert!(outcome.delayed.is_empty());
    }

    #[test]
    fn drop_mode_ignores_delay_rate() {
        let mut controller = controller(FailureLevel::Drop, 0.0, 1.0);
        let mut console = Console::scripted("");
        let outcome = controller.resolve_in_transit(packets(4), &mut console);
        assert_eq!(outcome.deliver.len(), 4);
        assert!(outcome.delayed.is_empty());
    }

    #[test]
    fn certain_drop_removes_everything() {
        let mut controller = controller(FailureLevel::Drop, 1.0, 0.0);
        let mut console = Console::scripted("");
        let outcome = controller.resolve_in_transit(packets(8), &mut console);
        assert!(outcome.deliver.is_empty());
        assert!(outcome.delayed.is_empty());
    }

    #[test]
    fn certain_delay_holds_everything() {
        let mut controller = controller(FailureLevel::Delay, 0.0, 1.0);
        let mut console = Console::scripted("");
        let outcome = controller.resolve_in_transit(packets(8), &mut console);
        assert!(outcome.deliver.is_empty());
        assert_eq!(outcome.delayed.len(), 8);
    }

    #[test]
    fn drop_and_delay_marginals() {
        // With drop 0.3 and delay 0.2 the observed frequencies over many
        // single-packet rounds should approach the configured marginals.
        let mut controller = controller(FailureLevel::Delay, 0.3, 0.2);
        let mut console = Console::scripted("");
        let trials = 10_000;
        let mut dropped = 0;
        let mut delayed = 0;
        for _ in 0..trials {
            let outcome = controller.resolve_in_transit(packets(1), &mut console);
            if outcome.delayed.len() == 1 {
                delayed += 1;
            } else if outcome.deliver.is_empty() {
                dropped += 1;
            }
        }
        let drop_freq = dropped as f64 / trials as f64;
        let delay_freq = delayed as f64 / trials as f64;
        assert!((drop_freq - 0.3).abs() < 0.03, "drop frequency {drop_freq}");
        assert!(
            (delay_freq - 0.2).abs() < 0.03,
            "delay frequency {delay_freq}"
        );
    }

    #[test]
    fn interactive_drop_and_delay_selection() {
        let mut controller = controller(FailureLevel::Crash, 0.0, 0.0);
        let mut console = Console::scripted("0 2\n1\n");
        let outcome = controller.resolve_in_transit(packets(3), &mut console);
        assert!(outcome.deliver.is_empty());
        assert_eq!(outcome.delayed.len(), 1);
        assert_eq!(outcome.delayed[0].payload, Message::new("p1"));
    }

    #[test]
    fn delay_wins_over_drop() {
        let mut controller = controller(FailureLevel::Crash, 0.0, 0.0);
        let mut console = Console::scripted("0\n0\n");
        let outcome = controller.resolve_in_transit(packets(1), &mut console);
        assert!(outcome.deliver.is_empty());
        assert_eq!(outcome.delayed.len(), 1);
    }

    #[test]
    fn dropping_everything_skips_the_delay_prompt() {
        let mut controller = controller(FailureLevel::Crash, 0.0, 0.0);
        // Only one input line: the drop list covering every packet.
        let mut console = Console::scripted("0 1\n");
        let outcome = controller.resolve_in_transit(packets(2), &mut console);
        assert!(outcome.deliver.is_empty());
        assert!(outcome.delayed.is_empty());
    }

    #[test]
    fn malformed_index_lists_reprompt() {
        let mut controller = controller(FailureLevel::Crash, 0.0, 0.0);
        let mut console = Console::scripted("9\nzero\n0\n\n");
        let outcome = controller.resolve_in_transit(packets(2), &mut console);
        assert_eq!(outcome.deliver.len(), 1);
        assert!(outcome.delayed.is_empty());
    }

    #[test]
    fn rng_crash_and_recovery_trials() {
        let mut controller = FailureController::new(&SimConfig {
            level: FailureLevel::Crash,
            failure_rate: 1.0,
            recovery_rate: 1.0,
            seed: Some(3),
            ..Default::default()
        });
        let mut console = Console::scripted("");
        let live = vec![Address::new(0), Address::new(1)];
        let crashed = vec![Address::new(5)];
        let outcome = controller.resolve_crashes(&live, &crashed, &mut console);
        assert_eq!(outcome.fail, live);
        assert_eq!(outcome.start, crashed);
    }

    #[test]
    fn low_levels_never_crash() {
        let mut controller = FailureController::new(&SimConfig {
            level: FailureLevel::Delay,
            failure_rate: 1.0,
            recovery_rate: 1.0,
            seed: Some(3),
            ..Default::default()
        });
        let mut console = Console::scripted("");
        let outcome =
            controller.resolve_crashes(&[Address::new(0)], &[Address::new(1)], &mut console);
        assert!(outcome.fail.is_empty());
        assert!(outcome.start.is_empty());
    }

    #[test]
    fn interactive_crash_selection() {
        let mut controller = controller(FailureLevel::Everything, 0.0, 0.0);
        let mut console = Console::scripted("1\n5\n");
        let outcome = controller.resolve_crashes(
            &[Address::new(0), Address::new(1)],
            &[Address::new(5)],
            &mut console,
        );
        assert_eq!(outcome.fail, vec![Address::new(1)]);
        assert_eq!(outcome.start, vec![Address::new(5)]);
    }

    #[test]
    fn user_permutation_is_applied() {
        let mut controller = controller(FailureLevel::Everything, 0.0, 0.0);
        let mut console = Console::scripted("2 0 1\n");
        let events = vec![
            Event::Echo { message: "a".into() },
            Event::Echo { message: "b".into() },
            Event::Echo { message: "c".into() },
        ];
        let ordered = controller.order_events(events, &mut console);
        let texts: Vec<_> = ordered
            .into_iter()
            .map(|event| match event {
                Event::Echo { message } => message,
                other => panic!("unexpected event: {other}"),
            })
            .collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
    }

    #[test]
    fn non_permutations_reprompt() {
        let mut controller = controller(FailureLevel::Everything, 0.0, 0.0);
        // A duplicate list, then a short list, then a valid permutation.
        let mut console = Console::scripted("0 0\n1\n1 0\n");
        let events = vec![
            Event::Echo { message: "a".into() },
            Event::Echo { message: "b".into() },
        ];
        let ordered = controller.order_events(events, &mut console);
        match &ordered[0] {
            Event::Echo { message } => assert_eq!(message, "b"),
            other => panic!("unexpected event: {other}"),
        }
    }

    #[test]
    fn empty_order_means_in_order() {
        let mut controller = controller(FailureLevel::Everything, 0.0, 0.0);
        let mut console = Console::scripted("\n");
        let events = vec![
            Event::Echo { message: "a".into() },
            Event::Echo { message: "b".into() },
        ];
        let ordered = controller.order_events(events, &mut console);
        match &ordered[0] {
            Event::Echo { message } => assert_eq!(message, "a"),
            other => panic!("unexpected event: {other}"),
        }
    }

    #[test]
    fn write_crash_by_level() {
        let mut console = Console::scripted("");
        let mut low = controller(FailureLevel::Delay, 0.0, 0.0);
        assert!(!low.write_crash(Address::new(0), "append", &mut console));

        let mut certain = FailureController::new(&SimConfig {
            level: FailureLevel::Crash,
            failure_rate: 1.0,
            seed: Some(1),
            ..Default::default()
        });
        assert!(certain.write_crash(Address::new(0), "append", &mut console));

        let mut interactive = controller(FailureLevel::Everything, 0.0, 0.0);
        let mut yes = Console::scripted("y\n");
        assert!(interactive.write_crash(Address::new(0), "append", &mut yes));
        let mut no = Console::scripted("n\n");
        assert!(!interactive.write_crash(Address::new(0), "append", &mut no));
    }

    #[test]
    fn identical_seeds_make_identical_decisions() {
        let run = |seed: u64| {
            let mut controller = FailureController::new(&SimConfig {
                level: FailureLevel::Delay,
                drop_rate: 0.4,
                delay_rate: 0.3,
                seed: Some(seed),
                ..Default::default()
            });
            let mut console = Console::scripted("");
            let outcome = controller.resolve_in_transit(packets(64), &mut console);
            (
                outcome
                    .deliver
                    .iter()
                    .map(|p| p.payload.to_string())
                    .collect::<Vec<_>>(),
                outcome
                    .delayed
                    .iter()
                    .map(|p| p.payload.to_string())
                    .collect::<Vec<_>>(),
            )
        };
        assert_eq!(run(11), run(11));
    }
}
