//! The tick loop: gathers candidate events, lets the failure controller
//! filter and order them, and dispatches node callbacks.

use crate::command;
use crate::console::Console;
use crate::events::{Event, Timeout};
use crate::failure::{FailureController, FailureLevel, SimConfig};
use crate::logging;
use crate::node::{Crashed, Node, NodeFactory};
use crate::node_table::{NodeState, NodeTable};
use crate::packet::{Address, Packet};
use crate::runtime::Runtime;
use std::collections::{HashSet, VecDeque};
use std::ops::ControlFlow;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// An Exit event executed.
    Exited,
    /// Script mode drained its script, in-transit queue, and timeouts.
    Drained,
    /// The configured tick limit was reached.
    TickLimit,
}

/// Owns all simulation state and drives the per-tick pipeline.
///
/// Script mode resolves in-transit packets, drains the script to the next
/// `TIME` marker, resolves crashes and timeouts, then executes the round.
/// Interactive mode prompts for the round first and resolves crashes before
/// in-transit packets, so the user sees pending messages before choosing
/// what to do with them. The two orders differ on purpose; do not unify
/// them.
pub struct Simulator {
    clock: u64,
    tick_limit: Option<u64>,
    table: NodeTable,
    in_transit: Vec<Packet>,
    waiting_timeouts: Vec<Timeout>,
    /// Owners failed during the current tick; guards Timeout events that
    /// resolved into the round before the failure executed.
    canceled_owners: HashSet<Address>,
    next_timeout_id: u64,
    controller: FailureController,
    console: Console,
    factory: NodeFactory,
}

impl Simulator {
    pub fn new(config: &SimConfig, factory: NodeFactory, console: Console) -> Self {
        let controller = FailureController::new(config);
        let mut console = console;
        if config.level != FailureLevel::Everything {
            console.println(format!(
                "Starting simulation with seed: {}",
                controller.seed()
            ));
        }
        Self {
            clock: 0,
            tick_limit: config.tick_limit,
            table: NodeTable::new(),
            in_transit: Vec::new(),
            waiting_timeouts: Vec::new(),
            canceled_owners: HashSet::new(),
            next_timeout_id: 0,
            controller,
            console,
            factory,
        }
    }

    /// The current tick.
    pub fn now(&self) -> u64 {
        self.clock
    }

    /// The seed driving this run's failure decisions.
    pub fn seed(&self) -> u64 {
        self.controller.seed()
    }

    pub fn node_state(&self, addr: Address) -> NodeState {
        self.table.state(addr)
    }

    pub fn live_addresses(&self) -> Vec<Address> {
        self.table.live_addresses()
    }

    pub fn crashed_addresses(&self) -> Vec<Address> {
        self.table.crashed_addresses()
    }

    /// How many node instances were ever constructed for brand-new
    /// addresses.
    pub fn nodes_created(&self) -> u64 {
        self.table.created()
    }

    pub fn in_transit_len(&self) -> usize {
        self.in_transit.len()
    }

    pub fn waiting_timeout_count(&self) -> usize {
        self.waiting_timeouts.len()
    }

    /// Starts nodes at addresses `0..count` before the clock moves.
    pub fn boot(&mut self, count: u8) {
        for addr in 0..count {
            self.start_node(Address::new(addr));
        }
    }

    /// Runs a pre-parsed command script to completion.
    ///
    /// The loop ends when the script, the in-transit queue, and the waiting
    /// timeouts are all drained, when an Exit event executes, or when the
    /// tick limit is hit.
    pub fn run_script(&mut self, script: Vec<Event>) -> Outcome {
        let mut script: VecDeque<Event> = script.into();
        while !(script.is_empty() && self.in_transit.is_empty() && self.waiting_timeouts.is_empty())
        {
            if self.tick_limit_reached() {
                self.report();
                return Outcome::TickLimit;
            }
            self.console.println(format!("\nTime: {}", self.clock));
            self.canceled_owners.clear();
            let mut round: Vec<Event> = Vec::new();

            self.resolve_in_transit(&mut round);

            // Drain the script up to the next tick boundary.
            loop {
                match script.pop_front() {
                    None | Some(Event::TimeAdvance) => break,
                    Some(event) => round.push(event),
                }
            }

            self.resolve_crashes(&mut round);
            self.resolve_timeouts(&mut round);
            if self.execute(round).is_break() {
                return Outcome::Exited;
            }
            self.clock += 1;
        }
        self.report();
        Outcome::Drained
    }

    /// Runs interactively until an Exit event (or end of console input).
    pub fn run_interactive(&mut self) -> Outcome {
        loop {
            if self.tick_limit_reached() {
                self.report();
                return Outcome::TickLimit;
            }
            self.console.println(format!("\nTime: {}", self.clock));
            self.canceled_owners.clear();
            let mut round: Vec<Event> = Vec::new();

            self.console.println(
                "Please input a sequence of commands terminated by a blank line or the TIME command:",
            );
            loop {
                let Some(line) = self.console.read_line() else {
                    // End of input: there is nobody left to ask.
                    round.push(Event::Exit);
                    break;
                };
                match command::parse_line(&line) {
                    Ok(None) | Ok(Some(Event::TimeAdvance)) => break,
                    Ok(Some(event)) => round.push(event),
                    Err(e) => self.console.println(format!("{e}")),
                }
            }

            self.resolve_crashes(&mut round);
            self.resolve_in_transit(&mut round);
            self.resolve_timeouts(&mut round);
            if self.execute(round).is_break() {
                return Outcome::Exited;
            }
            self.clock += 1;
        }
    }

    fn tick_limit_reached(&self) -> bool {
        self.tick_limit.is_some_and(|limit| self.clock >= limit)
    }

    /// Swaps out the in-transit queue and lets the controller sort it into
    /// deliveries, delays, and drops.
    fn resolve_in_transit(&mut self, round: &mut Vec<Event>) {
        if self.in_transit.is_empty() {
            return;
        }
        let packets = std::mem::take(&mut self.in_transit);
        let outcome = self.controller.resolve_in_transit(packets, &mut self.console);
        self.in_transit.extend(outcome.delayed);
        round.extend(
            outcome
                .deliver
                .into_iter()
                .map(|packet| Event::Delivery { packet }),
        );
    }

    fn resolve_crashes(&mut self, round: &mut Vec<Event>) {
        let live = self.table.live_addresses();
        let crashed = self.table.crashed_addresses();
        let outcome = self
            .controller
            .resolve_crashes(&live, &crashed, &mut self.console);
        round.extend(outcome.fail.into_iter().map(|node| Event::Failure { node }));
        round.extend(outcome.start.into_iter().map(|node| Event::Start { node }));
    }

    /// Moves every waiting timeout that has come due into the round.
    /// Cancelled timeouts never reach this point: failing a node removes
    /// its timeouts from the waiting set outright.
    fn resolve_timeouts(&mut self, round: &mut Vec<Event>) {
        let now = self.clock;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.waiting_timeouts)
            .into_iter()
            .partition(|timeout| timeout.fire_tick <= now);
        self.waiting_timeouts = waiting;
        debug_assert!(self
            .waiting_timeouts
            .iter()
            .all(|timeout| timeout.fire_tick > now));
        round.extend(due.into_iter().map(|timeout| Event::Timeout { timeout }));
    }

    /// Orders the round and dispatches each event. Breaks on Exit.
    fn execute(&mut self, round: Vec<Event>) -> ControlFlow<()> {
        let ordered = self.controller.order_events(round, &mut self.console);
        let announce = self.controller.level() != FailureLevel::Everything;
        if announce && !ordered.is_empty() {
            self.console.println("Executing with order:");
        }
        for event in ordered {
            if announce {
                self.console.println(format!("{event}"));
            }
            self.handle_event(event)?;
        }
        self.debug_check_invariants();
        ControlFlow::Continue(())
    }

    fn handle_event(&mut self, event: Event) -> ControlFlow<()> {
        match event {
            Event::TimeAdvance => {
                tracing::error!("a time-advance marker reached the execute phase");
            }
            Event::Failure { node } => {
                self.fail_node(node);
            }
            Event::Start { node } => self.start_node(node),
            Event::Exit => {
                self.report();
                return ControlFlow::Break(());
            }
            Event::Echo { message } => self.console.println(message),
            Event::Command { node, command } => self.dispatch_command(node, &command),
            Event::Delivery { packet } => self.dispatch_delivery(packet),
            Event::Timeout { timeout } => self.dispatch_timeout(timeout),
        }
        ControlFlow::Continue(())
    }

    fn dispatch_command(&mut self, addr: Address, command: &str) {
        match self.table.state(addr) {
            NodeState::Absent => {
                tracing::error!(node = %addr, "command for an address with no node");
            }
            // A crashed node takes no commands.
            NodeState::Crashed => {}
            NodeState::Live => self.dispatch(addr, |node, rt| node.on_command(rt, command)),
        }
    }

    fn dispatch_delivery(&mut self, packet: Packet) {
        match self.table.state(packet.dest) {
            NodeState::Absent => {
                tracing::error!(node = %packet.dest, "delivery for an address with no node");
            }
            // A crashed node has no I/O; the packet is lost.
            NodeState::Crashed => {}
            NodeState::Live => {
                logging::deliver_packet_event(&packet);
                let Packet {
                    src,
                    dest,
                    protocol,
                    payload,
                } = packet;
                self.dispatch(dest, move |node, rt| {
                    node.on_receive(rt, src, protocol, payload)
                });
            }
        }
    }

    fn dispatch_timeout(&mut self, timeout: Timeout) {
        // The owner may have failed earlier in this same round, possibly
        // restarting afterwards; either way the timeout died with it.
        if self.canceled_owners.contains(&timeout.addr) {
            return;
        }
        if !self.table.is_live(timeout.addr) {
            return;
        }
        self.dispatch(timeout.addr, move |node, rt| {
            node.on_timeout(rt, timeout.payload)
        });
    }

    /// Detaches a live node, runs one callback against it, and either puts
    /// it back or completes its crash. The crash sentinel stops at this
    /// boundary.
    fn dispatch<F>(&mut self, addr: Address, callback: F)
    where
        F: FnOnce(&mut dyn Node, &mut Runtime) -> Result<(), Crashed>,
    {
        let Some(mut node) = self.table.detach(addr) else {
            return;
        };
        let (result, crash_pending) = {
            let mut rt = Runtime {
                addr,
                now: self.clock,
                crashed: false,
                table: &self.table,
                in_transit: &mut self.in_transit,
                timeouts: &mut self.waiting_timeouts,
                next_timeout_id: &mut self.next_timeout_id,
                controller: &mut self.controller,
                console: &mut self.console,
            };
            let result = callback(node.as_mut(), &mut rt);
            (result, rt.crash_pending())
        };
        if result.is_err() || crash_pending {
            self.crash_detached(addr, node);
        } else {
            self.table.reattach(addr, node);
        }
    }

    /// Fails a node: stop it, move it to the crashed set, and cancel its
    /// timeouts. No-op when the node is not live. Returns the crash signal
    /// captured from `stop()` so in-stack callers can propagate it.
    pub fn fail_node(&mut self, addr: Address) -> Option<Crashed> {
        let node = self.table.detach(addr)?;
        self.crash_detached(addr, node)
    }

    /// The back half of a failure, for a node already out of the table.
    fn crash_detached(&mut self, addr: Address, mut node: Box<dyn Node>) -> Option<Crashed> {
        let captured = {
            let mut rt = Runtime {
                addr,
                now: self.clock,
                crashed: true,
                table: &self.table,
                in_transit: &mut self.in_transit,
                timeouts: &mut self.waiting_timeouts,
                next_timeout_id: &mut self.next_timeout_id,
                controller: &mut self.controller,
                console: &mut self.console,
            };
            node.stop(&mut rt).err()
        };
        self.table.mark_crashed(addr);
        self.cancel_timeouts(addr);
        logging::node_failure_event(addr);
        captured
    }

    /// Cancels every waiting timeout owned by `addr`, permanently, and
    /// records the owner for the rest of the tick.
    fn cancel_timeouts(&mut self, addr: Address) {
        self.waiting_timeouts.retain(|timeout| timeout.addr != addr);
        self.canceled_owners.insert(addr);
    }

    /// Starts a node, crashed or brand new. A live node is failed first.
    pub fn start_node(&mut self, addr: Address) {
        if !addr.is_valid() {
            tracing::error!(node = %addr, "invalid address for start");
            return;
        }
        if self.table.is_live(addr) {
            self.fail_node(addr);
        }

        let node = match (self.factory)(addr) {
            Ok(node) => node,
            Err(e) => {
                tracing::error!(node = %addr, error = %e, "node construction failed");
                // A node that cannot be built ends up crashed.
                self.table.mark_crashed(addr);
                return;
            }
        };

        if !self.table.clear_crashed(addr) {
            self.table.note_created();
        }
        self.table.insert_live(addr, node);
        logging::node_start_event(addr);
        // A crash out of start() is absorbed here like any other; the
        // dispatch boundary finishes the bookkeeping.
        self.dispatch(addr, |node, rt| node.start(rt));
    }

    /// The final report printed when a run ends.
    fn report(&mut self) {
        self.console
            .println(format!("Simulation stopped at time {}", self.clock));
        let live = self.table.live_addresses();
        if !live.is_empty() {
            self.console.println(format!(
                "Live nodes: {}",
                live.iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        let crashed = self.table.crashed_addresses();
        if !crashed.is_empty() {
            self.console.println(format!(
                "Failed nodes: {}",
                crashed
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
    }

    fn debug_check_invariants(&self) {
        debug_assert!(
            self.in_transit.iter().all(|p| !p.dest.is_broadcast()),
            "a broadcast packet is in transit"
        );
        debug_assert!(
            self.waiting_timeouts
                .iter()
                .all(|timeout| self.table.state(timeout.addr) != NodeState::Crashed),
            "a crashed node still owns a waiting timeout"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use std::sync::{Arc, Mutex};

    /// Minimal program: records callbacks, obeys a few commands.
    struct Probe {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Probe {
        fn factory(log: Arc<Mutex<Vec<String>>>) -> NodeFactory {
            Box::new(move |_addr| {
                Ok(Box::new(Probe { log: log.clone() }) as Box<dyn Node>)
            })
        }

        fn note(&self, rt: &Runtime, what: impl AsRef<str>) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}@{} {}", rt.addr(), rt.now(), what.as_ref()));
        }
    }

    impl Node for Probe {
        fn start(&mut self, rt: &mut Runtime) -> Result<(), Crashed> {
            self.note(rt, "start");
            Ok(())
        }

        fn stop(&mut self, rt: &mut Runtime) -> Result<(), Crashed> {
            self.note(rt, "stop");
            Ok(())
        }

        fn on_receive(
            &mut self,
            rt: &mut Runtime,
            src: Address,
            _protocol: u8,
            payload: Message,
        ) -> Result<(), Crashed> {
            self.note(rt, format!("recv {} {}", src, payload.as_text()));
            Ok(())
        }

        fn on_command(&mut self, rt: &mut Runtime, command: &str) -> Result<(), Crashed> {
            self.note(rt, format!("cmd {command}"));
            let mut words = command.split_whitespace();
            match words.next() {
                Some("send") => {
                    let dest = Address::new(words.next().unwrap().parse().unwrap());
                    let text: String = words.collect::<Vec<_>>().join(" ");
                    let _ = rt.send(dest, 0, Message::new(text));
                }
                Some("broadcast") => {
                    let text: String = words.collect::<Vec<_>>().join(" ");
                    let _ = rt.broadcast(0, Message::new(text));
                }
                Some("timeout") => {
                    let delta: u64 = words.next().unwrap().parse().unwrap();
                    let tag: String = words.collect::<Vec<_>>().join(" ");
                    rt.set_timeout(delta, Message::new(tag));
                }
                Some("crash") => return Err(rt.crash()),
                _ => {}
            }
            Ok(())
        }

        fn on_timeout(&mut self, rt: &mut Runtime, payload: Message) -> Result<(), Crashed> {
            self.note(rt, format!("timeout {}", payload.as_text()));
            Ok(())
        }
    }

    fn quiet_sim(config: &SimConfig) -> (Simulator, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sim = Simulator::new(config, Probe::factory(log.clone()), Console::scripted(""));
        (sim, log)
    }

    fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[test]
    fn boot_starts_fresh_nodes() {
        let (mut sim, log) = quiet_sim(&SimConfig::default());
        sim.boot(3);
        assert_eq!(sim.live_addresses().len(), 3);
        assert_eq!(sim.nodes_created(), 3);
        assert_eq!(entries(&log), vec!["0@0 start", "1@0 start", "2@0 start"]);
    }

    #[test]
    fn broadcast_excludes_the_sender() {
        let (mut sim, log) = quiet_sim(&SimConfig::default());
        sim.boot(3);
        let outcome = sim.run_script(vec![
            Event::Command {
                node: Address::new(0),
                command: "broadcast hi".into(),
            },
            Event::TimeAdvance,
        ]);
        assert_eq!(outcome, Outcome::Drained);
        let entries = entries(&log);
        assert!(entries.contains(&"1@1 recv 0 hi".to_string()));
        assert!(entries.contains(&"2@1 recv 0 hi".to_string()));
        assert!(!entries.iter().any(|e| e.starts_with("0@") && e.contains("recv")));
    }

    #[test]
    fn self_crash_inside_a_command() {
        let (mut sim, log) = quiet_sim(&SimConfig::default());
        sim.boot(2);
        sim.run_script(vec![
            Event::Command {
                node: Address::new(1),
                command: "crash".into(),
            },
            Event::TimeAdvance,
        ]);
        assert_eq!(sim.node_state(Address::new(1)), NodeState::Crashed);
        assert!(entries(&log).contains(&"1@0 stop".to_string()));
    }

    #[test]
    fn fail_node_is_a_noop_for_non_live_addresses() {
        let (mut sim, _log) = quiet_sim(&SimConfig::default());
        sim.boot(1);
        assert!(sim.fail_node(Address::new(9)).is_none());
        assert_eq!(sim.node_state(Address::new(9)), NodeState::Absent);
    }

    #[test]
    fn failing_a_node_cancels_its_timeouts() {
        let (mut sim, _log) = quiet_sim(&SimConfig::default());
        sim.boot(1);
        sim.run_script(vec![
            Event::Command {
                node: Address::new(0),
                command: "timeout 10 tag".into(),
            },
            Event::TimeAdvance,
        ]);
        assert_eq!(sim.waiting_timeout_count(), 1);
        sim.fail_node(Address::new(0));
        assert_eq!(sim.waiting_timeout_count(), 0);
    }

    #[test]
    fn restarting_a_live_node_fails_it_first() {
        let (mut sim, log) = quiet_sim(&SimConfig::default());
        sim.boot(1);
        sim.start_node(Address::new(0));
        let entries = entries(&log);
        assert_eq!(entries, vec!["0@0 start", "0@0 stop", "0@0 start"]);
        // The restart passes through the crashed set, so the address still
        // counts as created once.
        assert_eq!(sim.nodes_created(), 1);
    }

    #[test]
    fn factory_failure_leaves_the_node_crashed() {
        let mut calls = 0;
        let factory: NodeFactory = Box::new(move |_addr| {
            calls += 1;
            if calls > 1 {
                Err(crate::node::FactoryError("flaky".into()))
            } else {
                Ok(Box::new(Probe {
                    log: Arc::new(Mutex::new(Vec::new())),
                }) as Box<dyn Node>)
            }
        });
        let mut sim = Simulator::new(&SimConfig::default(), factory, Console::scripted(""));
        sim.boot(1);
        assert_eq!(sim.node_state(Address::new(0)), NodeState::Live);
        sim.start_node(Address::new(1));
        assert_eq!(sim.node_state(Address::new(1)), NodeState::Crashed);
    }

    #[test]
    fn start_rejects_invalid_addresses() {
        let (mut sim, _log) = quiet_sim(&SimConfig::default());
        sim.start_node(Address::BROADCAST);
        assert_eq!(sim.nodes_created(), 0);
    }

    #[test]
    fn tick_limit_stops_an_undrainable_run() {
        let (mut sim, log) = quiet_sim(&SimConfig {
            level: FailureLevel::Delay,
            delay_rate: 1.0,
            seed: Some(1),
            tick_limit: Some(6),
            ..Default::default()
        });
        sim.boot(2);
        let outcome = sim.run_script(vec![
            Event::Command {
                node: Address::new(0),
                command: "send 1 hi".into(),
            },
            Event::TimeAdvance,
        ]);
        assert_eq!(outcome, Outcome::TickLimit);
        assert_eq!(sim.in_transit_len(), 1);
        assert!(!entries(&log).iter().any(|e| e.contains("recv")));
    }
}
