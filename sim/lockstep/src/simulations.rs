//! Runnable example simulations.
//!
//! Each function builds a simulator, drives it with a command script (and,
//! for the interactive failure modes, a scripted console), and asserts on
//! what the node programs observed. The test wrappers run every simulation
//! under `cargo test`.

pub mod basic;
pub mod broadcast_fanout;
pub mod delay_forever;
pub mod drop_all;
pub mod everything_order;
pub mod heartbeat_crash;
pub mod journal_barrier;
pub mod ping_pong_volley;
pub mod restart;
