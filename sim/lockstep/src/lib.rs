//! The lockstep binary crate: command-line driver, command-file loading,
//! and a library of example node programs with runnable simulations.

pub mod cli;
pub mod programs;
pub mod script;
pub mod simulations;
