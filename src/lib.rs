//! PIN based application lock for a personal diary and habit tracker.
//! [gate::SecurityGate] holds the lock state machine, [storage] keeps the PIN and the lock policy
//! between runs and [session] drives a gate from environment signals and a periodic idle check.

pub mod cli;
pub mod gate;
pub mod session;
pub mod storage;
pub mod utils;
