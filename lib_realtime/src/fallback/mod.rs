//! Degraded-mode delivery: periodic pulls standing in for the push channel.

pub mod polling;
