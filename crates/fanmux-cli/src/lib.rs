//! fanmux CLI
//!
//! Replays the classic `select` scenarios (two-speed multiplexing, timeout
//! racing, non-blocking polling, cooperative cancellation, fan-in) on top of
//! `fanmux-core` sessions.

pub mod logging;
pub mod output;
pub mod scenarios;
