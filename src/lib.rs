//! Control core for a small two-motor robot with a claw and a launcher.
//!
//! Reads sensors, takes line-based commands from an operator link, drives the
//! motors under an obstacle interlock, runs timed servo sequences and writes
//! one telemetry line per cycle.

pub mod clock;
pub mod config;
pub mod decoder;
pub mod hw;
pub mod link;
pub mod messages;
pub mod motion;
pub mod runtime;
