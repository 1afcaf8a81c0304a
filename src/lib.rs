//! Wayfarer: a deterministic top-down world simulation core.
//!
//! The workspace crates provide the pieces (terrain, exploration, streaming,
//! collision, AI, wire protocol); this crate wires them into a tick-driven
//! [`simulation::Simulation`] with background persistence and a headless runner.

pub mod config;
pub mod headless;
pub mod input;
pub mod scripted_input;
pub mod simulation;
pub mod sync;
