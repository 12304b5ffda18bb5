//! Test suites for the engine process.

mod engine_behaviour;
mod process_behaviour;
mod support;
