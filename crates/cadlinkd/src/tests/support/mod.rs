//! Shared harness for the engine behavioural suites.

mod client;
mod config_loader;
mod reporter;
mod shutdown;
mod world;

pub use client::LineClient;
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use shutdown::TestShutdownSignal;
pub use world::{TestWorld, world};
