//! Command-line interface definition for `cadlink`.

use clap::{Parser, Subcommand};

use cadlink_config::EngineKind;

/// Command-line interface for driving cadlink engines through the gateway
/// client.
#[derive(Parser, Debug)]
#[command(
    name = "cadlink",
    about = "Send commands to cadlink engines",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Structured subcommands.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Sends one command and prints the engine's response.
    Call {
        /// Target engine (`mesh` or `solid`).
        engine: EngineKind,
        /// Method to invoke, for example `create_box`.
        method: String,
        /// Method parameters as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
        /// Print the HTTP status and body the gateway would reply with.
        #[arg(long)]
        http: bool,
    },
    /// Probes an engine with `ping` and `get_version`.
    Health {
        /// Target engine (`mesh` or `solid`).
        engine: EngineKind,
    },
}
