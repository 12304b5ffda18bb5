//! Runtime for the `cadlink` command-line client.
//!
//! The binary loads a [`cadlink_config::GatewayConfig`], builds a
//! [`GatewayClient`] and sends one command through it, exactly as an HTTP
//! handler in the gateway would. Responses are printed as single-line JSON on
//! stdout; failures go to stderr and produce a non-zero exit code.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use serde_json::Value;

use cadlink_gateway::GatewayClient;
use cadlink_gateway::translate::http::http_reply;
use cadlink_protocol::Params;

mod cli;
mod config;
mod errors;
mod telemetry;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, split_arguments};
use errors::AppError;

/// Runs the CLI with the provided arguments and output streams.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(args: I, stdout: &mut W, stderr: &mut E, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let split = split_arguments(&args);

    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return match write!(stdout, "{}", error.render()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    let outcome = loader.load(&split.config_arguments).and_then(|config| {
        telemetry::initialise(&config)?;
        execute(cli.command, &GatewayClient::new(config), stdout)
    });
    match outcome {
        Ok(code) => code,
        Err(error) => report(stderr, &error),
    }
}

fn execute<W: Write>(
    command: CliCommand,
    client: &GatewayClient,
    stdout: &mut W,
) -> Result<ExitCode, AppError> {
    match command {
        CliCommand::Call {
            engine,
            method,
            params,
            http,
        } => {
            let params = parse_params(&params)?;
            let outcome = client.send_command(engine, &method, params);
            if http {
                let reply = http_reply(&outcome);
                emit(stdout, &reply)?;
                return Ok(exit_code(reply.status < 400));
            }
            let response = outcome?;
            emit(stdout, &response)?;
            Ok(exit_code(response.is_success()))
        }
        CliCommand::Health { engine } => {
            let health = client.health(engine);
            emit(stdout, &health)?;
            Ok(exit_code(health.is_healthy()))
        }
    }
}

fn parse_params(text: &str) -> Result<Params, AppError> {
    match serde_json::from_str(text).map_err(AppError::ParseParams)? {
        Value::Object(params) => Ok(params),
        _ => Err(AppError::ParamsNotObject),
    }
}

fn emit<W: Write, T: serde::Serialize>(stdout: &mut W, value: &T) -> Result<(), AppError> {
    let line = serde_json::to_string(value).map_err(AppError::Serialise)?;
    writeln!(stdout, "{line}").map_err(AppError::Emit)
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    if writeln!(stderr, "cadlink: {error}").is_err() {
        return ExitCode::from(2);
    }
    ExitCode::FAILURE
}
