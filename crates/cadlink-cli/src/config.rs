//! Configuration loading for the CLI.
//!
//! Gateway settings are ordinary `ortho_config` flags, so they have to be
//! separated from the subcommand before either parser sees the arguments.
//! Configuration flags must come first: `cadlink --pool-size 2 call mesh ping`.

use std::ffi::{OsStr, OsString};

use cadlink_config::GatewayConfig;
use ortho_config::OrthoConfig;

use crate::errors::AppError;

/// Flags understood by the configuration loader.
///
/// Keep in sync with the fields of [`GatewayConfig`].
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--mesh-endpoint",
    "--solid-endpoint",
    "--pool-size",
    "--command-timeout-ms",
    "--connect-timeout-ms",
    "--acquire-timeout-ms",
    "--retry-attempts",
    "--retry-delay-ms",
    "--max-idle-secs",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads the gateway configuration from the filtered arguments.
    fn load(&self, args: &[OsString]) -> Result<GatewayConfig, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<GatewayConfig, AppError> {
        GatewayConfig::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments split into the configuration part and the command part.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

/// Splits leading configuration flags from the subcommand. Both halves keep
/// the program name as their first element.
pub(crate) fn split_arguments(args: &[OsString]) -> ArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ArgumentSplit::default();
    };
    let mut config_arguments = vec![program.clone()];
    let mut remaining = rest.iter();
    let mut command_arguments = vec![program.clone()];
    while let Some(argument) = remaining.next() {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                if needs_value && let Some(value) = remaining.next() {
                    config_arguments.push(value.clone());
                }
            }
            FlagAction::Stop => {
                command_arguments.push(argument.clone());
                command_arguments.extend(remaining.cloned());
                break;
            }
        }
    }
    ArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case("--log-filter", FlagAction::Include { needs_value: true })]
    #[case("call", FlagAction::Stop)]
    #[case("--params", FlagAction::Stop)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify(OsStr::new(argument)), expected);
    }

    #[rstest]
    fn leading_configuration_flags_are_separated() {
        let split = split_arguments(&os(&[
            "cadlink",
            "--pool-size",
            "2",
            "--retry-delay-ms=10",
            "call",
            "solid",
            "create_box",
            "--params",
            "{}",
        ]));
        assert_eq!(
            split.config_arguments,
            os(&["cadlink", "--pool-size", "2", "--retry-delay-ms=10"])
        );
        assert_eq!(
            split.command_arguments,
            os(&["cadlink", "call", "solid", "create_box", "--params", "{}"])
        );
    }

    #[rstest]
    fn leading_flags_reach_the_gateway_configuration() {
        let split = split_arguments(&os(&[
            "cadlink",
            "--pool-size",
            "2",
            "--retry-attempts=4",
            "health",
            "mesh",
        ]));
        let config = OrthoConfigLoader
            .load(&split.config_arguments)
            .expect("configuration loads");
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.retry_attempts, 4);
    }

    #[rstest]
    fn flags_after_the_subcommand_stay_with_it() {
        let split = split_arguments(&os(&["cadlink", "health", "mesh", "--pool-size", "2"]));
        assert_eq!(split.config_arguments, os(&["cadlink"]));
        assert_eq!(
            split.command_arguments,
            os(&["cadlink", "health", "mesh", "--pool-size", "2"])
        );
    }
}
