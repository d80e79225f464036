//! CLI command definitions and dispatch.

pub mod run;

use std::path::PathBuf;

use burrow_common::config::{BurrowConfig, RegistryConfig};
use burrow_common::constants::FALLBACK_EXIT_CODE;
use clap::{Parser, Subcommand};

/// Burrow — run a command inside a registry image, isolated from the host.
#[derive(Parser, Debug)]
#[command(name = "burrow", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Registry API base URL.
    #[arg(long, global = true, env = "BURROW_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Token endpoint URL.
    #[arg(long, global = true, env = "BURROW_AUTH_URL")]
    pub auth_url: Option<String>,

    /// Service name sent to the token endpoint.
    #[arg(long, global = true, env = "BURROW_AUTH_SERVICE")]
    pub auth_service: Option<String>,

    /// Directory in which staging roots are created.
    #[arg(long, global = true, env = "BURROW_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,
}

impl Cli {
    /// Builds the launch configuration from defaults and overrides.
    #[must_use]
    pub fn config(&self) -> BurrowConfig {
        let defaults = RegistryConfig::default();
        BurrowConfig {
            registry: RegistryConfig {
                registry_url: self.registry_url.clone().unwrap_or(defaults.registry_url),
                auth_url: self.auth_url.clone().unwrap_or(defaults.auth_url),
                service: self.auth_service.clone().unwrap_or(defaults.service),
                ..defaults
            },
            staging_parent: self.staging_dir.clone(),
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command inside an image.
    Run(run::RunArgs),
}

/// Dispatches the parsed CLI command and returns the process exit status.
pub fn execute(cli: Cli) -> u8 {
    let config = cli.config();
    match cli.command {
        Command::Run(args) => run::execute(args, config),
    }
}

/// Maps a clap parse outcome to the process exit status.
///
/// `--help` and `--version` succeed; usage errors fail like any other
/// launch failure.
#[must_use]
pub fn parse_failure_status(err: &clap::Error) -> u8 {
    if err.use_stderr() {
        FALLBACK_EXIT_CODE
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_collects_trailing_arguments_verbatim() {
        let cli = Cli::try_parse_from(["burrow", "run", "alpine", "/bin/sh", "-c", "exit 3"])
            .expect("parse failed");
        let Command::Run(args) = cli.command;
        assert_eq!(args.image, "alpine");
        assert_eq!(args.command, "/bin/sh");
        assert_eq!(args.args, vec!["-c", "exit 3"]);
    }

    #[test]
    fn run_requires_image_and_command() {
        assert!(Cli::try_parse_from(["burrow", "run"]).is_err());
        assert!(Cli::try_parse_from(["burrow", "run", "alpine"]).is_err());
    }

    #[test]
    fn overrides_replace_registry_defaults() {
        let cli = Cli::try_parse_from([
            "burrow",
            "--registry-url",
            "http://127.0.0.1:5000/v2",
            "--staging-dir",
            "/var/tmp",
            "run",
            "alpine",
            "/bin/echo",
        ])
        .expect("parse failed");
        let config = cli.config();
        assert_eq!(config.registry.registry_url, "http://127.0.0.1:5000/v2");
        assert_eq!(config.registry.auth_url, RegistryConfig::default().auth_url);
        assert_eq!(config.staging_parent, Some(PathBuf::from("/var/tmp")));
    }

    #[test]
    fn usage_errors_map_to_fallback_status() {
        let err = Cli::try_parse_from(["burrow", "run"]).expect_err("must fail");
        assert_eq!(parse_failure_status(&err), FALLBACK_EXIT_CODE);

        let err = Cli::try_parse_from(["burrow", "launch"]).expect_err("must fail");
        assert_eq!(parse_failure_status(&err), FALLBACK_EXIT_CODE);
    }

    #[test]
    fn help_and_version_exit_cleanly() {
        let err = Cli::try_parse_from(["burrow", "--help"]).expect_err("help short-circuits");
        assert_eq!(parse_failure_status(&err), 0);

        let err = Cli::try_parse_from(["burrow", "--version"]).expect_err("version short-circuits");
        assert_eq!(parse_failure_status(&err), 0);
    }
}
