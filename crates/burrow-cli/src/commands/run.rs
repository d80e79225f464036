//! `burrow run` — run a command inside an image.

use anyhow::Context;
use burrow_common::config::BurrowConfig;
use burrow_common::constants::FALLBACK_EXIT_CODE;
use burrow_common::types::ImageReference;
use burrow_core::isolation::HostIsolation;
use burrow_image::registry::RegistryClient;
use burrow_runtime::launcher::{LaunchRequest, Launcher};
use clap::Args;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image to populate the root from (e.g. `alpine`).
    pub image: String,

    /// Command to execute inside the image.
    pub command: String,

    /// Arguments passed to the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the `run` command and returns the exit status to use.
///
/// The status is the child's own exit code, or `1` if the launch failed
/// before or while spawning the child.
pub fn execute(args: RunArgs, config: BurrowConfig) -> u8 {
    match launch(args, config) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "launch failed");
            #[allow(clippy::print_stderr)]
            {
                eprintln!("burrow: {e:#}");
            }
            FALLBACK_EXIT_CODE
        }
    }
}

fn launch(args: RunArgs, config: BurrowConfig) -> anyhow::Result<u8> {
    let image = ImageReference::parse(&args.image).context("invalid image reference")?;
    let registry =
        RegistryClient::new(config.registry).context("failed to configure registry client")?;

    let mut launcher = Launcher::new(HostIsolation, registry, config.staging_parent);
    let request = LaunchRequest {
        image: Some(image),
        command: args.command,
        args: args.args,
    };

    let report = launcher
        .launch(&request)
        .map_err(|e| anyhow::anyhow!("{} error: {e}", e.kind()))
        .with_context(|| format!("launch {} stopped at {}", launcher.run_id(), launcher.state()))?;

    Ok(report.outcome.exit_code())
}
