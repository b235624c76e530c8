//! Binary entry point for the biolinux CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use biolinux::{
    CloudmanError, CloudmanOptions, DryRunExecutor, InstallError, InstallOrchestrator, Phase,
    ProcessCommandRunner, RemoteExecutor, RunEnvironment, SshExecutor,
};

mod cli;

use cli::{Cli, CloudmanOptionsCommand, Command, FlavorArgs, TargetArg};

const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";
const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("install failed: {0}")]
    Install(#[from] InstallError),
    #[error("cloudman error: {0}")]
    Cloudman(#[from] CloudmanError),
    #[error("failed to write output: {0}")]
    Output(String),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Install(args) => {
            let env = load_environment(cli.host, &args.flavor)?;
            let target = args.target.map(phase_for);
            with_orchestrator(&env, cli.dry_run, |orchestrator| orchestrator.install(target))
        }
        Command::InstallCustom(args) => {
            let env = load_environment(cli.host, &args.flavor)?;
            with_orchestrator(&env, cli.dry_run, |orchestrator| {
                orchestrator.install_custom(&args.name)
            })
        }
        Command::InstallChefRecipe(args) => {
            let env = load_environment(cli.host, &args.flavor)?;
            with_orchestrator(&env, cli.dry_run, |orchestrator| {
                orchestrator.install_chef_recipes(&args.recipes)
            })
        }
        Command::InstallLibraries(args) => {
            let env = load_environment(cli.host, &args.flavor)?;
            with_orchestrator(&env, cli.dry_run, |orchestrator| {
                orchestrator.install_libraries(&args.language)
            })
        }
        Command::CloudmanLaunchSpec(args) => cloudman_launch_spec(&args, io::stdout()),
        Command::CloudmanBundle(args) => cloudman_bundle(&args, io::stdout()),
    }
}

fn load_environment(host: Option<String>, flavor: &FlavorArgs) -> Result<RunEnvironment, CliError> {
    let mut env =
        RunEnvironment::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    apply_overrides(&mut env, host, flavor.flavor.clone());
    Ok(env)
}

fn apply_overrides(env: &mut RunEnvironment, host: Option<String>, flavor: Option<String>) {
    if let Some(value) = host {
        env.host = value;
    }
    if flavor.is_some() {
        env.flavor = flavor;
    }
}

const fn phase_for(target: TargetArg) -> Phase {
    match target {
        TargetArg::Packages => Phase::Packages,
        TargetArg::Custom => Phase::Custom,
        TargetArg::ChefRecipes => Phase::ChefRecipes,
        TargetArg::Libraries => Phase::Libraries,
        TargetArg::PostInstall => Phase::PostInstall,
        TargetArg::Cleanup => Phase::Cleanup,
    }
}

fn with_orchestrator(
    env: &RunEnvironment,
    dry_run: bool,
    action: impl FnOnce(&InstallOrchestrator<'_>) -> Result<(), InstallError>,
) -> Result<(), CliError> {
    env.validate().map_err(InstallError::from)?;
    let ssh;
    let executor: &dyn RemoteExecutor = if dry_run {
        &DryRunExecutor
    } else {
        ssh = SshExecutor::with_process_runner(env.ssh_target()).map_err(InstallError::from)?;
        &ssh
    };
    let orchestrator = InstallOrchestrator::new(env, executor)?;
    action(&orchestrator).map_err(CliError::from)
}

fn credential(configured: Option<&String>, env_var: &str, key: &str) -> Result<String, CliError> {
    configured
        .cloned()
        .or_else(|| std::env::var(env_var).ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            CliError::Config(format!(
                "missing {key}: set {env_var} or add {key} to the options file"
            ))
        })
}

fn cloudman_launch_spec(
    args: &CloudmanOptionsCommand,
    mut out: impl Write,
) -> Result<(), CliError> {
    let options = CloudmanOptions::load(&Utf8PathBuf::from(&args.options))?;
    let access_key = credential(options.access_key.as_ref(), ACCESS_KEY_ENV, "access_key")?;
    let secret_key = credential(options.secret_key.as_ref(), SECRET_KEY_ENV, "secret_key")?;
    let spec = options.launch_spec(&access_key, &secret_key)?;
    let rendered =
        serde_yaml::to_string(&spec).map_err(|err| CliError::Output(err.to_string()))?;
    out.write_all(rendered.as_bytes())
        .map_err(|err| CliError::Output(err.to_string()))
}

fn cloudman_bundle(
    args: &CloudmanOptionsCommand,
    mut out: impl Write,
) -> Result<(), CliError> {
    let options = CloudmanOptions::load(&Utf8PathBuf::from(&args.options))?;
    let archive = options.bundle(&ProcessCommandRunner)?;
    writeln!(out, "{archive}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
