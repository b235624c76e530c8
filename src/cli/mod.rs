//! Command-line interface definitions for the `biolinux` binary.
//!
//! The parser structures live here so both the binary and the build script
//! can use them; the build script renders the manual page from them.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Top-level CLI for the `biolinux` binary.
#[derive(Debug, Parser)]
#[command(
    name = "biolinux",
    about = "Install bioinformatics software stacks onto a remote host over SSH",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Target host; overrides `host` from configuration.
    #[arg(short = 'H', long, global = true, value_name = "HOST")]
    pub(crate) host: Option<String>,
    /// Log remote commands instead of running them.
    #[arg(long, global = true)]
    pub(crate) dry_run: bool,
    /// Subcommand to run.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Subcommands of the `biolinux` binary.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run the install phases.
    #[command(name = "install", about = "Run every install phase, or a single one")]
    Install(InstallCommand),
    /// Install one custom program.
    #[command(name = "install-custom", about = "Install a single custom program by name")]
    InstallCustom(InstallCustomCommand),
    /// Converge chef recipes.
    #[command(
        name = "install-chef-recipe",
        about = "Provision one or more chef recipes by name"
    )]
    InstallChefRecipe(InstallChefRecipeCommand),
    /// Install one language's libraries.
    #[command(
        name = "install-libraries",
        about = "Install the libraries configured for one language"
    )]
    InstallLibraries(InstallLibrariesCommand),
    /// Print CloudMan launch parameters.
    #[command(
        name = "cloudman-launch-spec",
        about = "Resolve the image and user data for a CloudMan launch"
    )]
    CloudmanLaunchSpec(CloudmanOptionsCommand),
    /// Pack the CloudMan sources into the bucket.
    #[command(
        name = "cloudman-bundle",
        about = "Pack the CloudMan sources into cm.tar.gz inside bucket_source"
    )]
    CloudmanBundle(CloudmanOptionsCommand),
}

/// Install phases accepted by `--target`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum TargetArg {
    /// Distribution and nix packages.
    Packages,
    /// Custom-built programs.
    Custom,
    /// Chef recipes.
    #[value(name = "chef_recipes", alias = "chef-recipes")]
    ChefRecipes,
    /// Language libraries.
    Libraries,
    /// Flavor post-install steps.
    #[value(name = "post_install", alias = "post-install")]
    PostInstall,
    /// Space cleanup and image preparation.
    Cleanup,
}

/// Flavor selection shared by the install subcommands.
#[derive(Debug, Args)]
pub(crate) struct FlavorArgs {
    /// Flavor name under `<config_dir>/flavor`, or a flavor directory.
    #[arg(long, value_name = "FLAVOR")]
    pub(crate) flavor: Option<String>,
}

/// Arguments for `biolinux install`.
#[derive(Debug, Args)]
pub(crate) struct InstallCommand {
    /// Run only this phase.
    #[arg(long, value_enum, value_name = "PHASE")]
    pub(crate) target: Option<TargetArg>,
    /// Flavor to apply.
    #[command(flatten)]
    pub(crate) flavor: FlavorArgs,
}

/// Arguments for `biolinux install-custom`.
#[derive(Debug, Args)]
pub(crate) struct InstallCustomCommand {
    /// Program name as listed in `custom.yaml`.
    #[arg(value_name = "NAME")]
    pub(crate) name: String,
    /// Flavor to apply.
    #[command(flatten)]
    pub(crate) flavor: FlavorArgs,
}

/// Arguments for `biolinux install-chef-recipe`.
#[derive(Debug, Args)]
pub(crate) struct InstallChefRecipeCommand {
    /// Recipes to add to the run list, in order.
    #[arg(required = true, value_name = "RECIPE")]
    pub(crate) recipes: Vec<String>,
    /// Flavor to apply.
    #[command(flatten)]
    pub(crate) flavor: FlavorArgs,
}

/// Arguments for `biolinux install-libraries`.
#[derive(Debug, Args)]
pub(crate) struct InstallLibrariesCommand {
    /// Language whose libraries to install (`r`, `python`, `ruby`, ...).
    #[arg(value_name = "LANGUAGE")]
    pub(crate) language: String,
    /// Flavor to apply.
    #[command(flatten)]
    pub(crate) flavor: FlavorArgs,
}

/// Arguments for `biolinux cloudman-launch-spec` and `cloudman-bundle`.
#[derive(Debug, Args)]
pub(crate) struct CloudmanOptionsCommand {
    /// YAML file holding the CloudMan options.
    #[arg(value_name = "FILE")]
    pub(crate) options: String,
}
