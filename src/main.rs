use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "monotools",
    version = "0.1.0",
    about = "Split a monorepo into per-package repositories and back",
    long_about = "Keeps a development monorepo and its published per-package \
    repositories in sync, commit for commit: split projects the monorepo \
    history into one history per configured folder, merge folds existing \
    package histories into one monorepo."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "split",
        about = "Split the monorepo into repositories by subfolder",
        long_about = "This command rewrites the monorepo history into one history per \
        configured folder and pushes the results to the configured remotes. \
        Without an argument, all branches matching the configured branch filter \
        are split."
    )]
    Split {
        #[arg(
            index = 1,
            help = "Split only this branch or tag, instead of all branches matching the branch filter"
        )]
        branch_or_tag: Option<String>,
        #[arg(
            long,
            help = "Absolute path to the cache directory, defaults to .monorepo-split-cache in the project directory"
        )]
        cache_dir: Option<PathBuf>,
        #[arg(long, help = "Force push branches (not tags) to the split remotes")]
        force_push: bool,
    },
    #[command(
        name = "merge",
        about = "Merge the configured repositories into one monorepo",
        long_about = "This command folds the histories of all configured repositories \
        into one monorepo history, built in the local merge cache directory, and \
        prints the mapping to seed the split configuration with."
    )]
    Merge,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = std::env::current_dir()?;

    match cli.command {
        Commands::Split {
            branch_or_tag,
            cache_dir,
            force_push,
        } => monotools::commands::split::run(&root, branch_or_tag, cache_dir, force_push),
        Commands::Merge => monotools::commands::merge::run(&root),
    }
}
