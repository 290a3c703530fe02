//! extplan CLI - build planner for native extensions

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use extplan::planner::PlanError;
use extplan::util::GlobalContext;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<PlanError>() {
            Some(plan_error) => eprint!("{}", plan_error.to_diagnostic().format(color)),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging; EXTPLAN_LOG takes precedence over --verbose
    let default_filter = if cli.verbose {
        "extplan=debug"
    } else {
        "extplan=info"
    };
    let filter =
        EnvFilter::try_from_env("EXTPLAN_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = match &cli.project_dir {
        Some(dir) => {
            let cwd = std::env::current_dir()?.join(dir);
            GlobalContext::with_cwd(cwd)
        }
        None => GlobalContext::new()?,
    };
    ctx.set_verbose(cli.verbose);

    // Execute command
    match cli.command {
        Commands::Plan(args) => commands::plan::execute(args, &ctx),
        Commands::Backend(args) => commands::backend::execute(args, &ctx),
        Commands::Sources(args) => commands::sources::execute(args, &ctx),
        Commands::Flags(args) => commands::flags::execute(args, &ctx),
        Commands::Toolchain(args) => commands::toolchain::execute(args, &ctx),
        Commands::Manifest(args) => commands::manifest::execute(args, &ctx),
        Commands::Build(args) => commands::build::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
