//! Bootstrap a Python virtual environment and launch the app.
//!
//! With no arguments the launcher prepares `venv/` next to the app (creating
//! it only when absent), installs `requirements.txt`, and runs
//! `python -m streamlit run app.py` until the app exits or Ctrl-C.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use launcher::bootstrap::{BootstrapPlan, launch_app, prepare_environment};
use launcher::core::failure::{BootstrapError, BootstrapFailure};
use launcher::core::layout::Platform;
use launcher::exit_codes;
use launcher::io::config::{LauncherConfig, load_config};
use launcher::io::git::Git;
use launcher::io::interrupt::InterruptFlag;
use launcher::io::paths::{ProjectPaths, locate_project_root};
use launcher::io::toolchain::{LaunchRequest, LaunchStatus, SystemToolchain};
use launcher::logging;
use launcher::setup::run_setup;
use launcher::sync::{SyncPlan, confirm, sync_branches};

#[derive(Parser)]
#[command(
    name = "launcher",
    version,
    about = "Bootstrap a Python virtual environment and launch the app"
)]
struct Cli {
    /// Project directory. Defaults to the launcher's own directory when it
    /// holds the app, otherwise the current directory.
    #[arg(long, global = true, value_name = "PATH")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Prepare the environment and launch the app (the default).
    Run {
        /// Serve on this port instead of the default, e.g. when it is already in use.
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        port: Option<u16>,
    },
    /// Prepare the environment without launching and mark helper scripts executable.
    Setup,
    /// Pull the base branch and merge it into the target branch.
    SyncBranches {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => report_error(&err),
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let root = locate_project_root(cli.dir.as_deref())?;
    let cfg = load_config(&root.join(launcher::io::config::CONFIG_FILE_NAME))?;
    let paths = ProjectPaths::new(&root, &cfg);
    match cli.command.unwrap_or(Command::Run { port: None }) {
        Command::Run { port } => cmd_run(&paths, &cfg, port),
        Command::Setup => cmd_setup(&paths, &cfg),
        Command::SyncBranches { yes } => cmd_sync_branches(&paths, &cfg, yes),
    }
}

fn cmd_run(paths: &ProjectPaths, cfg: &LauncherConfig, port: Option<u16>) -> Result<i32> {
    let plan = BootstrapPlan::from_config(cfg)?;
    let toolchain = SystemToolchain::new(&paths.root, cfg);
    let prepared = prepare_environment(&toolchain, paths, &plan)?;

    // Only the handoff is interruptible; earlier steps keep default Ctrl-C behavior.
    let interrupt = InterruptFlag::install()?;
    let request = LaunchRequest::from_config(cfg, port);
    let outcome = launch_app(&toolchain, paths, prepared, &request, &interrupt)?;
    match outcome.launch {
        LaunchStatus::Exited(Some(0)) => {}
        LaunchStatus::Exited(Some(code)) => eprintln!("app exited with status {code}"),
        LaunchStatus::Exited(None) => eprintln!("app was terminated by a signal"),
        LaunchStatus::Interrupted => {
            println!(
                "Interrupted. The environment at {} is kept for the next run.",
                paths.env_dir.display()
            );
        }
    }
    Ok(outcome.exit_code())
}

fn cmd_setup(paths: &ProjectPaths, cfg: &LauncherConfig) -> Result<i32> {
    let plan = BootstrapPlan::from_config(cfg)?;
    let toolchain = SystemToolchain::new(&paths.root, cfg);
    let outcome = run_setup(&toolchain, paths, &plan, &cfg.setup.scripts)?;

    for script in &outcome.scripts.marked {
        println!("Made {} executable", script.display());
    }
    for script in &outcome.scripts.missing {
        eprintln!("warning: {} not found", script.display());
    }
    println!("Setup complete! Start the app with: launcher run");
    Ok(exit_codes::OK)
}

fn cmd_sync_branches(paths: &ProjectPaths, cfg: &LauncherConfig, yes: bool) -> Result<i32> {
    let plan = SyncPlan::from(&cfg.sync);
    if !yes && !confirm(&plan, io::stdin().lock(), io::stdout())? {
        println!("Operation cancelled.");
        return Ok(exit_codes::OK);
    }
    sync_branches(&Git::new(&paths.root), &plan, &[cfg.environment.dir.as_str()])?;
    println!("{} is now up to date with {}.", plan.target, plan.base);
    Ok(exit_codes::OK)
}

/// Print a failure and pick its exit code.
fn report_error(err: &anyhow::Error) -> i32 {
    if let Some(failure) = err.downcast_ref::<BootstrapFailure>() {
        eprintln!("error: {failure}");
        eprintln!("hint: {}", failure.remediation(Platform::current()));
        return failure.exit_code();
    }
    eprintln!("error: {err:#}");
    exit_codes::INVALID
}
