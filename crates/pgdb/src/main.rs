//! Command-line host for the pgdb debugger launcher.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libpgdb::config::{COMMAND_DESCRIPTION, DEFAULT_COMMAND, DEFAULT_SCRIPT_DIR, DebuggerConfig};
use libpgdb::host::{ArrayArg, Host, ProcessHost};
use libpgdb::launcher::ForkLauncher;
use libpgdb::template::CommandTemplate;
use libpgdb::{PgdbError, attach, list_symbols};
use log::{info, warn};

/// Top-level argument parser describing the launcher interface.
#[derive(Parser, Debug)]
#[command(
    name = "pgdb",
    version,
    about = "Attach gdb to a running process and list its symbols",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

/// Template option shared by the subcommands that expand it.
#[derive(clap::Args, Debug)]
struct TemplateArgs {
    #[arg(
        long = "command",
        env = "PGDB_DEBUGGER_COMMAND",
        default_value = DEFAULT_COMMAND,
        help = COMMAND_DESCRIPTION
    )]
    command: String,
}

/// Subcommands exposed by the launcher frontend.
#[derive(Subcommand, Debug)]
enum Command {
    /// Launch the debugger against a process, optionally with breakpoints.
    Attach {
        /// Process to attach to; defaults to this process.
        #[arg(long)]
        pid: Option<i32>,
        #[command(flatten)]
        template: TemplateArgs,
        /// Directory for generated breakpoint scripts.
        #[arg(long, default_value = DEFAULT_SCRIPT_DIR)]
        script_dir: PathBuf,
        /// Breakpoint locations; an empty string stands for a null entry.
        breakpoints: Vec<String>,
    },
    /// Print the exported text symbols of a process, one per line.
    Symbols { pid: Option<i32> },
    /// Validate a debugger template and show its expansion.
    Check {
        #[command(flatten)]
        template: TemplateArgs,
        #[arg(long)]
        pid: Option<i32>,
    },
    /// Display version information for diagnostics.
    Version,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Attach {
            pid,
            template,
            script_dir,
            breakpoints,
        } => attach_debugger(pid, template.command, script_dir, &breakpoints),
        Command::Symbols { pid } => print_symbols(pid),
        Command::Check { template, pid } => check_template(&template.command, pid),
        Command::Version => {
            println!("pgdb {}", libpgdb::version());
            Ok(())
        }
    };
    if let Err(err) = result {
        eprintln!("error: {err:#}");
        if let Some(hint) = hint_for(&err) {
            eprintln!("hint: {hint}");
        }
        std::process::exit(1);
    }
}

fn host_for(pid: Option<i32>, config: DebuggerConfig) -> ProcessHost {
    let host = ProcessHost::new(config);
    match pid {
        Some(pid) => host.with_pid(pid),
        None => host,
    }
}

fn attach_debugger(
    pid: Option<i32>,
    command: String,
    script_dir: PathBuf,
    breakpoints: &[String],
) -> Result<()> {
    let config = DebuggerConfig::default()
        .with_command(command)
        .with_script_dir(script_dir);
    let host = host_for(pid, config);

    let arg = (!breakpoints.is_empty()).then(|| {
        ArrayArg::text(
            breakpoints
                .iter()
                .map(|b| (!b.is_empty()).then(|| b.clone()))
                .collect(),
        )
    });

    let attached = attach(&host, &ForkLauncher::default(), arg.as_ref())
        .with_context(|| format!("attaching debugger to pid {}", host.pid()))?;
    if let Some(script) = &attached.script {
        info!("breakpoint script at {}", script.display());
    }
    println!("{} {}", attached.child.pid(), attached.command);
    Ok(())
}

fn print_symbols(pid: Option<i32>) -> Result<()> {
    let host = host_for(None, DebuggerConfig::default());
    let mut count = 0usize;
    for symbol in list_symbols(&host, pid) {
        println!("{}", symbol.context("reading symbol pipeline")?);
        count += 1;
    }
    if count == 0 {
        warn!("no symbols found");
    }
    Ok(())
}

fn check_template(command: &str, pid: Option<i32>) -> Result<()> {
    let host = host_for(pid, DebuggerConfig::default().with_command(command));
    let template = CommandTemplate::parse(host.debugger_command().as_deref())?;
    println!("{}", template.expand(host.pid()));
    Ok(())
}

/// User-facing hint carried by a core error anywhere in the chain.
fn hint_for(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PgdbError>())
        .and_then(PgdbError::hint)
}
