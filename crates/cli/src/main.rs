use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::replay::ReplayOpts;
use commands::{dump, replay};

#[derive(Parser)]
#[command(name = "pmguard")]
#[command(
    about = "Replay a captured persistent-memory trace through the shadow-state crash-consistency checker",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace file and report detected crash-consistency bugs.
    Replay {
        /// Path to the trace log.
        trace: PathBuf,

        /// Directory holding backtrace_pre.<exec_id> / backtrace_post.<exec_id>.
        #[arg(long)]
        backtrace_dir: Option<PathBuf>,

        /// Commit-variable range, START:SIZE (0x-prefixed hex accepted).
        /// Repeatable.
        #[arg(long = "commit-var")]
        commit_vars: Vec<String>,

        /// Emit reports for drains that transition no bytes.
        #[arg(long)]
        report_unnecessary_drains: bool,

        /// PM arena base address (0x-prefixed hex accepted).
        #[arg(long)]
        pm_base: Option<String>,

        /// PM arena size in bytes (0x-prefixed hex accepted).
        #[arg(long)]
        pm_size: Option<String>,

        /// Print the summary as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Decode a trace file and print its records.
    Dump {
        /// Path to the trace log.
        trace: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay {
            trace,
            backtrace_dir,
            commit_vars,
            report_unnecessary_drains,
            pm_base,
            pm_size,
            json,
        } => replay::run(ReplayOpts {
            trace,
            backtrace_dir,
            commit_vars,
            report_unnecessary_drains,
            pm_base,
            pm_size,
            json,
        }),
        Commands::Dump { trace } => dump::run(&trace),
    }
}
