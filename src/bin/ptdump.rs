//! CLI entry point for the `ptdump` trace inspection tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use pipetrace::cli::commands;

#[derive(Parser)]
#[command(name = "ptdump", about = "Inspect pipeline trace files")]
struct Cli {
    /// Output format: "text" (default) or "json"
    #[arg(long, default_value = "text", global = true)]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display information about a trace file
    Info {
        /// Path to the trace file
        file: PathBuf,
    },
    /// Print the commands of a trace file
    Dump {
        /// Path to the trace file
        file: PathBuf,
        /// Maximum number of commands to print
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();
    let json = cli.format == "json";

    let result = match cli.command {
        Commands::Info { file } => commands::cmd_info(&file, json),
        Commands::Dump { file, limit } => commands::cmd_dump(&file, limit, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(commands::exit_code(&e));
    }
}
