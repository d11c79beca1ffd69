//! Coinsheet CLI.
//!
//! ```bash
//! coinsheet export --table users=data/users.csv --aggregate-column coins
//! coinsheet chat   --table users=data/users.arrow   # messages on stdin
//! ```

mod chat;
mod conf;

use std::io::{self, BufRead, Write};

use clap::Parser;
use coinsheet_export::{ExportError, Exporter};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::chat::ChatSession;
use crate::conf::{ArgsExport, Cli, Commands};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn main() {
    load_dotenv();
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Export(args) => cmd_export(&args),
        Commands::Chat(args) => cmd_chat(&args),
    };

    if let Err(err) = result {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

/// `.env` from the working directory, then from next to the executable.
/// Variables already set win.
fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let path_env_exe = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join(".env")));
    if let Some(path_env) = path_env_exe {
        let _ = dotenvy::from_path(&path_env);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn cmd_export(args: &ArgsExport) -> Result<(), CliError> {
    let mut source = args.build_source()?;
    let mut exporter = Exporter::new(args.to_export_options());
    let outcome = exporter.run(&mut source, &args.query)?;

    debug!("{}", outcome.report);
    println!("{}", outcome.path.display());
    Ok(())
}

fn cmd_chat(args: &ArgsExport) -> Result<(), CliError> {
    let source = args.build_source()?;
    let mut session = ChatSession::new(source, args.query.clone(), args.to_export_options());

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let c_line = line?;
        if let Some(reply) = session.handle(&c_line) {
            writeln!(stdout, "{reply}")?;
            stdout.flush()?;
        }
    }
    debug!("chat input closed");
    Ok(())
}
