//! Grabdrop CLI - throw clipboard content to a nearby device with a hand gesture
//!
//! Grabdrop reads classified hand readings, grabs the clipboard when a fist
//! is held, and sends it to a peer discovered on the local network when the
//! hand opens again.
//!
//! ## Quick Start
//!
//! ```bash
//! # On the receiving device
//! grabdrop serve
//!
//! # On the sending device, fed by a hand tracker
//! hand-tracker --json | grabdrop run
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unused_async)]

use anyhow::Result;
use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => commands::run::run(args).await,
        Command::Serve(args) => commands::serve::run(args).await,
        Command::Scan(args) => commands::scan::run(args).await,
        Command::Send(args) => commands::send::run(args).await,
        Command::Config(args) => commands::config::run(args),
        Command::Completions(args) => {
            commands::completions::run(&args);
            Ok(())
        }
    };

    if let Err(e) = &result {
        let hint = e
            .chain()
            .find_map(|cause| cause.downcast_ref::<grabdrop_core::Error>())
            .and_then(grabdrop_core::Error::suggestion);
        if let Some(hint) = hint {
            eprintln!();
            eprintln!("{hint}");
            eprintln!();
        }
    }

    result
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if verbose {
        "info,grabdrop=debug,grabdrop_core=debug"
    } else {
        "warn,grabdrop=info,grabdrop_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
