//! CLI command definitions and handlers.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

pub mod completions;
pub mod config;
pub mod run;
pub mod scan;
pub mod send;
pub mod serve;

/// Load configuration with graceful fallback to defaults.
///
/// A missing file yields the defaults; an unreadable or invalid one is
/// reported and the defaults are used instead.
pub fn load_config() -> grabdrop_core::config::Config {
    match grabdrop_core::config::Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring configuration file: {e}");
            grabdrop_core::config::Config::default()
        }
    }
}

/// Grabdrop - grab clipboard content with your hand, throw it to a nearby device
#[derive(Parser)]
#[command(name = "grabdrop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Detailed logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand)]
pub enum Command {
    /// Run the gesture pipeline on a stream of hand readings
    Run(RunArgs),

    /// Receive transfers from other devices
    Serve(ServeArgs),

    /// List devices on the network
    Scan(ScanArgs),

    /// Send a file to a device without gestures
    Send(SendArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by commands that run a receiver.
#[derive(Parser, Debug, Clone)]
pub struct NodeArgs {
    /// Receiver port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Device name announced to others (overrides config)
    #[arg(long)]
    pub name: Option<String>,

    /// Directory for received files (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not announce this device on the network
    #[arg(long)]
    pub no_announce: bool,
}

/// Arguments for the run command
#[derive(Parser)]
pub struct RunArgs {
    /// JSON-lines file of hand readings ("-" or omitted for stdin)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub node: NodeArgs,

    /// Print signals as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the serve command
#[derive(Parser)]
pub struct ServeArgs {
    #[command(flatten)]
    pub node: NodeArgs,
}

/// Arguments for the scan command
#[derive(Parser)]
pub struct ScanArgs {
    /// Duration to scan (e.g., 3s, 500ms)
    #[arg(short, long, default_value = "3s")]
    pub duration: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the send command
#[derive(Parser)]
pub struct SendArgs {
    /// File to send
    pub file: PathBuf,

    /// Device name, or ip:port of a receiver
    #[arg(short, long)]
    pub to: Option<String>,

    /// How long to look for devices (e.g., 3s)
    #[arg(short, long, default_value = "3s")]
    pub duration: String,
}

/// Arguments for the config command
#[derive(Parser)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the configuration file path
    Path,
}

/// Arguments for the completions command
#[derive(Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,
}

/// Supported shell types for completions
#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum ShellType {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell
    Elvish,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::try_parse_from([
            "grabdrop", "run", "--input", "readings.jsonl", "--port", "5050", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.input, Some(PathBuf::from("readings.jsonl")));
        assert_eq!(args.node.port, Some(5050));
        assert!(!args.node.no_announce);
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::try_parse_from(["grabdrop", "send", "a.txt", "--to", "Office-PC"]).unwrap();
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.file, PathBuf::from("a.txt"));
        assert_eq!(args.to.as_deref(), Some("Office-PC"));
        assert_eq!(args.duration, "3s");
    }
}
