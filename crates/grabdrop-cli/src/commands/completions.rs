//! Shell completion generation.

use std::io;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use super::{Cli, CompletionsArgs, ShellType};

impl From<ShellType> for Shell {
    fn from(shell: ShellType) -> Self {
        match shell {
            ShellType::Bash => Self::Bash,
            ShellType::Zsh => Self::Zsh,
            ShellType::Fish => Self::Fish,
            ShellType::PowerShell => Self::PowerShell,
            ShellType::Elvish => Self::Elvish,
        }
    }
}

/// Write completions for the requested shell to stdout.
pub fn run(args: &CompletionsArgs) {
    generate(
        Shell::from(args.shell),
        &mut Cli::command(),
        "grabdrop",
        &mut io::stdout(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_mention_commands() {
        let mut out = Vec::new();
        generate(Shell::Bash, &mut Cli::command(), "grabdrop", &mut out);
        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("grabdrop"));
        assert!(script.contains("serve"));
    }
}
