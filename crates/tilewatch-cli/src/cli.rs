// SPDX-License-Identifier: Apache-2.0

//! Command-line interface definition for tilewatch.
//!
//! Uses clap's derive API for declarative CLI parsing with noun-verb
//! subcommands where a command has more than one action.

use std::io::IsTerminal;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Extended help text for the generate subcommand with shell-specific examples.
const COMPLETION_GENERATE_HELP: &str = r#"EXAMPLES

  bash
    Add to ~/.bashrc or ~/.bash_profile:
      eval "$(tilewatch completion generate bash)"

  zsh
    Generate completion file:
      mkdir -p ~/.zsh/completions
      tilewatch completion generate zsh > ~/.zsh/completions/_tilewatch

    Add to ~/.zshrc (before compinit):
      fpath=(~/.zsh/completions $fpath)
      autoload -U compinit && compinit -i

  fish
    Generate completion file:
      tilewatch completion generate fish > ~/.config/fish/completions/tilewatch.fish
"#;

/// Extended help text for the watch command.
const WATCH_HELP: &str = r"EXAMPLES

  Watch every tile, refreshing at the configured period:
    tilewatch watch

  Watch one tile and stop after three refreshes:
    tilewatch watch apicatalog --count 3

  Stream events as JSON lines:
    tilewatch watch --output json
";

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with colors (default)
    #[default]
    Text,
    /// JSON output for programmatic consumption
    Json,
    /// YAML output for programmatic consumption
    Yaml,
}

/// Global output configuration passed to commands.
#[derive(Clone, Debug)]
pub struct OutputContext {
    /// Output format (text, json, yaml)
    pub format: OutputFormat,
    /// Suppress non-essential output (spinners, status lines)
    pub quiet: bool,
    /// Enable verbose output (debug-level logging)
    pub verbose: bool,
    /// Whether stdout is a terminal (TTY)
    pub is_tty: bool,
}

impl OutputContext {
    /// Creates an `OutputContext` from CLI arguments.
    pub fn from_cli(format: OutputFormat, quiet: bool, verbose: bool) -> Self {
        Self {
            format,
            quiet,
            verbose,
            is_tty: std::io::stdout().is_terminal(),
        }
    }

    /// Returns true if interactive elements (spinners, colors) should be shown.
    pub fn is_interactive(&self) -> bool {
        self.is_tty && !self.quiet && matches!(self.format, OutputFormat::Text)
    }
}

/// tilewatch - keep an eye on API Catalog tiles.
///
/// Polls the API Catalog of an API Mediation Layer gateway, retrying
/// transient failures and stopping on errors that will not clear up.
#[derive(Parser)]
#[command(name = "tilewatch")]
#[command(version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Output format (text, json, yaml)
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    pub output: OutputFormat,

    /// Suppress non-essential output (spinners, status lines)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug-level logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Override the configured catalog base URL (e.g. `https://localhost:10010`)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Poll tiles until interrupted or a terminal error occurs
    #[command(after_long_help = WATCH_HELP)]
    Watch {
        /// Tile id to watch (omit for all tiles)
        service_id: Option<String>,

        /// Stop after this many successful refreshes
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        count: Option<u32>,
    },

    /// Fetch tiles once, without retries
    Fetch {
        /// Tile id to fetch (omit for all tiles)
        service_id: Option<String>,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate or install shell completion scripts
    #[command(subcommand)]
    Completion(CompletionCommand),
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

/// Shell completion subcommands
#[derive(Subcommand)]
pub enum CompletionCommand {
    /// Generate completion script to stdout
    #[command(after_long_help = COMPLETION_GENERATE_HELP)]
    Generate {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Install completion script to the standard location
    Install {
        /// Shell to install for (auto-detected from $SHELL if omitted)
        #[arg(long, value_enum)]
        shell: Option<Shell>,

        /// Show what would be done without writing files
        #[arg(long)]
        dry_run: bool,
    },
}
