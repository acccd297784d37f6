// SPDX-License-Identifier: Apache-2.0

//! Shell completion generation and installation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use console::style;
use tracing::debug;

use crate::cli::Cli;

/// Where a shell's completion script goes and how to enable it.
#[derive(Debug)]
struct InstallTarget {
    path: PathBuf,
    instructions: &'static str,
}

fn install_target(shell: Shell, home: &Path) -> Result<InstallTarget> {
    let (path, instructions) = match shell {
        Shell::Bash => (
            home.join(".bash_completion.d/tilewatch"),
            "Add to ~/.bashrc:\n  source ~/.bash_completion.d/tilewatch",
        ),
        Shell::Zsh => (
            home.join(".zsh/completions/_tilewatch"),
            "Add to ~/.zshrc (before compinit):\n  fpath=(~/.zsh/completions $fpath)\n  autoload -U compinit && compinit -i",
        ),
        Shell::Fish => (
            home.join(".config/fish/completions/tilewatch.fish"),
            "Completions are loaded from ~/.config/fish/completions/ automatically.",
        ),
        other => bail!(
            "Installing completions for {other} is not supported. Use `tilewatch completion generate {other}` instead."
        ),
    };
    Ok(InstallTarget { path, instructions })
}

/// Detect the current shell from `$SHELL`.
fn detect_shell() -> Result<Shell> {
    let shell_env = std::env::var("SHELL")
        .context("$SHELL environment variable not set. Use --shell to specify.")?;

    Shell::from_shell_path(&shell_env)
        .ok_or_else(|| anyhow!("Could not detect a supported shell from $SHELL={shell_env}"))
}

fn completion_script(shell: Shell) -> Vec<u8> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut script = Vec::new();
    generate(shell, &mut cmd, name, &mut script);
    script
}

/// Generate completion script to stdout.
pub fn run_generate(shell: Shell) -> Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(&completion_script(shell))?;
    stdout.flush()?;
    Ok(())
}

/// Install completion script to the standard location.
pub fn run_install(shell: Option<Shell>, dry_run: bool) -> Result<()> {
    let shell = match shell {
        Some(s) => s,
        None => detect_shell()?,
    };
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    let target = install_target(shell, &home)?;

    if dry_run {
        println!(
            "{}",
            style("DRY RUN - No files will be modified").yellow().bold()
        );
        println!("{}", style(format!("Shell: {shell}")).cyan());
        println!(
            "{}",
            style(format!("Completion path: {}", target.path.display())).cyan()
        );
        println!();
        println!("{}", target.instructions);
        return Ok(());
    }

    if let Some(parent) = target.path.parent() {
        debug!("Creating directory: {}", parent.display());
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(&target.path, completion_script(shell))
        .with_context(|| format!("Failed to write {}", target.path.display()))?;

    println!(
        "{}",
        style("Completion script installed.").green().bold()
    );
    println!("  {}", style(target.path.display()).cyan());
    println!();
    println!("{}", target.instructions);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_target_paths() {
        let home = Path::new("/home/user");
        let zsh = install_target(Shell::Zsh, home).expect("zsh supported");
        assert_eq!(zsh.path, PathBuf::from("/home/user/.zsh/completions/_tilewatch"));

        let fish = install_target(Shell::Fish, home).expect("fish supported");
        assert!(fish.path.ends_with("fish/completions/tilewatch.fish"));
    }

    #[test]
    fn test_install_target_unsupported_shell() {
        let err = install_target(Shell::Elvish, Path::new("/home/user"))
            .expect_err("elvish not supported");
        assert!(err.to_string().contains("completion generate"));
    }

    #[test]
    fn test_completion_script_mentions_commands() {
        let script = String::from_utf8(completion_script(Shell::Bash)).expect("utf8");
        assert!(script.contains("tilewatch"));
        assert!(script.contains("watch"));
    }
}
