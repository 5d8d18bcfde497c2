//! Interactive input
//!
//! Opens $EDITOR for longer text (quotes, notes) and prompts for
//! credentials, confirmations and catalog picks.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::process::Command;

/// Environment variable holding the password for non-interactive login
pub const PASSWORD_ENV: &str = "BOOKFOLK_PASSWORD";

/// Open content in the user's preferred editor
///
/// Uses $EDITOR, $VISUAL, or falls back to common editors.
pub fn edit_text(initial_content: &str) -> Result<String> {
    let editor = find_editor()?;

    let temp_path = env::temp_dir().join(format!("bookfolk_edit_{}.txt", std::process::id()));
    fs::write(&temp_path, initial_content)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let status = Command::new(&editor)
        .arg(&temp_path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        let _ = fs::remove_file(&temp_path);
        bail!(
            "Editor '{}' exited with non-zero status. Check that your editor is configured correctly.",
            editor
        );
    }

    let content = fs::read_to_string(&temp_path)
        .with_context(|| format!("Failed to read edited file: {:?}", temp_path))?;
    let _ = fs::remove_file(&temp_path);

    Ok(strip_comments(&content))
}

/// Drop `#` comment lines and surrounding whitespace from edited text
fn strip_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Find the user's preferred editor
fn find_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.is_empty() {
                return Ok(editor);
            }
        }
    }

    let common_editors = ["nano", "vim", "vi", "emacs", "notepad"];
    for editor in common_editors {
        if command_exists(editor) {
            return Ok(editor.to_string());
        }
    }

    bail!(
        "No editor found. Set $EDITOR environment variable.\n\
         Example: export EDITOR=nano"
    )
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn is_interactive() -> bool {
    atty::is(atty::Stream::Stdin)
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !is_interactive() {
        return Ok(false);
    }
    Ok(inquire::Confirm::new(prompt).with_default(false).prompt()?)
}

/// Prompt for a required line of text
pub fn prompt_text(prompt: &str) -> Result<String> {
    if !is_interactive() {
        bail!("{} is required (no terminal to prompt on)", prompt.trim_end_matches(':'));
    }
    Ok(inquire::Text::new(prompt).prompt()?.trim().to_string())
}

/// Password from the environment, else a hidden prompt
pub fn read_password(confirm_new: bool) -> Result<String> {
    if let Ok(password) = env::var(PASSWORD_ENV) {
        if !password.is_empty() {
            return Ok(password);
        }
    }
    if !is_interactive() {
        bail!("No password given. Set {} or run in a terminal.", PASSWORD_ENV);
    }

    let prompt = inquire::Password::new("Password:");
    let prompt = if confirm_new {
        prompt.with_custom_confirmation_message("Confirm password:")
    } else {
        prompt.without_confirmation()
    };
    Ok(prompt.prompt()?)
}

/// Let the user pick one of `options`; returns its index
pub fn select(prompt: &str, options: Vec<String>) -> Result<usize> {
    if !is_interactive() {
        bail!("Cannot choose interactively without a terminal. Use --pick.");
    }
    let choice = inquire::Select::new(prompt, options).raw_prompt()?;
    Ok(choice.index)
}
