//! Output formatting utilities

use anyhow::{Context, Result};
use colored::*;
use gitid_core::Identity;
use serde::Serialize;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(data).context("failed to encode JSON output")?;
    println!("{}", text);
    Ok(())
}

/// Print one identity with its paths
pub fn print_identity(identity: &Identity) {
    println!("{}", identity.name.bold());
    println!("  {} {}", "Name: ".dimmed(), identity.display_name);
    println!("  {} {}", "Email:".dimmed(), identity.email);
    if identity.paths.is_empty() {
        println!("  {} {}", "Paths:".dimmed(), "none".dimmed());
    } else {
        println!("  {}", "Paths:".dimmed());
        for path in &identity.paths {
            println!("    {}", path.cyan());
        }
    }
}

/// Print a labelled value
pub fn print_field(label: &str, value: &str) {
    println!("{} {}", format!("{}:", label).bold(), value);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.red());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.yellow());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}
