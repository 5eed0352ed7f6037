//! Display utilities for CLI output formatting
//!
//! Provides formatted output for payloads, failures and session state

use colored::Colorize;
use serde::Serialize;

use staffsync_client::FailureKind;

/// Print a payload as pretty JSON
pub fn display_payload<T: Serialize>(payload: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

/// Print a one-line summary for a list call
pub fn display_count(label: &str, count: usize) {
    println!("{} {count} {label}", "✓".green().bold());
}

/// Describe a failed gateway call
pub fn display_failure(kind: FailureKind) {
    eprintln!("{} {kind}", "✗".red().bold());

    match kind {
        FailureKind::Transport => {
            eprintln!(
                "  {}",
                "Could not reach the server; stored session was cleared.".dimmed()
            );
        }
        FailureKind::AuthOrClient { .. } => {
            eprintln!(
                "  {}",
                "Session is no longer valid; stored token was cleared.".dimmed()
            );
        }
        FailureKind::Server => {
            eprintln!("  {}", "Server error; your session is kept, try again later.".dimmed());
        }
        FailureKind::Malformed => {
            eprintln!("  {}", "The server sent a response that could not be read.".dimmed());
        }
    }

    if kind.clears_token() {
        eprintln!("  Run {} to sign in again.", "staffsync login".cyan());
    }
}

/// Show whether a token is stored and which role it carries
pub fn display_session(authenticated: bool, role: Option<&str>) {
    if authenticated {
        println!("{} signed in", "●".green());
    } else {
        println!("{} signed out", "○".red());
    }
    if let Some(role) = role {
        println!("  role: {}", role.bold());
    }
}

/// Print a confirmation line
pub fn display_ok(message: &str) {
    println!("{} {message}", "✓".green().bold());
}
