//! One-line status messages.

use owo_colors::OwoColorize;

pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print a heading followed by each compile diagnostic, numbered.
pub fn diagnostics(heading: &str, errors: &[String]) {
    error(heading);
    for (index, message) in errors.iter().enumerate() {
        let mut lines = message.lines();
        if let Some(first) = lines.next() {
            eprintln!("  {} {}", format!("{}.", index + 1).dimmed(), first);
        }
        for line in lines {
            eprintln!("     {}", line.dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_do_not_panic() {
        success("Rebuilt controller-bundle.js");
        info("pies/text-entry/controller/index.js changed");
        warning("Pie directory not found");
        error("Rebuild failed");
        diagnostics("2 compile errors", &["first\n  at line 3".to_string(), String::new()]);
    }
}
