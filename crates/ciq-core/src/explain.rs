//! One-line explanations for common commands, keyed by the leading program.

const EXPLANATIONS: &[(&str, &str)] = &[
    ("ls", "List files in directory"),
    ("df", "Show disk space usage"),
    ("du", "Estimate file and directory space usage"),
    ("ps", "Display running processes"),
    ("top", "Show real-time system usage"),
    ("cat", "Display file contents"),
    ("grep", "Search text patterns"),
    ("find", "Search for files in a directory hierarchy"),
    ("tar", "Create or extract archives"),
];

/// Fallback when the program is not in the table.
pub const NO_EXPLANATION: &str = "No explanation available yet.";

/// Explain a command by its first word. `sudo` is looked through.
pub fn explain(command: &str) -> &'static str {
    let mut words = command.split_whitespace();
    let program = match words.next() {
        Some("sudo") => words.next(),
        other => other,
    };

    program
        .and_then(|p| EXPLANATIONS.iter().find(|(name, _)| *name == p))
        .map(|(_, text)| *text)
        .unwrap_or(NO_EXPLANATION)
}
