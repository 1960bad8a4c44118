use colored::{ColoredString, Colorize};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {:<12} {}", format!("{key}:").dimmed(), value);
}

// ============================================================================
// Environment Formatting
// ============================================================================

/// Color a health indicator by its meaning
pub fn health(value: &str) -> ColoredString {
    match value {
        "Green" => value.green(),
        "Yellow" => value.yellow(),
        "Red" => value.red(),
        _ => value.dimmed(),
    }
}

/// Color a lifecycle status by its meaning
pub fn status(value: &str) -> ColoredString {
    match value {
        "Ready" => value.green(),
        "Launching" | "Updating" => value.yellow(),
        "Terminating" | "Terminated" => value.red(),
        _ => value.normal(),
    }
}

/// Placeholder for a missing value
pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

/// Hide most of a secret for display
pub fn mask(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

// ============================================================================
// Tests
// ============================================================================
