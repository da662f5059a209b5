//! Terminal output helpers: coloured notes and aligned key/value lines.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

fn styled(text: &str, style: &str) -> String {
    if supports_color() {
        format!("{style}{text}{RESET}")
    } else {
        text.to_string()
    }
}

pub fn note_info(msg: &str) {
    if supports_color() {
        println!("{CYAN}{BOLD}ℹ{RESET} {msg}");
    } else {
        println!("INFO: {msg}");
    }
}

pub fn note_warn(msg: &str) {
    if supports_color() {
        println!("{YELLOW}{BOLD}⚠{RESET} {msg}");
    } else {
        println!("WARN: {msg}");
    }
}

pub fn note_error(msg: &str) {
    if supports_color() {
        eprintln!("{RED}{BOLD}✗{RESET} {msg}");
    } else {
        eprintln!("ERROR: {msg}");
    }
}

/// Format `key: value` with the key padded to `width`.
pub fn key_value(key: &str, value: &str, width: usize) -> String {
    format!("  {}{} {}", styled(key, DIM), " ".repeat(width.saturating_sub(key.len())), value)
}

/// Green "yes" or red "no".
pub fn yes_no(flag: bool) -> String {
    if flag {
        styled("yes", GREEN)
    } else {
        styled("no", RED)
    }
}

/// Label printed before each bot reply in the chat REPL.
pub fn bot_prefix() -> String {
    styled("bot>", CYAN)
}
