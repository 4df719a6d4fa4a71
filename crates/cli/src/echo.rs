use owo_colors::OwoColorize;
use recital_core::{AttemptOutcome, ExtractionAttempt};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Recital".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Reader mode and read-aloud for web pages\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print one line per extraction attempt, in the order they ran
pub fn print_attempts(attempts: &[ExtractionAttempt], elapsed: std::time::Duration) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Attempts".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());

    for attempt in attempts {
        let label = format!("{}:", attempt.method);
        match &attempt.outcome {
            AttemptOutcome::Success(article) => eprintln!(
                "  {:<20} {} {}",
                label.dimmed(),
                "success".bright_green(),
                format!("({} chars)", article.text_length()).dimmed()
            ),
            AttemptOutcome::Empty => eprintln!("  {:<20} {}", label.dimmed(), "empty".bright_yellow()),
            AttemptOutcome::Failed(reason) => {
                eprintln!("  {:<20} {} {}", label.dimmed(), "failed".bright_red(), reason.dimmed())
            }
        }
    }

    let ms = elapsed.as_secs_f64() * 1000.0;
    eprintln!("  {:<20} {:>8.2}ms\n", "Total:".bold().dimmed(), ms);
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
