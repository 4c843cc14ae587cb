//! Common display utilities for CLI commands.

use colored::Colorize;

const MAX_DISPLAY_ITEMS: usize = 10;

/// Display a list with optional truncation.
///
/// Shows up to `MAX_DISPLAY_ITEMS` lines with bullet points. If there are more,
/// shows "... and N more". If empty, shows the provided `empty_message`.
pub fn print_list<T>(items: &[T], empty_message: &str, render: impl Fn(&T) -> String) {
    if items.is_empty() {
        println!("    {}", empty_message.dimmed());
        return;
    }

    for item in items.iter().take(MAX_DISPLAY_ITEMS) {
        println!("    {} {}", "•".dimmed(), render(item));
    }

    if items.len() > MAX_DISPLAY_ITEMS {
        println!(
            "    {} ... and {} more",
            "•".dimmed(),
            items.len() - MAX_DISPLAY_ITEMS
        );
    }
}

/// Print `label: count` with the count highlighted.
pub fn print_count(label: &str, count: usize) {
    println!("  {}: {}", label.white().bold(), count.to_string().green());
}
