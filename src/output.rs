//! Operator-facing output.
//!
//! Every message the organizer prints goes through [`OutputFormatter`] so
//! styling stays consistent: green ✓ for moves, red ✗ for errors, yellow ⚠
//! for files that were left in place.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;

const PROGRESS_TEMPLATE: &str = "{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Styled console output.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nfe_organizer::output::OutputFormatter;
    /// OutputFormatter::success("Nota n1.xml (Saída) moved");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message to stderr in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a bold section header preceded by a blank line.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for `total` files.
    ///
    /// ```no_run
    /// use nfe_organizer::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("done");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints a table of file counts per destination group.
    ///
    /// # Arguments
    ///
    /// * `group_counts` - Group name (events directory, operation label or
    ///   the unprocessed bucket) to number of files
    /// * `total_files` - Number of XML files considered
    ///
    /// # Example
    ///
    /// ```no_run
    /// use nfe_organizer::output::OutputFormatter;
    /// use std::collections::HashMap;
    ///
    /// let mut counts = HashMap::new();
    /// counts.insert("Entrada".to_string(), 15);
    /// counts.insert("Eventos".to_string(), 2);
    /// OutputFormatter::summary_table(&counts, 17);
    /// ```
    pub fn summary_table(group_counts: &HashMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let mut groups: Vec<_> = group_counts.iter().collect();
        groups.sort_by_key(|&(name, _)| name);

        let width = groups
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0)
            .max(5);

        println!(
            "{:<width$} | {}",
            "Group".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (group, count) in &groups {
            println!(
                "{:<width$} | {} {}",
                group,
                count.to_string().green(),
                plural_files(**count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural_files(total_files),
            width = width
        );
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn plural_files(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
