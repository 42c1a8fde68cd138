//! Formatting for sizes, durations and the build summary.

use console::Term;
use owo_colors::{OwoColorize, Stream::Stderr, Style};
use std::time::Duration;

/// Human-readable size in binary units.
///
/// ```
/// use bale_cli::ui::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// `50ms`, `1.50s` or `2m 5s`.
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// One output file in the summary table.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    pub filename: String,
    pub kind: &'static str,
    pub size: u64,
    /// Over the configured large-asset threshold
    pub large: bool,
}

/// Print the table of written files with a total line.
pub fn print_build_summary(rows: &[SummaryRow], duration: Duration) {
    if super::is_quiet() {
        return;
    }
    let width = (Term::stderr().size().1 as usize).clamp(40, 80);
    let name_width = rows.iter().map(|row| row.filename.len()).max().unwrap_or(0);

    eprintln!("\n{}", "Build Summary".if_supports_color(Stderr, |t| t.style(Style::new().bold().underline())));
    eprintln!("{}", "─".repeat(width));
    for row in rows {
        let size = format_size(row.size);
        let line = format!(
            "  {:<name_width$}  {:>10}  {}",
            row.filename,
            size,
            row.kind,
            name_width = name_width
        );
        if row.large {
            eprintln!(
                "{} {}",
                line.if_supports_color(Stderr, |t| t.yellow()),
                "(large)".if_supports_color(Stderr, |t| t.style(Style::new().yellow().bold()))
            );
        } else {
            eprintln!("{}", line.if_supports_color(Stderr, |t| t.dimmed()));
        }
    }
    eprintln!("{}", "─".repeat(width));

    let total: u64 = rows.iter().map(|row| row.size).sum();
    eprintln!(
        "  {} {} in {} files, {}",
        "Total:".if_supports_color(Stderr, |t| t.bold()),
        format_size(total).if_supports_color(Stderr, |t| t.green()),
        rows.len(),
        format_duration(duration).if_supports_color(Stderr, |t| t.green())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
        assert_eq!(format_size(2_147_483_648), "2.00 GB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
