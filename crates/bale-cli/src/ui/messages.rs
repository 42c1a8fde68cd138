//! One-line status messages on stderr.

use owo_colors::{OwoColorize, Stream::Stderr, Style};

use super::is_quiet;

/// `text` in `style` when stderr takes colors.
fn paint(text: &str, style: Style) -> String {
    text.if_supports_color(Stderr, |t| t.style(style)).to_string()
}

pub fn success(message: &str) {
    if !is_quiet() {
        eprintln!("{} {}", paint("✓", Style::new().green().bold()), message);
    }
}

pub fn info(message: &str) {
    if !is_quiet() {
        eprintln!("{} {}", paint("ℹ", Style::new().blue().bold()), message);
    }
}

pub fn warning(message: &str) {
    if !is_quiet() {
        eprintln!(
            "{} {}",
            paint("⚠", Style::new().yellow().bold()),
            paint(message, Style::new().yellow())
        );
    }
}

/// Errors print even in quiet mode.
pub fn error(message: &str) {
    eprintln!(
        "{} {}",
        paint("✗", Style::new().red().bold()),
        paint(message, Style::new().red())
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn paint_follows_the_color_override() {
        owo_colors::set_override(true);
        let colored = paint("✓", Style::new().green().bold());
        assert!(colored.starts_with("\u{1b}["), "{colored:?}");
        assert!(colored.contains('✓'));

        owo_colors::set_override(false);
        assert_eq!(paint("✓", Style::new().green().bold()), "✓");
        owo_colors::unset_override();
    }

    #[test]
    #[serial]
    fn messages_print_without_colors() {
        owo_colors::set_override(false);
        success("built");
        info("watching");
        warning("large asset");
        error("failed");
        owo_colors::unset_override();
    }
}
