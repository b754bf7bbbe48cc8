//! Styled terminal lines for liftoff commands

use console::{style, Style, StyledObject};
use liftoff_core::OptionDescriptor;

/// Leading mark of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Done,
    Failed,
    Notice,
    Step,
}

impl Mark {
    fn glyph(self) -> StyledObject<&'static str> {
        match self {
            Self::Done => style("✓").green().bold(),
            Self::Failed => style("✗").red().bold(),
            Self::Notice => style("!").yellow().bold(),
            Self::Step => style("→").blue(),
        }
    }
}

fn status_line(mark: Mark, message: &str) -> String {
    format!("{} {}", mark.glyph(), message)
}

pub fn success(message: &str) {
    println!("{}", status_line(Mark::Done, message));
}

/// On stderr
pub fn error(message: &str) {
    eprintln!("{}", status_line(Mark::Failed, message));
}

pub fn warning(message: &str) {
    println!("{}", status_line(Mark::Notice, message));
}

pub fn info(message: &str) {
    println!("{}", status_line(Mark::Step, message));
}

pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Indented `key: value` line with a dimmed key
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Files and directories
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Command line flags
pub fn flag_style() -> Style {
    Style::new().yellow()
}

/// Lines describing one option: key and flag, then description, env and default
pub fn option_entry(item: &OptionDescriptor) -> Vec<String> {
    let flag = item.short_option.as_deref().unwrap_or("");
    let mut lines = vec![
        format!("  {} {}", style(&item.key).bold(), flag_style().apply_to(flag))
            .trim_end()
            .to_string(),
        format!("      {}", item.description),
    ];
    if let Some(ref env) = item.env_name {
        lines.push(format!("      {} {}", style("env:").dim(), env));
    }
    let default = item.default_display();
    if !default.is_empty() {
        lines.push(format!("      {} {}", style("default:").dim(), default));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftoff_core::ValueKind;

    #[test]
    fn test_status_line() {
        console::set_colors_enabled(false);
        assert_eq!(status_line(Mark::Done, "Uploaded"), "✓ Uploaded");
        assert_eq!(status_line(Mark::Step, "Building"), "→ Building");
    }

    #[test]
    fn test_option_entry() {
        console::set_colors_enabled(false);
        let item = OptionDescriptor::new("scheme", "The project's scheme")
            .short("-s")
            .env("GYM_SCHEME")
            .kind(ValueKind::String);

        assert_eq!(
            option_entry(&item),
            vec![
                "  scheme -s".to_string(),
                "      The project's scheme".to_string(),
                "      env: GYM_SCHEME".to_string(),
            ]
        );
    }
}
