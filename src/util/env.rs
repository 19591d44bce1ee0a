//! Terminal detection.

use std::io::IsTerminal;

/// Whether human output should carry ANSI colors.
///
/// Off when `--no-color` is given, `NO_COLOR` is set, `TERM=dumb`, or stdout
/// is not a terminal.
#[must_use]
pub fn should_use_color(no_color_flag: bool) -> bool {
    color_allowed(no_color_flag, |key| std::env::var(key).ok()) && std::io::stdout().is_terminal()
}

fn color_allowed(no_color_flag: bool, lookup: impl Fn(&str) -> Option<String>) -> bool {
    !no_color_flag && lookup("NO_COLOR").is_none() && lookup("TERM").as_deref() != Some("dumb")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_color_sources() {
        assert!(color_allowed(false, |_| None));
        assert!(!color_allowed(true, |_| None));
        assert!(!color_allowed(false, |k| (k == "NO_COLOR").then(String::new)));
        assert!(!color_allowed(false, |k| (k == "TERM").then(|| "dumb".to_string())));
    }
}
