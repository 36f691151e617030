//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Characters kept by [`excerpt`].
const EXCERPT_CHARS: usize = 160;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Shortens text for listing cards, cutting on a character boundary.
///
/// Usage in templates: `{{ org.description|excerpt }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn excerpt(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(shorten(&value.to_string(), EXCERPT_CHARS))
}

fn shorten(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorten_keeps_short_text() {
        assert_eq!(shorten("  Beach cleanup ", 160), "Beach cleanup");
    }

    #[test]
    fn test_shorten_cuts_on_chars() {
        assert_eq!(shorten("ééééé", 3), "ééé…");
    }
}
