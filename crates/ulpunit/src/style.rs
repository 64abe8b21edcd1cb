//! Placeholder substitution for report text.
//!
//! Report text embeds `[/key]` placeholders. A [`Style`] maps each key to an
//! escape sequence (or nothing). Recognized keys:
//! - `bold_on`, `bold_off`
//! - `default_color`, `warning_color`
//! - `file_color`, `type_color`, `name_color`
//!
//! Unknown keys are erased. Whitespace inside a placeholder is ignored, so
//! `[/ warning_color ]` resolves like `[/warning_color]`.

use std::fmt;

const OPEN: &str = "[/";
const CLOSE: char = ']';

/// Maps placeholder keys to their rendering.
pub trait Style: Send + Sync {
    /// Replacement for `key`; the empty string for unknown keys.
    fn symbol(&self, key: &str) -> &'static str;

    /// Resolve every placeholder in `text`.
    fn apply(&self, text: &str) -> String {
        replace_symbols(text, |key| self.symbol(key))
    }
}

/// ANSI escape sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct FancyStyle;

impl Style for FancyStyle {
    fn symbol(&self, key: &str) -> &'static str {
        match key {
            "bold_on" => "\x1b[1m",
            "bold_off" => "\x1b[0m",
            "default_color" => "\x1b[39m",
            "warning_color" => "\x1b[31m",
            "type_color" => "\x1b[32m",
            "file_color" => "\x1b[33m",
            "name_color" => "\x1b[34m",
            _ => "",
        }
    }
}

/// Plain text: every placeholder vanishes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawStyle;

impl Style for RawStyle {
    fn symbol(&self, _key: &str) -> &'static str {
        ""
    }
}

/// Selects which built-in style a writer uses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    #[default]
    Fancy,
    Raw,
}

impl OutputFormat {
    /// Parse from string (case-insensitive); unknown values are `None`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fancy" | "ansi" | "color" | "colour" => Some(Self::Fancy),
            "raw" | "plain" | "none" | "text" => Some(Self::Raw),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fancy => "fancy",
            Self::Raw => "raw",
        }
    }

    /// Instantiate the style for this format.
    #[must_use]
    pub fn create(self) -> Box<dyn Style> {
        match self {
            Self::Fancy => Box::new(FancyStyle),
            Self::Raw => Box::new(RawStyle),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substitute every `[/key]` in `text` with `lookup(key)`.
///
/// An opening marker with no closing bracket is copied through verbatim.
pub fn replace_symbols<'a>(text: &str, lookup: impl Fn(&str) -> &'a str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut key = String::new();

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            out.push_str(&rest[start..]);
            return out;
        };
        key.clear();
        key.extend(after[..end].chars().filter(|c| !c.is_whitespace()));
        out.push_str(lookup(&key));
        rest = &after[end + CLOSE.len_utf8()..];
    }
    out.push_str(rest);
    out
}
