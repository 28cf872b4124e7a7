//! Inline markup conversion
//!
//! Scene text is held in the internal bracket markup (`[b]..[/b]`,
//! `[i]..[/i]`, `[s]..[/s]`) and stored in content files as Markdown-style
//! emphasis (`**bold**`, `_italic_`, `~~strike~~`).

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());

/// Italics must neither start nor end on a space
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([^ _](?:[^_]*?[^ _])?)_").unwrap());

static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"~~(.+?)~~").unwrap());

/// Highlight, alignment and underline tags have no Markdown equivalent
static UNSUPPORTED_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[/*[h|c|r|u]\d*\]").unwrap());

/// Applied in order when writing; spaces move outside markup boundaries
/// before the tags are replaced
const TO_MARKDOWN: &[(&str, &str)] = &[
    ("[i] ", " [i]"),
    ("[b] ", " [b]"),
    ("[s] ", " [s]"),
    (" [/i]", "[/i] "),
    (" [/b]", "[/b] "),
    (" [/s]", "[/s] "),
    ("[i]", "_"),
    ("[/i]", "_"),
    ("[b]", "**"),
    ("[/b]", "**"),
    ("[s]", "~~"),
    ("[/s]", "~~"),
    ("  ", " "),
];

/// Converts scene text between the internal markup and content-file Markdown
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupConverter {
    /// Paragraphs are separated by blank lines in the content file
    pub double_linebreaks: bool,
}

impl MarkupConverter {
    pub fn new(double_linebreaks: bool) -> Self {
        Self { double_linebreaks }
    }

    /// Internal markup to Markdown
    pub fn to_markdown(&self, text: &str) -> String {
        let mut text = if self.double_linebreaks {
            text.replace('\n', "\n\n")
        } else {
            text.to_string()
        };

        for (from, to) in TO_MARKDOWN {
            text = text.replace(from, to);
        }

        UNSUPPORTED_TAGS.replace_all(&text, "").into_owned()
    }

    /// Markdown to internal markup
    pub fn from_markdown(&self, text: &str) -> String {
        let text = BOLD.replace_all(text, "[b]${1}[/b]");
        let text = ITALIC.replace_all(&text, "[i]${1}[/i]");
        let text = STRIKE.replace_all(&text, "[s]${1}[/s]");

        let text: Cow<'_, str> = if self.double_linebreaks {
            Cow::Owned(text.replace("\n\n", "\n"))
        } else {
            text
        };
        text.into_owned()
    }
}
