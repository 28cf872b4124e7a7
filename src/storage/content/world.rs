//! Location and item sheets
//!
//! Both kinds share one layout: heading, `@tag:` line, optional aka and tag
//! lines, then the description.

use crate::domain::WorldElement;
use crate::storage::config::Settings;
use crate::storage::nwx::NwItem;

use super::{keyword_value, tag_line, tag_title};

/// Encodes and decodes location and item content files
pub struct WorldCodec {
    aka_prefix: String,
    tag_prefix: String,
}

impl WorldCodec {
    pub fn new(settings: &Settings) -> Self {
        Self {
            aka_prefix: settings.keywords.aka_prefix(),
            tag_prefix: settings.keywords.tag_prefix(),
        }
    }

    pub fn encode(&self, element: &WorldElement) -> Vec<String> {
        let mut lines = vec![format!("# {}\n", element.title), tag_line(&element.title)];

        if !element.aka.is_empty() {
            lines.push(format!("{}{}", self.aka_prefix, element.aka));
        }
        for tag in &element.tags {
            lines.push(format!("{}{}", self.tag_prefix, tag));
        }
        if !element.desc.is_empty() {
            lines.push(format!("\n{}", element.desc));
        }

        lines
    }

    /// Builds an element from its item and content lines
    ///
    /// Headings and blank lines are skipped; the remaining plain lines are
    /// the description.
    pub fn decode(&self, item: &NwItem, lines: &[String]) -> WorldElement {
        let mut element = WorldElement::new(item.name.clone());
        let mut desc = Vec::new();

        for line in lines.iter().map(String::as_str) {
            if line.is_empty() || line.starts_with('#') || line.starts_with("%%") {
                continue;
            }

            if line.starts_with('%') {
                if let Some(aka) = keyword_value(line, &self.aka_prefix) {
                    element.aka = aka.to_string();
                } else if let Some(tag) = keyword_value(line, &self.tag_prefix) {
                    element.tags.push(tag.to_string());
                }
            } else if line.starts_with('@') {
                if let Some(title) = tag_title(line) {
                    element.title = title;
                }
            } else {
                desc.push(line);
            }
        }

        element.desc = desc.join("\n");
        element
    }
}
