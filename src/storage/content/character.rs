//! Character sheets

use crate::domain::Character;
use crate::storage::config::Settings;
use crate::storage::nwx::NwItem;

use super::{keyword_value, tag_line, tag_title};

/// Sections of a character sheet, selected by heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Desc,
    Bio,
    Goals,
    Notes,
}

/// Encodes and decodes character content files
pub struct CharacterCodec<'a> {
    settings: &'a Settings,
    aka_prefix: String,
    tag_prefix: String,
}

impl<'a> CharacterCodec<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            aka_prefix: settings.keywords.aka_prefix(),
            tag_prefix: settings.keywords.tag_prefix(),
        }
    }

    /// Body lines of a character sheet
    pub fn encode(&self, character: &Character) -> Vec<String> {
        let headings = &self.settings.headings;
        let heading = if character.full_name.is_empty() {
            &character.title
        } else {
            &character.full_name
        };

        let mut lines = vec![format!("# {}\n", heading), tag_line(&character.title)];

        if !character.aka.is_empty() {
            lines.push(format!("{}{}", self.aka_prefix, character.aka));
        }
        for tag in &character.tags {
            lines.push(format!("{}{}", self.tag_prefix, tag));
        }
        if !character.desc.is_empty() {
            lines.push(format!("\n{}", character.desc));
        }

        let sections = [
            (&headings.character_bio, &character.bio),
            (&headings.character_goals, &character.goals),
            (&headings.character_notes, &character.notes),
        ];
        for (heading, text) in sections {
            if !text.is_empty() {
                lines.push(format!("\n{}", heading));
                lines.push(text.clone());
            }
        }

        lines
    }

    /// Builds a character from its item and content lines
    ///
    /// The item name is the full name; the `@tag:` line gives the short title.
    pub fn decode(&self, item: &NwItem, lines: &[String]) -> Character {
        let headings = &self.settings.headings;
        let is_major = item
            .importance
            .as_ref()
            .is_some_and(|imp| self.settings.status.major_character.contains(imp));

        let mut character = Character::new(item.name.clone(), is_major);
        character.full_name = item.name.clone();

        let mut section = Section::Desc;
        let mut desc = Vec::new();
        let mut bio = Vec::new();
        let mut goals = Vec::new();
        let mut notes = Vec::new();

        for line in lines.iter().map(String::as_str) {
            if line.is_empty() || line.starts_with("%%") {
                continue;
            }

            if line.starts_with('#') {
                section = if line.starts_with(headings.character_bio.as_str()) {
                    Section::Bio
                } else if line.starts_with(headings.character_goals.as_str()) {
                    Section::Goals
                } else if line.starts_with(headings.character_notes.as_str()) {
                    Section::Notes
                } else {
                    Section::Desc
                };
            } else if line.starts_with('@') {
                if let Some(title) = tag_title(line) {
                    character.title = title;
                }
            } else if line.starts_with('%') {
                if let Some(aka) = keyword_value(line, &self.aka_prefix) {
                    character.aka = aka.to_string();
                } else if let Some(tag) = keyword_value(line, &self.tag_prefix) {
                    character.tags.push(tag.to_string());
                }
            } else {
                match section {
                    Section::Desc => desc.push(line),
                    Section::Bio => bio.push(line),
                    Section::Goals => goals.push(line),
                    Section::Notes => notes.push(line),
                }
            }
        }

        character.desc = desc.join("\n");
        character.bio = bio.join("\n");
        character.goals = goals.join("\n");
        character.notes = notes.join("\n");
        character
    }
}
