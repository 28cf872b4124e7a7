//! Novel domain model
//!
//! The in-memory representation shared by every reader and writer. Elements
//! live in maps keyed by element ID; the `srt_*` lists (and
//! [`Chapter::scenes`]) hold the authoritative document order.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::id::next_id;

/// Dashes that separate words
static ADDITIONAL_WORD_LIMITS: Lazy<Regex> = Lazy::new(|| Regex::new("--|—|–").unwrap());

/// Markup, comments, hyphens and quote markers that never separate words
static NO_WORD_LIMITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)\[.+?\]|/\*.+?\*/|-|^>").unwrap());

/// Markup, comments and line breaks that are not letters
static NON_LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.+?\]|/\*.+?\*/|\n|\r").unwrap());

/// Counts words the way LibreOffice does, ignoring markup and comments
pub fn count_words(text: &str) -> usize {
    let text = ADDITIONAL_WORD_LIMITS.replace_all(text, " ");
    let text = NO_WORD_LIMITS.replace_all(&text, "");
    text.split_whitespace().count()
}

/// Counts characters, ignoring markup, comments and line breaks
pub fn count_letters(text: &str) -> usize {
    NON_LETTERS.replace_all(text, "").chars().count()
}

/// Anything with a title and a description
pub trait Describe {
    fn title(&self) -> &str;

    fn desc(&self) -> &str;

    /// Returns the title, or `fallback` when the title is empty
    fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        if self.title().is_empty() {
            fallback
        } else {
            self.title()
        }
    }
}

macro_rules! impl_describe {
    ($($ty:ty),*) => {
        $(
            impl Describe for $ty {
                fn title(&self) -> &str {
                    &self.title
                }

                fn desc(&self) -> &str {
                    &self.desc
                }
            }
        )*
    };
}

impl_describe!(Novel, Chapter, Scene, WorldElement, Character);

/// Type of a chapter or scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    #[default]
    Normal,
    Notes,
    Todo,
    Unused,
}

impl ElementType {
    /// Returns true for the Normal type
    pub fn is_normal(&self) -> bool {
        matches!(self, ElementType::Normal)
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementType::Normal => write!(f, "normal"),
            ElementType::Notes => write!(f, "notes"),
            ElementType::Todo => write!(f, "todo"),
            ElementType::Unused => write!(f, "unused"),
        }
    }
}

/// Level of a chapter entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChapterLevel {
    /// A regular chapter that owns scenes
    #[default]
    Chapter,

    /// A part heading that starts a new section
    Part,
}

/// A chapter or part
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Chapter {
    pub title: String,

    /// Synopsis
    pub desc: String,

    pub level: ChapterLevel,

    pub chapter_type: ElementType,

    /// Scene IDs in document order
    pub scenes: Vec<String>,
}

impl Chapter {
    pub fn new(title: impl Into<String>, level: ChapterLevel) -> Self {
        Self {
            title: title.into(),
            level,
            ..Default::default()
        }
    }
}

/// Scene status "Outline"
pub const STATUS_OUTLINE: u32 = 1;

/// A scene
///
/// Word and letter counts are derived from the content and only change
/// through [`Scene::set_content`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub title: String,

    /// Synopsis
    pub desc: String,

    /// 1 Outline, 2 Draft, 3 1st Edit, 4 2nd Edit, 5 Done
    pub status: u32,

    pub scene_type: ElementType,

    /// Render without a separating break from the previous scene
    pub append_to_prev: bool,

    /// Character IDs; the first one is the point-of-view character
    pub characters: Vec<String>,

    pub locations: Vec<String>,

    pub items: Vec<String>,

    pub tags: Vec<String>,

    content: String,

    word_count: usize,

    letter_count: usize,
}

impl Scene {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: STATUS_OUTLINE,
            ..Default::default()
        }
    }

    /// Returns the scene text in internal markup
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Sets the scene text and recomputes the counts
    pub fn set_content(&mut self, text: impl Into<String>) {
        self.content = text.into();
        self.word_count = count_words(&self.content);
        self.letter_count = count_letters(&self.content);
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn letter_count(&self) -> usize {
        self.letter_count
    }
}

/// A location or item
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorldElement {
    pub title: String,
    pub desc: String,
    pub tags: Vec<String>,

    /// Alternate name
    pub aka: String,
}

impl WorldElement {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// A character
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Character {
    /// Short name, used for cross references
    pub title: String,
    pub desc: String,
    pub tags: Vec<String>,
    pub aka: String,
    pub full_name: String,
    pub bio: String,
    pub goals: String,
    pub notes: String,
    pub is_major: bool,
}

impl Character {
    pub fn new(title: impl Into<String>, is_major: bool) -> Self {
        Self {
            title: title.into(),
            is_major,
            ..Default::default()
        }
    }
}

/// The whole novel
#[derive(Debug, Clone, Default, Serialize)]
pub struct Novel {
    pub title: String,
    pub desc: String,
    pub author_name: String,

    pub chapters: HashMap<String, Chapter>,
    pub scenes: HashMap<String, Scene>,
    pub characters: HashMap<String, Character>,
    pub locations: HashMap<String, WorldElement>,
    pub items: HashMap<String, WorldElement>,

    pub srt_chapters: Vec<String>,
    pub srt_characters: Vec<String>,
    pub srt_locations: Vec<String>,
    pub srt_items: Vec<String>,
}

impl Novel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chapter and returns its ID
    pub fn add_chapter(&mut self, chapter: Chapter) -> String {
        let id = next_id(&self.chapters);
        self.chapters.insert(id.clone(), chapter);
        self.srt_chapters.push(id.clone());
        id
    }

    /// Stores a scene without attaching it to a chapter and returns its ID
    ///
    /// The caller is responsible for listing the ID in a chapter.
    pub fn add_scene(&mut self, scene: Scene) -> String {
        let id = next_id(&self.scenes);
        self.scenes.insert(id.clone(), scene);
        id
    }

    /// Stores a scene and appends it to an existing chapter
    ///
    /// Returns None, storing nothing, if the chapter does not exist.
    pub fn add_scene_to(&mut self, chapter_id: &str, scene: Scene) -> Option<String> {
        if !self.chapters.contains_key(chapter_id) {
            return None;
        }
        let id = self.add_scene(scene);
        self.chapters.get_mut(chapter_id)?.scenes.push(id.clone());
        Some(id)
    }

    /// Appends a character and returns its ID
    pub fn add_character(&mut self, character: Character) -> String {
        let id = next_id(&self.characters);
        self.characters.insert(id.clone(), character);
        self.srt_characters.push(id.clone());
        id
    }

    /// Appends a location and returns its ID
    pub fn add_location(&mut self, location: WorldElement) -> String {
        let id = next_id(&self.locations);
        self.locations.insert(id.clone(), location);
        self.srt_locations.push(id.clone());
        id
    }

    /// Appends an item and returns its ID
    pub fn add_item(&mut self, item: WorldElement) -> String {
        let id = next_id(&self.items);
        self.items.insert(id.clone(), item);
        self.srt_items.push(id.clone());
        id
    }

    /// Iterates over chapters in document order
    pub fn chapters(&self) -> impl Iterator<Item = (&String, &Chapter)> {
        self.srt_chapters
            .iter()
            .filter_map(|id| self.chapters.get(id).map(|ch| (id, ch)))
    }

    /// Iterates over the scenes of a chapter in document order
    pub fn scenes_of<'a>(&'a self, chapter: &'a Chapter) -> impl Iterator<Item = (&'a String, &'a Scene)> {
        chapter
            .scenes
            .iter()
            .filter_map(|id| self.scenes.get(id).map(|sc| (id, sc)))
    }

    /// Lists every ID referenced from an order list or a scene that has no element
    pub fn dangling_references(&self) -> Vec<String> {
        let mut missing = Vec::new();

        collect_missing(&mut missing, "chapter", &self.srt_chapters, &self.chapters);
        collect_missing(&mut missing, "character", &self.srt_characters, &self.characters);
        collect_missing(&mut missing, "location", &self.srt_locations, &self.locations);
        collect_missing(&mut missing, "item", &self.srt_items, &self.items);

        for chapter in self.chapters.values() {
            collect_missing(&mut missing, "scene", &chapter.scenes, &self.scenes);
        }
        for scene in self.scenes.values() {
            collect_missing(&mut missing, "character", &scene.characters, &self.characters);
            collect_missing(&mut missing, "location", &scene.locations, &self.locations);
            collect_missing(&mut missing, "item", &scene.items, &self.items);
        }

        missing
    }
}

fn collect_missing<V>(missing: &mut Vec<String>, kind: &str, ids: &[String], map: &HashMap<String, V>) {
    for id in ids {
        if !map.contains_key(id) {
            missing.push(format!("{} {}", kind, id));
        }
    }
}
