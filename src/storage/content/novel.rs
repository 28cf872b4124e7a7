//! Chapter and scene text
//!
//! A novel content file holds a part or chapter heading (`#`, `##`) or a
//! scene (`###`, or `####` to append to the previous scene). Scene metadata
//! follows the heading:
//!
//! ```text
//! ### Scene title
//!
//! @pov: Ann_Lee
//! @char: Bob
//! @location: Old_Town
//! @object: Brass_Key
//! %tag: flashback
//!
//! % synopsis: First line.	Second line.
//!
//!
//! Scene text
//! ```
//!
//! Reading is a state machine folded over classified lines. The state carries
//! over from one file to the next, so scene files attach to the chapter whose
//! heading file precedes them.

use crate::domain::{Chapter, ChapterLevel, ElementType, Novel, Scene};
use crate::storage::config::Settings;
use crate::storage::markup::MarkupConverter;

use super::{from_reference, keyword_value, to_reference};

const POV_TAG: &str = "@pov: ";
const CHARACTER_TAG: &str = "@char: ";
const LOCATION_TAG: &str = "@location: ";
const ITEM_TAG: &str = "@object: ";
const SYNOPSIS_KEYWORD: &str = "synopsis:";

/// Attributes shared by everything read from one content file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileContext {
    pub element_type: ElementType,
    pub status: u32,
}

/// A classified content line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'l> {
    Blank,

    /// Metadata and unknown keyword lines
    Ignored,

    Pov(String),
    Character(String),
    Location(String),
    Item(String),
    Tag(&'l str),
    Synopsis(&'l str),

    /// `#` part or `##` chapter heading
    Heading {
        level: ChapterLevel,
        title: &'l str,
    },

    /// `###` scene heading, `####` when appended to the previous scene
    SceneHeading {
        title: &'l str,
        append_to_prev: bool,
    },

    Text(&'l str),
}

/// Scene data collected until the scene is committed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDraft {
    /// Title used if text starts a scene without a heading
    pub title: String,
    pub append_to_prev: bool,

    /// Referenced titles, point of view first
    pub characters: Vec<String>,
    pub locations: Vec<String>,
    pub items: Vec<String>,
    pub tags: Vec<String>,
    pub synopsis: Vec<String>,
    pub body: Vec<String>,
}

impl SceneDraft {
    /// A draft for a scene that starts without a heading
    fn implicit(novel: &Novel) -> Self {
        Self {
            title: format!("Scene {}", novel.scenes.len() + 1),
            ..Default::default()
        }
    }

    fn headed(title: &str, append_to_prev: bool) -> Self {
        Self {
            title: title.to_string(),
            append_to_prev,
            ..Default::default()
        }
    }

    /// Records a metadata line
    fn apply(&mut self, line: &Line<'_>) {
        match line {
            Line::Pov(title) => self.characters.insert(0, title.clone()),
            Line::Character(title) => self.characters.push(title.clone()),
            Line::Location(title) => self.locations.push(title.clone()),
            Line::Item(title) => self.items.push(title.clone()),
            Line::Tag(tag) => self.tags.push(tag.to_string()),
            Line::Synopsis(text) => self.synopsis.push(text.replace('\t', "\n")),
            _ => {}
        }
    }
}

/// Position of the reader in the novel text
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReadState {
    #[default]
    BeforeAnyChapter,

    /// After a chapter heading, before its first scene
    InChapterPreScene { chapter: String, draft: SceneDraft },

    InScene {
        chapter: String,
        scene: String,
        draft: SceneDraft,
    },
}

/// Encodes and decodes chapter and scene content files
pub struct NovelCodec {
    markup: MarkupConverter,
    tag_prefix: String,
}

impl NovelCodec {
    pub fn new(settings: &Settings) -> Self {
        Self {
            markup: MarkupConverter::new(settings.export.double_linebreaks),
            tag_prefix: settings.keywords.tag_prefix(),
        }
    }

    /// Body lines of a part or chapter heading file
    pub fn encode_chapter(&self, chapter: &Chapter) -> Vec<String> {
        let heading = match chapter.level {
            ChapterLevel::Chapter => format!("## {}\n", chapter.title),
            ChapterLevel::Part => format!("# {}\n", chapter.title),
        };

        let mut lines = vec![heading];
        if !chapter.desc.is_empty() {
            lines.push(format!("\n{}\n", synopsis_line(&chapter.desc)));
        }
        lines
    }

    /// Body lines of a scene file
    ///
    /// References name their elements by title; IDs missing from the novel
    /// are skipped.
    pub fn encode_scene(&self, scene: &Scene, novel: &Novel) -> Vec<String> {
        let heading = if scene.append_to_prev { "####" } else { "###" };
        let mut lines = vec![format!("{} {}\n", heading, scene.title)];

        let cast = scene
            .characters
            .iter()
            .filter_map(|id| novel.characters.get(id))
            .enumerate();
        for (i, character) in cast {
            let tag = if i == 0 { POV_TAG } else { CHARACTER_TAG };
            lines.push(format!("{}{}", tag, to_reference(&character.title)));
        }
        for location in scene.locations.iter().filter_map(|id| novel.locations.get(id)) {
            lines.push(format!("{}{}", LOCATION_TAG, to_reference(&location.title)));
        }
        for item in scene.items.iter().filter_map(|id| novel.items.get(id)) {
            lines.push(format!("{}{}", ITEM_TAG, to_reference(&item.title)));
        }
        for tag in &scene.tags {
            lines.push(format!("{}{}", self.tag_prefix, tag));
        }

        if !scene.desc.is_empty() {
            lines.push(format!("\n{}", synopsis_line(&scene.desc)));
        }

        lines.push("\n".to_string());

        let text = self.markup.to_markdown(scene.content());
        if !text.is_empty() {
            lines.push(text);
        }
        lines
    }

    /// Classifies one content line
    pub fn classify<'l>(&self, line: &'l str) -> Line<'l> {
        if line.starts_with("%%") {
            return Line::Ignored;
        }

        if let Some(v) = line.strip_prefix(POV_TAG) {
            return Line::Pov(from_reference(v));
        }
        if let Some(v) = line.strip_prefix(CHARACTER_TAG) {
            return Line::Character(from_reference(v));
        }
        if let Some(v) = line.strip_prefix(LOCATION_TAG) {
            return Line::Location(from_reference(v));
        }
        if let Some(v) = line.strip_prefix(ITEM_TAG) {
            return Line::Item(from_reference(v));
        }
        if line.starts_with('@') {
            return Line::Ignored;
        }

        if line.starts_with('%') {
            if let Some(tag) = keyword_value(line, &self.tag_prefix) {
                return Line::Tag(tag);
            }
            let rest = line.trim_start_matches('%').trim_start();
            let is_synopsis = rest
                .get(..SYNOPSIS_KEYWORD.len())
                .is_some_and(|kw| kw.eq_ignore_ascii_case(SYNOPSIS_KEYWORD));
            if is_synopsis {
                return Line::Synopsis(rest[SYNOPSIS_KEYWORD.len()..].trim());
            }
            return Line::Ignored;
        }

        if line.starts_with('#') {
            let title = line.split_once(' ').map(|(_, t)| t).unwrap_or_default();
            if line.starts_with("###") {
                return Line::SceneHeading {
                    title,
                    append_to_prev: line.starts_with("####"),
                };
            }
            let level = if line.starts_with("##") {
                ChapterLevel::Chapter
            } else {
                ChapterLevel::Part
            };
            return Line::Heading { level, title };
        }

        if line.is_empty() {
            Line::Blank
        } else {
            Line::Text(line)
        }
    }

    /// Folds the lines of one content file into the novel
    pub fn decode(
        &self,
        novel: &mut Novel,
        state: ReadState,
        file: FileContext,
        lines: &[String],
    ) -> ReadState {
        let state = lines
            .iter()
            .fold(state, |state, line| self.step(novel, state, self.classify(line), file));
        self.finish(novel, state)
    }

    /// Applies one line
    pub fn step(&self, novel: &mut Novel, state: ReadState, line: Line<'_>, file: FileContext) -> ReadState {
        match line {
            Line::Ignored => state,

            Line::Heading { level, title } => {
                self.close(novel, state);
                open_chapter(novel, level, title, file)
            }

            Line::SceneHeading {
                title,
                append_to_prev,
            } => match self.close(novel, state) {
                // Without a chapter, a scene heading starts one
                None => open_chapter(novel, ChapterLevel::Chapter, title, file),
                Some(chapter) => {
                    let draft = SceneDraft::headed(title, append_to_prev);
                    open_scene(novel, chapter, draft, file)
                }
            },

            Line::Blank => match state {
                ReadState::InScene {
                    chapter,
                    scene,
                    mut draft,
                } => {
                    if !draft.body.is_empty() {
                        draft.body.push(String::new());
                    }
                    ReadState::InScene { chapter, scene, draft }
                }
                other => other,
            },

            Line::Text(text) => match state {
                ReadState::BeforeAnyChapter => ReadState::BeforeAnyChapter,
                ReadState::InChapterPreScene { chapter, mut draft } => {
                    take_chapter_synopsis(novel, &chapter, &mut draft);
                    draft.body.push(text.to_string());
                    open_scene(novel, chapter, draft, file)
                }
                ReadState::InScene {
                    chapter,
                    scene,
                    mut draft,
                } => {
                    draft.body.push(text.to_string());
                    ReadState::InScene { chapter, scene, draft }
                }
            },

            meta => match state {
                ReadState::BeforeAnyChapter => ReadState::BeforeAnyChapter,
                ReadState::InChapterPreScene { chapter, mut draft } => {
                    draft.apply(&meta);
                    ReadState::InChapterPreScene { chapter, draft }
                }
                ReadState::InScene {
                    chapter,
                    scene,
                    mut draft,
                } => {
                    draft.apply(&meta);
                    ReadState::InScene { chapter, scene, draft }
                }
            },
        }
    }

    /// Commits pending data at the end of a file
    ///
    /// The chapter stays open for the files that follow.
    pub fn finish(&self, novel: &mut Novel, state: ReadState) -> ReadState {
        match self.close(novel, state) {
            Some(chapter) => ReadState::InChapterPreScene {
                chapter,
                draft: SceneDraft::implicit(novel),
            },
            None => ReadState::BeforeAnyChapter,
        }
    }

    /// Commits the pending scene or chapter synopsis; returns the open chapter
    fn close(&self, novel: &mut Novel, state: ReadState) -> Option<String> {
        match state {
            ReadState::BeforeAnyChapter => None,
            ReadState::InChapterPreScene { chapter, mut draft } => {
                take_chapter_synopsis(novel, &chapter, &mut draft);
                Some(chapter)
            }
            ReadState::InScene {
                chapter,
                scene,
                mut draft,
            } => {
                while draft.body.last().is_some_and(|l| l.is_empty()) {
                    draft.body.pop();
                }
                if let Some(sc) = novel.scenes.get_mut(&scene) {
                    sc.set_content(self.markup.from_markdown(&draft.body.join("\n")));
                    sc.desc = draft.synopsis.join("\n");
                    sc.characters = draft.characters;
                    sc.locations = draft.locations;
                    sc.items = draft.items;
                    sc.tags = draft.tags;
                }
                Some(chapter)
            }
        }
    }
}

fn synopsis_line(desc: &str) -> String {
    format!("% {} {}", SYNOPSIS_KEYWORD, desc.replace('\n', "\t"))
}

fn take_chapter_synopsis(novel: &mut Novel, chapter: &str, draft: &mut SceneDraft) {
    if draft.synopsis.is_empty() {
        return;
    }
    if let Some(ch) = novel.chapters.get_mut(chapter) {
        ch.desc = draft.synopsis.join("\n");
    }
    draft.synopsis.clear();
}

fn open_chapter(novel: &mut Novel, level: ChapterLevel, title: &str, file: FileContext) -> ReadState {
    let mut chapter = Chapter::new(title, level);
    chapter.chapter_type = file.element_type;
    let chapter = novel.add_chapter(chapter);

    ReadState::InChapterPreScene {
        chapter,
        draft: SceneDraft::implicit(novel),
    }
}

fn open_scene(novel: &mut Novel, chapter: String, draft: SceneDraft, file: FileContext) -> ReadState {
    let mut scene = Scene::new(draft.title.clone());
    scene.status = file.status;
    scene.scene_type = file.element_type;
    scene.append_to_prev = draft.append_to_prev;

    match novel.add_scene_to(&chapter, scene) {
        Some(scene) => ReadState::InScene { chapter, scene, draft },
        None => ReadState::InChapterPreScene { chapter, draft },
    }
}
