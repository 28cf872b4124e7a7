//! FreeMind mindmap reader
//!
//! The first `node` below `map` is the novel. Each of its children is a
//! group, classified by the first icon that matches the configured icons:
//!
//! | Icon              | Children become       |
//! |-------------------|-----------------------|
//! | main characters   | major characters      |
//! | minor characters  | minor characters      |
//! | locations         | locations             |
//! | items             | items                 |
//! | anything else     | a part with chapters, each chapter with scenes |

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::{Chapter, ChapterLevel, Character, ElementType, Novel, Scene, WorldElement};
use crate::storage::config::Settings;
use crate::storage::xml::XmlElement;

#[derive(Debug, Error)]
pub enum MindmapError {
    #[error("Can not process \"{}\".", .0.display())]
    Unreadable(PathBuf),

    #[error("Mindmap \"{}\" has no root node.", .0.display())]
    NoRootNode(PathBuf),
}

/// What a top-level group node holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    MajorCharacters,
    MinorCharacters,
    Locations,
    Items,
    Part,
}

/// Reads a mindmap outline into a [`Novel`]
pub struct MindmapReader<'a> {
    settings: &'a Settings,
}

impl<'a> MindmapReader<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Reads and parses a `.mm` file
    pub fn read_file(&self, path: &Path) -> Result<Novel, MindmapError> {
        let source =
            fs::read_to_string(path).map_err(|_| MindmapError::Unreadable(path.to_path_buf()))?;
        let map =
            XmlElement::parse(&source).map_err(|_| MindmapError::Unreadable(path.to_path_buf()))?;
        self.read(&map)
            .ok_or_else(|| MindmapError::NoRootNode(path.to_path_buf()))
    }

    /// Builds the novel from a parsed `map` element
    ///
    /// Returns None if there is no root node.
    pub fn read(&self, map: &XmlElement) -> Option<Novel> {
        let root = map.find("node")?;

        let mut novel = Novel::new();
        novel.title = node_title(root);
        novel.desc = node_desc(root);

        let export = &self.settings.export;
        for group in root.find_all("node") {
            match self.classify(group) {
                Group::MajorCharacters if export.characters => {
                    read_characters(&mut novel, group, true)
                }
                Group::MinorCharacters if export.characters => {
                    read_characters(&mut novel, group, false)
                }
                Group::Locations if export.locations => {
                    for node in group.find_all("node") {
                        novel.add_location(world_element(node));
                    }
                }
                Group::Items if export.items => {
                    for node in group.find_all("node") {
                        novel.add_item(world_element(node));
                    }
                }
                Group::Part if export.scenes => self.read_part(&mut novel, group),
                _ => {}
            }
        }

        Some(novel)
    }

    fn classify(&self, node: &XmlElement) -> Group {
        let icons = &self.settings.icons;
        for icon in icon_names(node) {
            if icon == icons.main_characters {
                return Group::MajorCharacters;
            }
            if icon == icons.minor_characters {
                return Group::MinorCharacters;
            }
            if icon == icons.locations {
                return Group::Locations;
            }
            if icon == icons.items {
                return Group::Items;
            }
        }
        Group::Part
    }

    /// Returns Notes or Todo for the first matching icon, else Normal
    fn element_type(&self, node: &XmlElement) -> ElementType {
        let icons = &self.settings.icons;
        for icon in icon_names(node) {
            if icon == icons.notes {
                return ElementType::Notes;
            }
            if icon == icons.todo {
                return ElementType::Todo;
            }
        }
        ElementType::Normal
    }

    fn read_part(&self, novel: &mut Novel, part_node: &XmlElement) {
        let mut part_type = self.element_type(part_node);

        if self.settings.export.has_normal_parts || !part_type.is_normal() {
            let mut part = Chapter::new(node_title(part_node), ChapterLevel::Part);
            part.desc = node_desc(part_node);
            part.chapter_type = part_type;
            novel.add_chapter(part);
        } else {
            part_type = ElementType::Normal;
        }

        for chapter_node in part_node.find_all("node") {
            let mut chapter = Chapter::new(node_title(chapter_node), ChapterLevel::Chapter);
            chapter.desc = node_desc(chapter_node);
            chapter.chapter_type = if part_type.is_normal() {
                self.element_type(chapter_node)
            } else {
                part_type
            };
            let chapter_type = chapter.chapter_type;
            let chapter_id = novel.add_chapter(chapter);

            for scene_node in chapter_node.find_all("node") {
                let mut scene = Scene::new(node_title(scene_node));
                scene.desc = node_desc(scene_node);
                scene.scene_type = if chapter_type.is_normal() {
                    self.element_type(scene_node)
                } else {
                    chapter_type
                };
                novel.add_scene_to(&chapter_id, scene);
            }
        }
    }
}

fn read_characters(novel: &mut Novel, group: &XmlElement, is_major: bool) {
    for node in group.find_all("node") {
        let mut character = Character::new(node_title(node), is_major);
        character.desc = node_desc(node);
        novel.add_character(character);
    }
}

fn world_element(node: &XmlElement) -> WorldElement {
    let mut element = WorldElement::new(node_title(node));
    element.desc = node_desc(node);
    element
}

fn icon_names(node: &XmlElement) -> impl Iterator<Item = &str> {
    node.find_all("icon")
        .map(|icon| icon.attr("BUILTIN").unwrap_or_default())
}

/// Text of the first `richcontent` child of the given type, trimmed
fn rich_text(node: &XmlElement, kind: &str) -> Option<String> {
    node.find_all("richcontent")
        .find(|rc| rc.attr("TYPE") == Some(kind))
        .map(|rc| rc.text_content().trim().to_string())
}

/// The `TEXT` attribute, else the rich text node title
fn node_title(node: &XmlElement) -> String {
    match node.attr("TEXT") {
        Some(text) => text.to_string(),
        None => rich_text(node, "NODE").unwrap_or_default(),
    }
}

fn node_desc(node: &XmlElement) -> String {
    rich_text(node, "NOTE").unwrap_or_default()
}
