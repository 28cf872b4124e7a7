//! novelWriter project index (`nwProject.nwx`)
//!
//! The index is a flat list of `item` elements. Each item names its parent
//! by handle and its position among siblings by `order`; FILE items have a
//! content file (see [`content`](super::content)).
//!
//! Item encoding depends on the `fileVersion` attribute of the root element.
//! Supported versions are listed in [`FORMAT_VERSIONS`].

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::Local;

use crate::domain::{
    Chapter, ChapterLevel, Describe, ElementType, Handle, HandleRegistry, Novel, Scene,
};
use crate::storage::config::Settings;
use crate::storage::content::{
    self, CharacterCodec, FileContext, NovelCodec, ReadState, WorldCodec,
};
use crate::storage::project::{write_atomic, ProjectError, PROJECT_FILE};
use crate::storage::xml::XmlElement;

const NWX_TAG: &str = "novelWriterXML";
const APP_VERSION: &str = "2.0.2";
const HEX_VERSION: &str = "0x020002f0";

/// Parent attribute of root items
const NO_PARENT: &str = "None";

/// Item type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Root,
    Folder,
    File,
}

/// Item class, the project section an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemClass {
    Novel,
    Plot,
    Character,
    World,
    Timeline,
    Object,
    Entity,
    Custom,
    Archive,
    Template,
    Trash,
}

/// Item layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLayout {
    Document,
    Note,
}

macro_rules! attr_enum {
    ($ty:ty, $err:path, { $($variant:ident => $text:literal),* $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ProjectError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)*
                    other => Err($err(other.to_string())),
                }
            }
        }
    };
}

attr_enum!(ItemType, ProjectError::InvalidItem, {
    Root => "ROOT",
    Folder => "FOLDER",
    File => "FILE",
});

attr_enum!(ItemClass, ProjectError::UnknownClass, {
    Novel => "NOVEL",
    Plot => "PLOT",
    Character => "CHARACTER",
    World => "WORLD",
    Timeline => "TIMELINE",
    Object => "OBJECT",
    Entity => "ENTITY",
    Custom => "CUSTOM",
    Archive => "ARCHIVE",
    Template => "TEMPLATE",
    Trash => "TRASH",
});

attr_enum!(ItemLayout, ProjectError::InvalidItem, {
    Document => "DOCUMENT",
    Note => "NOTE",
});

/// One entry of the project tree
///
/// Status and importance hold names; keys are assigned when encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct NwItem {
    pub handle: Handle,
    pub parent: Option<Handle>,
    pub order: usize,
    pub name: String,
    pub item_type: ItemType,
    pub class: Option<ItemClass>,
    pub layout: Option<ItemLayout>,
    pub status: Option<String>,
    pub importance: Option<String>,
    pub active: Option<bool>,
    pub char_count: Option<usize>,
    pub word_count: Option<usize>,
    pub para_count: Option<usize>,
    pub cursor_pos: Option<usize>,
}

impl NwItem {
    pub fn new(
        handle: Handle,
        parent: Option<Handle>,
        order: usize,
        name: impl Into<String>,
        item_type: ItemType,
    ) -> Self {
        Self {
            handle,
            parent,
            order,
            name: name.into(),
            item_type,
            class: None,
            layout: None,
            status: None,
            importance: None,
            active: None,
            char_count: None,
            word_count: None,
            para_count: None,
            cursor_pos: None,
        }
    }

    /// Parent handle, or `None` for roots
    pub fn parent_str(&self) -> &str {
        self.parent.as_ref().map(Handle::as_str).unwrap_or(NO_PARENT)
    }

    pub fn class_str(&self) -> &str {
        self.class.map(|c| c.as_str()).unwrap_or(NO_PARENT)
    }

    pub fn layout_str(&self) -> &str {
        self.layout.map(|l| l.as_str()).unwrap_or(NO_PARENT)
    }

    /// Sets layout and active flag from a chapter or scene type
    ///
    /// Notes and todo elements are notes; unused elements are inactive.
    fn apply_element_type(&mut self, element_type: ElementType) {
        self.layout = Some(ItemLayout::Document);
        self.active = Some(true);
        match element_type {
            ElementType::Unused => self.active = Some(false),
            ElementType::Notes | ElementType::Todo => self.layout = Some(ItemLayout::Note),
            ElementType::Normal => {}
        }
    }

    /// Chapter or scene type of a novel file
    pub fn element_type(&self) -> ElementType {
        match (self.layout, self.active) {
            (Some(ItemLayout::Document), Some(true)) => ElementType::Normal,
            (Some(ItemLayout::Note), _) => ElementType::Notes,
            _ => ElementType::Unused,
        }
    }
}

/// One status or importance entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    pub key: String,
    pub name: String,
    pub rgb: (u8, u8, u8),
}

/// Status or importance table of the project settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
}

const STATUS_COLOURS: [(u8, u8, u8); 6] = [
    (230, 230, 230),
    (0, 0, 0),
    (170, 40, 0),
    (240, 140, 0),
    (250, 190, 90),
    (58, 180, 58),
];

const IMPORTANCE: [(&str, (u8, u8, u8)); 3] = [
    ("None", (220, 220, 220)),
    ("Minor", (0, 122, 188)),
    ("Major", (21, 0, 180)),
];

impl LookupTable {
    /// Scene status entries, keyed by position
    ///
    /// Only the first six names get an entry.
    pub fn scene_status(names: &[String]) -> Self {
        let entries = names
            .iter()
            .zip(STATUS_COLOURS)
            .enumerate()
            .map(|(i, (name, rgb))| LookupEntry {
                key: format!("s{:06}", i + 1),
                name: name.clone(),
                rgb,
            })
            .collect();
        Self { entries }
    }

    /// The fixed character importance entries
    pub fn importance() -> Self {
        let entries = IMPORTANCE
            .iter()
            .enumerate()
            .map(|(i, (name, rgb))| LookupEntry {
                key: format!("i{:06}", i + 1),
                name: name.to_string(),
                rgb: *rgb,
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    pub fn key_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.key.as_str())
    }

    pub fn name_of(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.name.as_str())
    }

    fn to_xml(&self, tag: &str) -> XmlElement {
        let mut element = XmlElement::new(tag);
        for entry in &self.entries {
            let (red, green, blue) = entry.rgb;
            element.push(
                XmlElement::new("entry")
                    .with_attr("key", entry.key.as_str())
                    .with_attr("count", "0")
                    .with_attr("blue", blue.to_string())
                    .with_attr("green", green.to_string())
                    .with_attr("red", red.to_string())
                    .with_text(entry.name.as_str()),
            );
        }
        element
    }

    fn from_xml(element: Option<&XmlElement>) -> Self {
        let entries = element
            .into_iter()
            .flat_map(|e| e.find_all("entry"))
            .filter_map(|entry| {
                let channel = |name| entry.attr(name).and_then(|v| v.parse().ok()).unwrap_or(0);
                Some(LookupEntry {
                    key: entry.attr("key")?.to_string(),
                    name: entry.text(),
                    rgb: (channel("red"), channel("green"), channel("blue")),
                })
            })
            .collect();
        Self { entries }
    }
}

/// Status and importance tables used to encode item names
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub status: LookupTable,
    pub importance: LookupTable,
}

/// Supported project file versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    V1_5,
}

/// `fileVersion` attribute values and their item codecs
pub const FORMAT_VERSIONS: &[(&str, FormatVersion)] = &[("1.5", FormatVersion::V1_5)];

impl FormatVersion {
    /// Version written by [`ProjectWriter`]
    pub const CURRENT: FormatVersion = FormatVersion::V1_5;

    pub fn lookup(version: &str) -> Option<Self> {
        FORMAT_VERSIONS
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, format)| *format)
    }

    pub fn as_str(&self) -> &'static str {
        FORMAT_VERSIONS
            .iter()
            .find(|(_, format)| format == self)
            .map(|(v, _)| *v)
            .unwrap_or_default()
    }

    /// Encodes an item element
    pub fn encode_item(&self, item: &NwItem, tables: &Tables) -> Result<XmlElement, ProjectError> {
        match self {
            FormatVersion::V1_5 => encode_item_v1_5(item, tables),
        }
    }

    /// Decodes an item element
    pub fn decode_item(&self, node: &XmlElement, tables: &Tables) -> Result<NwItem, ProjectError> {
        match self {
            FormatVersion::V1_5 => decode_item_v1_5(node, tables),
        }
    }
}

fn encode_item_v1_5(item: &NwItem, tables: &Tables) -> Result<XmlElement, ProjectError> {
    let mut node = XmlElement::new("item")
        .with_attr("handle", item.handle.as_str())
        .with_attr("parent", item.parent_str())
        .with_attr("order", item.order.to_string())
        .with_attr("type", item.item_type.as_str());
    if let Some(class) = item.class {
        node.set_attr("class", class.as_str());
    }
    if let Some(layout) = item.layout {
        node.set_attr("layout", layout.as_str());
    }

    let mut name = XmlElement::new("name").with_text(item.name.as_str());
    if let Some(status) = &item.status {
        let key = tables
            .status
            .key_of(status)
            .ok_or_else(|| ProjectError::UnknownStatus(status.clone()))?;
        name.set_attr("status", key);
    }
    if let Some(importance) = &item.importance {
        let key = tables
            .importance
            .key_of(importance)
            .ok_or_else(|| ProjectError::UnknownStatus(importance.clone()))?;
        name.set_attr("import", key);
    }
    if let Some(active) = item.active {
        name.set_attr("active", if active { "yes" } else { "no" });
    }
    node.push(name);

    let mut meta = XmlElement::new("meta");
    let counts = [
        ("charCount", item.char_count),
        ("wordCount", item.word_count),
        ("paraCount", item.para_count),
        ("cursorPos", item.cursor_pos),
    ];
    for (key, value) in counts {
        if let Some(value) = value {
            meta.set_attr(key, value.to_string());
        }
    }
    node.push(meta);

    Ok(node)
}

fn decode_item_v1_5(node: &XmlElement, tables: &Tables) -> Result<NwItem, ProjectError> {
    let handle_attr = node.attr("handle").unwrap_or_default();
    let handle: Handle = handle_attr
        .parse()
        .map_err(|_| ProjectError::InvalidHandle(handle_attr.to_string()))?;

    let parent = match node.attr("parent") {
        None | Some(NO_PARENT) => None,
        Some(p) => Some(
            p.parse()
                .map_err(|_| ProjectError::InvalidHandle(p.to_string()))?,
        ),
    };

    let order = node
        .attr("order")
        .unwrap_or("0")
        .parse()
        .map_err(|_| ProjectError::InvalidItem(format!("order of {}", handle)))?;

    let item_type = node.attr("type").unwrap_or_default().parse()?;

    let name_node = node.find("name");
    let name = name_node.map(XmlElement::text).unwrap_or_default();

    let mut item = NwItem::new(handle, parent, order, name, item_type);
    item.class = node.attr("class").map(str::parse).transpose()?;
    item.layout = node.attr("layout").map(str::parse).transpose()?;

    if let Some(name_node) = name_node {
        item.status = name_node
            .attr("status")
            .and_then(|key| tables.status.name_of(key))
            .map(str::to_string);
        item.importance = name_node
            .attr("import")
            .and_then(|key| tables.importance.name_of(key))
            .map(str::to_string);
        item.active = Some(matches!(name_node.attr("active"), Some("yes" | "true" | "on")));
    }

    if let Some(meta) = node.find("meta") {
        let count = |key| meta.attr(key).and_then(|v| v.parse().ok());
        item.char_count = count("charCount");
        item.word_count = count("wordCount");
        item.para_count = count("paraCount");
        item.cursor_pos = count("cursorPos");
    }

    Ok(item)
}

/// Result of a project write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub index_path: PathBuf,
    pub items: usize,
    pub content_files: usize,
}

/// Depth-first emitter of project items
///
/// Keeps one sibling order counter per nesting level. Content files are
/// written as their items are emitted.
struct TreeWalk<'a> {
    project_dir: &'a Path,
    format: FormatVersion,
    tables: &'a Tables,
    handles: HandleRegistry,
    order: Vec<usize>,
    content: XmlElement,
    items: usize,
    content_files: usize,
}

impl<'a> TreeWalk<'a> {
    fn new(project_dir: &'a Path, tables: &'a Tables) -> Self {
        Self {
            project_dir,
            format: FormatVersion::CURRENT,
            tables,
            handles: HandleRegistry::new(),
            order: vec![0],
            content: XmlElement::new("content"),
            items: 0,
            content_files: 0,
        }
    }

    fn current_order(&self) -> usize {
        self.order.last().copied().unwrap_or_default()
    }

    /// Creates an item at the current level with a fresh handle
    fn item(
        &mut self,
        seed: &str,
        parent: Option<&Handle>,
        name: &str,
        item_type: ItemType,
        class: ItemClass,
    ) -> Result<NwItem> {
        let handle = self.handles.create(seed).map_err(ProjectError::from)?;
        let mut item = NwItem::new(handle, parent.cloned(), self.current_order(), name, item_type);
        item.class = Some(class);
        Ok(item)
    }

    /// Appends the item to the tree and writes its content file
    fn emit(&mut self, item: &NwItem, body: Option<Vec<String>>) -> Result<()> {
        self.content.push(self.format.encode_item(item, self.tables)?);
        if let Some(body) = body {
            content::write_content(self.project_dir, item, &body)?;
            self.content_files += 1;
        }
        self.items += 1;
        if let Some(order) = self.order.last_mut() {
            *order += 1;
        }
        Ok(())
    }

    fn descend(&mut self) {
        self.order.push(0);
    }

    fn ascend(&mut self) {
        self.order.pop();
    }
}

/// Writes a [`Novel`] as a novelWriter project
pub struct ProjectWriter<'a> {
    settings: &'a Settings,
    timestamp: String,
}

impl<'a> ProjectWriter<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    /// Overrides the `timeStamp` attribute
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    /// Writes the index and all content files into `project_dir`
    ///
    /// The directory and its `content` subdirectory must exist.
    pub fn write(&self, novel: &Novel, project_dir: &Path) -> Result<WriteSummary> {
        let missing = novel.dangling_references();
        if !missing.is_empty() {
            return Err(ProjectError::DanglingReferences(missing).into());
        }

        let tables = Tables {
            status: LookupTable::scene_status(&self.settings.status.scene),
            importance: LookupTable::importance(),
        };

        let mut root = XmlElement::new(NWX_TAG)
            .with_attr("appVersion", APP_VERSION)
            .with_attr("hexVersion", HEX_VERSION)
            .with_attr("fileVersion", FormatVersion::CURRENT.as_str())
            .with_attr("timeStamp", self.timestamp.as_str());
        root.push(project_element(novel));

        let mut settings = XmlElement::new("settings");
        settings.push(tables.status.to_xml("status"));
        settings.push(tables.importance.to_xml("importance"));
        root.push(settings);

        let mut walk = TreeWalk::new(project_dir, &tables);
        self.write_novel(&mut walk, novel)?;
        self.write_characters(&mut walk, novel)?;
        self.write_world(&mut walk, novel)?;

        let TreeWalk {
            mut content,
            items,
            content_files,
            ..
        } = walk;
        content.set_attr("count", items.to_string());
        root.push(content);

        let index_path = project_dir.join(PROJECT_FILE);
        write_atomic(&index_path, &root.to_document()?)?;

        Ok(WriteSummary {
            index_path,
            items,
            content_files,
        })
    }

    /// Status name of headings and root folders
    fn no_status(&self) -> Option<String> {
        self.settings.status.scene_status_name(0).map(str::to_string)
    }

    fn write_novel(&self, walk: &mut TreeWalk<'_>, novel: &Novel) -> Result<()> {
        let codec = NovelCodec::new(self.settings);

        let root = walk.item("novelFolderHandle", None, "Novel", ItemType::Root, ItemClass::Novel)?;
        walk.emit(&root, None)?;
        walk.descend();

        let mut part_folder: Option<Handle> = None;
        for (id, chapter) in novel.chapters() {
            let seed = format!("{}{}", id, chapter.title);
            let parent = match chapter.level {
                ChapterLevel::Part => {
                    if part_folder.is_some() {
                        walk.ascend();
                    }
                    &root.handle
                }
                ChapterLevel::Chapter => part_folder.as_ref().unwrap_or(&root.handle),
            };

            let folder_seed = format!("{}Folder", seed);
            let folder = walk.item(&folder_seed, Some(parent), &chapter.title, ItemType::Folder, ItemClass::Novel)?;
            walk.emit(&folder, None)?;
            walk.descend();

            let mut heading = walk.item(&seed, Some(&folder.handle), &chapter.title, ItemType::File, ItemClass::Novel)?;
            heading.apply_element_type(chapter.chapter_type);
            heading.status = self.no_status();
            heading.importance = Some("None".to_string());
            walk.emit(&heading, Some(codec.encode_chapter(chapter)))?;

            self.write_scenes(walk, novel, chapter, &folder.handle, &codec)?;

            match chapter.level {
                // Chapters of this part follow inside its folder
                ChapterLevel::Part => part_folder = Some(folder.handle),
                ChapterLevel::Chapter => walk.ascend(),
            }
        }

        if part_folder.is_some() {
            walk.ascend();
        }
        walk.ascend();
        Ok(())
    }

    fn write_scenes(
        &self,
        walk: &mut TreeWalk<'_>,
        novel: &Novel,
        chapter: &Chapter,
        parent: &Handle,
        codec: &NovelCodec,
    ) -> Result<()> {
        for (id, scene) in novel.scenes_of(chapter) {
            let fallback = format!("Scene {}", walk.current_order() + 1);
            let seed = format!("{}{}", id, scene.title);
            let mut item = walk.item(&seed, Some(parent), scene.name_or(&fallback), ItemType::File, ItemClass::Novel)?;
            self.apply_scene(&mut item, scene);
            walk.emit(&item, Some(codec.encode_scene(scene, novel)))?;
        }
        Ok(())
    }

    fn apply_scene(&self, item: &mut NwItem, scene: &Scene) {
        item.apply_element_type(scene.scene_type);
        item.status = self
            .settings
            .status
            .scene_status_name(scene.status)
            .map(str::to_string);
        item.importance = Some("None".to_string());
        if scene.word_count() > 0 {
            item.word_count = Some(scene.word_count());
        }
        if scene.letter_count() > 0 {
            item.char_count = Some(scene.letter_count());
        }
    }

    /// A root folder for characters, locations or items
    fn write_root(&self, walk: &mut TreeWalk<'_>, seed: &str, name: &str, class: ItemClass) -> Result<Handle> {
        let mut root = walk.item(seed, None, name, ItemType::Root, class)?;
        root.status = self.no_status();
        root.importance = Some("None".to_string());
        walk.emit(&root, None)?;
        Ok(root.handle)
    }

    /// A character, location or item note
    fn note_item(
        &self,
        walk: &mut TreeWalk<'_>,
        seed: &str,
        parent: &Handle,
        name: &str,
        class: ItemClass,
    ) -> Result<NwItem> {
        let mut item = walk.item(seed, Some(parent), name, ItemType::File, class)?;
        item.layout = Some(ItemLayout::Note);
        item.active = Some(true);
        item.status = self.no_status();
        item.importance = Some("None".to_string());
        Ok(item)
    }

    fn write_characters(&self, walk: &mut TreeWalk<'_>, novel: &Novel) -> Result<()> {
        let codec = CharacterCodec::new(self.settings);
        let folder = self.write_root(walk, "characterFolderHandle", "Characters", ItemClass::Character)?;

        walk.descend();
        for id in &novel.srt_characters {
            let Some(character) = novel.characters.get(id) else {
                continue;
            };
            let fallback = format!("Character {}", walk.current_order() + 1);
            let name = if character.full_name.is_empty() {
                character.name_or(&fallback)
            } else {
                character.full_name.as_str()
            };

            let seed = format!("{}{}", id, character.title);
            let mut item = self.note_item(walk, &seed, &folder, name, ItemClass::Character)?;
            let importance = if character.is_major { "Major" } else { "Minor" };
            item.importance = Some(importance.to_string());
            walk.emit(&item, Some(codec.encode(character)))?;
        }
        walk.ascend();
        Ok(())
    }

    fn write_world(&self, walk: &mut TreeWalk<'_>, novel: &Novel) -> Result<()> {
        let codec = WorldCodec::new(self.settings);
        let sections = [
            ("worldFolderHandle", "Locations", ItemClass::World, "Place", &novel.srt_locations, &novel.locations),
            ("objectFolderHandle", "Items", ItemClass::Object, "Object", &novel.srt_items, &novel.items),
        ];

        for (root_seed, root_name, class, noun, order, elements) in sections {
            let folder = self.write_root(walk, root_seed, root_name, class)?;

            walk.descend();
            for id in order {
                let Some(element) = elements.get(id) else {
                    continue;
                };
                let fallback = format!("{} {}", noun, walk.current_order() + 1);
                let seed = format!("{}{}", id, element.title);
                let item = self.note_item(walk, &seed, &folder, element.name_or(&fallback), class)?;
                walk.emit(&item, Some(codec.encode(element)))?;
            }
            walk.ascend();
        }
        Ok(())
    }
}

fn project_element(novel: &Novel) -> XmlElement {
    let title = if novel.title.is_empty() {
        "New project"
    } else {
        novel.title.as_str()
    };

    let mut project = XmlElement::new("project");
    project.push(XmlElement::new("name").with_text(title));
    project.push(XmlElement::new("title").with_text(title));

    let authors: Vec<&str> = if novel.author_name.is_empty() {
        vec![""]
    } else {
        novel.author_name.split(',').map(str::trim).collect()
    };
    for author in authors {
        project.push(XmlElement::new("author").with_text(author));
    }
    project
}

/// Reads a novelWriter project into a [`Novel`]
///
/// Items are read in index order up to the first archive or trash item.
/// Scene references are resolved by title once all files are read.
pub struct ProjectReader<'a> {
    settings: &'a Settings,
}

impl<'a> ProjectReader<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn read(&self, project_dir: &Path) -> Result<Novel> {
        let index_path = project_dir.join(PROJECT_FILE);
        let source = fs::read_to_string(&index_path)
            .with_context(|| format!("Can not process \"{}\".", index_path.display()))?;
        let root = XmlElement::parse(&source)
            .with_context(|| format!("Can not process \"{}\".", index_path.display()))?;

        if root.name != NWX_TAG {
            return Err(ProjectError::NotAProject(index_path).into());
        }
        let version = root.attr("fileVersion").unwrap_or_default();
        let format = FormatVersion::lookup(version)
            .ok_or_else(|| ProjectError::UnsupportedVersion(version.to_string()))?;

        let settings = root.find("settings");
        let tables = Tables {
            status: LookupTable::from_xml(settings.and_then(|s| s.find("status"))),
            importance: LookupTable::from_xml(settings.and_then(|s| s.find("importance"))),
        };

        let mut novel = Novel::new();
        if let Some(project) = root.find("project") {
            read_project_info(&mut novel, project);
        }

        let novel_codec = NovelCodec::new(self.settings);
        let character_codec = CharacterCodec::new(self.settings);
        let world_codec = WorldCodec::new(self.settings);

        let mut handles = HandleRegistry::new();
        let mut state = ReadState::default();
        let items = root.find("content").into_iter().flat_map(|c| c.find_all("item"));

        for node in items {
            let item = format.decode_item(node, &tables)?;
            if !handles.add(item.handle.as_str()) {
                return Err(ProjectError::DuplicateHandle(item.handle.to_string()).into());
            }

            if matches!(item.class, Some(ItemClass::Archive | ItemClass::Trash)) {
                break;
            }
            if item.item_type != ItemType::File {
                continue;
            }

            match item.class {
                Some(ItemClass::Novel) => {
                    let lines = content::read_content(project_dir, &item.handle)?;
                    let file = FileContext {
                        element_type: item.element_type(),
                        status: self
                            .settings
                            .status
                            .scene_status_from_name(item.status.as_deref().unwrap_or_default()),
                    };
                    state = novel_codec.decode(&mut novel, state, file, &lines);
                }
                Some(ItemClass::Character) => {
                    let lines = content::read_content(project_dir, &item.handle)?;
                    novel.add_character(character_codec.decode(&item, &lines));
                }
                Some(ItemClass::World) => {
                    let lines = content::read_content(project_dir, &item.handle)?;
                    novel.add_location(world_codec.decode(&item, &lines));
                }
                Some(ItemClass::Object) => {
                    let lines = content::read_content(project_dir, &item.handle)?;
                    novel.add_item(world_codec.decode(&item, &lines));
                }
                _ => {}
            }
        }

        resolve_references(&mut novel)?;
        Ok(novel)
    }
}

fn read_project_info(novel: &mut Novel, project: &XmlElement) {
    if let Some(title) = project.find("title").or_else(|| project.find("name")) {
        novel.title = title.text();
    }

    let authors: Vec<String> = project
        .find_all("author")
        .map(XmlElement::text)
        .filter(|a| !a.is_empty())
        .collect();
    novel.author_name = authors.join(", ");
}

/// Replaces the titles collected in scene references by element IDs
fn resolve_references(novel: &mut Novel) -> Result<(), ProjectError> {
    let characters = ids_by_title(&novel.srt_characters, |id| {
        novel.characters.get(id).map(|c| c.title.clone())
    });
    let locations = ids_by_title(&novel.srt_locations, |id| {
        novel.locations.get(id).map(|l| l.title.clone())
    });
    let items = ids_by_title(&novel.srt_items, |id| novel.items.get(id).map(|i| i.title.clone()));

    for scene in novel.scenes.values_mut() {
        scene.characters = resolve(&characters, &scene.characters, "character")?;
        scene.locations = resolve(&locations, &scene.locations, "location")?;
        scene.items = resolve(&items, &scene.items, "item")?;
    }
    Ok(())
}

fn ids_by_title(
    order: &[String],
    title_of: impl Fn(&String) -> Option<String>,
) -> HashMap<String, String> {
    order
        .iter()
        .filter_map(|id| title_of(id).map(|title| (title, id.clone())))
        .collect()
}

fn resolve(
    ids: &HashMap<String, String>,
    titles: &[String],
    kind: &'static str,
) -> Result<Vec<String>, ProjectError> {
    titles
        .iter()
        .map(|title| {
            ids.get(title)
                .cloned()
                .ok_or_else(|| ProjectError::UnresolvedReference {
                    kind,
                    title: title.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Character, WorldElement};
    use crate::storage::content::CONTENT_DIR;
    use tempfile::TempDir;

    fn project_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(CONTENT_DIR)).unwrap();
        dir
    }

    fn demo_novel() -> Novel {
        let mut novel = Novel::new();
        novel.title = "Demo".to_string();
        novel.add_location(WorldElement::new("Cave"));
        novel.add_chapter(Chapter::new("Part I", ChapterLevel::Part));
        let ch = novel.add_chapter(Chapter::new("Chapter 1", ChapterLevel::Chapter));
        let mut scene = Scene::new("Scene 1");
        scene.desc = "Opening line.".to_string();
        novel.add_scene_to(&ch, scene).unwrap();
        novel
    }

    fn write(novel: &Novel, settings: &Settings) -> (TempDir, XmlElement) {
        let dir = project_dir();
        ProjectWriter::new(settings)
            .with_timestamp("2024-01-02 03:04:05")
            .write(novel, dir.path())
            .unwrap();
        let text = fs::read_to_string(dir.path().join(PROJECT_FILE)).unwrap();
        let root = XmlElement::parse(&text).unwrap();
        (dir, root)
    }

    fn items(root: &XmlElement) -> Vec<&XmlElement> {
        root.find("content").unwrap().find_all("item").collect()
    }

    fn name_of(item: &XmlElement) -> String {
        item.find("name").unwrap().text()
    }

    #[test]
    fn header_and_settings() {
        let (_dir, root) = write(&demo_novel(), &Settings::default());

        assert_eq!(root.name, "novelWriterXML");
        assert_eq!(root.attr("appVersion"), Some("2.0.2"));
        assert_eq!(root.attr("hexVersion"), Some("0x020002f0"));
        assert_eq!(root.attr("fileVersion"), Some("1.5"));
        assert_eq!(root.attr("timeStamp"), Some("2024-01-02 03:04:05"));

        let project = root.find("project").unwrap();
        assert_eq!(project.find("name").unwrap().text(), "Demo");
        assert_eq!(project.find("title").unwrap().text(), "Demo");
        assert_eq!(project.find_all("author").count(), 1);

        let settings = root.find("settings").unwrap();
        let status: Vec<_> = settings.find("status").unwrap().find_all("entry").collect();
        assert_eq!(status.len(), 6);
        assert_eq!(status[0].attr("key"), Some("s000001"));
        assert_eq!(status[0].text(), "None");
        assert_eq!(status[5].attr("red"), Some("58"));
        assert_eq!(status[5].attr("green"), Some("180"));
        assert_eq!(status[5].attr("count"), Some("0"));

        let importance: Vec<_> = settings.find("importance").unwrap().find_all("entry").collect();
        assert_eq!(importance.len(), 3);
        assert_eq!(importance[2].attr("key"), Some("i000003"));
        assert_eq!(importance[2].text(), "Major");
        assert_eq!(importance[2].attr("blue"), Some("180"));
    }

    #[test]
    fn demo_tree_shape() {
        let (dir, root) = write(&demo_novel(), &Settings::default());
        let items = items(&root);

        let names: Vec<_> = items.iter().map(|i| name_of(i)).collect();
        assert_eq!(
            names,
            vec![
                "Novel", "Part I", "Part I", "Chapter 1", "Chapter 1", "Scene 1", "Characters",
                "Locations", "Cave", "Items"
            ]
        );
        assert_eq!(root.find("content").unwrap().attr("count"), Some("10"));

        let handle = |i: usize| items[i].attr("handle").unwrap();
        let parent = |i: usize| items[i].attr("parent").unwrap();
        let order = |i: usize| items[i].attr("order").unwrap();

        // Novel root
        assert_eq!(parent(0), "None");
        assert_eq!(items[0].attr("type"), Some("ROOT"));
        assert_eq!(items[0].attr("class"), Some("NOVEL"));
        // Part folder and heading
        assert_eq!(parent(1), handle(0));
        assert_eq!(items[1].attr("type"), Some("FOLDER"));
        assert_eq!(parent(2), handle(1));
        assert_eq!(order(2), "0");
        // Chapter folder inside the part, heading and scene inside the chapter
        assert_eq!(parent(3), handle(1));
        assert_eq!(order(3), "1");
        assert_eq!(parent(4), handle(3));
        assert_eq!(parent(5), handle(3));
        assert_eq!(order(5), "1");
        assert_eq!(items[5].attr("layout"), Some("DOCUMENT"));
        // Root folders continue the top-level order
        assert_eq!(order(6), "1");
        assert_eq!(items[7].attr("class"), Some("WORLD"));
        assert_eq!(order(7), "2");
        assert_eq!(parent(8), handle(7));
        assert_eq!(items[8].attr("layout"), Some("NOTE"));
        assert_eq!(order(9), "3");

        for item in items.iter().filter(|i| i.attr("type") == Some("FILE")) {
            let path = dir.path().join(CONTENT_DIR).join(format!("{}.nwd", item.attr("handle").unwrap()));
            assert!(path.is_file(), "missing {}", path.display());
        }
    }

    #[test]
    fn consecutive_parts_are_siblings() {
        let mut novel = Novel::new();
        novel.add_chapter(Chapter::new("P1", ChapterLevel::Part));
        novel.add_chapter(Chapter::new("C1", ChapterLevel::Chapter));
        novel.add_chapter(Chapter::new("P2", ChapterLevel::Part));
        novel.add_chapter(Chapter::new("C2", ChapterLevel::Chapter));

        let (_dir, root) = write(&novel, &Settings::default());
        let items = items(&root);
        let find = |name: &str, kind: &str| {
            items
                .iter()
                .find(|i| name_of(i) == name && i.attr("type") == Some(kind))
                .copied()
                .unwrap()
        };

        let novel_root = items[0].attr("handle").unwrap();
        let p1 = find("P1", "FOLDER");
        let p2 = find("P2", "FOLDER");
        assert_eq!(p1.attr("parent"), Some(novel_root));
        assert_eq!(p2.attr("parent"), Some(novel_root));
        assert_eq!(p1.attr("order"), Some("0"));
        assert_eq!(p2.attr("order"), Some("1"));
        assert_eq!(find("C2", "FOLDER").attr("parent"), p2.attr("handle"));
        assert_eq!(find("C2", "FOLDER").attr("order"), Some("1"));
        assert_eq!(find("Characters", "ROOT").attr("order"), Some("1"));
    }

    #[test]
    fn chapters_without_parts_sit_under_novel_root() {
        let mut novel = Novel::new();
        let ch = novel.add_chapter(Chapter::new("C1", ChapterLevel::Chapter));
        novel.add_scene_to(&ch, Scene::new("")).unwrap();
        novel.add_chapter(Chapter::new("C2", ChapterLevel::Chapter));

        let (_dir, root) = write(&novel, &Settings::default());
        let items = items(&root);

        assert_eq!(items[1].attr("parent"), items[0].attr("handle"));
        assert_eq!(items[1].attr("order"), Some("0"));
        assert_eq!(name_of(items[3]), "Scene 2");
        assert_eq!(items[4].attr("order"), Some("1"));
        assert_eq!(items[4].attr("parent"), items[0].attr("handle"));
    }

    #[test]
    fn scene_attributes() {
        let mut novel = Novel::new();
        let ch = novel.add_chapter(Chapter::new("C", ChapterLevel::Chapter));
        let mut done = Scene::new("Done");
        done.status = 5;
        done.set_content("Three little words");
        novel.add_scene_to(&ch, done).unwrap();
        let mut odd = Scene::new("Odd");
        odd.status = 42;
        odd.scene_type = ElementType::Unused;
        novel.add_scene_to(&ch, odd).unwrap();
        let mut todo = Scene::new("Todo");
        todo.scene_type = ElementType::Todo;
        novel.add_scene_to(&ch, todo).unwrap();

        let (_dir, root) = write(&novel, &Settings::default());
        let items = items(&root);
        let scene = |name: &str| items.iter().find(|i| name_of(i) == name).copied().unwrap();

        let done = scene("Done");
        assert_eq!(done.find("name").unwrap().attr("status"), Some("s000006"));
        assert_eq!(done.find("name").unwrap().attr("active"), Some("yes"));
        assert_eq!(done.find("meta").unwrap().attr("wordCount"), Some("3"));
        assert_eq!(done.find("meta").unwrap().attr("charCount"), Some("18"));

        let odd = scene("Odd");
        assert_eq!(odd.find("name").unwrap().attr("status"), Some("s000006"));
        assert_eq!(odd.find("name").unwrap().attr("active"), Some("no"));
        assert!(odd.find("meta").unwrap().attributes.is_empty());

        assert_eq!(scene("Todo").attr("layout"), Some("NOTE"));
    }

    #[test]
    fn characters_get_importance_and_fallback_names() {
        let mut novel = Novel::new();
        let mut ann = Character::new("Ann", true);
        ann.full_name = "Ann Lee".to_string();
        novel.add_character(ann);
        novel.add_character(Character::new("", false));

        let (_dir, root) = write(&novel, &Settings::default());
        let items = items(&root);

        let ann = items.iter().find(|i| name_of(i) == "Ann Lee").unwrap();
        assert_eq!(ann.find("name").unwrap().attr("import"), Some("i000003"));
        assert_eq!(ann.attr("class"), Some("CHARACTER"));
        let nameless = items.iter().find(|i| name_of(i) == "Character 2").unwrap();
        assert_eq!(nameless.find("name").unwrap().attr("import"), Some("i000002"));
    }

    #[test]
    fn dangling_reference_fails_before_writing() {
        let mut novel = demo_novel();
        let scene = novel.scenes.get_mut("1").unwrap();
        scene.characters.push("7".to_string());

        let dir = project_dir();
        let err = ProjectWriter::new(&Settings::default())
            .write(&novel, dir.path())
            .unwrap_err();

        assert!(err.to_string().contains("character 7"));
        assert!(!dir.path().join(PROJECT_FILE).exists());
    }

    #[test]
    fn authors_are_split() {
        let mut novel = Novel::new();
        novel.author_name = "Ann, Bob".to_string();

        let (_dir, root) = write(&novel, &Settings::default());
        let authors: Vec<_> = root
            .find("project")
            .unwrap()
            .find_all("author")
            .map(XmlElement::text)
            .collect();
        assert_eq!(authors, vec!["Ann", "Bob"]);
        assert_eq!(root.find("project").unwrap().find("title").unwrap().text(), "New project");
    }

    #[test]
    fn short_status_tuple_omits_entries() {
        let mut settings = Settings::default();
        settings.status.scene = vec!["None".to_string(), "Outline".to_string()];

        let (_dir, root) = write(&Novel::new(), &settings);
        let status = root.find("settings").unwrap().find("status").unwrap();
        assert_eq!(status.find_all("entry").count(), 2);
    }

    #[test]
    fn format_version_lookup() {
        assert_eq!(FormatVersion::lookup("1.5"), Some(FormatVersion::V1_5));
        assert_eq!(FormatVersion::lookup("1.3"), None);
        assert_eq!(FormatVersion::CURRENT.as_str(), "1.5");
    }

    #[test]
    fn item_encoding_roundtrip() {
        let tables = Tables {
            status: LookupTable::scene_status(&Settings::default().status.scene),
            importance: LookupTable::importance(),
        };
        let mut item = NwItem::new(
            "0123456789abc".parse().unwrap(),
            Some("abcdef0123456".parse().unwrap()),
            4,
            "Scene",
            ItemType::File,
        );
        item.class = Some(ItemClass::Novel);
        item.layout = Some(ItemLayout::Document);
        item.status = Some("Draft".to_string());
        item.importance = Some("None".to_string());
        item.active = Some(true);
        item.word_count = Some(12);

        let node = FormatVersion::V1_5.encode_item(&item, &tables).unwrap();
        let keys: Vec<_> = node.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["handle", "parent", "order", "type", "class", "layout"]);

        let back = FormatVersion::V1_5.decode_item(&node, &tables).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn unknown_status_name_is_an_error() {
        let tables = Tables::default();
        let mut item = NwItem::new("0123456789abc".parse().unwrap(), None, 0, "x", ItemType::Root);
        item.status = Some("Nope".to_string());

        assert!(matches!(
            FormatVersion::V1_5.encode_item(&item, &tables),
            Err(ProjectError::UnknownStatus(_))
        ));
    }

    #[test]
    fn element_type_from_item() {
        let mut item = NwItem::new("0123456789abc".parse().unwrap(), None, 0, "x", ItemType::File);
        item.apply_element_type(ElementType::Normal);
        assert_eq!(item.element_type(), ElementType::Normal);
        item.apply_element_type(ElementType::Todo);
        assert_eq!(item.element_type(), ElementType::Notes);
        item.apply_element_type(ElementType::Unused);
        assert_eq!(item.element_type(), ElementType::Unused);
    }

    #[test]
    fn read_back_written_project() {
        let mut novel = demo_novel();
        let ann = novel.add_character(Character::new("Ann Lee", true));
        let scene = novel.scenes.get_mut("1").unwrap();
        scene.characters = vec![ann];
        scene.locations = vec!["1".to_string()];
        scene.status = 2;
        scene.set_content("Dark [i]inside[/i].");
        novel.author_name = "Ann, Bob".to_string();

        let settings = Settings::default();
        let (dir, _root) = write(&novel, &settings);
        let back = ProjectReader::new(&settings).read(dir.path()).unwrap();

        assert_eq!(back.title, "Demo");
        assert_eq!(back.author_name, "Ann, Bob");
        let titles: Vec<_> = back.chapters().map(|(_, c)| (c.title.as_str(), c.level)).collect();
        assert_eq!(
            titles,
            vec![("Part I", ChapterLevel::Part), ("Chapter 1", ChapterLevel::Chapter)]
        );

        let (_, chapter) = back.chapters().nth(1).unwrap();
        let (_, scene) = back.scenes_of(chapter).next().unwrap();
        assert_eq!(scene.title, "Scene 1");
        assert_eq!(scene.desc, "Opening line.");
        assert_eq!(scene.status, 2);
        assert_eq!(scene.content(), "Dark [i]inside[/i].");
        assert_eq!(back.characters[&scene.characters[0]].title, "Ann Lee");
        assert!(back.characters[&scene.characters[0]].is_major);
        assert_eq!(back.locations[&scene.locations[0]].title, "Cave");
    }

    #[test]
    fn reader_rejects_other_versions_and_files() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::default();

        fs::write(dir.path().join(PROJECT_FILE), r#"<novelWriterXML fileVersion="1.3"/>"#).unwrap();
        let err = ProjectReader::new(&settings).read(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProjectError>(),
            Some(ProjectError::UnsupportedVersion(_))
        ));

        fs::write(dir.path().join(PROJECT_FILE), "<map/>").unwrap();
        let err = ProjectReader::new(&settings).read(dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<ProjectError>(), Some(ProjectError::NotAProject(_))));
    }

    #[test]
    fn reader_rejects_duplicate_handles() {
        let dir = TempDir::new().unwrap();
        let index = r#"<novelWriterXML fileVersion="1.5"><content>
<item handle="0123456789abc" parent="None" order="0" type="ROOT" class="NOVEL"><name>Novel</name><meta/></item>
<item handle="0123456789abc" parent="None" order="1" type="ROOT" class="WORLD"><name>W</name><meta/></item>
</content></novelWriterXML>"#;
        fs::write(dir.path().join(PROJECT_FILE), index).unwrap();

        let err = ProjectReader::new(&Settings::default()).read(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProjectError>(),
            Some(ProjectError::DuplicateHandle(_))
        ));
    }

    #[test]
    fn reader_stops_at_trash_and_reports_unknown_references() {
        let dir = project_dir();
        let index = r#"<novelWriterXML fileVersion="1.5"><content>
<item handle="aaaaaaaaaaaaa" parent="None" order="0" type="ROOT" class="NOVEL"><name>Novel</name><meta/></item>
<item handle="bbbbbbbbbbbbb" parent="aaaaaaaaaaaaa" order="0" type="FILE" class="NOVEL" layout="DOCUMENT"><name active="yes">S</name><meta/></item>
<item handle="ccccccccccccc" parent="None" order="1" type="ROOT" class="TRASH"><name>Trash</name><meta/></item>
<item handle="ddddddddddddd" parent="ccccccccccccc" order="0" type="FILE" class="NOVEL" layout="DOCUMENT"><name>Gone</name><meta/></item>
</content></novelWriterXML>"#;
        fs::write(dir.path().join(PROJECT_FILE), index).unwrap();
        fs::write(
            dir.path().join(CONTENT_DIR).join("bbbbbbbbbbbbb.nwd"),
            "## C\n### S\n@pov: Nobody\nText",
        )
        .unwrap();

        let err = ProjectReader::new(&Settings::default()).read(dir.path()).unwrap_err();
        match err.downcast_ref::<ProjectError>() {
            Some(ProjectError::UnresolvedReference { kind, title }) => {
                assert_eq!(*kind, "character");
                assert_eq!(title, "Nobody");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
