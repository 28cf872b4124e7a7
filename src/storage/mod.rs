//! # Storage Layer
//!
//! File formats read and written by mm2nw.
//!
//! ## Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Mindmap | FreeMind XML | `<name>.mm` |
//! | Project index | novelWriter XML | `<name>.nw/nwProject.nwx` |
//! | Content | novelWriter markdown | `<name>.nw/content/{handle}.nwd` |
//! | Settings | TOML | `<config dir>/mm2nw/config.toml` |
//!
//! All project files are written atomically (temp file + rename).
//!
//! ## Project Structure
//!
//! ```text
//! story.mm
//! story.nw/
//! ├── nwProject.nwx         # Project tree, settings and metadata
//! ├── nwProject.lock        # Present while novelWriter has the project open
//! └── content/
//!     └── 9a4c0e51f2b7d.nwd # One file per FILE item
//! story.nw.bak/             # Previous project, moved aside
//! ```
//!
//! ## Key Types
//!
//! - [`MindmapReader`] - Builds a novel from a mindmap
//! - [`ProjectWriter`] - Writes a novel as a project
//! - [`ProjectReader`] - Reads a project back into a novel
//! - [`ProjectTarget`] - Prepares the project directory
//! - [`Settings`] - User configuration

mod config;
pub mod content;
mod markup;
mod mindmap;
mod nwx;
mod project;
mod xml;

pub use config::{
    ConfigError, ExportOptions, HeadingSettings, IconSettings, KeywordSettings, Settings,
    StatusSettings,
};
pub use markup::MarkupConverter;
pub use mindmap::{MindmapError, MindmapReader};
pub use nwx::{
    FormatVersion, ItemClass, ItemLayout, ItemType, LookupEntry, LookupTable, NwItem,
    ProjectReader, ProjectWriter, Tables, WriteSummary, FORMAT_VERSIONS,
};
pub use project::{backup_path, ProjectError, ProjectTarget, LOCK_FILE, PROJECT_FILE};
pub use xml::{XmlElement, XmlError, XmlNode};
