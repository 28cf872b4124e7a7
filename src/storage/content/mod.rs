//! Content files
//!
//! Every FILE item of a project has a text file `content/<handle>.nwd`.
//! It starts with three metadata lines followed by the item's body:
//!
//! ```text
//! %%~name: Chapter 1
//! %%~path: 4f0c2e9ab31d7/9a4c0e51f2b7d
//! %%~kind: NOVEL/DOCUMENT
//! ## Chapter 1
//! ```
//!
//! Body lines use a small keyword grammar shared by all codecs:
//! `@keyword: value` references and `%keyword: value` pseudo tags. Unknown
//! keyword lines are ignored.

mod character;
mod novel;
mod world;

pub use character::CharacterCodec;
pub use novel::{FileContext, Line, NovelCodec, ReadState, SceneDraft};
pub use world::WorldCodec;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::Handle;
use crate::storage::nwx::NwItem;
use crate::storage::project::write_atomic;

/// Directory of the content files, relative to the project directory
pub const CONTENT_DIR: &str = "content";

pub const CONTENT_EXTENSION: &str = "nwd";

/// Reference tag line giving an element's short title
const TAG_KEYWORD: &str = "@tag:";

/// Returns the content file path of an item
pub fn content_path(project_dir: &Path, handle: &Handle) -> PathBuf {
    project_dir
        .join(CONTENT_DIR)
        .join(format!("{}.{}", handle, CONTENT_EXTENSION))
}

/// Renders the metadata preamble followed by the body lines
pub fn render(item: &NwItem, body: &[String]) -> String {
    let mut lines = vec![
        format!("%%~name: {}", item.name),
        format!("%%~path: {}/{}", item.parent_str(), item.handle),
        format!("%%~kind: {}/{}", item.class_str(), item.layout_str()),
    ];
    lines.extend(body.iter().cloned());
    lines.join("\n")
}

/// Writes the content file of an item
pub fn write_content(project_dir: &Path, item: &NwItem, body: &[String]) -> Result<()> {
    write_atomic(&content_path(project_dir, &item.handle), &render(item, body))
}

/// Reads the lines of an item's content file
pub fn read_content(project_dir: &Path, handle: &Handle) -> Result<Vec<String>> {
    let path = content_path(project_dir, handle);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Can not read \"{}\".", path.display()))?;
    Ok(text.split('\n').map(str::to_string).collect())
}

/// Returns the trimmed value of a `keyword: value` line starting with `prefix`
pub(crate) fn keyword_value<'l>(line: &'l str, prefix: &str) -> Option<&'l str> {
    line.strip_prefix(prefix).map(str::trim)
}

/// Title as written in reference lines
pub(crate) fn to_reference(title: &str) -> String {
    title.replace(' ', "_")
}

/// Title as read from reference lines
pub(crate) fn from_reference(value: &str) -> String {
    value.trim().replace('_', " ")
}

/// The `@tag:` line naming an element
pub(crate) fn tag_line(title: &str) -> String {
    format!("{} {}", TAG_KEYWORD, to_reference(title))
}

/// Returns the title carried by a `@tag:` line
pub(crate) fn tag_title(line: &str) -> Option<String> {
    keyword_value(line, TAG_KEYWORD).map(from_reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::nwx::{ItemClass, ItemLayout, ItemType};
    use tempfile::TempDir;

    fn item() -> NwItem {
        let mut item = NwItem::new(
            "9a4c0e51f2b7d".parse().unwrap(),
            Some("4f0c2e9ab31d7".parse().unwrap()),
            0,
            "Chapter 1",
            ItemType::File,
        );
        item.class = Some(ItemClass::Novel);
        item.layout = Some(ItemLayout::Document);
        item
    }

    #[test]
    fn preamble_lines() {
        let text = render(&item(), &["## Chapter 1\n".to_string()]);

        assert_eq!(
            text,
            "%%~name: Chapter 1\n%%~path: 4f0c2e9ab31d7/9a4c0e51f2b7d\n%%~kind: NOVEL/DOCUMENT\n## Chapter 1\n"
        );
    }

    #[test]
    fn write_then_read_lines() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(CONTENT_DIR)).unwrap();
        let item = item();

        write_content(dir.path(), &item, &["body".to_string()]).unwrap();
        assert!(dir.path().join("content/9a4c0e51f2b7d.nwd").is_file());

        let lines = read_content(dir.path(), &item.handle).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "body");
    }

    #[test]
    fn reading_missing_file_names_it() {
        let dir = TempDir::new().unwrap();
        let handle: Handle = "0123456789abc".parse().unwrap();

        let err = read_content(dir.path(), &handle).unwrap_err();
        assert!(err.to_string().contains("0123456789abc.nwd"));
    }

    #[test]
    fn reference_titles() {
        assert_eq!(tag_line("Old Town"), "@tag: Old_Town");
        assert_eq!(tag_title("@tag: Old_Town"), Some("Old Town".to_string()));
        assert_eq!(tag_title("@pov: Alice"), None);
        assert_eq!(keyword_value("%tag: a: b ", "%tag: "), Some("a: b"));
    }
}
