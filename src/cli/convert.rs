//! Mindmap conversion command

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use super::output::Output;
use crate::storage::{MindmapReader, ProjectTarget, ProjectWriter, Settings, WriteSummary};

const SOURCE_EXTENSION: &str = "mm";

/// What a conversion produced
#[derive(Debug)]
pub struct Conversion {
    pub summary: WriteSummary,

    /// Where the previous project was moved, if there was one
    pub backup: Option<PathBuf>,

    pub chapters: usize,
    pub scenes: usize,
    pub characters: usize,
    pub locations: usize,
    pub items: usize,
}

/// Converts `source` into `<dir>/<stem>.nw`
///
/// The mindmap is read before the target directory is touched.
pub fn convert(source: &Path, settings: &Settings) -> Result<Conversion> {
    if !source.is_file() {
        bail!("File \"{}\" not found.", source.display());
    }
    // Extension match is case sensitive
    if source.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
        bail!("File type of \"{}\" not supported.", source.display());
    }

    let novel = MindmapReader::new(settings).read_file(source)?;

    let target = ProjectTarget::for_source(source);
    let backup = target.prepare()?;
    let summary = ProjectWriter::new(settings).write(&novel, target.dir())?;

    Ok(Conversion {
        summary,
        backup,
        chapters: novel.srt_chapters.len(),
        scenes: novel.scenes.len(),
        characters: novel.characters.len(),
        locations: novel.locations.len(),
        items: novel.items.len(),
    })
}

pub fn run(source: &Path, silent: bool, settings: &Settings, output: &Output) -> Result<()> {
    let conversion = convert(source, settings)?;

    if let Some(backup) = &conversion.backup {
        output.verbose_ctx("convert", &format!("Backup folder \"{}\" saved.", backup.display()));
    }
    output.verbose_ctx(
        "convert",
        &format!(
            "Read {} chapters, {} scenes, {} characters, {} locations, {} items",
            conversion.chapters,
            conversion.scenes,
            conversion.characters,
            conversion.locations,
            conversion.items
        ),
    );
    output.verbose_ctx(
        "convert",
        &format!(
            "Wrote {} project items, {} content files",
            conversion.summary.items, conversion.summary.content_files
        ),
    );

    output.silenced(silent).success(&format!(
        "File written: \"{}\".",
        conversion.summary.index_path.display()
    ));

    Ok(())
}
