//! Project inspection command

use std::ffi::OsStr;
use std::path::Path;

use anyhow::Result;

use super::output::Output;
use crate::domain::{ChapterLevel, Novel};
use crate::storage::{ProjectReader, Settings, PROJECT_FILE};

pub fn run(path: &Path, settings: &Settings, output: &Output) -> Result<()> {
    // Accept the index file as well as its directory
    let project_dir = if path.file_name() == Some(OsStr::new(PROJECT_FILE)) {
        path.parent().unwrap_or(path)
    } else {
        path
    };

    output.verbose_ctx("inspect", &format!("Reading {}", project_dir.display()));
    let novel = ProjectReader::new(settings).read(project_dir)?;

    if output.is_json() {
        output.data(&novel);
    } else {
        print_outline(&novel);
    }

    Ok(())
}

fn print_outline(novel: &Novel) {
    let title = if novel.title.is_empty() {
        "(untitled)"
    } else {
        novel.title.as_str()
    };
    println!("{}", title);
    if !novel.author_name.is_empty() {
        println!("by {}", novel.author_name);
    }
    println!("{}", "=".repeat(40));

    for (_, chapter) in novel.chapters() {
        let indent = match chapter.level {
            ChapterLevel::Part => "",
            ChapterLevel::Chapter => "  ",
        };
        println!("{}{}", indent, chapter.title);

        for (_, scene) in novel.scenes_of(chapter) {
            println!("{}  - {} ({} words)", indent, scene.title, scene.word_count());
        }
    }

    println!();
    println!("Chapters:   {}", novel.srt_chapters.len());
    println!("Scenes:     {}", novel.scenes.len());
    println!("Characters: {}", novel.characters.len());
    println!("Locations:  {}", novel.locations.len());
    println!("Items:      {}", novel.items.len());
}
