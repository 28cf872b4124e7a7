//! mm2nw - Convert FreeMind mindmaps into novelWriter projects
//!
//! A mindmap outline (parts, chapters, scenes, characters, locations and
//! items as nodes) becomes a novelWriter project directory with its project
//! index and one content file per document. Projects can be read back into
//! the same novel model.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Chapter, Character, Novel, Scene, WorldElement};
