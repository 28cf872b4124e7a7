//! Domain models for mm2nw
//!
//! Contains the novel model and ID allocation without any I/O concerns.

mod id;
mod novel;

pub use id::{next_id, Handle, HandleRegistry, IdError, HANDLE_SIZE};
pub use novel::{
    count_letters, count_words, Chapter, ChapterLevel, Character, Describe, ElementType, Novel,
    Scene, WorldElement, STATUS_OUTLINE,
};
