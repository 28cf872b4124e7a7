//! Conversion settings
//!
//! Settings are read from `--config <path>` if given, else from
//! `~/.config/mm2nw/config.toml` (platform equivalent), else built-in
//! defaults. Every key is optional; a partial file overrides only what it names.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// FreeMind icons that classify nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IconSettings {
    pub locations: String,
    pub items: String,
    pub main_characters: String,
    pub minor_characters: String,
    pub notes: String,
    pub todo: String,
}

impl Default for IconSettings {
    fn default() -> Self {
        Self {
            locations: "gohome".to_string(),
            items: "password".to_string(),
            main_characters: "full-1".to_string(),
            minor_characters: "full-2".to_string(),
            notes: "info".to_string(),
            todo: "list".to_string(),
        }
    }
}

/// What gets exported, and how
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportOptions {
    pub scenes: bool,
    pub characters: bool,
    pub locations: bool,
    pub items: bool,

    /// Create a part entry for every top-level outline node, not only for
    /// nodes marked as notes or todo
    pub has_normal_parts: bool,

    /// Write every line break twice, read double breaks as single ones
    pub double_linebreaks: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scenes: true,
            characters: true,
            locations: true,
            items: true,
            has_normal_parts: true,
            double_linebreaks: true,
        }
    }
}

/// Scene status names
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StatusSettings {
    /// Source names read as "Outline"
    pub outline: Vec<String>,
    pub draft: Vec<String>,
    pub first_edit: Vec<String>,
    pub second_edit: Vec<String>,
    pub done: Vec<String>,

    /// Canonical status names, indexed by scene status
    pub scene: Vec<String>,

    /// Importance names read as a major character
    pub major_character: Vec<String>,
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            outline: strings(&["Outline", "New", "Notes"]),
            draft: strings(&["Draft", "Started", "1st Draft"]),
            first_edit: strings(&["1st Edit", "2nd Draft"]),
            second_edit: strings(&["2nd Edit", "3rd Draft"]),
            done: strings(&["Done", "Finished"]),
            scene: strings(&["None", "Outline", "Draft", "1st Edit", "2nd Edit", "Done"]),
            major_character: strings(&["Major", "Main"]),
        }
    }
}

impl StatusSettings {
    /// Returns the canonical name for a scene status
    ///
    /// Out of range values map to the last name.
    pub fn scene_status_name(&self, status: u32) -> Option<&str> {
        self.scene
            .get(status as usize)
            .or_else(|| self.scene.last())
            .map(String::as_str)
    }

    /// Maps a status name back to a scene status, defaulting to Outline
    pub fn scene_status_from_name(&self, name: &str) -> u32 {
        let groups = [
            &self.outline,
            &self.draft,
            &self.first_edit,
            &self.second_edit,
            &self.done,
        ];
        groups
            .iter()
            .position(|group| group.iter().any(|n| n == name))
            .map(|i| i as u32 + 1)
            .unwrap_or(1)
    }
}

/// Headings that divide a character sheet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeadingSettings {
    pub character_bio: String,
    pub character_goals: String,
    pub character_notes: String,
}

impl Default for HeadingSettings {
    fn default() -> Self {
        Self {
            character_bio: "## Bio".to_string(),
            character_goals: "## Goals".to_string(),
            character_notes: "## Notes".to_string(),
        }
    }
}

/// Keywords of the `%keyword: value` lines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KeywordSettings {
    pub aka: String,
    pub tag: String,
}

impl Default for KeywordSettings {
    fn default() -> Self {
        Self {
            aka: "aka".to_string(),
            tag: "tag".to_string(),
        }
    }
}

impl KeywordSettings {
    /// Line prefix for alternate names, e.g. `%aka: `
    pub fn aka_prefix(&self) -> String {
        format!("%{}: ", self.aka)
    }

    /// Line prefix for tags, e.g. `%tag: `
    pub fn tag_prefix(&self) -> String {
        format!("%{}: ", self.tag)
    }
}

/// All conversion settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub icons: IconSettings,
    pub export: ExportOptions,
    pub status: StatusSettings,
    pub headings: HeadingSettings,
    pub keywords: KeywordSettings,
}

impl Settings {
    /// Loads settings from an explicit file, or from the user config file
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()).into());
                }
                Self::from_file(path)
            }
            None => match Self::user_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parses settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Returns the per-user config directory
    pub fn user_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "mm2nw", "mm2nw").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns the per-user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        Self::user_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Renders the settings as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }

    /// Writes the settings to a file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}
