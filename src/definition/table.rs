//! Static table of mini-game definitions, keyed by mini-game id
//!
//! Definitions are authored as TOML files holding `[[minigame]]` entries:
//!
//! ```toml
//! [[minigame]]
//! id = "Station.Safe.Keypad"
//! type = "Simulator.MiniGame.Type.Sequence"
//! camera_mode = "Camera.Mode.Station.Numpad"
//!
//! [[minigame.objectives.entries]]
//! condition = { tag = "Simulator.MiniGame.Objective.CodeEntered", target = 1.0 }
//!
//! [minigame.mechanic]
//! kind = "sequence"
//! expected = ["Input.Numpad.4", "Input.Numpad.2"]
//! ```
//!
//! Entries without objectives get the single mandatory objective their
//! mechanic reports on.

use std::path::Path;

use ahash::AHashMap;
use serde::Deserialize;

use super::MiniGameDefinition;
use crate::core::error::{MiniGameError, Result};
use crate::core::tag::Tag;

#[derive(Debug, Deserialize)]
struct DefinitionFile {
    #[serde(default)]
    minigame: Vec<MiniGameDefinition>,
}

/// Lookup table of definitions
#[derive(Debug, Default, Clone)]
pub struct DefinitionTable {
    definitions: AHashMap<Tag, MiniGameDefinition>,
}

impl DefinitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing any previous one with the same id.
    ///
    /// Rejects definitions that fail validation.
    pub fn insert(&mut self, mut definition: MiniGameDefinition) -> Result<()> {
        definition.fill_default_objectives();
        definition.validate()?;
        if self.definitions.contains_key(&definition.id) {
            tracing::warn!(id = %definition.id, "Replacing existing mini-game definition");
        }
        self.definitions.insert(definition.id, definition);
        Ok(())
    }

    /// Parse a TOML document and insert every entry. Returns the ids loaded.
    pub fn load_str(&mut self, content: &str) -> Result<Vec<Tag>> {
        let file: DefinitionFile = toml::from_str(content)?;
        let mut ids = Vec::with_capacity(file.minigame.len());
        for definition in file.minigame {
            ids.push(definition.id);
            self.insert(definition)?;
        }
        Ok(ids)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut table = Self::new();
        table.load_str(content)?;
        Ok(table)
    }

    /// Load a single TOML file
    pub fn load_file(&mut self, path: &Path) -> Result<Vec<Tag>> {
        let content = std::fs::read_to_string(path)?;
        self.load_str(&content)
            .map_err(|e| MiniGameError::ParseError(format!("{}: {}", path.display(), e)))
    }

    /// Load all .toml files from a directory recursively
    pub fn load_directory(&mut self, path: &Path) -> Result<Vec<Tag>> {
        let mut ids = Vec::new();
        self.load_directory_recursive(path, &mut ids)?;
        tracing::info!(count = ids.len(), path = %path.display(), "Loaded mini-game definitions");
        Ok(ids)
    }

    fn load_directory_recursive(&mut self, path: &Path, ids: &mut Vec<Tag>) -> Result<()> {
        let mut entries = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();

        for entry_path in entries {
            if entry_path.is_dir() {
                self.load_directory_recursive(&entry_path, ids)?;
            } else if entry_path.extension().map_or(false, |ext| ext == "toml") {
                ids.extend(self.load_file(&entry_path)?);
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &Tag) -> Option<&MiniGameDefinition> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &Tag) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &Tag> {
        self.definitions.keys()
    }
}
