use serene_core::{Result, SereneError};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

pub mod entry;

pub use entry::{mood_label, JournalEntry, NEW_ENTRY_TITLE};

/// A patient's journal, newest entries first.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a journal from a JSON file. A missing file is an empty journal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No journal at {:?}, starting empty", path);
            return Ok(Self::new());
        }

        let json = fs::read_to_string(path)?;
        let entries: Vec<JournalEntry> = serde_json::from_str(&json)?;
        debug!("Loaded {} journal entries from {:?}", entries.len(), path);
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, json)?;

        info!("Saved {} journal entries to {:?}", self.entries.len(), path);
        Ok(())
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&JournalEntry> {
        self.entries.iter().find(|e| e.id == *id)
    }

    /// Prepend a blank "New Entry" and return it for editing.
    pub fn new_entry(&mut self) -> &JournalEntry {
        self.add(JournalEntry::blank())
    }

    pub fn add(&mut self, entry: JournalEntry) -> &JournalEntry {
        debug!("Adding journal entry {}", entry.id);
        self.entries.insert(0, entry);
        &self.entries[0]
    }

    /// Replace an entry's title and content, keeping its date, mood and tags.
    pub fn save_entry(
        &mut self,
        id: &Uuid,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<&JournalEntry> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == *id)
            .ok_or_else(|| SereneError::JournalError(format!("No journal entry with id {}", id)))?;

        entry.title = title.into();
        entry.content = content.into();
        debug!("Updated journal entry {}", id);
        Ok(entry)
    }

    pub fn set_mood(&mut self, id: &Uuid, mood: Option<u8>) -> Result<()> {
        if let Some(mood) = mood {
            entry::validate_mood(mood)?;
        }
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == *id)
            .ok_or_else(|| SereneError::JournalError(format!("No journal entry with id {}", id)))?;
        entry.mood = mood;
        Ok(())
    }

    /// Entries whose title, content or tags contain `term`, in journal order.
    pub fn search(&self, term: &str) -> Vec<&JournalEntry> {
        self.entries.iter().filter(|e| e.matches(term)).collect()
    }

    /// Resolve a full id or a unique id prefix, as printed by `journal list`.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(id_or_prefix) {
            return Ok(id);
        }

        let prefix = id_or_prefix.to_lowercase();
        let mut matches = self
            .entries
            .iter()
            .filter(|e| !prefix.is_empty() && e.id.to_string().starts_with(&prefix));

        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(entry.id),
            (None, _) => Err(SereneError::JournalError(format!(
                "No journal entry matches '{}'",
                id_or_prefix
            ))),
            (Some(_), Some(_)) => Err(SereneError::JournalError(format!(
                "Journal id prefix '{}' is ambiguous",
                id_or_prefix
            ))),
        }
    }
}
