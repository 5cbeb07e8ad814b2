//! Document store for extracted bulletin text.
//!
//! A bulletin counts as processed when the store holds a non-empty document
//! for its identifier.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Persistence for bulletin documents, keyed by bulletin identifier.
///
/// Implementations serialize writes; they are shared between batch workers.
pub trait DocumentStore: Send + Sync {
    /// True if a non-empty document exists for `id`.
    fn has_document(&self, id: &str) -> Result<bool>;

    fn save_document(&self, id: &str, text: &str) -> Result<()>;

    /// Removes the document for `id` so the bulletin is processed again.
    fn clear_document(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub ocr_data: String,
    pub processed_at: DateTime<Local>,
}

/// JSON file mapping bulletin id → document. The whole file is rewritten on
/// every change.
pub struct JsonFileStore {
    path: PathBuf,
    documents: Mutex<BTreeMap<String, StoredDocument>>,
}

impl JsonFileStore {
    /// Opens the store, starting empty if the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let documents = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read document store {}", path.display()))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse document store {}", path.display()))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            documents: Mutex::new(documents),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredDocument>>> {
        self.documents
            .lock()
            .map_err(|_| anyhow!("Document store lock poisoned"))
    }

    fn persist(&self, documents: &BTreeMap<String, StoredDocument>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create document store directory")?;
        }
        let json = serde_json::to_string_pretty(documents)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write document store {}", self.path.display()))
    }

    /// Returns the stored text for `id`, if any.
    #[cfg(test)]
    pub fn get_document(&self, id: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(id).map(|d| d.ocr_data.clone()))
    }

    /// Rewrites documents holding escaped paragraph breaks (literal `\n\n`)
    /// with real newlines. Documents with only a lone `\n` are left alone.
    /// Returns the number of documents changed.
    pub fn repair_escaped_newlines(&self) -> Result<usize> {
        let mut documents = self.lock()?;
        let mut fixed = 0;

        for (id, document) in documents.iter_mut() {
            if document.ocr_data.contains("\\n\\n") {
                document.ocr_data = document.ocr_data.replace("\\n", "\n");
                crate::log(&format!("Repaired escaped newlines: id={}", id));
                fixed += 1;
            }
        }

        if fixed > 0 {
            self.persist(&documents)?;
        }
        Ok(fixed)
    }
}

impl DocumentStore for JsonFileStore {
    fn has_document(&self, id: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .get(id)
            .is_some_and(|d| !d.ocr_data.trim().is_empty()))
    }

    fn save_document(&self, id: &str, text: &str) -> Result<()> {
        let mut documents = self.lock()?;
        documents.insert(
            id.to_string(),
            StoredDocument {
                ocr_data: text.to_string(),
                processed_at: Local::now(),
            },
        );
        self.persist(&documents)
    }

    fn clear_document(&self, id: &str) -> Result<()> {
        let mut documents = self.lock()?;
        if documents.remove(id).is_some() {
            self.persist(&documents)?;
        }
        Ok(())
    }
}
