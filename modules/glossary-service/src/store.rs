//! In-memory glossary store backed by a single JSON document.
//!
//! The whole collection is loaded at startup and the document is rewritten
//! after every mutation. This is sized for a curated glossary of a few
//! hundred terms; a large collection would need append-based persistence or
//! an embedded database instead.
//!
//! Ids are recomputed as `max(id) + 1` on load, so deleting the highest id
//! and restarting hands that id out again. A document whose highest id is
//! `i64::MAX` is refused.
//!
//! Timestamps are always written in the fixed-width UTC form. Documents with
//! naive timestamps (no offset) load fine, but the first rewrite normalizes
//! every record's timestamps, so the text changes while the instants do not.

use crate::error::StoreError;
use chrono::{DateTime, Duration, Utc};
use glossary_types::*;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

struct Collection {
    terms: Vec<TermRecord>,
    next_id: i64,
}

pub struct TermStore {
    path: PathBuf,
    inner: RwLock<Collection>,
}

/// Borrowing twin of `GlossaryDocument` so persisting needs no clone.
#[derive(Serialize)]
struct DocumentRef<'a> {
    glossary: &'a [TermRecord],
}

impl TermStore {
    /// Load the document at `path`, or start empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let terms = load_document(&path)?;
        let next_id = match terms.iter().map(|t| t.id).max() {
            None => 1,
            Some(max) => max.checked_add(1).ok_or_else(|| StoreError::Unavailable {
                path: path.clone(),
                reason: "id space exhausted".to_string(),
            })?,
        };

        log::info!(
            "Loaded {} glossary terms from {} (next id {})",
            terms.len(),
            path.display(),
            next_id
        );

        Ok(Self {
            path,
            inner: RwLock::new(Collection { terms, next_id }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.inner.read().terms.len()
    }

    /// All terms in insertion order.
    pub fn list_all(&self) -> Vec<TermRecord> {
        self.inner.read().terms.clone()
    }

    pub fn get(&self, id: i64) -> Option<TermRecord> {
        self.inner.read().terms.iter().find(|t| t.id == id).cloned()
    }

    /// Case-insensitive substring match on title, definition and category.
    pub fn search(&self, keyword: &str) -> Vec<TermRecord> {
        let needle = keyword.to_lowercase();
        self.inner
            .read()
            .terms
            .iter()
            .filter(|t| matches_keyword(t, &needle))
            .cloned()
            .collect()
    }

    pub fn create(&self, request: CreateTermRequest) -> Result<TermRecord, StoreError> {
        let mut inner = self.inner.write();
        let following_id = inner
            .next_id
            .checked_add(1)
            .ok_or_else(|| StoreError::IdsExhausted {
                path: self.path.clone(),
            })?;
        let now = timestamp::now();

        let term = TermRecord {
            id: inner.next_id,
            title: request.title,
            definition: request.definition,
            category: Some(request.category),
            examples: request.examples.unwrap_or_default(),
            related_terms: request.related_terms.unwrap_or_default(),
            source: request.source.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        inner.terms.push(term.clone());
        if let Err(e) = self.persist(&inner.terms) {
            inner.terms.pop();
            return Err(e);
        }
        inner.next_id = following_id;

        log::info!("Created glossary term #{} ({})", term.id, term.title);
        Ok(term)
    }

    /// Replace every field present in `changes`; `Ok(None)` if `id` is unknown.
    pub fn update(
        &self,
        id: i64,
        changes: &UpdateTermRequest,
    ) -> Result<Option<TermRecord>, StoreError> {
        let mut inner = self.inner.write();
        let Some(idx) = inner.terms.iter().position(|t| t.id == id) else {
            return Ok(None);
        };

        if changes.is_empty() {
            log::debug!("Update of term #{} carries no fields, refreshing updated_at only", id);
        }

        let previous = inner.terms[idx].clone();
        let term = &mut inner.terms[idx];
        apply_changes(term, changes);
        term.updated_at = refreshed_timestamp(&previous);

        if let Err(e) = self.persist(&inner.terms) {
            inner.terms[idx] = previous;
            return Err(e);
        }

        let term = inner.terms[idx].clone();
        log::info!("Updated glossary term #{} ({})", term.id, term.title);
        Ok(Some(term))
    }

    /// Remove the term; `Ok(false)` if `id` is unknown.
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        let Some(idx) = inner.terms.iter().position(|t| t.id == id) else {
            return Ok(false);
        };

        let removed = inner.terms.remove(idx);
        if let Err(e) = self.persist(&inner.terms) {
            inner.terms.insert(idx, removed);
            return Err(e);
        }

        log::info!("Deleted glossary term #{} ({})", removed.id, removed.title);
        Ok(true)
    }

    /// Rewrite the whole document. Callers hold the write lock.
    fn persist(&self, terms: &[TermRecord]) -> Result<(), StoreError> {
        let write_failed = |reason: String| StoreError::WriteFailed {
            path: self.path.clone(),
            reason,
        };

        let mut bytes = serde_json::to_vec_pretty(&DocumentRef { glossary: terms })
            .map_err(|e| write_failed(e.to_string()))?;
        bytes.push(b'\n');

        write_atomic(&self.path, &bytes).map_err(|e| {
            log::error!("Failed to persist glossary to {}: {}", self.path.display(), e);
            write_failed(e.to_string())
        })
    }
}

fn matches_keyword(term: &TermRecord, needle: &str) -> bool {
    term.title.to_lowercase().contains(needle)
        || term.definition.to_lowercase().contains(needle)
        || term
            .category
            .as_ref()
            .is_some_and(|c| c.to_lowercase().contains(needle))
}

fn apply_changes(term: &mut TermRecord, changes: &UpdateTermRequest) {
    if let Some(title) = &changes.title {
        term.title = title.clone();
    }
    if let Some(definition) = &changes.definition {
        term.definition = definition.clone();
    }
    if let Some(category) = &changes.category {
        term.category = Some(category.clone());
    }
    if let Some(examples) = &changes.examples {
        term.examples = examples.clone();
    }
    if let Some(related_terms) = &changes.related_terms {
        term.related_terms = related_terms.clone();
    }
    if let Some(source) = &changes.source {
        term.source = source.clone();
    }
}

/// Current time, but always strictly after the previous stamps.
fn refreshed_timestamp(previous: &TermRecord) -> DateTime<Utc> {
    let floor = previous.updated_at.max(previous.created_at) + Duration::microseconds(1);
    timestamp::now().max(floor)
}

fn load_document(path: &Path) -> Result<Vec<TermRecord>, StoreError> {
    let unavailable = |reason: String| StoreError::Unavailable {
        path: path.to_path_buf(),
        reason,
    };

    if !path.exists() {
        log::info!("No glossary document at {}, starting empty", path.display());
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
    let document: GlossaryDocument =
        serde_json::from_str(&raw).map_err(|e| unavailable(e.to_string()))?;

    let mut seen = HashSet::new();
    for term in &document.glossary {
        if !seen.insert(term.id) {
            return Err(unavailable(format!("duplicate term id {}", term.id)));
        }
    }

    Ok(document.glossary)
}

/// Write to a sibling temp file and rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "glossary".into());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
