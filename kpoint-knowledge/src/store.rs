//! In-memory knowledge store.
//!
//! Holds the ephemeral batch from the latest extraction and the saved set.
//! The saved set is the only part that outlives a session; callers persist it
//! after each mutation that returns a new entry.

use chrono::{DateTime, Utc};
use kpoint_core::KnowledgePoint;
use tracing::debug;

use crate::errors::{KnowledgeError, KnowledgeResult};

#[derive(Debug, Default)]
pub struct KnowledgeStore {
    extracted: Vec<KnowledgePoint>,
    saved: Vec<KnowledgePoint>,
    detail_id: Option<String>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session with a previously persisted saved set.
    pub fn with_saved(saved: Vec<KnowledgePoint>) -> Self {
        Self {
            saved,
            ..Self::default()
        }
    }

    /// Replace the current batch. The saved set is untouched.
    pub fn set_extracted(&mut self, points: Vec<KnowledgePoint>) {
        debug!(count = points.len(), "replacing extracted batch");
        self.extracted = points;
        self.detail_id = None;
    }

    pub fn extracted(&self) -> &[KnowledgePoint] {
        &self.extracted
    }

    pub fn point(&self, id: &str) -> Option<&KnowledgePoint> {
        self.extracted.iter().find(|p| p.id == id)
    }

    /// Flip `selected` on the batch point with `id`.
    ///
    /// Selecting a point makes it the detail point; deselecting the current
    /// detail point clears it.
    pub fn toggle_selection(&mut self, id: &str) -> KnowledgeResult<&KnowledgePoint> {
        let point = self
            .extracted
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| KnowledgeError::UnknownPoint(id.to_string()))?;

        point.selected = !point.selected;
        if point.selected {
            self.detail_id = Some(point.id.clone());
        } else if self.detail_id.as_deref() == Some(id) {
            self.detail_id = None;
        }
        Ok(point)
    }

    /// The batch point currently shown in detail, if any.
    pub fn detail_point(&self) -> Option<&KnowledgePoint> {
        self.detail_id.as_deref().and_then(|id| self.point(id))
    }

    pub fn selected(&self) -> impl Iterator<Item = &KnowledgePoint> {
        self.extracted.iter().filter(|p| p.selected)
    }

    pub fn is_saved(&self, id: &str) -> bool {
        self.saved.iter().any(|p| p.id == id)
    }

    /// Append a saved copy of `point` stamped at `now`.
    ///
    /// Returns the new entry, or `None` when a point with the same id is
    /// already saved.
    pub fn save(&mut self, point: &KnowledgePoint, now: DateTime<Utc>) -> Option<KnowledgePoint> {
        if self.is_saved(&point.id) {
            debug!(id = %point.id, "point already saved");
            return None;
        }
        let entry = point.saved_copy(now);
        self.saved.push(entry.clone());
        Some(entry)
    }

    /// Save the batch point with `id`.
    pub fn save_by_id(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> KnowledgeResult<Option<KnowledgePoint>> {
        let point = self
            .point(id)
            .cloned()
            .ok_or_else(|| KnowledgeError::UnknownPoint(id.to_string()))?;
        Ok(self.save(&point, now))
    }

    /// Save every selected batch point, returning the entries actually added.
    pub fn save_selected(&mut self, now: DateTime<Utc>) -> Vec<KnowledgePoint> {
        let selected: Vec<KnowledgePoint> = self.selected().cloned().collect();
        selected
            .iter()
            .filter_map(|point| self.save(point, now))
            .collect()
    }

    /// Saved set in insertion order.
    pub fn saved(&self) -> &[KnowledgePoint] {
        &self.saved
    }

    /// Case-insensitive substring filter over title, content and description.
    pub fn search_saved(&self, query: &str) -> Vec<&KnowledgePoint> {
        let needle = query.trim().to_lowercase();
        self.saved
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.matches(&needle)
                    || p.description.to_lowercase().contains(&needle)
            })
            .collect()
    }
}
