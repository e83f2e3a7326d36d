// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Ordered pool of images under review

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::category::CategoryLabel;
use crate::{CullerError, Result};

/// Per-image outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    Pending,
    Kept,
    Deleted,
}

/// Terminal decision for a pending image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Keep,
    Delete,
}

impl From<Verdict> for Disposition {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Keep => Disposition::Kept,
            Verdict::Delete => Disposition::Deleted,
        }
    }
}

/// A single image in the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub path: PathBuf,
    pub category: Option<CategoryLabel>,
    pub disposition: Disposition,
}

impl ImageRecord {
    fn pending(path: PathBuf) -> Self {
        Self {
            path,
            category: None,
            disposition: Disposition::Pending,
        }
    }
}

/// Pending images in insertion order, plus the paths already decided on.
///
/// Decided paths are remembered until [`ImagePool::reset`] so that a re-scan
/// of the same folder does not bring them back.
#[derive(Debug, Default, Clone)]
pub struct ImagePool {
    records: Vec<ImageRecord>,
    /// Position of each pending path in `records`
    positions: HashMap<PathBuf, usize>,
    kept: HashSet<PathBuf>,
    deleted: HashSet<PathBuf>,
}

impl ImagePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add paths as pending, unclassified images.
    ///
    /// Paths already in the pool or already kept/deleted are skipped.
    /// Returns the number of images actually added.
    pub fn ingest<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut added = 0;
        for path in paths {
            let path = normalize_path(path.as_ref());
            if self.positions.contains_key(&path) || self.is_retained(&path) {
                debug!("Skipping {:?}: already seen this session", path);
                continue;
            }
            self.positions.insert(path.clone(), self.records.len());
            self.records.push(ImageRecord::pending(path));
            added += 1;
        }
        added
    }

    /// All pending records in insertion order
    pub fn active_flat(&self) -> &[ImageRecord] {
        &self.records
    }

    /// Pending records that have not been classified yet
    pub fn unclassified(&self) -> impl Iterator<Item = &ImageRecord> {
        self.records.iter().filter(|r| r.category.is_none())
    }

    /// Look up a pending record
    pub fn get(&self, path: &Path) -> Option<&ImageRecord> {
        let pos = *self.positions.get(&normalize_path(path))?;
        self.records.get(pos)
    }

    /// Whether the path is pending in this pool
    pub fn contains(&self, path: &Path) -> bool {
        self.positions.contains_key(&normalize_path(path))
    }

    /// Cache a classification result on a pending record.
    ///
    /// A record is classified at most once; later calls are ignored.
    pub fn set_category(&mut self, path: &Path, label: CategoryLabel) -> Result<()> {
        let path = normalize_path(path);
        let pos = *self
            .positions
            .get(&path)
            .ok_or_else(|| CullerError::NotFound(path.clone()))?;
        let record = &mut self.records[pos];

        if record.category.is_none() {
            record.category = Some(label);
        }
        Ok(())
    }

    /// Move a pending image to a terminal disposition.
    ///
    /// The record leaves active storage and its path is retained so it cannot
    /// be ingested again in this session.
    pub fn dispose(&mut self, path: &Path, verdict: Verdict) -> Result<ImageRecord> {
        let path = normalize_path(path);
        let pos = self
            .positions
            .remove(&path)
            .ok_or_else(|| CullerError::NotFound(path.clone()))?;

        let mut record = self.records.remove(pos);
        for later in &self.records[pos..] {
            if let Some(p) = self.positions.get_mut(&later.path) {
                *p -= 1;
            }
        }
        record.disposition = verdict.into();

        match verdict {
            Verdict::Keep => self.kept.insert(path),
            Verdict::Delete => self.deleted.insert(path),
        };

        Ok(record)
    }

    /// Drop every record and forget all decisions
    pub fn reset(&mut self) {
        self.records.clear();
        self.positions.clear();
        self.kept.clear();
        self.deleted.clear();
    }

    pub fn is_kept(&self, path: &Path) -> bool {
        self.kept.contains(&normalize_path(path))
    }

    pub fn is_deleted(&self, path: &Path) -> bool {
        self.deleted.contains(&normalize_path(path))
    }

    fn is_retained(&self, path: &Path) -> bool {
        self.kept.contains(path) || self.deleted.contains(path)
    }

    /// Paths kept this session
    pub fn kept(&self) -> &HashSet<PathBuf> {
        &self.kept
    }

    /// Paths deleted this session
    pub fn deleted(&self) -> &HashSet<PathBuf> {
        &self.deleted
    }

    /// Number of pending images
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Normalize a path lexically: drop `.` components and fold `..` into its parent.
///
/// No filesystem access, so paths that no longer exist still compare equal.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(pool: &ImagePool) -> Vec<PathBuf> {
        pool.active_flat().iter().map(|r| r.path.clone()).collect()
    }

    #[test]
    fn test_ingest_preserves_order_and_skips_duplicates() {
        let mut pool = ImagePool::new();
        assert_eq!(pool.ingest(["a.jpg", "b.jpg", "a.jpg"]), 2);
        assert_eq!(pool.ingest(["./b.jpg", "c.jpg"]), 1);

        assert_eq!(
            paths(&pool),
            vec![PathBuf::from("a.jpg"), PathBuf::from("b.jpg"), PathBuf::from("c.jpg")]
        );
        assert!(pool.active_flat().iter().all(|r| r.category.is_none()));
        assert!(pool.active_flat().iter().all(|r| r.disposition == Disposition::Pending));
    }

    #[test]
    fn test_dispose_keep_retains_path() {
        let mut pool = ImagePool::new();
        pool.ingest(["a.jpg", "b.jpg"]);

        let record = pool.dispose(Path::new("a.jpg"), Verdict::Keep).unwrap();
        assert_eq!(record.disposition, Disposition::Kept);
        assert_eq!(pool.len(), 1);
        assert!(pool.is_kept(Path::new("a.jpg")));

        // Re-ingesting a kept path is a silent no-op
        assert_eq!(pool.ingest(["a.jpg"]), 0);
        assert_eq!(paths(&pool), vec![PathBuf::from("b.jpg")]);
    }

    #[test]
    fn test_dispose_delete_is_not_reingested() {
        let mut pool = ImagePool::new();
        pool.ingest(["x.png"]);
        pool.dispose(Path::new("x.png"), Verdict::Delete).unwrap();

        assert!(pool.is_deleted(Path::new("x.png")));
        assert!(!pool.is_kept(Path::new("x.png")));
        assert_eq!(pool.ingest(["x.png"]), 0);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_dispose_unknown_is_not_found() {
        let mut pool = ImagePool::new();
        pool.ingest(["a.jpg"]);
        pool.dispose(Path::new("a.jpg"), Verdict::Keep).unwrap();

        let err = pool.dispose(Path::new("a.jpg"), Verdict::Delete).unwrap_err();
        assert!(matches!(err, CullerError::NotFound(_)));
        let err = pool.dispose(Path::new("nope.jpg"), Verdict::Keep).unwrap_err();
        assert!(matches!(err, CullerError::NotFound(_)));
    }

    #[test]
    fn test_lookups_follow_removal_from_the_middle() {
        let mut pool = ImagePool::new();
        pool.ingest(["a.jpg", "b.jpg", "c.jpg", "d.jpg"]);
        pool.dispose(Path::new("b.jpg"), Verdict::Delete).unwrap();

        assert_eq!(pool.get(Path::new("c.jpg")).unwrap().path, PathBuf::from("c.jpg"));
        assert_eq!(pool.get(Path::new("./d.jpg")).unwrap().path, PathBuf::from("d.jpg"));
        assert!(pool.get(Path::new("b.jpg")).is_none());

        pool.set_category(Path::new("d.jpg"), CategoryLabel::Art).unwrap();
        assert_eq!(pool.active_flat()[2].category, Some(CategoryLabel::Art));

        pool.dispose(Path::new("a.jpg"), Verdict::Keep).unwrap();
        pool.dispose(Path::new("d.jpg"), Verdict::Keep).unwrap();
        assert_eq!(paths(&pool), vec![PathBuf::from("c.jpg")]);
        assert!(pool.contains(Path::new("c.jpg")));
    }

    #[test]
    fn test_set_category_is_write_once() {
        let mut pool = ImagePool::new();
        pool.ingest(["a.jpg", "b.jpg"]);
        pool.set_category(Path::new("a.jpg"), CategoryLabel::Food).unwrap();
        pool.set_category(Path::new("a.jpg"), CategoryLabel::Art).unwrap();

        assert_eq!(pool.get(Path::new("a.jpg")).unwrap().category, Some(CategoryLabel::Food));
        assert_eq!(pool.unclassified().count(), 1);
        assert!(pool.set_category(Path::new("zzz.jpg"), CategoryLabel::Art).is_err());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut pool = ImagePool::new();
        pool.ingest(["a.jpg", "b.jpg"]);
        pool.dispose(Path::new("a.jpg"), Verdict::Keep).unwrap();
        pool.dispose(Path::new("b.jpg"), Verdict::Delete).unwrap();

        pool.reset();
        pool.reset();
        assert!(pool.is_empty());
        assert!(pool.kept().is_empty());
        assert!(pool.deleted().is_empty());
        assert_eq!(pool.ingest(["a.jpg", "b.jpg"]), 2);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("./a/./b.jpg")), PathBuf::from("a/b.jpg"));
        assert_eq!(normalize_path(Path::new("a/c/../b.jpg")), PathBuf::from("a/b.jpg"));
        assert_eq!(normalize_path(Path::new("../b.jpg")), PathBuf::from("../b.jpg"));
        assert_eq!(normalize_path(Path::new("/../b.jpg")), PathBuf::from("/b.jpg"));
    }
}
