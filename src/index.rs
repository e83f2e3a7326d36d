// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Category buckets derived from the pending pool

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::category::CategoryLabel;
use crate::classify::classify_batch;
use crate::oracle::CategoryOracle;
use crate::pool::{normalize_path, ImagePool, ImageRecord};

/// Pending images sharing one label, in classification order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBucket {
    pub label: CategoryLabel,
    pub members: Vec<PathBuf>,
}

/// A bucket as shown in a category list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub label: CategoryLabel,
    pub count: usize,
}

/// Oracle traffic caused by one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Images sent to the oracle
    pub classified: usize,
    /// Images whose label was already cached on the record
    pub cached: usize,
    /// Oracle calls that failed and fell back to `Uncategorized`
    pub failed: usize,
}

/// Partition of the pending pool by category.
///
/// Holds path keys only; the records themselves stay in [`ImagePool`].
/// A bucket never exists with zero members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    buckets: Vec<CategoryBucket>,
}

impl CategoryIndex {
    /// Classify every unclassified pending image, then group the pending pool.
    ///
    /// Labels are cached on the records, so a second build over the same pool
    /// makes no oracle calls. Returns no index when nothing is pending.
    pub async fn build(
        pool: &mut ImagePool,
        oracle: &dyn CategoryOracle,
        concurrency: usize,
    ) -> (Option<Self>, BuildReport) {
        let todo: Vec<PathBuf> = pool.unclassified().map(|r| r.path.clone()).collect();
        let mut report = BuildReport {
            cached: pool.len() - todo.len(),
            ..BuildReport::default()
        };

        for result in classify_batch(oracle, &todo, concurrency).await {
            report.classified += 1;
            if result.failed {
                report.failed += 1;
            }
            if let Err(e) = pool.set_category(&result.path, result.label) {
                warn!("Dropping classification for {:?}: {}", result.path, e);
            }
        }

        let index = Self::from_records(pool.active_flat());
        info!(
            "Category index built: {} buckets ({} classified, {} cached, {} failed)",
            index.as_ref().map_or(0, |i| i.len()),
            report.classified,
            report.cached,
            report.failed
        );
        (index, report)
    }

    /// Group already-classified records. `None` when there are no records.
    ///
    /// Unclassified records land in `Uncategorized`.
    pub fn from_records(records: &[ImageRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let mut index = Self::default();
        for record in records {
            let label = record.category.unwrap_or(CategoryLabel::Uncategorized);
            match index.buckets.iter_mut().find(|b| b.label == label) {
                Some(bucket) => bucket.members.push(record.path.clone()),
                None => index.buckets.push(CategoryBucket {
                    label,
                    members: vec![record.path.clone()],
                }),
            }
        }
        Some(index)
    }

    /// Members of a bucket, empty if the bucket does not exist
    pub fn bucket_for(&self, label: CategoryLabel) -> &[PathBuf] {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.members.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, label: CategoryLabel) -> bool {
        self.buckets.iter().any(|b| b.label == label)
    }

    /// Remove one member from a bucket, dropping the bucket if it empties.
    ///
    /// Returns whether the member was present.
    pub fn remove_from_bucket(&mut self, label: CategoryLabel, path: &Path) -> bool {
        let path = normalize_path(path);
        let Some(pos) = self.buckets.iter().position(|b| b.label == label) else {
            return false;
        };

        let bucket = &mut self.buckets[pos];
        let Some(member) = bucket.members.iter().position(|p| *p == path) else {
            return false;
        };
        bucket.members.remove(member);

        if bucket.members.is_empty() {
            debug!("Bucket {} is empty, removing it", label);
            self.buckets.remove(pos);
        }
        true
    }

    /// Remove a path from whichever bucket holds it
    pub fn remove_path(&mut self, path: &Path) -> Option<CategoryLabel> {
        let label = self.label_of(path)?;
        self.remove_from_bucket(label, path);
        Some(label)
    }

    /// Bucket holding a path
    pub fn label_of(&self, path: &Path) -> Option<CategoryLabel> {
        let path = normalize_path(path);
        self.buckets
            .iter()
            .find(|b| b.members.contains(&path))
            .map(|b| b.label)
    }

    /// `(label, count)` per bucket, first-classified first
    pub fn summaries(&self) -> Vec<CategorySummary> {
        self.buckets
            .iter()
            .map(|b| CategorySummary {
                label: b.label,
                count: b.members.len(),
            })
            .collect()
    }

    pub fn buckets(&self) -> &[CategoryBucket] {
        &self.buckets
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total members across all buckets
    pub fn member_count(&self) -> usize {
        self.buckets.iter().map(|b| b.members.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::fake::MapOracle;

    fn scenario_oracle() -> MapOracle {
        MapOracle::new([
            ("a", CategoryLabel::Nature),
            ("b", CategoryLabel::Nature),
            ("c", CategoryLabel::Food),
        ])
    }

    #[tokio::test]
    async fn test_build_groups_by_label() {
        let mut pool = ImagePool::new();
        pool.ingest(["a", "b", "c"]);
        let oracle = scenario_oracle();

        let (index, report) = CategoryIndex::build(&mut pool, &oracle, 2).await;
        let index = index.unwrap();

        assert_eq!(index.bucket_for(CategoryLabel::Nature), &[PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(index.bucket_for(CategoryLabel::Food), &[PathBuf::from("c")]);
        assert!(index.bucket_for(CategoryLabel::Art).is_empty());
        assert_eq!(
            index.summaries(),
            vec![
                CategorySummary { label: CategoryLabel::Nature, count: 2 },
                CategorySummary { label: CategoryLabel::Food, count: 1 },
            ]
        );
        assert_eq!(report, BuildReport { classified: 3, cached: 0, failed: 0 });
        assert_eq!(pool.get(Path::new("c")).unwrap().category, Some(CategoryLabel::Food));
    }

    #[tokio::test]
    async fn test_rebuild_uses_cache() {
        let mut pool = ImagePool::new();
        pool.ingest(["a", "b", "c"]);
        let oracle = scenario_oracle();

        let (first, _) = CategoryIndex::build(&mut pool, &oracle, 4).await;
        let (second, report) = CategoryIndex::build(&mut pool, &oracle, 4).await;

        assert_eq!(first, second);
        assert_eq!(report, BuildReport { classified: 0, cached: 3, failed: 0 });
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_build_only_classifies_new_images() {
        let mut pool = ImagePool::new();
        pool.ingest(["a", "b"]);
        let oracle = scenario_oracle();
        CategoryIndex::build(&mut pool, &oracle, 4).await;

        pool.ingest(["c"]);
        let (index, report) = CategoryIndex::build(&mut pool, &oracle, 4).await;

        assert_eq!(report.classified, 1);
        assert_eq!(report.cached, 2);
        assert_eq!(index.unwrap().len(), 2);
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_build_on_empty_pool_has_no_index() {
        let mut pool = ImagePool::new();
        let oracle = scenario_oracle();
        let (index, report) = CategoryIndex::build(&mut pool, &oracle, 4).await;

        assert!(index.is_none());
        assert_eq!(report, BuildReport::default());
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_calls_land_in_uncategorized() {
        let mut pool = ImagePool::new();
        pool.ingest(["a", "b", "c"]);
        let oracle = scenario_oracle().failing_on("b");

        let (index, report) = CategoryIndex::build(&mut pool, &oracle, 4).await;
        let index = index.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(index.bucket_for(CategoryLabel::Nature), &[PathBuf::from("a")]);
        assert_eq!(index.bucket_for(CategoryLabel::Uncategorized), &[PathBuf::from("b")]);
        // Failures are cached like any other answer
        let (_, again) = CategoryIndex::build(&mut pool, &oracle, 4).await;
        assert_eq!(again.classified, 0);
    }

    #[tokio::test]
    async fn test_bucket_order_ignores_completion_order() {
        let mut pool = ImagePool::new();
        pool.ingest(["a", "b", "c"]);
        let oracle = scenario_oracle().delayed("a", 40);

        let (index, _) = CategoryIndex::build(&mut pool, &oracle, 3).await;
        let index = index.unwrap();
        assert_eq!(index.buckets()[0].label, CategoryLabel::Nature);
        assert_eq!(index.buckets()[0].members, vec![PathBuf::from("a"), PathBuf::from("b")]);
    }

    #[test]
    fn test_remove_drops_empty_bucket() {
        let mut pool = ImagePool::new();
        pool.ingest(["a", "b", "c"]);
        pool.set_category(Path::new("a"), CategoryLabel::Nature).unwrap();
        pool.set_category(Path::new("b"), CategoryLabel::Nature).unwrap();
        pool.set_category(Path::new("c"), CategoryLabel::Food).unwrap();
        let mut index = CategoryIndex::from_records(pool.active_flat()).unwrap();

        assert!(index.remove_from_bucket(CategoryLabel::Nature, Path::new("a")));
        assert_eq!(index.bucket_for(CategoryLabel::Nature), &[PathBuf::from("b")]);
        assert!(!index.remove_from_bucket(CategoryLabel::Nature, Path::new("a")));
        assert!(!index.remove_from_bucket(CategoryLabel::Art, Path::new("b")));

        assert_eq!(index.remove_path(Path::new("b")), Some(CategoryLabel::Nature));
        assert!(!index.contains(CategoryLabel::Nature));
        assert_eq!(index.summaries(), vec![CategorySummary { label: CategoryLabel::Food, count: 1 }]);
        assert!(index.summaries().iter().all(|s| s.count > 0));
        assert_eq!(index.member_count(), 1);
    }
}
