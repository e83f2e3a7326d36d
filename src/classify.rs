// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Batch classification with bounded parallelism

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::category::CategoryLabel;
use crate::oracle::{classify_or_uncategorized, CategoryOracle};

/// One oracle answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub path: PathBuf,
    pub label: CategoryLabel,
    /// The oracle failed and the label is the `Uncategorized` fallback
    pub failed: bool,
}

/// Classify every path with at most `concurrency` oracle calls in flight.
///
/// Results come back in the order of `paths`, whatever order the calls finish
/// in. A failing call yields `Uncategorized` and does not affect the others.
pub async fn classify_batch(
    oracle: &dyn CategoryOracle,
    paths: &[PathBuf],
    concurrency: usize,
) -> Vec<Classification> {
    if paths.is_empty() {
        return Vec::new();
    }

    let width = concurrency.max(1);
    info!(
        "Classifying {} images with {} ({} at a time)",
        paths.len(),
        oracle.name(),
        width
    );

    let mut done: Vec<(usize, CategoryLabel, bool)> = stream::iter(paths.iter().enumerate())
        .map(|(i, path)| async move {
            let (label, failed) = classify_or_uncategorized(oracle, path).await;
            (i, label, failed)
        })
        .buffer_unordered(width)
        .collect()
        .await;

    done.sort_by_key(|(i, _, _)| *i);

    done.into_iter()
        .map(|(i, label, failed)| Classification {
            path: paths[i].clone(),
            label,
            failed,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::fake::MapOracle;

    fn pb(paths: &[&str]) -> Vec<PathBuf> {
        paths.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        // a.jpg finishes last
        let oracle = MapOracle::new([
            ("a.jpg", CategoryLabel::Nature),
            ("b.jpg", CategoryLabel::Food),
            ("c.jpg", CategoryLabel::Art),
        ])
        .delayed("a.jpg", 40)
        .delayed("b.jpg", 10);

        let results = classify_batch(&oracle, &pb(&["a.jpg", "b.jpg", "c.jpg"]), 3).await;
        let labels: Vec<_> = results.iter().map(|c| (c.path.clone(), c.label)).collect();
        assert_eq!(
            labels,
            vec![
                (PathBuf::from("a.jpg"), CategoryLabel::Nature),
                (PathBuf::from("b.jpg"), CategoryLabel::Food),
                (PathBuf::from("c.jpg"), CategoryLabel::Art),
            ]
        );
        assert_eq!(oracle.calls(), 3);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let oracle = MapOracle::new([("a.jpg", CategoryLabel::People), ("c.jpg", CategoryLabel::People)])
            .failing_on("b.jpg");

        let results = classify_batch(&oracle, &pb(&["a.jpg", "b.jpg", "c.jpg"]), 2).await;
        assert_eq!(results.len(), 3);
        assert!(!results[0].failed);
        assert!(results[1].failed);
        assert_eq!(results[1].label, CategoryLabel::Uncategorized);
        assert_eq!(results[2].label, CategoryLabel::People);
    }

    #[tokio::test]
    async fn test_calls_in_flight_never_exceed_width() {
        let names = ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"];
        let oracle = names
            .iter()
            .fold(MapOracle::default(), |oracle, name| oracle.delayed(name, 20));

        let results = classify_batch(&oracle, &pb(&names), 2).await;
        assert_eq!(results.len(), 5);
        assert_eq!(oracle.calls(), 5);
        assert_eq!(oracle.peak(), 2);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let oracle = MapOracle::new([("a.jpg", CategoryLabel::Art)]);
        let results = classify_batch(&oracle, &pb(&["a.jpg"]), 0).await;
        assert_eq!(results[0].label, CategoryLabel::Art);
        assert_eq!(oracle.peak(), 1);
    }

    #[test]
    fn test_empty_batch_makes_no_calls() {
        let oracle = MapOracle::default();
        let results = tokio_test::block_on(classify_batch(&oracle, &[], 4));
        assert!(results.is_empty());
        assert_eq!(oracle.calls(), 0);
    }
}
