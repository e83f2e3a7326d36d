// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! A triage session: pool, category index and controller under one owner
//!
//! Every mutating operation takes `&mut self`, so nothing can run while a
//! category build is awaiting the oracle. Front ends hold a `Session` and
//! render from [`Session::current`], [`Session::state`] and
//! [`Session::summaries`].

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::category::CategoryLabel;
use crate::controller::{DecisionPoint, Mode, Scope, TriageController, TriageState, View};
use crate::disposal::Disposer;
use crate::index::{BuildReport, CategoryIndex, CategorySummary};
use crate::oracle::CategoryOracle;
use crate::pool::{ImagePool, ImageRecord, Verdict};

/// Result of a keep or delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    /// The record as it left the pool
    pub record: ImageRecord,
    /// Set when the recycle bin move failed; the image is still gone from the session
    pub disposal_error: Option<String>,
    /// Set when the active view ran out
    pub decision: Option<DecisionPoint>,
}

/// One lifecycle scope from first ingest to reset
pub struct Session {
    pool: ImagePool,
    index: Option<CategoryIndex>,
    triage: TriageController,
    oracle: Arc<dyn CategoryOracle>,
    disposer: Box<dyn Disposer>,
    concurrency: usize,
    last_build: Option<BuildReport>,
}

impl Session {
    pub fn new(oracle: Arc<dyn CategoryOracle>, disposer: Box<dyn Disposer>, concurrency: usize) -> Self {
        Self {
            pool: ImagePool::new(),
            index: None,
            triage: TriageController::new(),
            oracle,
            disposer,
            concurrency: concurrency.max(1),
            last_build: None,
        }
    }

    /// Add images. Duplicates and already decided paths are skipped.
    ///
    /// New images invalidate the category index, so category mode falls back
    /// to the flat view. A completed session becomes active again.
    pub fn ingest<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let added = self.pool.ingest(paths);
        if added == 0 {
            return 0;
        }

        info!("Added {} images ({} pending)", added, self.pool.len());
        if self.triage.mode() == Mode::ByCategory {
            debug!("New images invalidate the category index");
            self.index = None;
            self.triage.enter_flat();
        } else if self.triage.completed().is_some() {
            self.triage.enter_flat();
        }
        added
    }

    /// Switch between the flat pool and category buckets.
    ///
    /// Turning it on classifies whatever has not been classified yet and
    /// returns the oracle report.
    pub async fn toggle_category_view(&mut self, on: bool) -> Option<BuildReport> {
        if !on {
            self.index = None;
            self.triage.enter_flat();
            return None;
        }

        let (index, report) =
            CategoryIndex::build(&mut self.pool, self.oracle.as_ref(), self.concurrency).await;
        self.index = index;
        self.last_build = Some(report);
        self.triage.enter_by_category();
        Some(report)
    }

    /// Choose a bucket to walk. Does nothing if the bucket no longer exists.
    pub fn select_category(&mut self, label: CategoryLabel) -> bool {
        if self.triage.mode() != Mode::ByCategory {
            debug!("Ignoring selection of {}: not in category view", label);
            return false;
        }
        if !self.index.as_ref().is_some_and(|i| i.contains(label)) {
            debug!("Ignoring selection of {}: no such bucket", label);
            return false;
        }
        self.triage.select(label)
    }

    /// Move to the next image in the active view, wrapping around
    pub fn next(&mut self) -> Option<&ImageRecord> {
        let len = self.active_paths().len();
        self.triage.advance(len)?;
        self.current()
    }

    /// Keep the current image
    pub fn keep(&mut self) -> Option<ActionOutcome> {
        self.decide(Verdict::Keep)
    }

    /// Delete the current image
    pub fn delete(&mut self) -> Option<ActionOutcome> {
        self.decide(Verdict::Delete)
    }

    fn decide(&mut self, verdict: Verdict) -> Option<ActionOutcome> {
        let view = self.triage.view();
        let (pos, path) = {
            let paths = self.active_paths();
            let pos = self.triage.position(paths.len())?;
            (pos, paths[pos].to_path_buf())
        };
        self.triage.pin(pos);

        let record = match self.pool.dispose(&path, verdict) {
            Ok(record) => record,
            Err(e) => {
                warn!("Stale entry in active view: {}", e);
                if let Some(index) = self.index.as_mut() {
                    index.remove_path(&path);
                }
                return None;
            }
        };
        if let Some(index) = self.index.as_mut() {
            index.remove_path(&path);
        }

        let disposal_error = match verdict {
            Verdict::Keep => {
                info!("Kept: {:?}", path);
                None
            }
            Verdict::Delete => match self.disposer.discard(&path) {
                Ok(()) => None,
                Err(e) => {
                    warn!("Error moving image to recycle bin: {}", e);
                    Some(e.to_string())
                }
            },
        };

        let decision = if !self.active_paths().is_empty() {
            None
        } else if self.pool.is_empty() {
            Some(self.triage.complete(Scope::Pool))
        } else if let View::Bucket(label) = view {
            Some(self.triage.complete(Scope::Category(label)))
        } else {
            Some(self.triage.complete(Scope::Pool))
        };
        if let Some(decision) = decision {
            info!("{}", decision.prompt());
        }

        Some(ActionOutcome {
            record,
            disposal_error,
            decision,
        })
    }

    /// Answer a decision point.
    ///
    /// Accepting a category fallback returns to the flat pool; accepting pool
    /// exhaustion resets the session. Declining leaves the session completed.
    /// Returns `false` if the decision no longer applies.
    pub fn resolve(&mut self, decision: DecisionPoint, accept: bool) -> bool {
        if self.triage.completed() != Some(decision.scope()) {
            debug!("Ignoring stale decision {:?}", decision);
            return false;
        }
        if !accept {
            return true;
        }
        match decision {
            DecisionPoint::CategoryExhausted(_) => {
                self.index = None;
                self.triage.enter_flat();
            }
            DecisionPoint::PoolExhausted => self.reset(),
        }
        true
    }

    /// Forget everything, including kept and deleted paths
    pub fn reset(&mut self) {
        self.pool.reset();
        self.index = None;
        self.triage.reset();
        self.last_build = None;
        info!("Session reset");
    }

    /// The image under the cursor, if any
    pub fn current(&self) -> Option<&ImageRecord> {
        let paths = self.active_paths();
        let pos = self.triage.position(paths.len())?;
        self.pool.get(paths[pos])
    }

    /// Records in the active view, in order
    pub fn active_view(&self) -> Vec<&ImageRecord> {
        self.active_paths()
            .into_iter()
            .filter_map(|p| self.pool.get(p))
            .collect()
    }

    fn active_paths(&self) -> Vec<&Path> {
        match self.triage.view() {
            View::Pool => self.pool.active_flat().iter().map(|r| r.path.as_path()).collect(),
            View::Bucket(label) => self
                .index
                .as_ref()
                .map(|i| i.bucket_for(label).iter().map(PathBuf::as_path).collect())
                .unwrap_or_default(),
            View::Nothing => Vec::new(),
        }
    }

    pub fn state(&self) -> TriageState {
        self.triage.state(self.pool.len())
    }

    /// Bucket list with counts; empty outside category view
    pub fn summaries(&self) -> Vec<CategorySummary> {
        self.index.as_ref().map(|i| i.summaries()).unwrap_or_default()
    }

    pub fn pool(&self) -> &ImagePool {
        &self.pool
    }

    pub fn index(&self) -> Option<&CategoryIndex> {
        self.index.as_ref()
    }

    pub fn controller(&self) -> &TriageController {
        &self.triage
    }

    pub fn last_build(&self) -> Option<BuildReport> {
        self.last_build
    }

    pub fn oracle_name(&self) -> &'static str {
        self.oracle.name()
    }

    pub fn disposer_name(&self) -> &'static str {
        self.disposer.name()
    }
}
