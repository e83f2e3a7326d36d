// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use async_trait::async_trait;
use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use culler::disposal::DryRunDisposer;
use culler::oracle::CategoryOracle;
use culler::{CategoryLabel, DecisionPoint, Session};

/// Labels by the first byte of the path; a leading `z` fails
struct ByteOracle;

#[async_trait]
impl CategoryOracle for ByteOracle {
    fn name(&self) -> &'static str {
        "byte"
    }

    async fn classify(&self, image: &Path) -> culler::Result<CategoryLabel> {
        let b = image.to_string_lossy().bytes().next().unwrap_or(0);
        if b == b'z' {
            return Err(culler::CullerError::Oracle("refused".to_string()));
        }
        Ok(CategoryLabel::VOCABULARY[b as usize % 3])
    }
}

#[derive(Arbitrary, Debug)]
enum Op {
    Ingest(Vec<u8>),
    CategoryView(bool),
    Select(u8),
    Next,
    Keep,
    Delete,
    Resolve(bool),
    Reset,
}

fn name(b: u8) -> PathBuf {
    PathBuf::from(format!("{}{}.jpg", (b'a' + b % 26) as char, b % 7))
}

fn check(session: &Session, decided: &HashSet<PathBuf>) {
    let view = session.active_view();
    let unique: HashSet<_> = view.iter().map(|r| &r.path).collect();
    assert_eq!(unique.len(), view.len());
    assert!(view.iter().all(|r| !decided.contains(&r.path)));

    if let Some(index) = session.index() {
        assert!(index.summaries().iter().all(|s| s.count > 0));
        assert_eq!(index.member_count(), session.pool().len());
        for s in index.summaries() {
            assert_eq!(s.count, index.bucket_for(s.label).len());
        }
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let rt = match tokio::runtime::Builder::new_current_thread().build() {
        Ok(rt) => rt,
        Err(_) => return,
    };
    let mut session = Session::new(Arc::new(ByteOracle), Box::new(DryRunDisposer), 2);
    let mut decided: HashSet<PathBuf> = HashSet::new();
    let mut pending: Option<DecisionPoint> = None;

    for op in ops {
        match op {
            Op::Ingest(bytes) => {
                session.ingest(bytes.into_iter().map(name));
            }
            Op::CategoryView(on) => {
                rt.block_on(session.toggle_category_view(on));
            }
            Op::Select(i) => {
                let label = CategoryLabel::VOCABULARY[i as usize % 10];
                session.select_category(label);
            }
            Op::Next => {
                session.next();
            }
            Op::Keep => {
                let before = session.active_view().len();
                if let Some(outcome) = session.keep() {
                    assert_eq!(session.active_view().len(), before - 1);
                    decided.insert(outcome.record.path);
                    pending = outcome.decision;
                }
            }
            Op::Delete => {
                let before = session.active_view().len();
                if let Some(outcome) = session.delete() {
                    assert_eq!(session.active_view().len(), before - 1);
                    decided.insert(outcome.record.path);
                    pending = outcome.decision;
                }
            }
            Op::Resolve(accept) => {
                if let Some(decision) = pending.take() {
                    let reset = accept && decision == DecisionPoint::PoolExhausted;
                    if session.resolve(decision, accept) && reset {
                        decided.clear();
                    }
                }
            }
            Op::Reset => {
                session.reset();
                decided.clear();
                pending = None;
            }
        }
        check(&session, &decided);
    }
});
