// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Triage state machine: mode, selection, cursor and completion

use serde::Serialize;

use crate::category::CategoryLabel;

/// How the pool is being walked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    Flat,
    ByCategory,
}

/// Which sequence ran out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Scope {
    Category(CategoryLabel),
    Pool,
}

/// Observable state of a triage session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriageState {
    /// Nothing pending, nothing selected
    Empty,
    /// Walking the whole pending pool
    Flat,
    /// Category view with no category chosen
    SelectingCategory,
    /// Walking one bucket
    ViewingCategory(CategoryLabel),
    /// The active view ran out; waiting for the caller's decision
    Completed(Scope),
}

/// A question the front end has to put to the user.
///
/// Answer it with [`crate::Session::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecisionPoint {
    /// The selected bucket emptied; accepting falls back to the flat pool
    CategoryExhausted(CategoryLabel),
    /// Nothing is pending anywhere; accepting resets the session
    PoolExhausted,
}

impl DecisionPoint {
    pub fn scope(&self) -> Scope {
        match self {
            DecisionPoint::CategoryExhausted(label) => Scope::Category(*label),
            DecisionPoint::PoolExhausted => Scope::Pool,
        }
    }

    /// Question text for a yes/no prompt
    pub fn prompt(&self) -> String {
        match self {
            DecisionPoint::CategoryExhausted(label) => format!(
                "All images in {} are done. Check the remaining images?",
                label
            ),
            DecisionPoint::PoolExhausted => {
                "All images have been kept or deleted. Start a new session?".to_string()
            }
        }
    }
}

/// The sequence the cursor currently indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Pool,
    Bucket(CategoryLabel),
    Nothing,
}

/// Mode, selection, cursor and completion flag.
///
/// Holds no images; the session resolves [`TriageController::view`] against
/// its pool and index and passes lengths in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageController {
    mode: Mode,
    selected: Option<CategoryLabel>,
    cursor: usize,
    completed: Option<Scope>,
}

impl Default for TriageController {
    fn default() -> Self {
        Self::new()
    }
}

impl TriageController {
    pub fn new() -> Self {
        Self {
            mode: Mode::Flat,
            selected: None,
            cursor: 0,
            completed: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected(&self) -> Option<CategoryLabel> {
        self.selected
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn completed(&self) -> Option<Scope> {
        self.completed
    }

    /// The one place that decides which sequence is active
    pub fn view(&self) -> View {
        if self.completed.is_some() {
            return View::Nothing;
        }
        match (self.mode, self.selected) {
            (Mode::Flat, _) => View::Pool,
            (Mode::ByCategory, Some(label)) => View::Bucket(label),
            (Mode::ByCategory, None) => View::Nothing,
        }
    }

    pub fn state(&self, pending: usize) -> TriageState {
        if let Some(scope) = self.completed {
            return TriageState::Completed(scope);
        }
        if pending == 0 {
            return TriageState::Empty;
        }
        match (self.mode, self.selected) {
            (Mode::Flat, _) => TriageState::Flat,
            (Mode::ByCategory, None) => TriageState::SelectingCategory,
            (Mode::ByCategory, Some(label)) => TriageState::ViewingCategory(label),
        }
    }

    /// Cursor position within a view of `len` items
    pub fn position(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.cursor % len)
    }

    /// Step forward, wrapping at the end
    pub fn advance(&mut self, len: usize) -> Option<usize> {
        let pos = self.position(len)?;
        self.cursor = (pos + 1) % len;
        Some(self.cursor)
    }

    /// Fix the cursor on the slot about to be removed, so the next item shifts into it
    pub fn pin(&mut self, pos: usize) {
        self.cursor = pos;
    }

    pub fn enter_flat(&mut self) {
        self.mode = Mode::Flat;
        self.selected = None;
        self.cursor = 0;
        self.completed = None;
    }

    pub fn enter_by_category(&mut self) {
        self.mode = Mode::ByCategory;
        self.selected = None;
        self.cursor = 0;
        self.completed = None;
    }

    /// Choose a bucket. Only meaningful in category mode.
    pub fn select(&mut self, label: CategoryLabel) -> bool {
        if self.mode != Mode::ByCategory {
            return false;
        }
        self.selected = Some(label);
        self.cursor = 0;
        self.completed = None;
        true
    }

    /// Record that the active view ran out and say what to ask the user
    pub fn complete(&mut self, scope: Scope) -> DecisionPoint {
        self.completed = Some(scope);
        match scope {
            Scope::Category(label) => DecisionPoint::CategoryExhausted(label),
            Scope::Pool => DecisionPoint::PoolExhausted,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
