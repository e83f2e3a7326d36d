// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! The closed category vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CullerError;

/// A category label returned by the oracle.
///
/// Ten domain labels plus the `Uncategorized` sentinel. Not user-extensible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryLabel {
    Nature,
    Landscape,
    People,
    Animals,
    Food,
    Buildings,
    Technology,
    Vehicles,
    Art,
    Documents,
    Uncategorized,
}

impl CategoryLabel {
    /// The labels an oracle may choose from (excludes the sentinel)
    pub const VOCABULARY: [CategoryLabel; 10] = [
        CategoryLabel::Nature,
        CategoryLabel::Landscape,
        CategoryLabel::People,
        CategoryLabel::Animals,
        CategoryLabel::Food,
        CategoryLabel::Buildings,
        CategoryLabel::Technology,
        CategoryLabel::Vehicles,
        CategoryLabel::Art,
        CategoryLabel::Documents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryLabel::Nature => "Nature",
            CategoryLabel::Landscape => "Landscape",
            CategoryLabel::People => "People",
            CategoryLabel::Animals => "Animals",
            CategoryLabel::Food => "Food",
            CategoryLabel::Buildings => "Buildings",
            CategoryLabel::Technology => "Technology",
            CategoryLabel::Vehicles => "Vehicles",
            CategoryLabel::Art => "Art",
            CategoryLabel::Documents => "Documents",
            CategoryLabel::Uncategorized => "Uncategorized",
        }
    }

    /// Map a raw oracle reply onto the vocabulary.
    ///
    /// Models tend to wrap the word in quotes or end it with a period, so those
    /// are stripped before matching. Anything outside the vocabulary becomes
    /// `Uncategorized`.
    pub fn from_response(raw: &str) -> Self {
        let cleaned = raw.trim().replace(['\n', '\r'], "");
        let cleaned = cleaned
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.' || c.is_whitespace());

        Self::VOCABULARY
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(cleaned))
            .unwrap_or(CategoryLabel::Uncategorized)
    }

    /// Comma separated vocabulary, used to fill prompt templates
    pub fn vocabulary_list() -> String {
        Self::VOCABULARY
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CategoryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryLabel {
    type Err = CullerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(CategoryLabel::Uncategorized.as_str()) {
            return Ok(CategoryLabel::Uncategorized);
        }
        Self::VOCABULARY
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CullerError::CategoryNotFound(s.to_string()))
    }
}
