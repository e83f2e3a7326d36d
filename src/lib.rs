// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Culler: AI-assisted image triage
//!
//! Load a pile of images, let a vision model sort them into categories, then
//! keep or delete them one at a time, either as one queue or bucket by bucket.

pub mod category;
pub mod classify;
pub mod config;
pub mod controller;
pub mod disposal;
pub mod error;
pub mod index;
pub mod oracle;
pub mod pool;
pub mod scan;
pub mod session;
pub mod web;

pub use category::CategoryLabel;
pub use config::AppConfig;
pub use controller::{DecisionPoint, TriageState};
pub use error::{CullerError, Result};
pub use session::Session;
