// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! What happens on disk when an image is deleted

use std::path::Path;
use tracing::{info, warn};

use crate::config::DisposalConfig;
use crate::{CullerError, Result};

/// Removes a deleted image from the user's view of the filesystem
pub trait Disposer: Send + Sync {
    fn name(&self) -> &'static str;

    fn discard(&self, path: &Path) -> Result<()>;
}

/// Moves files to the platform recycle bin
pub struct TrashDisposer {
    remove_on_failure: bool,
}

impl TrashDisposer {
    pub fn new(remove_on_failure: bool) -> Self {
        Self { remove_on_failure }
    }
}

impl Disposer for TrashDisposer {
    fn name(&self) -> &'static str {
        "trash"
    }

    fn discard(&self, path: &Path) -> Result<()> {
        match trash::delete(path) {
            Ok(()) => {
                info!("Moved to recycle bin: {:?}", path);
                Ok(())
            }
            Err(e) if self.remove_on_failure => {
                warn!("Recycle bin refused {:?}: {}, removing instead", path, e);
                std::fs::remove_file(path).map_err(|fs_err| CullerError::Disposal {
                    path: path.to_path_buf(),
                    reason: format!("trash failed ({}), remove failed ({})", e, fs_err),
                })
            }
            Err(e) => Err(CullerError::Disposal {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Deletes files outright, for systems without a recycle bin
pub struct RemoveDisposer;

impl Disposer for RemoveDisposer {
    fn name(&self) -> &'static str {
        "remove"
    }

    fn discard(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).map_err(|e| CullerError::Disposal {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("Removed: {:?}", path);
        Ok(())
    }
}

/// Leaves files alone
pub struct DryRunDisposer;

impl Disposer for DryRunDisposer {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    fn discard(&self, path: &Path) -> Result<()> {
        info!("DRY RUN: Would move {:?} to the recycle bin", path);
        Ok(())
    }
}

/// Pick a disposer from configuration
pub fn from_config(config: &DisposalConfig, dry_run: bool) -> Box<dyn Disposer> {
    if dry_run {
        Box::new(DryRunDisposer)
    } else if config.use_trash {
        Box::new(TrashDisposer::new(config.remove_on_trash_failure))
    } else {
        Box::new(RemoveDisposer)
    }
}
