// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Finding image files to feed a session

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::Result;

/// List supported images in a folder, sorted by path
pub fn scan_folder(dir: &Path, extensions: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect(dir, extensions, recursive, &mut files)?;
    files.sort();
    debug!("Found {} images in {:?}", files.len(), dir);
    Ok(files)
}

fn collect(dir: &Path, extensions: &[String], recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // file_type() does not follow links
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if recursive && !is_hidden(&path) {
                collect(&path, extensions, recursive, out)?;
            }
        } else if file_type.is_symlink() && path.is_dir() {
            debug!("Not following directory link {:?}", path);
        } else if path.is_file() && is_supported(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}

/// Keep only paths that look like supported images, preserving order
pub fn filter_supported<I>(paths: I, extensions: &[String]) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    paths
        .into_iter()
        .filter(|p| {
            let ok = is_supported(p, extensions);
            if !ok {
                debug!("Skipping unsupported file: {:?}", p);
            }
            ok
        })
        .collect()
}

/// Check extension and skip hidden or half-written files
pub fn is_supported(path: &Path, extensions: &[String]) -> bool {
    if is_hidden(path) {
        return false;
    }

    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    // Skip temporary files
    let temp_suffixes = [".tmp", ".part", ".crdownload", ".partial", ".download"];
    if temp_suffixes.iter().any(|s| filename.ends_with(s)) {
        return false;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
