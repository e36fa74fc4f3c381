// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::PathBuf;

const APP_DIR: &str = "tillprint";

/// Return the application data directory, creating it if needed.
///
/// `$XDG_DATA_HOME/tillprint`, else `~/.local/share/tillprint`.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join(APP_DIR);
    if let Err(e) = std::fs::create_dir_all(&dir) {
        tracing::warn!(path = %dir.display(), error = %e, "could not create data directory");
    }
    dir
}

/// Scratch directory used when the real data directory is unusable.
pub fn fallback_dir() -> PathBuf {
    std::env::temp_dir().join(APP_DIR)
}

fn base_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME")
        && !xdg.is_empty()
    {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
