// Resolver configuration from the environment

use std::env;
use std::path::{Path, PathBuf};

/// Default manifest file name
pub const MANIFEST_FILE: &str = "shim.json";

/// Default lock file name, written next to the manifest
pub const LOCK_FILE: &str = "shim.lock";

/// Extra module search roots, in platform path-list form
pub const SEARCH_PATH_VAR: &str = "SHIM_PATH";

/// The lock file that belongs to a manifest
pub fn lock_path_for(manifest_path: &Path) -> PathBuf {
    manifest_path
        .parent()
        .map(|dir| dir.join(LOCK_FILE))
        .unwrap_or_else(|| PathBuf::from(LOCK_FILE))
}

/// Search roots from `SHIM_PATH`, in order; empty entries are skipped
pub fn search_roots_from_env() -> Vec<PathBuf> {
    match env::var_os(SEARCH_PATH_VAR) {
        Some(value) => split_search_path(&value),
        None => Vec::new(),
    }
}

pub fn split_search_path(value: &std::ffi::OsStr) -> Vec<PathBuf> {
    env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}
