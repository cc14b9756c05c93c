// Lock file management (shim.lock)
// Records which candidate each shim bound, so drift shows up in CI

use crate::package::Package;
use crate::shim::Shim;
use crate::system::ModuleSystem;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Lock file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockFile {
    pub version: u32,

    #[serde(rename = "lockTime")]
    pub lock_time: String,

    pub shims: BTreeMap<String, LockedShim>,
}

/// What one shim bound when the lock was written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedShim {
    /// Bound candidate; `None` when the surface was empty
    pub backend: Option<String>,

    /// `sha256:<hex>` of the backend's module file, when file-backed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

impl LockFile {
    pub fn new() -> Self {
        Self {
            version: 1,
            lock_time: Utc::now().to_rfc3339(),
            shims: BTreeMap::new(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let lockfile: LockFile =
            serde_json::from_str(content).context("Failed to parse shim.lock")?;

        Ok(lockfile)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize lock file")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Resolve the package and record every shim's binding
    pub fn generate(package: &Package, system: &ModuleSystem) -> Result<Self> {
        package.load(system);

        let mut lockfile = Self::new();
        for shim in package.shims() {
            lockfile
                .shims
                .insert(shim.canonical().to_string(), lock_shim(shim)?);
        }

        Ok(lockfile)
    }

    /// Resolve the package and list every difference from the lock
    pub fn verify(&self, package: &Package, system: &ModuleSystem) -> Result<Vec<String>> {
        package.load(system);

        let mut drift = Vec::new();

        for shim in package.shims() {
            let canonical = shim.canonical().to_string();
            let Some(locked) = self.shims.get(&canonical) else {
                drift.push(format!("Shim `{}` is not in the lock file", canonical));
                continue;
            };

            let current = lock_shim(shim)?;

            if current.backend != locked.backend {
                drift.push(format!(
                    "Shim `{}` bound {} but the lock has {}",
                    canonical,
                    describe(&current.backend),
                    describe(&locked.backend)
                ));
            } else if locked.integrity.is_some() && current.integrity != locked.integrity {
                drift.push(format!(
                    "Integrity mismatch for `{}`: expected {}, got {}",
                    canonical,
                    describe(&locked.integrity),
                    describe(&current.integrity)
                ));
            }
        }

        for canonical in self.shims.keys() {
            if !package
                .shims()
                .iter()
                .any(|s| s.canonical().as_str() == canonical)
            {
                drift.push(format!("Locked shim `{}` is no longer declared", canonical));
            }
        }

        Ok(drift)
    }

    pub fn get_shim(&self, canonical: &str) -> Option<&LockedShim> {
        self.shims.get(canonical)
    }
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_shim(shim: &Shim) -> Result<LockedShim> {
    let Some(backend) = shim.backend() else {
        return Ok(LockedShim {
            backend: None,
            integrity: None,
        });
    };

    let integrity = match backend.origin() {
        Some(file) => Some(format!("sha256:{}", hash_file(file)?)),
        None => None,
    };

    Ok(LockedShim {
        backend: Some(backend.path().to_string()),
        integrity,
    })
}

fn describe(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(empty)")
}

/// SHA-256 of a file, hex encoded
pub fn hash_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let content = fs::read(&path)
        .with_context(|| format!("Failed to read file: {}", path.as_ref().display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&content);

    Ok(format!("{:x}", hasher.finalize()))
}
