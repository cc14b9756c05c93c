// Bridge manifest - shim.json

use crate::config;
use crate::loader::FileLoader;
use crate::package::Package;
use crate::path::{CandidateList, ModulePath};
use crate::shim::Shim;
use crate::surface::DEFAULT_PRIVATE_MARKER;
use crate::system::ModuleSystem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shim_diagnostics::error_codes;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Package description (shim.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub package: String,

    #[serde(rename = "privateMarker", default = "default_private_marker")]
    pub private_marker: String,

    /// Module roots, relative to the manifest's directory
    #[serde(rename = "searchPaths", default, skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<String>,

    #[serde(default)]
    pub shims: Vec<ShimEntry>,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// One canonical path and its candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShimEntry {
    pub canonical: String,
    pub candidates: Vec<String>,
}

/// A validation problem, with its diagnostic code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIssue {
    pub code: &'static str,
    pub message: String,
}

fn default_private_marker() -> String {
    DEFAULT_PRIVATE_MARKER.to_string()
}

impl Manifest {
    /// Parse and validate shim.json
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manifest = Self::read(&path)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse shim.json without validating it
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let mut manifest: Manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        manifest.base_dir = path.parent().map(Path::to_path_buf);
        Ok(manifest)
    }

    /// Parse and validate manifest text; search paths stay relative to the cwd
    pub fn from_str(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(content).context("Failed to parse shim.json")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize manifest")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Fail on the first validation problem
    pub fn validate(&self) -> Result<()> {
        match self.issues().into_iter().next() {
            Some(issue) => anyhow::bail!("{}", issue.message),
            None => Ok(()),
        }
    }

    /// Every validation problem, in manifest order
    pub fn issues(&self) -> Vec<ManifestIssue> {
        let mut issues = Vec::new();
        let mut push = |code, message: String| issues.push(ManifestIssue { code, message });

        if self.package.trim().is_empty() {
            push(
                error_codes::INVALID_MANIFEST,
                "Package name cannot be empty".to_string(),
            );
        }

        if self.private_marker.is_empty() {
            push(
                error_codes::INVALID_MANIFEST,
                "Private marker cannot be empty".to_string(),
            );
        }

        if self.shims.is_empty() {
            push(
                error_codes::INVALID_MANIFEST,
                "Manifest declares no shims".to_string(),
            );
        }

        let mut seen = HashSet::new();
        for entry in &self.shims {
            match ModulePath::parse(&entry.canonical) {
                Ok(canonical) => {
                    if !seen.insert(canonical.clone()) {
                        push(
                            error_codes::DUPLICATE_SHIM,
                            format!("Shim `{}` is declared more than once", canonical),
                        );
                    }
                }
                Err(e) => push(error_codes::INVALID_MODULE_PATH, e.to_string()),
            }

            if entry.candidates.is_empty() {
                push(
                    error_codes::EMPTY_CANDIDATES,
                    format!("Shim `{}` has no candidates", entry.canonical),
                );
            }

            for candidate in &entry.candidates {
                if let Err(e) = ModulePath::parse(candidate) {
                    push(
                        error_codes::INVALID_MODULE_PATH,
                        format!("In shim `{}`: {}", entry.canonical, e),
                    );
                }
            }
        }

        issues
    }

    /// Directory relative search paths are resolved against
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// `SHIM_PATH` roots first, then the manifest's own search paths
    pub fn resolved_search_paths(&self) -> Vec<PathBuf> {
        let mut roots = config::search_roots_from_env();

        for entry in &self.search_paths {
            let path = PathBuf::from(entry);
            let resolved = match &self.base_dir {
                Some(base) if path.is_relative() => base.join(path),
                _ => path,
            };
            roots.push(resolved);
        }

        roots
    }

    /// File-backed module system over the resolved search paths
    pub fn module_system(&self) -> ModuleSystem {
        ModuleSystem::new().with_loader(self.file_loader())
    }

    pub fn file_loader(&self) -> FileLoader {
        FileLoader::new(self.resolved_search_paths())
    }

    /// Build the package; fails if the manifest does not validate
    pub fn build_package(&self) -> Result<Package> {
        self.validate()?;

        let mut package = Package::new(&self.package);

        for entry in &self.shims {
            let canonical = ModulePath::parse(&entry.canonical)?;
            let candidates = CandidateList::new(&entry.candidates)
                .with_context(|| format!("Invalid candidates for `{}`", canonical))?;
            let shim = Shim::from_parts(canonical, candidates)
                .with_private_marker(&self.private_marker)?;
            package.add_shim(shim);
        }

        Ok(package)
    }

    /// Line of `"canonical": "<path>"` in the manifest text, for diagnostics
    ///
    /// Only the value of the `canonical` key counts; the same path listed as
    /// a candidate elsewhere is ignored.
    pub fn line_of(content: &str, canonical: &str) -> Option<usize> {
        let needle = format!("\"{}\"", canonical);
        content
            .lines()
            .position(|line| {
                line.match_indices("\"canonical\"").any(|(idx, key)| {
                    line.get(idx + key.len()..)
                        .and_then(|rest| rest.trim_start().strip_prefix(':'))
                        .is_some_and(|value| value.trim_start().starts_with(&needle))
                })
            })
            .map(|idx| idx + 1)
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            package: "my-package".to_string(),
            private_marker: default_private_marker(),
            search_paths: vec!["modules".to_string()],
            shims: vec![ShimEntry {
                canonical: "my_package.widget".to_string(),
                candidates: vec![
                    "legacy.widget".to_string(),
                    "my_package.impl_.widget".to_string(),
                ],
            }],
            base_dir: None,
        }
    }
}

/// Write a starter shim.json into `dir`
pub fn init_manifest(dir: &Path) -> Result<PathBuf> {
    let manifest_path = dir.join(config::MANIFEST_FILE);
    if manifest_path.exists() {
        anyhow::bail!("{} already exists in {}", config::MANIFEST_FILE, dir.display());
    }

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut manifest = Manifest::default();
    if let Some(name) = dir
        .canonicalize()
        .ok()
        .as_deref()
        .and_then(Path::file_name)
        .and_then(|n| n.to_str())
    {
        manifest.package = name.to_string();
    }

    manifest.to_file(&manifest_path)?;
    Ok(manifest_path)
}
