// File-backed modules
// Resolves dotted module paths to JSON module files under search roots

use super::ModuleLoader;
use crate::error::LoadError;
use crate::module::Module;
use crate::path::ModulePath;
use crate::value::Value;
use std::fs;
use std::path::{Path, PathBuf};

pub const MODULE_EXTENSION: &str = "json";
pub const PACKAGE_FILE: &str = "mod.json";
const PACKAGE_STEM: &str = "mod";

/// Loads modules from JSON files
///
/// For `a.b.c`, each root is tried in order with:
/// 1. `<root>/a/b/c.json` - module file
/// 2. `<root>/a/b/c/mod.json` - package directory
///
/// A module file holds one JSON object; its keys become attributes. A path
/// ending in `mod` never resolves, so `a/mod.json` is reachable only as `a`.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    roots: Vec<PathBuf>,
}

impl FileLoader {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// File that `load` would read for `path`
    pub fn locate(&self, path: &ModulePath) -> Option<PathBuf> {
        self.roots.iter().find_map(|root| locate_in(root, path))
    }

    /// Every module reachable under the roots, sorted and de-duplicated
    pub fn list_modules(&self) -> Vec<ModulePath> {
        let mut modules = Vec::new();
        for root in &self.roots {
            collect_modules(root, &mut Vec::new(), &mut modules);
        }
        modules.sort();
        modules.dedup();
        modules
    }
}

fn locate_in(root: &Path, path: &ModulePath) -> Option<PathBuf> {
    if path.name() == PACKAGE_STEM {
        return None;
    }

    let mut base = root.to_path_buf();
    for segment in path.segments() {
        base.push(segment);
    }

    // Strategy 1: module file
    let module_file = base.with_extension(MODULE_EXTENSION);
    if module_file.is_file() {
        return Some(module_file);
    }

    // Strategy 2: package directory
    let package_file = base.join(PACKAGE_FILE);
    if package_file.is_file() {
        return Some(package_file);
    }

    None
}

fn collect_modules(dir: &Path, prefix: &mut Vec<String>, out: &mut Vec<ModulePath>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        if path.is_dir() {
            prefix.push(name);
            collect_modules(&path, prefix, out);
            prefix.pop();
        } else if name == PACKAGE_FILE {
            if prefix.last().is_some_and(|p| p == PACKAGE_STEM) {
                continue;
            }
            if let Ok(module) = ModulePath::parse(&prefix.join(".")) {
                out.push(module);
            }
        } else if let Some(stem) = name.strip_suffix(".json") {
            let mut segments = prefix.clone();
            segments.push(stem.to_string());
            if let Ok(module) = ModulePath::parse(&segments.join(".")) {
                out.push(module);
            }
        }
    }
}

impl ModuleLoader for FileLoader {
    fn name(&self) -> &str {
        "file"
    }

    fn load(&self, path: &ModulePath) -> Result<Module, LoadError> {
        let file = self.locate(path).ok_or_else(|| LoadError::not_found(path))?;

        let content = fs::read_to_string(&file).map_err(|e| LoadError::Io {
            file: file.clone(),
            reason: e.to_string(),
        })?;

        let json: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| LoadError::Malformed {
                path: path.to_string(),
                reason: format!("{}: {}", file.display(), e),
            })?;

        let serde_json::Value::Object(attributes) = json else {
            return Err(LoadError::Malformed {
                path: path.to_string(),
                reason: format!("{}: expected a JSON object", file.display()),
            });
        };

        let mut module = Module::new(path.clone()).with_origin(file);
        for (name, value) in attributes {
            module.set_attr(name, Value::from_json(value));
        }

        Ok(module)
    }

    fn contains(&self, path: &ModulePath) -> bool {
        self.locate(path).is_some()
    }
}
