use crate::path::ModulePath;
use crate::value::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A loaded module: its path and its attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    path: ModulePath,
    attributes: BTreeMap<String, Value>,
    /// File the module was read from, when file-backed
    origin: Option<PathBuf>,
}

impl Module {
    pub fn new(path: ModulePath) -> Self {
        Self {
            path,
            attributes: BTreeMap::new(),
            origin: None,
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_origin(mut self, origin: PathBuf) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn path(&self) -> &ModulePath {
        &self.path
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attribute names not starting with `private_marker`, sorted
    pub fn public_names(&self, private_marker: &str) -> Vec<&str> {
        self.attributes
            .keys()
            .filter(|name| !name.starts_with(private_marker))
            .map(String::as_str)
            .collect()
    }
}
