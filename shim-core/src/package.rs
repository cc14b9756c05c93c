// Aggregating packages
// A named set of shims whose surfaces merge into one namespace

use crate::error::SurfaceError;
use crate::path::ModulePath;
use crate::shim::Shim;
use crate::surface::{call_value, PublicSurface};
use crate::system::ModuleSystem;
use crate::value::Value;
use shim_diagnostics::fuzzy;
use std::collections::BTreeMap;

/// Merged view of every shim surface in a package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    names: BTreeMap<String, Value>,
    /// name -> canonical path of the shim that provided it
    providers: BTreeMap<String, ModulePath>,
    /// (name, shadowed shim, winning shim)
    shadowed: Vec<(String, ModulePath, ModulePath)>,
}

impl Namespace {
    fn merge(&mut self, canonical: &ModulePath, surface: &PublicSurface) {
        for (name, value) in surface.iter() {
            if let Some(previous) = self.providers.insert(name.to_string(), canonical.clone()) {
                log::debug!("`{}` from {} shadowed by {}", name, previous, canonical);
                self.shadowed
                    .push((name.to_string(), previous, canonical.clone()));
            }
            self.names.insert(name.to_string(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Value, SurfaceError> {
        self.names.get(name).ok_or_else(|| SurfaceError::Unbound {
            name: name.to_string(),
            suggestions: fuzzy::suggest(name, &self.exports()),
        })
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, SurfaceError> {
        call_value(name, self.require(name)?, args)
    }

    /// Canonical path of the shim a name came from
    pub fn provider_of(&self, name: &str) -> Option<&ModulePath> {
        self.providers.get(name)
    }

    pub fn shadowed(&self) -> &[(String, ModulePath, ModulePath)] {
        &self.shadowed
    }

    /// Sorted export list
    pub fn exports(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A package that re-exports a list of shims
///
/// Shims resolve in declaration order; when two export the same name the
/// later shim wins.
#[derive(Debug)]
pub struct Package {
    name: String,
    shims: Vec<Shim>,
}

impl Package {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shims: Vec::new(),
        }
    }

    pub fn shim(mut self, shim: Shim) -> Self {
        self.add_shim(shim);
        self
    }

    pub fn add_shim(&mut self, shim: Shim) {
        self.shims.push(shim);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shims(&self) -> &[Shim] {
        &self.shims
    }

    pub fn shim_for(&self, canonical: &ModulePath) -> Option<&Shim> {
        self.shims.iter().find(|s| s.canonical() == canonical)
    }

    /// Resolve every shim and merge their surfaces
    pub fn load(&self, system: &ModuleSystem) -> Namespace {
        let mut namespace = Namespace::default();

        for shim in &self.shims {
            let surface = shim.resolve_and_bind(system);
            namespace.merge(shim.canonical(), surface);
        }

        let bound = self.shims.iter().filter(|s| s.is_bound()).count();
        log::info!(
            "package {}: {}/{} shims bound, {} names exported",
            self.name,
            bound,
            self.shims.len(),
            namespace.len()
        );

        namespace
    }

    /// Shims that resolved to nothing; empty before `load`
    pub fn unbound(&self) -> Vec<&Shim> {
        self.shims
            .iter()
            .filter(|s| s.is_resolved() && !s.is_bound())
            .collect()
    }
}
