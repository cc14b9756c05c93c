// Compiled-in module registry

use super::ModuleLoader;
use crate::error::{guard_init, LoadError};
use crate::module::Module;
use crate::path::ModulePath;
use std::collections::HashMap;
use std::sync::Arc;

type ModuleFactory = dyn Fn() -> Result<Module, LoadError> + Send + Sync;

/// Registry of module factories keyed by path
///
/// Running a factory is the module's initialiser: it may build services,
/// read state, or fail. A panicking factory is reported as
/// `LoadError::InitFailed`. Factories run each time `load` is called;
/// caching belongs to the `ModuleSystem`.
#[derive(Default)]
pub struct StaticLoader {
    name: String,
    factories: HashMap<ModulePath, Arc<ModuleFactory>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::named("static")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factories: HashMap::new(),
        }
    }

    /// Register an initialiser for `path`, replacing any earlier one
    pub fn register<F>(&mut self, path: ModulePath, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Module, LoadError> + Send + Sync + 'static,
    {
        self.factories.insert(path, Arc::new(factory));
        self
    }

    /// Register a ready-made module
    pub fn register_module(&mut self, module: Module) -> &mut Self {
        let path = module.path().clone();
        self.register(path, move || Ok(module.clone()))
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.register_module(module);
        self
    }

    pub fn with_factory<F>(mut self, path: ModulePath, factory: F) -> Self
    where
        F: Fn() -> Result<Module, LoadError> + Send + Sync + 'static,
    {
        self.register(path, factory);
        self
    }

    pub fn unregister(&mut self, path: &ModulePath) -> bool {
        self.factories.remove(path).is_some()
    }

    /// Registered paths, sorted
    pub fn paths(&self) -> Vec<&ModulePath> {
        let mut paths: Vec<_> = self.factories.keys().collect();
        paths.sort();
        paths
    }
}

impl ModuleLoader for StaticLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self, path: &ModulePath) -> Result<Module, LoadError> {
        let factory = self
            .factories
            .get(path)
            .ok_or_else(|| LoadError::not_found(path))?;

        let module = guard_init(path, || factory())?;

        if module.path() != path {
            return Err(LoadError::Malformed {
                path: path.to_string(),
                reason: format!("initialiser produced module `{}`", module.path()),
            });
        }

        Ok(module)
    }

    fn contains(&self, path: &ModulePath) -> bool {
        self.factories.contains_key(path)
    }
}
