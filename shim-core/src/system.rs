// Host module system
// Loads modules through an ordered loader chain and caches them process-wide

use crate::error::{guard_init, LoadError};
use crate::loader::ModuleLoader;
use crate::module::Module;
use crate::path::ModulePath;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// Ordered loaders plus a cache of every module loaded so far
///
/// Importing the same path twice returns the same `Arc<Module>`, and
/// concurrent first imports of one path run its initialiser once. Failed
/// imports are not cached, so a later import tries again.
#[derive(Default)]
pub struct ModuleSystem {
    loaders: Vec<Box<dyn ModuleLoader>>,
    cache: DashMap<ModulePath, Arc<Module>>,
    // One slot per path being loaded; shard guards are never held across a load
    in_flight: DashMap<ModulePath, Arc<Mutex<()>>>,
}

impl ModuleSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.add_loader(loader);
        self
    }

    pub fn add_loader(&mut self, loader: impl ModuleLoader + 'static) {
        self.loaders.push(Box::new(loader));
    }

    pub fn loader_names(&self) -> Vec<&str> {
        self.loaders.iter().map(|l| l.name()).collect()
    }

    /// Load `path`, or return the cached module
    ///
    /// Loaders are asked in order. `NotFound` moves on to the next loader;
    /// any other error stops the search and is returned. A module whose
    /// initialiser imports itself deadlocks.
    pub fn import(&self, path: &ModulePath) -> Result<Arc<Module>, LoadError> {
        if let Some(cached) = self.get_loaded(path) {
            log::trace!("cache hit for {}", path);
            return Ok(cached);
        }

        let slot = Arc::clone(self.in_flight.entry(path.clone()).or_default().value());
        let _loading = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Whoever held the slot before us may have finished the load
        if let Some(cached) = self.get_loaded(path) {
            log::trace!("{} loaded by a concurrent import", path);
            return Ok(cached);
        }

        let module = Arc::new(self.load_uncached(path)?);
        self.cache.insert(path.clone(), Arc::clone(&module));
        Ok(module)
    }

    fn load_uncached(&self, path: &ModulePath) -> Result<Module, LoadError> {
        for loader in &self.loaders {
            match guard_init(path, || loader.load(path)) {
                Ok(module) => {
                    log::debug!("loaded {} via {} loader", path, loader.name());
                    return Ok(module);
                }
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        Err(LoadError::not_found(path))
    }

    /// Whether any loader knows `path` (does not load it)
    pub fn can_import(&self, path: &ModulePath) -> bool {
        self.is_loaded(path) || self.loaders.iter().any(|l| l.contains(path))
    }

    pub fn is_loaded(&self, path: &ModulePath) -> bool {
        self.cache.contains_key(path)
    }

    pub fn get_loaded(&self, path: &ModulePath) -> Option<Arc<Module>> {
        self.cache.get(path).map(|m| Arc::clone(m.value()))
    }

    /// Paths of loaded modules, sorted
    pub fn loaded_modules(&self) -> Vec<ModulePath> {
        let mut paths: Vec<ModulePath> = self.cache.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Drop one module from the cache; shims already bound keep their copy
    pub fn evict(&self, path: &ModulePath) -> Option<Arc<Module>> {
        self.cache.remove(path).map(|(_, module)| module)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticLoader;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};

    fn path(s: &str) -> ModulePath {
        ModulePath::parse(s).unwrap()
    }

    #[test]
    fn test_import_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let system = ModuleSystem::new().with_loader(StaticLoader::new().with_factory(
            path("labs.memory"),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Module::new(path("labs.memory")).with_attr("store", Value::Int(1)))
            },
        ));

        let first = system.import(&path("labs.memory")).unwrap();
        let second = system.import(&path("labs.memory")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(system.is_loaded(&path("labs.memory")));
        assert_eq!(system.loaded_modules(), vec![path("labs.memory")]);
    }

    #[test]
    fn test_loader_chain_order() {
        let system = ModuleSystem::new()
            .with_loader(
                StaticLoader::named("first")
                    .with_module(Module::new(path("shared")).with_attr("from", "first")),
            )
            .with_loader(
                StaticLoader::named("second")
                    .with_module(Module::new(path("shared")).with_attr("from", "second"))
                    .with_module(Module::new(path("only_second"))),
            );

        assert_eq!(system.loader_names(), vec!["first", "second"]);
        let shared = system.import(&path("shared")).unwrap();
        assert_eq!(shared.get("from"), Some(&Value::from("first")));
        assert!(system.import(&path("only_second")).is_ok());
        assert!(system.import(&path("nowhere")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_failures_are_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let system = ModuleSystem::new().with_loader(StaticLoader::new().with_factory(
            path("flaky"),
            move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(LoadError::init_failed("flaky", "first call fails"))
                } else {
                    Ok(Module::new(path("flaky")))
                }
            },
        ));

        assert!(system.import(&path("flaky")).is_err());
        assert!(!system.is_loaded(&path("flaky")));
        assert!(system.import(&path("flaky")).is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_init_failure_stops_chain() {
        let system = ModuleSystem::new()
            .with_loader(StaticLoader::new().with_factory(path("svc"), || {
                Err(LoadError::init_failed("svc", "boom"))
            }))
            .with_loader(StaticLoader::new().with_module(Module::new(path("svc"))));

        assert!(matches!(
            system.import(&path("svc")),
            Err(LoadError::InitFailed { .. })
        ));
    }

    struct PanickingLoader;

    impl ModuleLoader for PanickingLoader {
        fn name(&self) -> &str {
            "panicking"
        }

        #[allow(clippy::panic)]
        fn load(&self, path: &ModulePath) -> Result<Module, LoadError> {
            panic!("cannot load {}", path)
        }

        fn contains(&self, _path: &ModulePath) -> bool {
            true
        }
    }

    #[test]
    fn test_panicking_loader_is_an_init_failure() {
        let system = ModuleSystem::new()
            .with_loader(PanickingLoader)
            .with_loader(StaticLoader::new().with_module(Module::new(path("svc"))));

        let err = system.import(&path("svc")).unwrap_err();
        assert!(matches!(err, LoadError::InitFailed { .. }));
        assert!(err.to_string().contains("cannot load svc"));
        assert!(!system.is_loaded(&path("svc")));
    }

    #[test]
    fn test_concurrent_imports_initialise_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let system = Arc::new(ModuleSystem::new().with_loader(StaticLoader::new().with_factory(
            path("labs.memory"),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(Module::new(path("labs.memory")))
            },
        )));
        let barrier = Arc::new(std::sync::Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let system = Arc::clone(&system);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    system.import(&path("labs.memory")).unwrap()
                })
            })
            .collect();

        let modules: Vec<Arc<Module>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(modules.iter().all(|m| Arc::ptr_eq(m, &modules[0])));
    }

    #[test]
    fn test_initialiser_may_import_other_modules() {
        let handle: Arc<OnceLock<Weak<ModuleSystem>>> = Arc::new(OnceLock::new());
        let inner = Arc::clone(&handle);
        let system = Arc::new(
            ModuleSystem::new().with_loader(
                StaticLoader::new()
                    .with_module(Module::new(path("labs.leaf")).with_attr("v", 1i64))
                    .with_factory(path("labs.root"), move || {
                        let system = inner
                            .get()
                            .and_then(Weak::upgrade)
                            .ok_or_else(|| LoadError::init_failed("labs.root", "no system"))?;
                        let leaf = system.import(&path("labs.leaf"))?;
                        let v = leaf.get("v").cloned().unwrap_or(Value::Null);
                        Ok(Module::new(path("labs.root")).with_attr("v", v))
                    }),
            ),
        );
        handle.set(Arc::downgrade(&system)).unwrap();

        let root = system.import(&path("labs.root")).unwrap();
        assert_eq!(root.get("v"), Some(&Value::Int(1)));
        assert!(system.is_loaded(&path("labs.leaf")));
    }

    #[test]
    fn test_evict_and_clear() {
        let system = ModuleSystem::new()
            .with_loader(StaticLoader::new().with_module(Module::new(path("a"))));

        assert!(system.can_import(&path("a")));
        assert!(!system.can_import(&path("b")));

        let module = system.import(&path("a")).unwrap();
        let evicted = system.evict(&path("a")).unwrap();
        assert!(Arc::ptr_eq(&module, &evicted));
        assert!(!system.is_loaded(&path("a")));

        system.import(&path("a")).unwrap();
        system.clear_cache();
        assert!(system.loaded_modules().is_empty());
    }
}
