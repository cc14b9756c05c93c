use shim_core::{
    CallError, LoadError, Module, ModulePath, ModuleSystem, Shim, StaticLoader, SurfaceError,
    Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn path(s: &str) -> ModulePath {
    ModulePath::parse(s).unwrap()
}

struct WidgetClass;

fn widget_system() -> ModuleSystem {
    ModuleSystem::new().with_loader(
        StaticLoader::new().with_module(
            Module::new(path("pkg.new.widget"))
                .with_attr("Widget", Value::object(WidgetClass))
                .with_attr("_internal_cache", Value::List(Vec::new())),
        ),
    )
}

#[test]
fn test_legacy_absent_new_bound() {
    let system = widget_system();
    let shim = Shim::new("pkg.widget", ["pkg.legacy.widget", "pkg.new.widget"]).unwrap();

    let surface = shim.resolve_and_bind(&system);

    assert_eq!(surface.exports(), vec!["Widget"]);
    assert!(surface.get("Widget").unwrap().downcast_ref::<WidgetClass>().is_some());
    assert!(surface.get("_internal_cache").is_none());
    assert_eq!(shim.bound_path(), Some(&path("pkg.new.widget")));

    let report = shim.report().unwrap();
    let misses: Vec<_> = report.misses().map(|(c, _)| c.to_string()).collect();
    assert_eq!(misses, vec!["pkg.legacy.widget"]);
}

#[test]
fn test_first_resolvable_candidate_surface_is_exact() {
    let first = Module::new(path("a"))
        .with_attr("alpha", 1i64)
        .with_attr("beta", "two")
        .with_attr("_gamma", 3i64);
    let system = ModuleSystem::new().with_loader(
        StaticLoader::new()
            .with_module(first.clone())
            .with_module(Module::new(path("b")).with_attr("delta", 4i64)),
    );

    let shim = Shim::new("canon", ["a", "b"]).unwrap();
    let surface = shim.resolve_and_bind(&system);

    let expected: Vec<(String, Value)> = first
        .attributes()
        .filter(|(name, _)| !name.starts_with('_'))
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    let actual: Vec<(String, Value)> = surface
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    assert_eq!(actual, expected);
}

#[test]
fn test_failing_initialiser_falls_through_without_merging() {
    let system = ModuleSystem::new().with_loader(
        StaticLoader::new()
            .with_factory(path("a"), || Err(LoadError::init_failed("a", "import-time fault")))
            .with_module(Module::new(path("b")).with_attr("from_b", true)),
    );

    let shim = Shim::new("canon", ["a", "b"]).unwrap();
    let surface = shim.resolve_and_bind(&system);

    assert_eq!(shim.bound_path(), Some(&path("b")));
    assert_eq!(surface.exports(), vec!["from_b"]);
    assert!(!system.is_loaded(&path("a")));

    let reasons: Vec<_> = shim.report().unwrap().misses().map(|(_, r)| r.to_string()).collect();
    assert_eq!(reasons, vec!["module a failed to initialise: import-time fault"]);
}

#[test]
#[allow(clippy::panic)]
fn test_panicking_initialiser_falls_through() {
    let probes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&probes);
    let system = ModuleSystem::new().with_loader(
        StaticLoader::new()
            .with_factory(path("a"), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                panic!("import-time fault")
            })
            .with_module(Module::new(path("b")).with_attr("from_b", true)),
    );

    let shim = Shim::new("canon", ["a", "b"]).unwrap();
    let surface = shim.resolve_and_bind(&system);

    assert!(shim.is_resolved());
    assert_eq!(shim.bound_path(), Some(&path("b")));
    assert_eq!(surface.exports(), vec!["from_b"]);

    let reasons: Vec<_> = shim.report().unwrap().misses().map(|(_, r)| r.to_string()).collect();
    assert_eq!(reasons.len(), 1);
    assert!(reasons[0].contains("import-time fault"));

    // Bound once; the panicking candidate is not probed again
    shim.resolve_and_bind(&system);
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_nothing_resolves() {
    let system = ModuleSystem::new();
    let shim = Shim::new("lukhas.consciousness", ["labs.consciousness", "candidate.consciousness"])
        .unwrap();

    let surface = shim.resolve_and_bind(&system);
    assert!(surface.is_empty());
    assert!(shim.backend().is_none());

    // The primary failure mode for consumers: a typed "not defined" error
    assert!(matches!(
        surface.call("awaken", &[]),
        Err(SurfaceError::Unbound { .. })
    ));
}

#[test]
fn test_idempotent_without_reprobing() {
    let probes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&probes);
    let system = ModuleSystem::new().with_loader(StaticLoader::new().with_factory(
        path("labs.memory"),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Module::new(path("labs.memory")).with_attr("fold", 1i64))
        },
    ));

    let shim = Shim::new("lukhas.memory", ["labs.memory"]).unwrap();
    let first = shim.resolve_and_bind(&system).clone();
    let second = shim.resolve_and_bind(&system).clone();

    assert_eq!(first, second);
    assert_eq!(probes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_two_shims_share_cached_backend() {
    let system = widget_system();
    let a = Shim::new("pkg.widget", ["pkg.new.widget"]).unwrap();
    let b = Shim::new("legacy.widget", ["pkg.legacy.widget", "pkg.new.widget"]).unwrap();

    a.resolve_and_bind(&system);
    b.resolve_and_bind(&system);

    assert!(Arc::ptr_eq(a.backend().unwrap(), b.backend().unwrap()));
}

#[test]
fn test_concurrent_first_resolution_runs_once() {
    let inits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&inits);
    let system = Arc::new(ModuleSystem::new().with_loader(StaticLoader::new().with_factory(
        path("labs.orchestration"),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Module::new(path("labs.orchestration")).with_attr("Hub", "hub"))
        },
    )));
    let shim = Arc::new(Shim::new("lukhas.orchestration", ["labs.orchestration"]).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let system = Arc::clone(&system);
            let shim = Arc::clone(&shim);
            thread::spawn(move || shim.resolve_and_bind(&system).exports())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec!["Hub"]);
    }
    assert_eq!(inits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_distinct_shims_racing_share_one_initialisation() {
    let inits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&inits);
    let system = Arc::new(ModuleSystem::new().with_loader(StaticLoader::new().with_factory(
        path("labs.memory"),
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            Ok(Module::new(path("labs.memory")).with_attr("MemoryFold", "fold"))
        },
    )));
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = ["lukhas.memory", "core.memory", "memory", "legacy.memory"]
        .into_iter()
        .map(|canonical| {
            let system = Arc::clone(&system);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let shim = Shim::new(canonical, ["labs.memory"]).unwrap();
                barrier.wait();
                shim.resolve_and_bind(&system);
                Arc::clone(shim.backend().unwrap())
            })
        })
        .collect();

    let backends: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(inits.load(Ordering::SeqCst), 1);
    assert!(backends.iter().all(|b| Arc::ptr_eq(b, &backends[0])));
}

#[test]
fn test_backend_errors_propagate_unchanged() {
    let system = ModuleSystem::new().with_loader(
        StaticLoader::new().with_module(Module::new(path("labs.governance")).with_attr(
            "audit",
            Value::function("audit", |_| {
                Err(CallError::Failed {
                    function: "audit".to_string(),
                    message: "ledger unavailable".to_string(),
                })
            }),
        )),
    );

    let shim = Shim::new("lukhas.governance", ["labs.governance"]).unwrap();
    let err = shim
        .resolve_and_bind(&system)
        .call("audit", &[])
        .unwrap_err();

    match err {
        SurfaceError::Backend(inner) => assert_eq!(
            inner,
            CallError::Failed {
                function: "audit".to_string(),
                message: "ledger unavailable".to_string(),
            }
        ),
        other => unreachable!("expected backend error, got {:?}", other),
    }
}
