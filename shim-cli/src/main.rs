use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use shim_core::config::{lock_path_for, MANIFEST_FILE};
use shim_core::{LockFile, Manifest, ModulePath, Package, Shim, SurfaceError};
use shim_diagnostics::{fuzzy, DiagnosticEngine, Location};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "shim")]
#[command(version)]
#[command(about = "Resolve canonical module paths to their first available backend", long_about = None)]
struct Cli {
    /// Path to the bridge manifest
    #[arg(short, long, global = true, value_name = "FILE", default_value = MANIFEST_FILE)]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every shim and show what it bound
    Resolve {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the names a shim exports
    Exports {
        /// Canonical module path
        #[arg(value_name = "CANONICAL")]
        canonical: String,
    },

    /// Print one exported value as JSON
    Get {
        /// Canonical module path
        #[arg(value_name = "CANONICAL")]
        canonical: String,

        /// Exported name
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Validate the manifest and report shims with empty surfaces
    Check {
        /// Also verify bindings against shim.lock
        #[arg(long)]
        locked: bool,

        /// Output diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write shim.lock next to the manifest
    Lock,

    /// Show which file a module path loads from
    Locate {
        /// Dotted module path
        #[arg(value_name = "MODULE")]
        module: String,
    },

    /// Write a starter manifest
    Init {
        /// Directory (default: current directory)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { json } => resolve(&cli.manifest, json),
        Commands::Exports { canonical } => exports(&cli.manifest, &canonical),
        Commands::Get { canonical, name } => get(&cli.manifest, &canonical, &name),
        Commands::Check { locked, json } => check(&cli.manifest, locked, json),
        Commands::Lock => lock(&cli.manifest),
        Commands::Locate { module } => locate(&cli.manifest, &module),
        Commands::Init { path } => {
            let dir = path.unwrap_or_else(|| PathBuf::from("."));
            let written = shim_core::init_manifest(&dir)?;
            println!("✅ Initialized {}", written.display());
            Ok(())
        }
    }
}

fn load(manifest_path: &Path) -> Result<(Manifest, Package)> {
    let manifest = Manifest::from_file(manifest_path)?;
    log::debug!(
        "manifest {}: search paths {:?}",
        manifest_path.display(),
        manifest.resolved_search_paths()
    );
    let package = manifest.build_package()?;
    Ok((manifest, package))
}

fn report_misses(shim: &Shim, engine: &mut DiagnosticEngine) {
    let canonical = shim.canonical().to_string();

    if let Some(report) = shim.report() {
        for (candidate, reason) in report.misses() {
            engine.candidate_unavailable(&canonical, candidate.as_str(), reason);
        }
    }

    if shim.is_resolved() && !shim.is_bound() {
        engine.empty_surface(&canonical, &shim.candidates().to_strings());
    }
}

fn resolve(manifest_path: &Path, json: bool) -> Result<()> {
    let (manifest, package) = load(manifest_path)?;
    let system = manifest.module_system();
    let namespace = package.load(&system);

    let mut engine = DiagnosticEngine::new();
    for shim in package.shims() {
        report_misses(shim, &mut engine);
    }
    for (name, shadowed, winner) in namespace.shadowed() {
        engine.name_shadowed(
            name,
            shadowed.as_str(),
            winner.as_str(),
            Location::new(winner.as_str()),
        );
    }

    if json {
        let shims: Vec<serde_json::Value> = package
            .shims()
            .iter()
            .map(|shim| {
                let misses: Vec<serde_json::Value> = shim
                    .report()
                    .map(|r| {
                        r.misses()
                            .map(|(candidate, reason)| {
                                serde_json::json!({ "candidate": candidate.as_str(), "reason": reason })
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                serde_json::json!({
                    "canonical": shim.canonical().as_str(),
                    "backend": shim.bound_path().map(ModulePath::as_str),
                    "exports": shim.surface().map(|s| s.exports()).unwrap_or_default(),
                    "misses": misses,
                })
            })
            .collect();

        let output = serde_json::json!({
            "package": package.name(),
            "shims": shims,
            "exports": namespace.exports(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} {}", "package".bold(), package.name());
    for shim in package.shims() {
        let backend = match shim.bound_path() {
            Some(path) => path.to_string().green(),
            None => "(empty)".yellow(),
        };
        let exports = shim.surface().map(|s| s.exports()).unwrap_or_default();
        println!("  {} -> {}", shim.canonical(), backend);
        if !exports.is_empty() {
            println!("      {}", exports.join(", ").dimmed());
        }
    }

    if engine.has_diagnostics() {
        eprintln!();
        engine.print_all();
        engine.print_summary();
    }

    Ok(())
}

fn find_shim<'p>(package: &'p Package, canonical: &ModulePath) -> Result<&'p Shim> {
    if let Some(shim) = package.shim_for(canonical) {
        return Ok(shim);
    }

    let declared: Vec<String> = package
        .shims()
        .iter()
        .map(|s| s.canonical().to_string())
        .collect();
    let suggestions = fuzzy::suggest(canonical.as_str(), &declared);
    if suggestions.is_empty() {
        anyhow::bail!("No shim declared for `{}`", canonical);
    }
    anyhow::bail!(
        "No shim declared for `{}`; did you mean `{}`?",
        canonical,
        suggestions.join("`, `")
    )
}

fn exports(manifest_path: &Path, canonical: &str) -> Result<()> {
    let (manifest, package) = load(manifest_path)?;
    let canonical = ModulePath::parse(canonical)?;
    let shim = find_shim(&package, &canonical)?;

    let system = manifest.module_system();
    for name in shim.resolve_and_bind(&system).exports() {
        println!("{}", name);
    }

    Ok(())
}

fn get(manifest_path: &Path, canonical: &str, name: &str) -> Result<()> {
    let (manifest, package) = load(manifest_path)?;
    let canonical = ModulePath::parse(canonical)?;
    let shim = find_shim(&package, &canonical)?;

    let system = manifest.module_system();
    match shim.resolve_and_bind(&system).require(name) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value.to_json())?);
            Ok(())
        }
        Err(SurfaceError::Unbound { name, suggestions }) => {
            let mut engine = DiagnosticEngine::new();
            engine.unbound_name(&name, Location::new(canonical.as_str()), &suggestions);
            engine.print_all();
            anyhow::bail!("`{}` is not exported by `{}`", name, canonical)
        }
        Err(e) => Err(e.into()),
    }
}

fn check(manifest_path: &Path, locked: bool, json: bool) -> Result<()> {
    let engine = shim_core::check_manifest(manifest_path, locked)?;

    if json {
        println!("{}", engine.to_json());
    } else if engine.has_diagnostics() {
        engine.print_all();
        engine.print_summary();
    } else {
        println!("✅ {} is valid", manifest_path.display());
    }

    if engine.has_errors() {
        anyhow::bail!("check failed with {} error(s)", engine.error_count());
    }

    Ok(())
}

fn lock(manifest_path: &Path) -> Result<()> {
    let (manifest, package) = load(manifest_path)?;
    let system = manifest.module_system();

    let lockfile = LockFile::generate(&package, &system)?;
    let lock_path = lock_path_for(manifest_path);
    lockfile.to_file(&lock_path)?;

    let bound = lockfile.shims.values().filter(|s| s.backend.is_some()).count();
    println!(
        "✅ Wrote {} ({}/{} shims bound)",
        lock_path.display(),
        bound,
        lockfile.shims.len()
    );

    Ok(())
}

fn locate(manifest_path: &Path, module: &str) -> Result<()> {
    let manifest = Manifest::from_file(manifest_path)?;
    let module = ModulePath::parse(module)?;
    let loader = manifest.file_loader();

    match loader.locate(&module) {
        Some(file) => {
            println!("{}", file.display());
            Ok(())
        }
        None => {
            let roots: Vec<String> = loader
                .roots()
                .iter()
                .map(|r| r.display().to_string())
                .collect();
            anyhow::bail!("`{}` not found in: {}", module, roots.join(", "))
        }
    }
}
