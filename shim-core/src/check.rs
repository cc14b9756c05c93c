// Manifest checks (shim check)

use crate::config;
use crate::lockfile::LockFile;
use crate::manifest::Manifest;
use anyhow::{Context, Result};
use shim_diagnostics::{error_codes, Diagnostic, DiagnosticEngine, Location};
use std::fs;
use std::path::Path;

/// Validate a manifest, resolve its shims and collect what looks wrong
///
/// Manifest issues are errors and stop the check before resolution. Empty
/// surfaces and shadowed names are warnings. With `locked`, the lock file
/// next to the manifest must exist and match. Callers decide what to do
/// with the returned diagnostics; only I/O and parse failures are `Err`.
pub fn check_manifest(manifest_path: &Path, locked: bool) -> Result<DiagnosticEngine> {
    let manifest = Manifest::read(manifest_path)?;
    let content = fs::read_to_string(manifest_path)
        .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
    let origin = manifest_path.display().to_string();
    let locate = |canonical: &str| match Manifest::line_of(&content, canonical) {
        Some(line) => Location::at_line(&origin, line),
        None => Location::new(&origin),
    };

    let mut engine = DiagnosticEngine::new();

    for issue in manifest.issues() {
        engine.emit_error(issue.code, issue.message, Location::new(&origin));
    }
    if engine.has_errors() {
        return Ok(engine);
    }

    let package = manifest.build_package()?;
    let system = manifest.module_system();
    let namespace = package.load(&system);

    for shim in package.unbound() {
        let canonical = shim.canonical().to_string();
        let mut diag = Diagnostic::warning(
            error_codes::EMPTY_SURFACE,
            format!("`{}` resolved to an empty surface", canonical),
            locate(&canonical),
        );
        if let Some(report) = shim.report() {
            for (candidate, reason) in report.misses() {
                diag = diag.with_note(format!("{}: {}", candidate, reason));
            }
        }
        engine.emit(diag);
    }

    for (name, shadowed, winner) in namespace.shadowed() {
        engine.name_shadowed(
            name,
            shadowed.as_str(),
            winner.as_str(),
            locate(winner.as_str()),
        );
    }

    if locked {
        let lock_path = config::lock_path_for(manifest_path);
        if lock_path.exists() {
            let lockfile = LockFile::from_file(&lock_path)?;
            for drift in lockfile.verify(&package, &system)? {
                engine.lock_drift(Location::from_path(&lock_path), drift);
            }
        } else {
            engine.emit_error(
                error_codes::LOCK_MISSING,
                format!("{} not found", lock_path.display()),
                Location::from_path(&lock_path),
            );
        }
    }

    Ok(engine)
}
