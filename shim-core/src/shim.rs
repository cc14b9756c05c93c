// Module resolution shim
// Binds a canonical path to the first candidate backend that loads

use crate::error::ShimError;
use crate::module::Module;
use crate::path::{CandidateList, ModulePath};
use crate::surface::{PublicSurface, DEFAULT_PRIVATE_MARKER};
use crate::system::ModuleSystem;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// What happened to one probed candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Bound,
    Miss { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub candidate: ModulePath,
    pub outcome: AttemptOutcome,
}

/// Candidates in the order they were probed
///
/// Probing stops at the first success, so later candidates never appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    attempts: Vec<Attempt>,
}

impl ResolutionReport {
    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn misses(&self) -> impl Iterator<Item = (&ModulePath, &str)> {
        self.attempts.iter().filter_map(|a| match &a.outcome {
            AttemptOutcome::Miss { reason } => Some((&a.candidate, reason.as_str())),
            AttemptOutcome::Bound => None,
        })
    }

    pub fn bound(&self) -> Option<&ModulePath> {
        self.attempts
            .iter()
            .find(|a| a.outcome == AttemptOutcome::Bound)
            .map(|a| &a.candidate)
    }
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attempt in &self.attempts {
            match &attempt.outcome {
                AttemptOutcome::Bound => writeln!(f, "  bound {}", attempt.candidate)?,
                AttemptOutcome::Miss { reason } => {
                    writeln!(f, "  miss  {} ({})", attempt.candidate, reason)?
                }
            }
        }
        Ok(())
    }
}

/// Outcome of one resolution: backend (if any), surface, and report
#[derive(Debug, Clone)]
pub struct Binding {
    backend: Option<Arc<Module>>,
    surface: PublicSurface,
    report: ResolutionReport,
}

impl Binding {
    pub fn backend(&self) -> Option<&Arc<Module>> {
        self.backend.as_ref()
    }

    pub fn surface(&self) -> &PublicSurface {
        &self.surface
    }

    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }

    pub fn is_bound(&self) -> bool {
        self.backend.is_some()
    }

    pub fn into_surface(self) -> PublicSurface {
        self.surface
    }
}

/// Probe `candidates` in order and bind the first module that loads
///
/// Never fails: every load error is a miss, and running out of candidates
/// yields an empty surface.
pub fn resolve_and_bind(
    system: &ModuleSystem,
    candidates: &CandidateList,
    private_marker: &str,
) -> Binding {
    let mut report = ResolutionReport::default();

    for candidate in candidates {
        match system.import(candidate) {
            Ok(module) => {
                report.attempts.push(Attempt {
                    candidate: candidate.clone(),
                    outcome: AttemptOutcome::Bound,
                });
                let surface = PublicSurface::from_module(&module, private_marker);
                return Binding {
                    backend: Some(module),
                    surface,
                    report,
                };
            }
            Err(e) => {
                log::debug!("candidate {} unavailable: {}", candidate, e);
                report.attempts.push(Attempt {
                    candidate: candidate.clone(),
                    outcome: AttemptOutcome::Miss {
                        reason: e.to_string(),
                    },
                });
            }
        }
    }

    Binding {
        backend: None,
        surface: PublicSurface::empty(),
        report,
    }
}

/// A stable import path in front of a relocatable implementation
///
/// Resolution happens once, on first use; afterwards the shim always
/// returns the same surface, even if it is empty.
///
/// # Example
/// ```
/// use shim_core::{Module, ModulePath, ModuleSystem, Shim, StaticLoader, Value};
///
/// let widget = Module::new(ModulePath::parse("pkg.new.widget").unwrap())
///     .with_attr("Widget", Value::from("class"))
///     .with_attr("_internal_cache", Value::Null);
/// let system = ModuleSystem::new().with_loader(StaticLoader::new().with_module(widget));
///
/// let shim = Shim::new("pkg.widget", ["pkg.legacy.widget", "pkg.new.widget"]).unwrap();
/// let surface = shim.resolve_and_bind(&system);
///
/// assert_eq!(surface.exports(), vec!["Widget"]);
/// assert_eq!(shim.bound_path().unwrap().as_str(), "pkg.new.widget");
/// ```
pub struct Shim {
    canonical: ModulePath,
    candidates: CandidateList,
    private_marker: String,
    binding: OnceLock<Binding>,
}

impl Shim {
    pub fn new<I>(canonical: &str, candidates: I) -> Result<Self, ShimError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(Self::from_parts(
            ModulePath::parse(canonical)?,
            CandidateList::new(candidates)?,
        ))
    }

    pub fn from_parts(canonical: ModulePath, candidates: CandidateList) -> Self {
        Self {
            canonical,
            candidates,
            private_marker: DEFAULT_PRIVATE_MARKER.to_string(),
            binding: OnceLock::new(),
        }
    }

    pub fn with_private_marker(mut self, marker: &str) -> Result<Self, ShimError> {
        if marker.is_empty() {
            return Err(ShimError::EmptyPrivateMarker);
        }
        self.private_marker = marker.to_string();
        Ok(self)
    }

    pub fn canonical(&self) -> &ModulePath {
        &self.canonical
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn private_marker(&self) -> &str {
        &self.private_marker
    }

    /// Resolve on first call; later calls return the stored surface
    pub fn resolve_and_bind(&self, system: &ModuleSystem) -> &PublicSurface {
        self.resolve(system).surface()
    }

    /// Same as `resolve_and_bind` but returns the whole binding
    pub fn resolve(&self, system: &ModuleSystem) -> &Binding {
        self.binding.get_or_init(|| {
            let binding = resolve_and_bind(system, &self.candidates, &self.private_marker);
            match binding.report().bound() {
                Some(backend) => log::info!("{} bound to {}", self.canonical, backend),
                None => log::debug!(
                    "{} resolved to an empty surface ({} candidates tried)",
                    self.canonical,
                    self.candidates.len()
                ),
            }
            binding
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.binding.get().is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.backend().is_some()
    }

    /// `None` before resolution
    pub fn surface(&self) -> Option<&PublicSurface> {
        self.binding.get().map(Binding::surface)
    }

    /// `None` before resolution or when nothing loaded
    pub fn backend(&self) -> Option<&Arc<Module>> {
        self.binding.get().and_then(Binding::backend)
    }

    pub fn bound_path(&self) -> Option<&ModulePath> {
        self.backend().map(|m| m.path())
    }

    pub fn report(&self) -> Option<&ResolutionReport> {
        self.binding.get().map(Binding::report)
    }
}

impl fmt::Debug for Shim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shim")
            .field("canonical", &self.canonical)
            .field("candidates", &self.candidates.to_strings())
            .field("bound", &self.bound_path())
            .finish()
    }
}
