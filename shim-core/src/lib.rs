// shim-core - candidate-ordered module resolution
// A canonical path binds to the first backing module that loads; if none
// does, it exposes an empty public surface instead of failing.

pub mod check;
pub mod config;
pub mod error;
pub mod loader;
pub mod lockfile;
pub mod manifest;
pub mod module;
pub mod package;
pub mod path;
pub mod provider;
pub mod shim;
pub mod surface;
pub mod system;
pub mod value;

pub use check::check_manifest;
pub use error::{LoadError, ShimError, SurfaceError};
pub use loader::{FileLoader, ModuleLoader, StaticLoader};
pub use lockfile::{LockFile, LockedShim};
pub use manifest::{init_manifest, Manifest, ManifestIssue, ShimEntry};
pub use module::Module;
pub use package::{Namespace, Package};
pub use path::{CandidateList, ModulePath};
pub use provider::ProviderChain;
pub use shim::{resolve_and_bind, Attempt, AttemptOutcome, Binding, ResolutionReport, Shim};
pub use surface::{PublicSurface, DEFAULT_PRIVATE_MARKER};
pub use system::ModuleSystem;
pub use value::{CallError, NativeFn, Value};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
