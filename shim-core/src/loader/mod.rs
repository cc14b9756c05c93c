/**
 * Module loaders
 * Turn a module path into a loaded module, or report why they cannot
 */
pub mod file_loader;
pub mod static_loader;

pub use file_loader::FileLoader;
pub use static_loader::StaticLoader;

use crate::error::LoadError;
use crate::module::Module;
use crate::path::ModulePath;

/// A source of modules
///
/// Return `LoadError::NotFound` when this loader does not know the path so
/// that a `ModuleSystem` can ask the next loader. Any other error means the
/// module exists here but could not be loaded.
pub trait ModuleLoader: Send + Sync {
    /// Short label used in logs and reports
    fn name(&self) -> &str;

    fn load(&self, path: &ModulePath) -> Result<Module, LoadError>;

    /// Whether `load` would find something, without running it
    fn contains(&self, path: &ModulePath) -> bool;
}
