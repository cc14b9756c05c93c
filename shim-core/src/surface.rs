// Public surfaces: the names a shim re-exports from its backend

use crate::error::SurfaceError;
use crate::module::Module;
use crate::value::Value;
use shim_diagnostics::fuzzy;
use std::collections::BTreeMap;

/// Names that mark an attribute as implementation-private
pub const DEFAULT_PRIVATE_MARKER: &str = "_";

/// Public names copied out of a bound backend
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicSurface {
    names: BTreeMap<String, Value>,
}

impl PublicSurface {
    /// The surface of a shim that bound nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every attribute of `module` whose name does not start with `private_marker`
    pub fn from_module(module: &Module, private_marker: &str) -> Self {
        let names = module
            .attributes()
            .filter(|(name, _)| !name.starts_with(private_marker))
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();

        Self { names }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Like `get`, but a missing name is an error with suggestions
    pub fn require(&self, name: &str) -> Result<&Value, SurfaceError> {
        self.names.get(name).ok_or_else(|| SurfaceError::Unbound {
            name: name.to_string(),
            suggestions: fuzzy::suggest(name, &self.exports()),
        })
    }

    /// Call an exported function
    ///
    /// Errors raised by the function itself come back as
    /// `SurfaceError::Backend` with the original `CallError` inside.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, SurfaceError> {
        call_value(name, self.require(name)?, args)
    }

    /// Sorted export list, for wildcard consumers
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

pub(crate) fn call_value(name: &str, value: &Value, args: &[Value]) -> Result<Value, SurfaceError> {
    let func = value.as_function().ok_or_else(|| SurfaceError::NotCallable {
        name: name.to_string(),
        kind: value.kind(),
    })?;

    Ok(func.call(args)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ModulePath;
    use crate::value::CallError;

    fn widget_module() -> Module {
        Module::new(ModulePath::parse("pkg.new.widget").unwrap())
            .with_attr("Widget", Value::object("widget-class"))
            .with_attr("_internal_cache", Value::Map(BTreeMap::new()))
            .with_attr(
                "render",
                Value::function("render", |args| Ok(Value::Int(args.len() as i64))),
            )
            .with_attr(
                "explode",
                Value::function("explode", |_| {
                    Err(CallError::Failed {
                        function: "explode".to_string(),
                        message: "backend fault".to_string(),
                    })
                }),
            )
    }

    #[test]
    fn test_private_names_filtered() {
        let surface = PublicSurface::from_module(&widget_module(), DEFAULT_PRIVATE_MARKER);

        assert_eq!(surface.exports(), vec!["Widget", "explode", "render"]);
        assert!(!surface.contains("_internal_cache"));
        assert_eq!(surface.len(), 3);
    }

    #[test]
    fn test_custom_marker() {
        let surface = PublicSurface::from_module(&widget_module(), "ren");
        assert!(surface.contains("_internal_cache"));
        assert!(!surface.contains("render"));
    }

    #[test]
    fn test_require_suggests() {
        let surface = PublicSurface::from_module(&widget_module(), DEFAULT_PRIVATE_MARKER);

        match surface.require("Widgte") {
            Err(SurfaceError::Unbound { name, suggestions }) => {
                assert_eq!(name, "Widgte");
                assert_eq!(suggestions.first().map(String::as_str), Some("Widget"));
            }
            other => unreachable!("expected Unbound, got {:?}", other),
        }
    }

    #[test]
    fn test_call_paths() {
        let surface = PublicSurface::from_module(&widget_module(), DEFAULT_PRIVATE_MARKER);

        assert_eq!(
            surface.call("render", &[Value::Null, Value::Null]).unwrap(),
            Value::Int(2)
        );
        assert!(matches!(
            surface.call("Widget", &[]),
            Err(SurfaceError::NotCallable { kind: "object", .. })
        ));
        assert!(matches!(
            surface.call("missing", &[]),
            Err(SurfaceError::Unbound { .. })
        ));

        let err = surface.call("explode", &[]).unwrap_err();
        assert!(matches!(
            err,
            SurfaceError::Backend(CallError::Failed { ref message, .. }) if message == "backend fault"
        ));
        assert_eq!(err.to_string(), "explode() failed: backend fault");
    }

    #[test]
    fn test_empty_surface() {
        let surface = PublicSurface::empty();
        assert!(surface.is_empty());
        assert!(surface.exports().is_empty());
        assert!(matches!(
            surface.require("anything"),
            Err(SurfaceError::Unbound { suggestions, .. }) if suggestions.is_empty()
        ));
    }
}
