// Typed provider chains
// Ordered factories for a capability; the first that succeeds is kept

use crate::error::{guard_init, LoadError};
use std::fmt;
use std::sync::OnceLock;

type Factory<T> = Box<dyn Fn() -> Result<T, LoadError> + Send + Sync>;

struct Provider<T> {
    label: String,
    factory: Factory<T>,
}

struct Resolved<T> {
    winner: Option<(String, T)>,
    misses: Vec<(String, String)>,
}

/// A capability with several possible providers, tried in order
///
/// `resolve` runs the factories at most once. Callers get `Some(&T)` when a
/// provider succeeded and `None` when none did; a panicking factory counts
/// as a miss.
///
/// ```
/// use shim_core::{LoadError, ProviderChain};
/// use std::sync::Arc;
///
/// trait Store: Send + Sync {
///     fn name(&self) -> &'static str;
/// }
///
/// struct InMemory;
/// impl Store for InMemory {
///     fn name(&self) -> &'static str {
///         "in-memory"
///     }
/// }
///
/// let store: ProviderChain<Arc<dyn Store>> = ProviderChain::new("memory.store")
///     .provider("labs", || Err(LoadError::not_found("labs.memory")))
///     .provider("builtin", || Ok(Arc::new(InMemory) as Arc<dyn Store>));
///
/// assert_eq!(store.resolve().map(|s| s.name()), Some("in-memory"));
/// assert_eq!(store.bound_label(), Some("builtin"));
/// ```
pub struct ProviderChain<T> {
    name: String,
    providers: Vec<Provider<T>>,
    resolved: OnceLock<Resolved<T>>,
}

impl<T> ProviderChain<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            providers: Vec::new(),
            resolved: OnceLock::new(),
        }
    }

    pub fn provider<F>(mut self, label: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<T, LoadError> + Send + Sync + 'static,
    {
        self.providers.push(Provider {
            label: label.into(),
            factory: Box::new(factory),
        });
        self
    }

    /// Provider for factories that only know "available or not"
    pub fn optional<F>(self, label: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Option<T> + Send + Sync + 'static,
    {
        let label = label.into();
        let missing = label.clone();
        self.provider(label, move || {
            factory().ok_or_else(|| LoadError::not_found(&missing))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn resolve(&self) -> Option<&T> {
        self.resolved_state().winner.as_ref().map(|(_, value)| value)
    }

    pub fn bound_label(&self) -> Option<&str> {
        self.resolved
            .get()?
            .winner
            .as_ref()
            .map(|(label, _)| label.as_str())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Labels that failed, with the reason, in probe order
    pub fn misses(&self) -> Vec<(&str, &str)> {
        self.resolved
            .get()
            .map(|r| {
                r.misses
                    .iter()
                    .map(|(label, reason)| (label.as_str(), reason.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn resolved_state(&self) -> &Resolved<T> {
        self.resolved.get_or_init(|| {
            let mut misses = Vec::new();

            for provider in &self.providers {
                match guard_init(&provider.label, || (provider.factory)()) {
                    Ok(value) => {
                        log::info!("{} provided by {}", self.name, provider.label);
                        return Resolved {
                            winner: Some((provider.label.clone(), value)),
                            misses,
                        };
                    }
                    Err(e) => {
                        log::debug!("{}: provider {} unavailable: {}", self.name, provider.label, e);
                        misses.push((provider.label.clone(), e.to_string()));
                    }
                }
            }

            log::debug!("{}: no provider available", self.name);
            Resolved {
                winner: None,
                misses,
            }
        })
    }
}

impl<T> fmt::Debug for ProviderChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderChain")
            .field("name", &self.name)
            .field(
                "providers",
                &self.providers.iter().map(|p| p.label.as_str()).collect::<Vec<_>>(),
            )
            .field("bound", &self.bound_label())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_first_success_wins() {
        let chain: ProviderChain<u32> = ProviderChain::new("answer")
            .provider("broken", || Err(LoadError::init_failed("broken", "no")))
            .provider("first", || Ok(1))
            .provider("second", || Ok(2));

        assert_eq!(chain.resolve(), Some(&1));
        assert_eq!(chain.bound_label(), Some("first"));
        assert_eq!(chain.misses().len(), 1);
        assert_eq!(chain.misses()[0].0, "broken");
    }

    #[test]
    fn test_none_available() {
        let chain: ProviderChain<String> = ProviderChain::new("identity")
            .optional("labs", || None)
            .optional("candidate", || None);

        assert!(!chain.is_resolved());
        assert!(chain.resolve().is_none());
        assert!(chain.is_resolved());
        assert!(chain.bound_label().is_none());
        assert_eq!(chain.misses().len(), 2);
    }

    #[test]
    fn test_resolves_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let chain: ProviderChain<usize> = ProviderChain::new("counter").provider("only", move || {
            Ok(counter.fetch_add(1, Ordering::SeqCst))
        });

        assert_eq!(chain.resolve(), Some(&0));
        assert_eq!(chain.resolve(), Some(&0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_panicking_provider_is_a_miss() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let chain: ProviderChain<&'static str> = ProviderChain::new("orchestration")
            .provider("labs", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                panic!("hub offline")
            })
            .provider("builtin", || Ok("local hub"));

        assert_eq!(chain.resolve(), Some(&"local hub"));
        assert_eq!(chain.resolve(), Some(&"local hub"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let misses = chain.misses();
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].0, "labs");
        assert!(misses[0].1.contains("hub offline"));
    }

    #[test]
    fn test_empty_chain() {
        let chain: ProviderChain<()> = ProviderChain::new("nothing");
        assert!(chain.is_empty());
        assert!(chain.resolve().is_none());
    }
}
