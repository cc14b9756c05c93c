// Module identifiers and candidate lists

use crate::error::ShimError;
use std::fmt;
use std::str::FromStr;

/// A dotted module identifier such as `lukhas.memory.fold`
///
/// Input may use `.`, `::` or `/` as separators; the stored form is always
/// dotted. Every segment must be a plain identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath {
    dotted: String,
}

impl ModulePath {
    pub fn parse(raw: &str) -> Result<Self, ShimError> {
        let normalized = raw.trim().replace("::", ".").replace('/', ".");

        if normalized.is_empty() {
            return Err(ShimError::InvalidPath {
                path: raw.to_string(),
                reason: "empty module path".to_string(),
            });
        }

        for segment in normalized.split('.') {
            if !is_identifier(segment) {
                return Err(ShimError::InvalidPath {
                    path: raw.to_string(),
                    reason: if segment.is_empty() {
                        "empty segment".to_string()
                    } else {
                        format!("`{}` is not an identifier", segment)
                    },
                });
            }
        }

        Ok(Self { dotted: normalized })
    }

    pub fn as_str(&self) -> &str {
        &self.dotted
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.dotted.split('.')
    }

    /// Last segment: `pkg.new.widget` -> `widget`
    pub fn name(&self) -> &str {
        self.dotted.rsplit('.').next().unwrap_or(&self.dotted)
    }

    /// Enclosing package, `None` for a top-level module
    pub fn parent(&self) -> Option<ModulePath> {
        self.dotted.rsplit_once('.').map(|(parent, _)| ModulePath {
            dotted: parent.to_string(),
        })
    }

    pub fn starts_with(&self, prefix: &ModulePath) -> bool {
        self.dotted == prefix.dotted
            || self
                .dotted
                .strip_prefix(&prefix.dotted)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted)
    }
}

impl FromStr for ModulePath {
    type Err = ShimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for ModulePath {
    type Error = ShimError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Ordered, non-empty list of backing modules; the first that loads wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    candidates: Vec<ModulePath>,
}

impl CandidateList {
    pub fn new<I>(candidates: I) -> Result<Self, ShimError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let candidates = candidates
            .into_iter()
            .map(|c| ModulePath::parse(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_paths(candidates)
    }

    pub fn from_paths(candidates: Vec<ModulePath>) -> Result<Self, ShimError> {
        if candidates.is_empty() {
            return Err(ShimError::EmptyCandidates);
        }
        Ok(Self { candidates })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModulePath> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The preferred candidate; `Some` for every list `new` accepts
    pub fn first(&self) -> Option<&ModulePath> {
        self.candidates.first()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.candidates.iter().map(ToString::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a ModulePath;
    type IntoIter = std::slice::Iter<'a, ModulePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
