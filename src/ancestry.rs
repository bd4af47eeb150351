//! Materialized path codec.
//!
//! Both stores encode lineage the same way: a `/`-joined list of identifiers, nearest ancestor
//! first and root last. Only the identifier space differs (edge ids on relationship rows,
//! resource ids on resources), so [`Ancestry`] is generic over the id type.
//!
//! An empty string and `NULL` are the same value. Reads go through [`normalize`] and writes go
//! through [`Ancestry::encode`], so `""` is never observed or stored.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use crate::error::TranscodeError;

pub const DELIMITER: char = '/';

/// Map `Some("")` to `None`, leaving every other value untouched.
pub fn normalize(raw: Option<String>) -> Option<String> {
    raw.filter(|s| !s.is_empty())
}

/// A non-empty ancestor chain, nearest ancestor first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<I>")]
pub struct Ancestry<I>(Vec<I>);

impl<I> TryFrom<Vec<I>> for Ancestry<I> {
    type Error = TranscodeError;

    fn try_from(ids: Vec<I>) -> Result<Self, Self::Error> {
        Ancestry::from_nearest_first(ids)
            .ok_or_else(|| TranscodeError::malformed("[]", "an ancestry chain cannot be empty"))
    }
}

impl<I> Ancestry<I> {
    /// Build a chain from ids ordered nearest first. Returns `None` for an empty chain.
    pub fn from_nearest_first(ids: Vec<I>) -> Option<Self> {
        if ids.is_empty() {
            None
        } else {
            Some(Ancestry(ids))
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, I> {
        self.0.iter()
    }

    /// Translate every id through `f`, preserving order. Stops at the first failure.
    pub fn try_map<J, E, F>(&self, mut f: F) -> Result<Ancestry<J>, E>
    where
        F: FnMut(&I) -> Result<J, E>,
    {
        let mapped = self.0.iter().map(&mut f).collect::<Result<Vec<J>, E>>()?;
        Ok(Ancestry(mapped))
    }
}

impl<I: Clone> Ancestry<I> {
    /// The chain of the ancestor at `index`: every id above it. `None` when it is the root.
    pub fn suffix_after(&self, index: usize) -> Option<Ancestry<I>> {
        self.0
            .get(index + 1..)
            .and_then(|rest| Ancestry::from_nearest_first(rest.to_vec()))
    }

    /// Chain of a direct child of the node this chain belongs to, given that node's id.
    pub fn child_of(node: I, chain: Option<&Ancestry<I>>) -> Ancestry<I> {
        let mut ids = vec![node];
        if let Some(chain) = chain {
            ids.extend(chain.0.iter().cloned());
        }
        Ancestry(ids)
    }
}

impl<I: Display> Ancestry<I> {
    /// Write-side normalization: `None` stays `None`, a chain becomes its `/`-joined form.
    pub fn encode(chain: Option<&Ancestry<I>>) -> Option<String> {
        chain.map(|c| c.to_string())
    }
}

impl<I: FromStr> Ancestry<I> {
    /// Decode a stored path. `None` and `""` both decode to `Ok(None)`.
    pub fn parse(raw: Option<&str>) -> Result<Option<Ancestry<I>>, TranscodeError> {
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let mut ids = Vec::new();
        for segment in raw.split(DELIMITER) {
            if segment.is_empty() {
                return Err(TranscodeError::malformed(raw, "empty path segment"));
            }
            let id = segment.parse::<I>().map_err(|_| {
                TranscodeError::malformed(raw, format!("'{segment}' is not an identifier"))
            })?;
            ids.push(id);
        }
        Ok(Ancestry::from_nearest_first(ids))
    }
}

impl<I: Display> Display for Ancestry<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (idx, id) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, "{DELIMITER}")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl<'a, I> IntoIterator for &'a Ancestry<I> {
    type Item = &'a I;
    type IntoIter = std::slice::Iter<'a, I>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::{EdgeId, ResourceId};

    #[test]
    fn test_parse_nearest_first() {
        let chain = Ancestry::<ResourceId>::parse(Some("6/5/4")).unwrap().unwrap();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.iter().next(), Some(&ResourceId(6)));
        assert_eq!(chain.iter().last(), Some(&ResourceId(4)));
        assert_eq!(chain.to_string(), "6/5/4");
    }

    #[test]
    fn test_empty_and_null_are_equivalent() {
        assert_eq!(Ancestry::<EdgeId>::parse(None).unwrap(), None);
        assert_eq!(Ancestry::<EdgeId>::parse(Some("")).unwrap(), None);
        assert_eq!(normalize(Some(String::new())), None);
        assert_eq!(normalize(Some("7".to_string())), Some("7".to_string()));
        assert_eq!(Ancestry::<EdgeId>::encode(None), None);
    }

    #[test]
    fn test_malformed_paths_are_rejected() {
        for raw in ["1//2", "/1", "1/", "1/x/3", "-"] {
            let err = Ancestry::<ResourceId>::parse(Some(raw)).unwrap_err();
            assert!(
                matches!(err, TranscodeError::MalformedAncestry { .. }),
                "{raw} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_suffix_after() {
        let chain = Ancestry::<ResourceId>::parse(Some("6/5/4")).unwrap().unwrap();
        assert_eq!(chain.suffix_after(0).unwrap().to_string(), "5/4");
        assert_eq!(chain.suffix_after(1).unwrap().to_string(), "4");
        assert_eq!(chain.suffix_after(2), None);
    }

    #[test]
    fn test_child_of() {
        let root_child = Ancestry::child_of(ResourceId(1), None);
        assert_eq!(root_child.to_string(), "1");
        let grandchild = Ancestry::child_of(ResourceId(2), Some(&root_child));
        assert_eq!(grandchild.to_string(), "2/1");
    }

    #[test]
    fn test_deserialize_refuses_empty_chain() {
        let chain: Ancestry<ResourceId> = serde_json::from_str("[6, 5, 4]").unwrap();
        assert_eq!(chain.to_string(), "6/5/4");
        assert!(serde_json::from_str::<Ancestry<ResourceId>>("[]").is_err());
    }

    #[test]
    fn test_try_map_preserves_order() {
        let chain = Ancestry::<EdgeId>::parse(Some("30/20/10")).unwrap().unwrap();
        let mapped: Ancestry<ResourceId> = chain
            .try_map(|e| Ok::<_, TranscodeError>(ResourceId(e.get() / 10)))
            .unwrap();
        assert_eq!(mapped.to_string(), "3/2/1");
    }
}
