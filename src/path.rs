use std::fmt;
use std::sync::Arc;

/// Identifies the runtime type that owns a property.
///
/// `map_like` marks dynamic containers (maps, JSON objects) whose keys are not known
/// from type metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    name: Arc<str>,
    map_like: bool,
}

impl TypeKey {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            map_like: false,
        }
    }

    pub fn map(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            map_like: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_map_like(&self) -> bool {
        self.map_like
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One segment of an object path: the property name and the type that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    name: String,
    owner: Option<TypeKey>,
}

impl PathElement {
    pub fn new(name: impl Into<String>, owner: Option<TypeKey>) -> Self {
        Self {
            name: name.into(),
            owner,
        }
    }

    /// Segment owned by a concrete, introspectable type.
    pub fn typed(name: impl Into<String>, owner: TypeKey) -> Self {
        Self::new(name, Some(owner))
    }

    /// Segment with no known owner type.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Option<&TypeKey> {
        self.owner.as_ref()
    }

    /// True when the owner is unknown or map-like, i.e. there is no fixed property set.
    pub fn is_dynamic(&self) -> bool {
        self.owner.as_ref().is_none_or(TypeKey::is_map_like)
    }
}

/// A property path from the root object down to the field being visited.
///
/// Paths double as match cache keys; a path built from one-off segments should be
/// marked non-cacheable so it never fills the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPath {
    elements: Vec<PathElement>,
    cacheable: bool,
}

impl Default for JsonPath {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonPath {
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            cacheable: true,
        }
    }

    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Self {
            elements,
            cacheable: true,
        }
    }

    /// Convenience for untyped paths such as `["a", "b", "c"]`.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_elements(names.into_iter().map(PathElement::untyped).collect())
    }

    pub fn push(mut self, element: PathElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn non_cacheable(mut self) -> Self {
        self.cacheable = false;
        self
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, element) in self.elements.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            f.write_str(&element.name)?;
        }
        Ok(())
    }
}
