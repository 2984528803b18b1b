//! Property views and the type metadata they are resolved against.
//!
//! A view is a named group of properties of one type (`base`, `full`, `public`, ...).
//! The matcher never inspects types itself; it asks a [`TypeIntrospector`] for a
//! [`TypeInfo`] and reads view membership from it.

use crate::filter::FilterNode;
use crate::path::{PathElement, TypeKey};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// The default view: properties that carry no explicit view assignment.
pub const BASE_VIEW: &str = "base";

/// Every property of a type.
pub const FULL_VIEW: &str = "full";

static EMPTY_NAMES: BTreeSet<String> = BTreeSet::new();

#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("No type metadata registered for '{0}'")]
    UnknownType(String),

    #[error("Failed to read type metadata for '{type_name}': {reason}")]
    Unreadable { type_name: String, reason: String },
}

/// Property metadata for one concrete type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    properties: BTreeSet<String>,
    views: BTreeMap<String, BTreeSet<String>>,
    unwrapped: HashSet<String>,
}

impl TypeInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property to the base view.
    pub fn property(self, name: impl Into<String>) -> Self {
        self.property_in_views(name, &[BASE_VIEW])
    }

    /// Add a property to the given views. The property is always part of `full`.
    pub fn property_in_views(mut self, name: impl Into<String>, views: &[&str]) -> Self {
        let name = name.into();
        for view in views {
            self.views
                .entry((*view).to_string())
                .or_default()
                .insert(name.clone());
        }
        self.properties.insert(name);
        self
    }

    /// Mark a property whose value is spliced into the parent object.
    pub fn unwrapped(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.properties.insert(name.clone());
        self.unwrapped.insert(name);
        self
    }

    pub fn is_unwrapped(&self, property: &str) -> bool {
        self.unwrapped.contains(property)
    }

    /// Property names in `view`; unknown views are empty.
    pub fn property_names_for_view(&self, view: &str) -> &BTreeSet<String> {
        if view == FULL_VIEW {
            return &self.properties;
        }
        self.views.get(view).unwrap_or(&EMPTY_NAMES)
    }
}

/// Source of [`TypeInfo`] for the types appearing in object paths.
///
/// Implementations must answer consistently for the same type during a match.
pub trait TypeIntrospector: Send + Sync {
    fn introspect(&self, ty: &TypeKey) -> Result<Arc<TypeInfo>, IntrospectError>;
}

/// In-memory introspector backed by a registry of hand-described types.
#[derive(Debug, Default)]
pub struct StaticIntrospector {
    types: HashMap<TypeKey, Arc<TypeInfo>>,
}

impl StaticIntrospector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, ty: TypeKey, info: TypeInfo) -> Self {
        self.types.insert(ty, Arc::new(info));
        self
    }
}

impl TypeIntrospector for StaticIntrospector {
    fn introspect(&self, ty: &TypeKey) -> Result<Arc<TypeInfo>, IntrospectError> {
        self.types
            .get(ty)
            .cloned()
            .ok_or_else(|| IntrospectError::UnknownType(ty.name().to_string()))
    }
}

/// Resolves view names against the owner type of path elements.
#[derive(Clone)]
pub struct ViewResolver {
    introspector: Arc<dyn TypeIntrospector>,
    implicitly_include_base_fields: bool,
}

impl ViewResolver {
    pub fn new(
        introspector: Arc<dyn TypeIntrospector>,
        implicitly_include_base_fields: bool,
    ) -> Self {
        Self {
            introspector,
            implicitly_include_base_fields,
        }
    }

    /// Names of `view` on the element's owner type; empty for dynamic owners.
    pub fn property_names(
        &self,
        element: &PathElement,
        view: &str,
    ) -> Result<BTreeSet<String>, IntrospectError> {
        match static_owner(element) {
            Some(owner) => Ok(self
                .introspector
                .introspect(owner)?
                .property_names_for_view(view)
                .clone()),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Union of the names of every view on the stack, or the base view when no
    /// view has been pushed yet.
    pub fn property_names_from_view_stack(
        &self,
        element: &PathElement,
        view_stack: Option<&BTreeSet<String>>,
    ) -> Result<BTreeSet<String>, IntrospectError> {
        let Some(view_stack) = view_stack else {
            return self.property_names(element, BASE_VIEW);
        };

        let mut names = BTreeSet::new();
        for view in view_stack {
            let mut view_names = self.property_names(element, view)?;
            if view_names.is_empty() && self.implicitly_include_base_fields {
                view_names = self.property_names(element, BASE_VIEW)?;
            }
            names.append(&mut view_names);
        }

        Ok(names)
    }

    /// First node, in list order, whose name read as a view covers the element.
    ///
    /// Dynamic owners have no views, so only a node literally named `base` matches.
    pub fn find_view_node(
        &self,
        element: &PathElement,
        nodes: &[Arc<FilterNode>],
    ) -> Result<Option<Arc<FilterNode>>, IntrospectError> {
        let Some(owner) = static_owner(element) else {
            return Ok(nodes.iter().find(|node| node.name() == BASE_VIEW).cloned());
        };

        let info = self.introspector.introspect(owner)?;
        Ok(nodes
            .iter()
            .find(|node| {
                info.property_names_for_view(node.name())
                    .contains(element.name())
            })
            .cloned())
    }

    /// Whether the element is an unwrapped property of its owner type.
    pub fn is_unwrapped(&self, element: &PathElement) -> Result<bool, IntrospectError> {
        match static_owner(element) {
            Some(owner) => Ok(self
                .introspector
                .introspect(owner)?
                .is_unwrapped(element.name())),
            None => Ok(false),
        }
    }
}

fn static_owner(element: &PathElement) -> Option<&TypeKey> {
    element.owner().filter(|owner| !owner.is_map_like())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> TypeKey {
        TypeKey::new("User")
    }

    fn resolver(implicit_base: bool) -> ViewResolver {
        let info = TypeInfo::new()
            .property("id")
            .property("name")
            .property_in_views("email", &["contact"])
            .property_in_views("secret", &["internal"])
            .unwrapped("profile");
        let introspector = StaticIntrospector::new().register(user(), info);
        ViewResolver::new(Arc::new(introspector), implicit_base)
    }

    fn names(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_full_view_has_every_property() {
        let element = PathElement::typed("id", user());
        let full = resolver(true).property_names(&element, FULL_VIEW).unwrap();
        assert_eq!(full, names(&["email", "id", "name", "profile", "secret"]));
    }

    #[test]
    fn test_view_stack_defaults_to_base() {
        let element = PathElement::typed("id", user());
        let base = resolver(true)
            .property_names_from_view_stack(&element, None)
            .unwrap();
        assert_eq!(base, names(&["id", "name"]));
    }

    #[test]
    fn test_view_stack_union_and_base_fallback() {
        let element = PathElement::typed("id", user());
        let stack = names(&["contact", "missing"]);

        let with_base = resolver(true)
            .property_names_from_view_stack(&element, Some(&stack))
            .unwrap();
        assert_eq!(with_base, names(&["email", "id", "name"]));

        let without_base = resolver(false)
            .property_names_from_view_stack(&element, Some(&stack))
            .unwrap();
        assert_eq!(without_base, names(&["email"]));
    }

    #[test]
    fn test_find_view_node_in_list_order() {
        let nodes = vec![
            FilterNode::exact("internal").into_arc(),
            FilterNode::exact("contact").into_arc(),
            FilterNode::exact(FULL_VIEW).into_arc(),
        ];
        let element = PathElement::typed("email", user());
        let found = resolver(true).find_view_node(&element, &nodes).unwrap();
        assert_eq!(found.map(|n| n.name().to_string()), Some("contact".into()));
    }

    #[test]
    fn test_find_view_node_for_dynamic_owner() {
        let nodes = vec![
            FilterNode::exact("contact").into_arc(),
            FilterNode::exact(BASE_VIEW).into_arc(),
        ];
        let element = PathElement::typed("anything", TypeKey::map("Map"));
        let found = resolver(true).find_view_node(&element, &nodes).unwrap();
        assert_eq!(found.map(|n| n.name().to_string()), Some(BASE_VIEW.into()));
    }

    #[test]
    fn test_unwrapped_and_unknown_type() {
        let r = resolver(true);
        assert!(r.is_unwrapped(&PathElement::typed("profile", user())).unwrap());
        assert!(!r.is_unwrapped(&PathElement::untyped("profile")).unwrap());

        let err = r
            .is_unwrapped(&PathElement::typed("x", TypeKey::new("Ghost")))
            .unwrap_err();
        assert!(matches!(err, IntrospectError::UnknownType(name) if name == "Ghost"));
    }
}
