use super::name::NameMatcher;
use crate::view::BASE_VIEW;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// A node of a parsed filter tree.
///
/// Trees are immutable once built and shared through `Arc`, so a matched node can be
/// handed back to callers (and stored in the match cache) without copying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterNode {
    name: NameMatcher,
    children: Vec<Arc<FilterNode>>,
    negated: bool,
    squiggly: bool,
    empty_nested: bool,
    any_shallow: bool,
    any_deep: bool,
}

static ALWAYS_MATCH: LazyLock<Arc<FilterNode>> = LazyLock::new(|| Arc::new(sentinel()));
static NEVER_MATCH: LazyLock<Arc<FilterNode>> = LazyLock::new(|| Arc::new(sentinel()));
static BASE_VIEW_NODES: LazyLock<Vec<Arc<FilterNode>>> = LazyLock::new(|| {
    vec![Arc::new(
        FilterNode::new(NameMatcher::exact(BASE_VIEW)).with_squiggly(true),
    )]
});

fn sentinel() -> FilterNode {
    FilterNode::new(NameMatcher::AnyDeep)
}

impl FilterNode {
    pub fn new(name: NameMatcher) -> Self {
        Self {
            any_shallow: name.is_any_shallow(),
            any_deep: name.is_any_deep(),
            name,
            children: Vec::new(),
            negated: false,
            squiggly: false,
            empty_nested: false,
        }
    }

    /// Node matching exactly `name`.
    pub fn exact(name: impl Into<String>) -> Self {
        Self::new(NameMatcher::exact(name))
    }

    pub fn with_children(mut self, children: Vec<Arc<FilterNode>>) -> Self {
        self.children = children;
        self
    }

    pub fn with_child(mut self, child: FilterNode) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    pub fn with_squiggly(mut self, squiggly: bool) -> Self {
        self.squiggly = squiggly;
        self
    }

    pub fn with_empty_nested(mut self, empty_nested: bool) -> Self {
        self.empty_nested = empty_nested;
        self
    }

    /// Once matched, the node covers every remaining level (`**` sets this).
    pub fn with_any_deep(mut self, any_deep: bool) -> Self {
        self.any_deep = any_deep;
        self
    }

    /// The node matches one level and acts as a view marker below it (`*` sets this).
    pub fn with_any_shallow(mut self, any_shallow: bool) -> Self {
        self.any_shallow = any_shallow;
        self
    }

    pub fn into_arc(self) -> Arc<FilterNode> {
        Arc::new(self)
    }

    /// Name as written in the filter; also the view identifier when the node is
    /// matched as a view.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn name_matcher(&self) -> &NameMatcher {
        &self.name
    }

    /// Whether `other` selects the same names in the same way, so the two can be
    /// folded into one node with the union of their children.
    pub fn is_mergeable_with(&self, other: &FilterNode) -> bool {
        self.name_matcher() == other.name_matcher()
            && self.negated == other.negated
            && self.squiggly == other.squiggly
            && self.empty_nested == other.empty_nested
            && self.any_shallow == other.any_shallow
            && self.any_deep == other.any_deep
    }

    /// Strength of a match against a path segment name, negative when it does not match.
    pub fn match_strength(&self, name: &str) -> i32 {
        self.name.strength(name)
    }

    pub fn children(&self) -> &[Arc<FilterNode>] {
        &self.children
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether the node comes from an explicit nested expression (`a{...}`) rather
    /// than a bare name that may stand for a view.
    pub fn is_squiggly(&self) -> bool {
        self.squiggly
    }

    pub fn is_empty_nested(&self) -> bool {
        self.empty_nested
    }

    pub fn is_any_deep(&self) -> bool {
        self.any_deep
    }

    pub fn is_any_shallow(&self) -> bool {
        self.any_shallow
    }

    /// Sentinel meaning "the whole remaining path is included".
    pub fn always_match() -> &'static Arc<FilterNode> {
        &ALWAYS_MATCH
    }

    /// Sentinel meaning "the whole remaining path is excluded".
    pub fn never_match() -> &'static Arc<FilterNode> {
        &NEVER_MATCH
    }

    /// Implicit child list granting the base view of the next level.
    pub fn base_view_nodes() -> &'static [Arc<FilterNode>] {
        &BASE_VIEW_NODES
    }

    /// Identity check against the sentinels; they are structurally equal to any
    /// other `**` node, so comparing by value is not enough.
    pub fn is_sentinel(node: &Arc<FilterNode>) -> bool {
        Arc::ptr_eq(node, &ALWAYS_MATCH) || Arc::ptr_eq(node, &NEVER_MATCH)
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("-")?;
        }
        write!(f, "{}", self.name)?;

        if !self.children.is_empty() || self.empty_nested {
            f.write_str("{")?;
            for (idx, child) in self.children.iter().enumerate() {
                if idx > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{child}")?;
            }
            f.write_str("}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_are_distinct_by_identity() {
        let always = FilterNode::always_match();
        let never = FilterNode::never_match();

        assert_eq!(**always, **never);
        assert!(!Arc::ptr_eq(always, never));
        assert!(always.is_any_deep());
        assert!(FilterNode::is_sentinel(always));
        assert!(!FilterNode::is_sentinel(&FilterNode::new(NameMatcher::AnyDeep).into_arc()));
    }

    #[test]
    fn test_base_view_nodes() {
        let nodes = FilterNode::base_view_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name(), BASE_VIEW);
        assert!(nodes[0].is_squiggly());
        assert!(!nodes[0].is_negated());
        assert!(!nodes[0].is_empty_nested());
    }

    #[test]
    fn test_display() {
        let node = FilterNode::exact("a")
            .with_child(FilterNode::exact("b"))
            .with_child(FilterNode::exact("c").negated(true))
            .with_squiggly(true);
        assert_eq!(node.to_string(), "a{b,-c}");

        let empty = FilterNode::exact("d").with_empty_nested(true);
        assert_eq!(empty.to_string(), "d{}");
    }

    #[test]
    fn test_flags_follow_name_unless_overridden() {
        assert!(FilterNode::new(NameMatcher::AnyShallow).is_any_shallow());
        assert!(!FilterNode::exact("b").is_any_deep());

        let deep = FilterNode::exact("b").with_any_deep(true);
        assert!(deep.is_any_deep());
        assert_eq!(deep.match_strength("b"), i32::MAX);
    }
}
