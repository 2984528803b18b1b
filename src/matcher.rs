//! Matching of object paths against filter trees.
//!
//! [`NodeMatcher`] walks a filter tree one path segment at a time and reports which
//! node governs the visited field. Callers keep descending with the children of a
//! returned node, and stop at [`MatchedNode::Always`] (whole subtree included) or
//! [`MatchedNode::Never`] (whole subtree excluded).

use crate::cache::{CacheMetricsSource, MatchCache};
use crate::config::{ConfigError, FilterConfig};
use crate::filter::{ANY_DEEP_ID, FilterNode, FilterParseError, parse_filter};
use crate::metrics::MetricsSink;
use crate::path::{JsonPath, PathElement};
use crate::view::{IntrospectError, TypeIntrospector, ViewResolver};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// Prefix of the match cache counters published to the metrics sink.
pub const PATH_CACHE_METRICS_PREFIX: &str = "filter.path_cache.";

/// Match cache key: the visited path and the filter text the tree was parsed from.
pub type MatchKey = (JsonPath, String);

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid matcher configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error(transparent)]
    Introspect(#[from] IntrospectError),
}

/// Outcome of matching a path.
#[derive(Debug, Clone)]
pub enum MatchedNode {
    /// The path and everything below it is included.
    Always,
    /// The path and everything below it is excluded.
    Never,
    /// The path is governed by this node of the filter tree.
    Node(Arc<FilterNode>),
}

impl MatchedNode {
    pub fn is_always(&self) -> bool {
        matches!(self, MatchedNode::Always)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, MatchedNode::Never)
    }

    /// The matched node; the tags map to the process-wide sentinel nodes.
    pub fn node(&self) -> &Arc<FilterNode> {
        match self {
            MatchedNode::Always => FilterNode::always_match(),
            MatchedNode::Never => FilterNode::never_match(),
            MatchedNode::Node(node) => node,
        }
    }

    pub fn children(&self) -> &[Arc<FilterNode>] {
        self.node().children()
    }
}

impl PartialEq for MatchedNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatchedNode::Always, MatchedNode::Always) => true,
            (MatchedNode::Never, MatchedNode::Never) => true,
            (MatchedNode::Node(a), MatchedNode::Node(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

/// A filter expression together with its parsed tree.
#[derive(Debug, Clone)]
pub struct FilterContext {
    filter: String,
    node: Arc<FilterNode>,
}

impl FilterContext {
    pub fn new(filter: impl Into<String>, node: Arc<FilterNode>) -> Self {
        Self {
            filter: filter.into(),
            node,
        }
    }

    pub fn parse(filter: &str) -> Result<Self, FilterParseError> {
        Ok(Self::new(filter, parse_filter(filter)?))
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn node(&self) -> &Arc<FilterNode> {
        &self.node
    }
}

/// The node list examined for the next path segment.
enum Level {
    Children(Arc<FilterNode>),
    BaseView,
}

impl Level {
    fn nodes(&self) -> &[Arc<FilterNode>] {
        match self {
            Level::Children(parent) => parent.children(),
            Level::BaseView => FilterNode::base_view_nodes(),
        }
    }
}

/// Matches object paths against filter trees, memoizing results per
/// (path, filter string).
///
/// The matcher holds no per-call state, so one instance can serve any number of
/// threads. On a cacheable path it reads the cache, computes on a miss and then
/// stores the result unconditionally; two threads missing the same key both compute
/// and both store, which is harmless because the result only depends on the inputs.
pub struct NodeMatcher {
    config: Arc<FilterConfig>,
    views: ViewResolver,
    cache: Arc<MatchCache<MatchKey, MatchedNode>>,
}

impl NodeMatcher {
    pub fn new(
        config: Arc<FilterConfig>,
        introspector: Arc<dyn TypeIntrospector>,
        metrics: &dyn MetricsSink,
    ) -> Result<Self, MatchError> {
        let spec = config.path_cache_spec()?;
        debug!(cache_spec = %spec, "creating node matcher");

        let cache = Arc::new(MatchCache::new(spec));
        metrics.register(Arc::new(CacheMetricsSource::new(
            PATH_CACHE_METRICS_PREFIX,
            Arc::clone(&cache),
        )));

        let views = ViewResolver::new(introspector, config.filter_implicitly_include_base_fields);

        Ok(Self {
            config,
            views,
            cache,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn cache(&self) -> &MatchCache<MatchKey, MatchedNode> {
        &self.cache
    }

    /// Match `path` against the filter held by `context`.
    pub fn match_context(
        &self,
        path: &JsonPath,
        context: &FilterContext,
    ) -> Result<MatchedNode, MatchError> {
        self.match_path(path, context.filter(), context.node())
    }

    /// Match `path` against the tree rooted at `root`, parsed from `filter`.
    ///
    /// `filter` only keys the cache; the tree is never re-parsed. The `**` filter
    /// matches everything without looking at the tree.
    pub fn match_path(
        &self,
        path: &JsonPath,
        filter: &str,
        root: &Arc<FilterNode>,
    ) -> Result<MatchedNode, MatchError> {
        if filter == ANY_DEEP_ID {
            return Ok(MatchedNode::Always);
        }

        if !path.is_cacheable() {
            return self.match_uncached(path, root);
        }

        let key = (path.clone(), filter.to_string());
        let matched = match self.cache.get(&key) {
            Some(hit) => {
                trace!(path = %path, filter, "path cache hit");
                hit
            }
            None => self.match_uncached(path, root)?,
        };

        self.cache.put(key, matched.clone());
        Ok(matched)
    }

    fn match_uncached(
        &self,
        path: &JsonPath,
        root: &Arc<FilterNode>,
    ) -> Result<MatchedNode, MatchError> {
        let elements = path.elements();
        let last_idx = elements.len().saturating_sub(1);

        let mut level = Level::Children(Arc::clone(root));
        let mut view_node: Option<Arc<FilterNode>> = None;
        let mut view_stack: Option<Arc<BTreeSet<String>>> = None;
        let mut matched: Option<MatchedNode> = None;

        for (idx, element) in elements.iter().enumerate() {
            // below an inferred view, membership comes from the views, not the tree
            if view_node.as_ref().is_some_and(|view| !view.is_squiggly()) {
                if !element.is_dynamic() {
                    let allowed = self
                        .views
                        .property_names_from_view_stack(element, view_stack.as_deref())?;

                    if !allowed.contains(element.name()) {
                        trace!(path = %path, segment = element.name(), "not in active views");
                        return Ok(MatchedNode::Never);
                    }
                }
                continue;
            }

            let nodes = level.nodes();
            if nodes.is_empty() {
                return Ok(MatchedNode::Never);
            }

            let found = match find_best_simple_node(element, nodes) {
                None => {
                    let view = self.views.find_view_node(element, nodes)?;
                    if let Some(node) = &view {
                        view_node = Some(Arc::clone(node));
                        view_stack = self.add_to_view_stack(view_stack, node);
                    }
                    view
                }
                Some(node) if node.is_any_shallow() => {
                    view_node = Some(Arc::clone(&node));
                    Some(node)
                }
                Some(node) if node.is_any_deep() => {
                    return Ok(MatchedNode::Node(node));
                }
                simple => simple,
            };

            let Some(node) = found else {
                if self.views.is_unwrapped(element)? {
                    trace!(path = %path, segment = element.name(), "unwrapped property");
                    matched = Some(MatchedNode::Always);
                    continue;
                }
                return Ok(MatchedNode::Never);
            };

            if node.is_negated() {
                return Ok(MatchedNode::Never);
            }

            level = if idx < last_idx
                && node.children().is_empty()
                && !node.is_empty_nested()
                && self.config.filter_implicitly_include_base_fields
            {
                Level::BaseView
            } else {
                Level::Children(Arc::clone(&node))
            };
            matched = Some(MatchedNode::Node(node));
        }

        Ok(matched.unwrap_or(MatchedNode::Never))
    }

    fn add_to_view_stack(
        &self,
        view_stack: Option<Arc<BTreeSet<String>>>,
        view_node: &FilterNode,
    ) -> Option<Arc<BTreeSet<String>>> {
        if !self.config.filter_propagate_view_to_nested_filters {
            return None;
        }

        let mut views = view_stack.as_deref().cloned().unwrap_or_default();
        views.insert(view_node.name().to_string());
        Some(Arc::new(views))
    }
}

/// Strongest literal or pattern match; ties go to the later node.
fn find_best_simple_node(
    element: &PathElement,
    nodes: &[Arc<FilterNode>],
) -> Option<Arc<FilterNode>> {
    let mut best: Option<(&Arc<FilterNode>, i32)> = None;

    for node in nodes {
        let strength = node.match_strength(element.name());
        if strength < 0 {
            continue;
        }
        if best.is_none_or(|(_, best_strength)| strength >= best_strength) {
            best = Some((node, strength));
        }
    }

    best.map(|(node, _)| Arc::clone(node))
}
