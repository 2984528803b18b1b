pub mod cache;
pub mod config;
pub mod filter;
pub mod matcher;
pub mod metrics;
pub mod path;
pub mod view;

pub use cache::{CacheSpec, CacheSpecError, CacheStats, MatchCache};
pub use config::{ConfigError, FilterConfig, default_config, load_config, load_config_from_path};
pub use filter::{FilterNode, FilterParseError, NameMatcher, parse_filter};
pub use matcher::{FilterContext, MatchError, MatchedNode, NodeMatcher, PATH_CACHE_METRICS_PREFIX};
pub use metrics::{MetricsRegistry, MetricsSink, MetricsSource, NoopMetrics};
pub use path::{JsonPath, PathElement, TypeKey};
pub use view::{
    BASE_VIEW, FULL_VIEW, IntrospectError, StaticIntrospector, TypeInfo, TypeIntrospector,
    ViewResolver,
};
