use field_filter::{
    FilterConfig, FilterContext, JsonPath, MetricsRegistry, NodeMatcher, PATH_CACHE_METRICS_PREFIX,
    StaticIntrospector,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn matcher(config: FilterConfig, metrics: &MetricsRegistry) -> NodeMatcher {
    NodeMatcher::new(Arc::new(config), Arc::new(StaticIntrospector::new()), metrics)
        .expect("valid matcher config")
}

fn metric(metrics: &MetricsRegistry, name: &str) -> u64 {
    metrics
        .snapshot()
        .get(&format!("{PATH_CACHE_METRICS_PREFIX}{name}"))
        .copied()
        .unwrap_or_else(|| panic!("missing metric {name}"))
}

#[test]
fn test_repeated_match_is_served_from_cache() {
    let metrics = MetricsRegistry::new();
    let m = matcher(FilterConfig::default(), &metrics);
    let context = FilterContext::parse("a{b}").unwrap();
    let path = JsonPath::from_names(["a", "b"]);

    let first = m.match_context(&path, &context).unwrap();
    let second = m.match_context(&path, &context).unwrap();

    assert_eq!(first, second);
    assert_eq!(metric(&metrics, "misses"), 1);
    assert_eq!(metric(&metrics, "hits"), 1);
    assert_eq!(metric(&metrics, "size"), 1);
}

#[test]
fn test_cache_is_keyed_by_filter_text() {
    let metrics = MetricsRegistry::new();
    let m = matcher(FilterConfig::default(), &metrics);
    let path = JsonPath::from_names(["a"]);

    let include = FilterContext::parse("a").unwrap();
    let exclude = FilterContext::parse("-a").unwrap();

    assert!(!m.match_context(&path, &include).unwrap().is_never());
    assert!(m.match_context(&path, &exclude).unwrap().is_never());
    assert_eq!(m.cache().len(), 2);
}

#[test]
fn test_non_cacheable_paths_bypass_cache() {
    let metrics = MetricsRegistry::new();
    let m = matcher(FilterConfig::default(), &metrics);
    let context = FilterContext::parse("a").unwrap();
    let path = JsonPath::from_names(["a"]).non_cacheable();

    m.match_context(&path, &context).unwrap();
    m.match_context(&path, &context).unwrap();

    assert!(m.cache().is_empty());
    assert_eq!(metric(&metrics, "hits"), 0);
    assert_eq!(metric(&metrics, "misses"), 0);
}

#[test]
fn test_cache_hit_refreshes_written_entry() {
    let metrics = MetricsRegistry::new();
    let m = matcher(
        FilterConfig::default().with_path_cache_spec("expireAfterWrite=100ms"),
        &metrics,
    );
    let context = FilterContext::parse("a").unwrap();
    let path = JsonPath::from_names(["a"]);

    m.match_context(&path, &context).unwrap();
    thread::sleep(Duration::from_millis(60));
    m.match_context(&path, &context).unwrap();
    assert_eq!(metric(&metrics, "hits"), 1);

    // past the first write, but within the window of the write made by the hit
    thread::sleep(Duration::from_millis(60));
    m.match_context(&path, &context).unwrap();
    assert_eq!(metric(&metrics, "hits"), 2);
    assert_eq!(metric(&metrics, "misses"), 1);
    assert_eq!(metric(&metrics, "evictions"), 0);
}

#[test]
fn test_bounded_cache_reports_evictions() {
    let metrics = MetricsRegistry::new();
    let m = matcher(
        FilterConfig::default().with_path_cache_spec("maximumSize=2"),
        &metrics,
    );
    let context = FilterContext::parse("*").unwrap();

    for name in ["a", "b", "c", "d"] {
        m.match_context(&JsonPath::from_names([name]), &context)
            .unwrap();
    }

    assert_eq!(metric(&metrics, "size"), 2);
    assert_eq!(metric(&metrics, "evictions"), 2);
}

#[test]
fn test_metrics_json_snapshot() {
    let metrics = MetricsRegistry::new();
    let _m = matcher(FilterConfig::default(), &metrics);

    let json = metrics.to_json();
    for key in ["hits", "misses", "evictions", "size"] {
        assert_eq!(json[format!("{PATH_CACHE_METRICS_PREFIX}{key}")], 0);
    }
}
