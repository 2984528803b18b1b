use super::error::FilterParseError;
use regex::Regex;
use std::fmt;

/// Filter text that matches every remaining level.
pub const ANY_DEEP_ID: &str = "**";

/// Filter text that matches exactly one level.
pub const ANY_SHALLOW_ID: &str = "*";

/// Strength returned when a name does not match.
pub const NO_MATCH: i32 = -1;

/// How a filter node name is compared against a path segment.
///
/// Every variant yields a strength from [`NameMatcher::strength`]: higher means a
/// stronger match, [`NO_MATCH`] means no match at all. Exact names always beat
/// patterns, patterns beat `*`, and `*` beats `**`.
#[derive(Debug, Clone)]
pub enum NameMatcher {
    /// A literal field name
    Exact(String),
    /// A glob such as `na*e` or `addr?ss`
    Wildcard {
        raw: String,
        regex: Regex,
        literal_len: usize,
    },
    /// A `~pattern~` regular expression
    Regex { raw: String, regex: Regex },
    /// `*`
    AnyShallow,
    /// `**`
    AnyDeep,
}

impl NameMatcher {
    pub fn exact(name: impl Into<String>) -> Self {
        NameMatcher::Exact(name.into())
    }

    /// Build a glob matcher; `*` matches any run of characters, `?` a single one.
    ///
    /// Text without wildcard characters collapses to [`NameMatcher::Exact`], and the
    /// bare `*` / `**` forms map to their dedicated variants.
    pub fn wildcard(raw: &str) -> Self {
        match raw {
            ANY_DEEP_ID => return NameMatcher::AnyDeep,
            ANY_SHALLOW_ID => return NameMatcher::AnyShallow,
            _ => {}
        }

        if !raw.contains(['*', '?']) {
            return NameMatcher::Exact(raw.to_string());
        }

        let mut pattern = String::with_capacity(raw.len() + 8);
        let mut literal_len = 0;
        pattern.push('^');
        for c in raw.chars() {
            match c {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                other => {
                    literal_len += 1;
                    pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4])));
                }
            }
        }
        pattern.push('$');

        // Every literal was escaped above, so the pattern is always valid.
        let regex = Regex::new(&pattern).expect("escaped glob pattern is a valid regex");

        NameMatcher::Wildcard {
            raw: raw.to_string(),
            regex,
            literal_len,
        }
    }

    /// Build a regex matcher from the text between `~` delimiters.
    pub fn regex(pattern: &str) -> Result<Self, FilterParseError> {
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored).map_err(|e| FilterParseError::InvalidRegex {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(NameMatcher::Regex {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// Match strength of `name` against this matcher.
    pub fn strength(&self, name: &str) -> i32 {
        match self {
            NameMatcher::Exact(exact) => {
                if exact == name {
                    i32::MAX
                } else {
                    NO_MATCH
                }
            }
            NameMatcher::Wildcard {
                regex, literal_len, ..
            } => {
                if regex.is_match(name) {
                    saturating_strength(*literal_len)
                } else {
                    NO_MATCH
                }
            }
            NameMatcher::Regex { raw, regex } => {
                if regex.is_match(name) {
                    saturating_strength(raw.len())
                } else {
                    NO_MATCH
                }
            }
            NameMatcher::AnyShallow => 1,
            NameMatcher::AnyDeep => 0,
        }
    }

    /// The name as written in the filter, used when the node is read as a view name.
    pub fn as_str(&self) -> &str {
        match self {
            NameMatcher::Exact(name) => name,
            NameMatcher::Wildcard { raw, .. } | NameMatcher::Regex { raw, .. } => raw,
            NameMatcher::AnyShallow => ANY_SHALLOW_ID,
            NameMatcher::AnyDeep => ANY_DEEP_ID,
        }
    }

    pub fn is_any_deep(&self) -> bool {
        matches!(self, NameMatcher::AnyDeep)
    }

    pub fn is_any_shallow(&self) -> bool {
        matches!(self, NameMatcher::AnyShallow)
    }
}

// Patterns are always weaker than exact names and stronger than `*`.
fn saturating_strength(len: usize) -> i32 {
    i32::try_from(len)
        .unwrap_or(i32::MAX - 3)
        .min(i32::MAX - 3)
        + 2
}

impl PartialEq for NameMatcher {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NameMatcher::Exact(a), NameMatcher::Exact(b)) => a == b,
            (NameMatcher::Wildcard { raw: a, .. }, NameMatcher::Wildcard { raw: b, .. }) => a == b,
            (NameMatcher::Regex { raw: a, .. }, NameMatcher::Regex { raw: b, .. }) => a == b,
            (NameMatcher::AnyShallow, NameMatcher::AnyShallow) => true,
            (NameMatcher::AnyDeep, NameMatcher::AnyDeep) => true,
            _ => false,
        }
    }
}

impl Eq for NameMatcher {}

impl fmt::Display for NameMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameMatcher::Regex { raw, .. } => write!(f, "~{raw}~"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_beats_everything() {
        let exact = NameMatcher::exact("name");
        assert_eq!(exact.strength("name"), i32::MAX);
        assert_eq!(exact.strength("names"), NO_MATCH);
    }

    #[test]
    fn test_wildcard_strength_counts_literals() {
        let glob = NameMatcher::wildcard("na*");
        assert_eq!(glob.strength("name"), 4);
        assert_eq!(glob.strength("other"), NO_MATCH);

        let longer = NameMatcher::wildcard("nam?");
        assert!(longer.strength("name") > glob.strength("name"));
    }

    #[test]
    fn test_wildcard_escapes_regex_metacharacters() {
        let glob = NameMatcher::wildcard("a.b*");
        assert!(glob.strength("a.bc") > 0);
        assert_eq!(glob.strength("axbc"), NO_MATCH);
    }

    #[test]
    fn test_wildcard_collapses_special_forms() {
        assert!(NameMatcher::wildcard("**").is_any_deep());
        assert!(NameMatcher::wildcard("*").is_any_shallow());
        assert_eq!(NameMatcher::wildcard("plain"), NameMatcher::exact("plain"));
    }

    #[test]
    fn test_any_ranks_below_patterns() {
        let glob = NameMatcher::wildcard("*e");
        assert!(glob.strength("name") > NameMatcher::AnyShallow.strength("name"));
        assert!(NameMatcher::AnyShallow.strength("name") > NameMatcher::AnyDeep.strength("name"));
        assert_eq!(NameMatcher::AnyDeep.strength("anything"), 0);
    }

    #[test]
    fn test_regex_is_anchored() {
        let re = NameMatcher::regex("id|key").unwrap();
        assert!(re.strength("id") > 0);
        assert_eq!(re.strength("identity"), NO_MATCH);
    }

    #[test]
    fn test_invalid_regex() {
        let err = NameMatcher::regex("(").unwrap_err();
        assert!(matches!(err, FilterParseError::InvalidRegex { .. }));
    }
}
