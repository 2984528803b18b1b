use super::error::FilterParseError;
use super::name::NameMatcher;
use super::node::FilterNode;
use std::sync::Arc;

/// Name of the synthetic root node returned by [`parse_filter`].
pub const ROOT_NAME: &str = "root";

/// Parse a filter expression into a tree rooted at a synthetic `root` node.
///
/// An empty (or blank) expression yields a root without children, which matches
/// nothing.
pub fn parse_filter(input: &str) -> Result<Arc<FilterNode>, FilterParseError> {
    let mut parser = Parser::new(input);
    let children = parser.parse_top_level()?;

    Ok(FilterNode::exact(ROOT_NAME)
        .with_squiggly(true)
        .with_children(children)
        .into_arc())
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn parse_top_level(&mut self) -> Result<Vec<Arc<FilterNode>>, FilterParseError> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Ok(Vec::new());
        }

        let items = self.parse_list()?;
        self.skip_whitespace();
        match self.peek() {
            None => Ok(items),
            Some(found) => Err(FilterParseError::UnexpectedChar {
                found,
                position: self.pos,
            }),
        }
    }

    /// `item (',' item)*`, stopping before a closing brace or the end of input.
    fn parse_list(&mut self) -> Result<Vec<Arc<FilterNode>>, FilterParseError> {
        let mut items = Vec::new();
        merge_sibling(&mut items, self.parse_item()?);

        loop {
            self.skip_whitespace();
            if self.peek() != Some(',') {
                return Ok(items);
            }
            self.pos += 1;
            merge_sibling(&mut items, self.parse_item()?);
        }
    }

    /// `['-'] segment ('.' segment)* ['{' list? '}']`
    fn parse_item(&mut self) -> Result<Arc<FilterNode>, FilterParseError> {
        self.skip_whitespace();

        let negated = if self.peek() == Some('-') {
            self.pos += 1;
            true
        } else {
            false
        };

        let mut segments = vec![self.parse_segment()?];
        while self.peek() == Some('.') {
            self.pos += 1;
            segments.push(self.parse_segment()?);
        }

        self.skip_whitespace();
        let mut leaf = FilterNode::new(segments.pop().unwrap_or(NameMatcher::AnyShallow));

        if self.peek() == Some('{') {
            let open = self.pos;
            self.pos += 1;
            self.skip_whitespace();

            leaf = leaf.with_squiggly(true);
            if self.peek() == Some('}') {
                leaf = leaf.with_empty_nested(true);
            } else {
                leaf = leaf.with_children(self.parse_list()?);
                self.skip_whitespace();
            }

            if self.peek() != Some('}') {
                return Err(FilterParseError::UnclosedBrace(open));
            }
            self.pos += 1;
        }

        // `a.b.c` nests: only the innermost node carries the negation and braces
        let mut node = leaf.negated(negated);
        while let Some(parent) = segments.pop() {
            node = FilterNode::new(parent)
                .with_squiggly(true)
                .with_child(node);
        }

        Ok(node.into_arc())
    }

    fn parse_segment(&mut self) -> Result<NameMatcher, FilterParseError> {
        match self.peek() {
            Some('~') => self.parse_regex(),
            Some(c) if is_name_char(c) => {
                let start = self.pos;
                while self.peek().is_some_and(|c| is_name_char(c) || c == '-') {
                    self.pos += 1;
                }
                let raw: String = self.chars[start..self.pos].iter().collect();
                Ok(NameMatcher::wildcard(&raw))
            }
            Some(c) if c == ',' || c == '}' || c == '{' || c == '.' => {
                Err(FilterParseError::EmptyName(self.pos))
            }
            Some(found) => Err(FilterParseError::UnexpectedChar {
                found,
                position: self.pos,
            }),
            None => Err(FilterParseError::UnexpectedEnd {
                expected: "a field name",
            }),
        }
    }

    fn parse_regex(&mut self) -> Result<NameMatcher, FilterParseError> {
        // skip the opening '~'
        self.pos += 1;
        let start = self.pos;

        while let Some(c) = self.peek() {
            if c == '~' {
                let pattern: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                if pattern.is_empty() {
                    return Err(FilterParseError::EmptyName(start));
                }
                return NameMatcher::regex(&pattern);
            }
            self.pos += 1;
        }

        Err(FilterParseError::UnexpectedEnd {
            expected: "closing '~'",
        })
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }
}

/// Fold `item` into a sibling selecting the same names, so `a.b,a.c` reads as
/// `a{b,c}`. Otherwise append it.
fn merge_sibling(siblings: &mut Vec<Arc<FilterNode>>, item: Arc<FilterNode>) {
    let Some(idx) = siblings
        .iter()
        .position(|sibling| sibling.is_mergeable_with(&item))
    else {
        siblings.push(item);
        return;
    };

    let mut children = siblings[idx].children().to_vec();
    for child in item.children() {
        merge_sibling(&mut children, Arc::clone(child));
    }
    siblings[idx] = FilterNode::clone(&siblings[idx])
        .with_children(children)
        .into_arc();
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '@' | '*' | '?')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child<'a>(node: &'a FilterNode, name: &str) -> &'a FilterNode {
        node.children()
            .iter()
            .find(|c| c.name() == name)
            .unwrap_or_else(|| panic!("no child named {name} in {node}"))
    }

    #[test]
    fn test_parse_simple_list() {
        let root = parse_filter("id, name,address").unwrap();
        assert_eq!(root.name(), ROOT_NAME);
        assert_eq!(root.children().len(), 3);
        assert!(!child(&root, "name").is_squiggly());
    }

    #[test]
    fn test_parse_nested() {
        let root = parse_filter("address{city,-zip}").unwrap();
        let address = child(&root, "address");
        assert!(address.is_squiggly());
        assert_eq!(address.children().len(), 2);
        assert!(child(address, "zip").is_negated());
        assert!(!child(address, "city").is_negated());
    }

    #[test]
    fn test_parse_empty_nested() {
        let root = parse_filter("address{}").unwrap();
        let address = child(&root, "address");
        assert!(address.is_empty_nested());
        assert!(address.children().is_empty());
    }

    #[test]
    fn test_parse_dotted_path_nests() {
        let root = parse_filter("-a.b.c").unwrap();
        let a = child(&root, "a");
        assert!(!a.is_negated());
        assert!(a.is_squiggly());
        let c = child(child(a, "b"), "c");
        assert!(c.is_negated());
    }

    #[test]
    fn test_same_named_siblings_merge() {
        for text in ["a.b,a.c", "a{b},a{c}", "a.b,a{c}"] {
            let root = parse_filter(text).unwrap();
            assert_eq!(root.children().len(), 1, "{text}");
            let a = child(&root, "a");
            assert_eq!(a.children().len(), 2, "{text}");
            child(a, "b");
            child(a, "c");
        }

        let root = parse_filter("a.b.c,a.b.d,-a.e").unwrap();
        let b = child(child(&root, "a"), "b");
        assert_eq!(b.children().len(), 2);
        assert!(child(child(&root, "a"), "e").is_negated());
    }

    #[test]
    fn test_differently_shaped_siblings_stay_apart() {
        let root = parse_filter("a,-a,a{b},a{}").unwrap();
        assert_eq!(root.children().len(), 4);

        let root = parse_filter("id,id").unwrap();
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_parse_wildcards() {
        let root = parse_filter("**,*,na*,~i[dn]~").unwrap();
        let kids = root.children();
        assert!(kids[0].is_any_deep());
        assert!(kids[1].is_any_shallow());
        assert!(kids[2].match_strength("name") > 0);
        assert!(kids[3].match_strength("in") > 0);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_filter("  ").unwrap().children().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_filter("a{b"),
            Err(FilterParseError::UnclosedBrace(1))
        );
        assert_eq!(parse_filter("a,,b"), Err(FilterParseError::EmptyName(2)));
        assert!(matches!(
            parse_filter("a}"),
            Err(FilterParseError::UnexpectedChar { found: '}', .. })
        ));
        assert!(matches!(
            parse_filter("~abc"),
            Err(FilterParseError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_filter("a,"),
            Err(FilterParseError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn test_display_round_trip() {
        let text = "id,address{city,-zip},tags{}";
        let root = parse_filter(text).unwrap();
        let rendered: Vec<String> = root.children().iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered.join(","), text);
    }
}
