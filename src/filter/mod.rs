//! Filter expression model and parsing
//!
//! A filter selects which fields of an object graph are kept when it is written
//! out. The expression is parsed once into an immutable tree of [`FilterNode`]s that
//! the [`crate::matcher::NodeMatcher`] walks for every visited path.
//!
//! # Syntax
//!
//! ```text
//! name                 Include the field `name`
//! -name                Exclude the field `name`
//! a,b,c                Several fields at the same level
//! a{b,c}               Fields `b` and `c` nested under `a`
//! a.b.c                Shorthand for a{b{c}}
//! a{}                  Field `a` with no nested fields at all
//! na*e / addr?ss       Glob patterns
//! ~i[dn]~              Regular expression
//! *                    Any field at this level
//! **                   Everything from this level down
//! ```
//!
//! A bare name that matches no field is read as a view name (`base`, `full`,
//! or any view known to the type introspector).
//!
//! # Examples
//!
//! ```text
//! id,name                      Two top-level fields
//! **,-password                 Everything except `password`
//! user{id,address{city}}       Nested selection
//! full                         Every property of the root type
//! ```

pub mod error;
pub mod name;
pub mod node;
pub mod parser;

pub use error::FilterParseError;
pub use name::{ANY_DEEP_ID, ANY_SHALLOW_ID, NO_MATCH, NameMatcher};
pub use node::FilterNode;
pub use parser::{ROOT_NAME, parse_filter};
