//! Include-path compilation for the `include` query parameter.
//!
//! `"author,comments.author"` compiles to `["author", {"comments": "author"}]`,
//! the nested form eager-loading and serialisation layers expect.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One relationship path: a bare name, or a name with a nested path below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IncludePath {
    Name(String),
    Nested(String, Box<IncludePath>),
}

impl IncludePath {
    /// Parse a dotted path, folding `a.b.c` into `a -> b -> c`.
    ///
    /// Empty segments are ignored. Returns `None` if nothing is left.
    pub fn parse(dotted: &str) -> Option<Self> {
        let mut segments = dotted.split('.').filter(|s| !s.is_empty()).rev();
        let leaf = IncludePath::Name(segments.next()?.to_string());
        Some(segments.fold(leaf, |inner, name| {
            IncludePath::Nested(name.to_string(), Box::new(inner))
        }))
    }

    /// The first relationship name on the path.
    pub fn name(&self) -> &str {
        match self {
            IncludePath::Name(name) | IncludePath::Nested(name, _) => name,
        }
    }
}

impl fmt::Display for IncludePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncludePath::Name(name) => f.write_str(name),
            IncludePath::Nested(name, inner) => write!(f, "{}.{}", name, inner),
        }
    }
}

impl Serialize for IncludePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IncludePath::Name(name) => serializer.serialize_str(name),
            IncludePath::Nested(name, inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(name, inner)?;
                map.end()
            }
        }
    }
}

/// Compile a comma-separated list of dotted relationship paths.
///
/// Whitespace and empty entries are ignored. Repeats are dropped, as is any
/// path that another path in the list extends (`foo` given `foo.bar`).
/// Results are ordered by where their first segment first appears.
pub fn compile_includes(raw: &str) -> Vec<IncludePath> {
    let stripped: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let paths: Vec<&str> = stripped.split(',').filter(|p| !p.is_empty()).collect();

    let mut retained: Vec<&str> = Vec::new();
    for path in &paths {
        if retained.contains(path) || paths.iter().any(|other| extends(other, path)) {
            continue;
        }
        retained.push(*path);
    }

    let first_seen = |name: &str| {
        paths
            .iter()
            .filter_map(|p| IncludePath::parse(p))
            .position(|p| p.name() == name)
            .unwrap_or(usize::MAX)
    };
    let mut compiled: Vec<IncludePath> =
        retained.into_iter().filter_map(IncludePath::parse).collect();
    compiled.sort_by_key(|path| first_seen(path.name()));
    compiled
}

/// True if `longer` continues `shorter` by at least one more segment.
fn extends(longer: &str, shorter: &str) -> bool {
    longer.len() > shorter.len()
        && longer.starts_with(shorter)
        && longer.as_bytes()[shorter.len()] == b'.'
}
