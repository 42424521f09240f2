//! Dotted path lookup into JSON values (`"a.b"`, `"items[0].name"`, `"items.0"`).

use std::fmt;

use serde_json::Value;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// A parsed lookup path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePath(Vec<Segment>);

impl ValuePath {
    /// Parse a path. Empty segments (`"a..b"`, `"a."`, `""`) are kept as
    /// empty keys and never resolve; bracketed non-numeric content is treated
    /// as a key (`"a[b]"` == `"a.b"`).
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        for part in path.split('.') {
            if part.is_empty() {
                segments.push(Segment::Key(String::new()));
                continue;
            }
            let mut rest = part;
            while !rest.is_empty() {
                if let Some(inner) = rest.strip_prefix('[') {
                    let end = inner.find(']').unwrap_or(inner.len());
                    let token = &inner[..end];
                    if !token.is_empty() {
                        segments.push(match token.parse::<usize>() {
                            Ok(index) => Segment::Index(index),
                            Err(_) => Segment::Key(
                                token.trim_matches(|c: char| c == '"' || c == '\'').to_string(),
                            ),
                        });
                    }
                    rest = inner.get(end + 1..).unwrap_or("");
                } else {
                    let end = rest.find('[').unwrap_or(rest.len());
                    segments.push(Segment::Key(rest[..end].to_string()));
                    rest = &rest[end..];
                }
            }
        }
        Self(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Walk `root` along the path. `None` as soon as a step is missing, and
    /// for a path with no segments.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        if self.0.is_empty() {
            return None;
        }
        self.0.iter().try_fold(root, |current, segment| match segment {
            Segment::Key(key) => match current {
                Value::Object(map) => map.get(key),
                Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            },
            Segment::Index(index) => match current {
                Value::Array(items) => items.get(*index),
                Value::Object(map) => map.get(&index.to_string()),
                _ => None,
            },
        })
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Convenience: parse and resolve in one go.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    ValuePath::parse(path).resolve(root)
}
