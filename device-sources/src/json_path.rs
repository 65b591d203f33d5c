//! Dotted/bracketed path navigation over JSON values.
//!
//! Paths follow the conventions of lodash's `get`, which is what source mappings were
//! historically written against:
//!
//! - `a.b.c` walks object keys
//! - `a[0].b` and `a.0.b` both index into arrays
//! - `a["b.c"]` and `a['b']` allow keys containing separators
//! - when the current object has the *whole* path as a literal key, that key wins
//!
//! Only objects and arrays are descended into. Strings are not indexed and there is no
//! `length` pseudo-key, so `name[0]` and `tags.length` resolve to nothing. Unquoted bracket
//! contents are used verbatim: `list[ 1 ]` looks up the key `" 1 "`.
//!
//! Navigation is total: anything that cannot be followed yields `None`.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    fn from_unquoted(raw: &str) -> Self {
        match raw.parse::<usize>() {
            // "01" is a key, not index 1
            Ok(index) if index.to_string() == raw => PathSegment::Index(index),
            _ => PathSegment::Key(raw.to_string()),
        }
    }

    fn step<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match (self, value) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        }
    }
}

/// Split a path string into segments.
///
/// Never fails: malformed brackets are kept as literal key text.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    if path.is_empty() {
        return segments;
    }

    let chars: Vec<char> = path.chars().collect();
    let mut current = String::new();
    // Whether the text since the last separator belongs to a segment that must be emitted,
    // even if empty ("a..b" has an empty middle key, as in lodash).
    let mut pending = true;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if pending {
                    segments.push(PathSegment::from_unquoted(&current));
                }
                current.clear();
                pending = true;
                i += 1;
            }
            '[' => match parse_bracket(&chars, i) {
                Some((segment, next)) => {
                    if !current.is_empty() {
                        segments.push(PathSegment::from_unquoted(&current));
                    }
                    current.clear();
                    segments.push(segment);
                    pending = false;
                    i = next;
                }
                None => {
                    current.push('[');
                    pending = true;
                    i += 1;
                }
            },
            c => {
                current.push(c);
                pending = true;
                i += 1;
            }
        }
    }

    if pending {
        segments.push(PathSegment::from_unquoted(&current));
    }

    segments
}

/// Parse a `[...]` group starting at `start`. Returns the segment and the index after `]`.
fn parse_bracket(chars: &[char], start: usize) -> Option<(PathSegment, usize)> {
    let mut i = start + 1;
    let quote = match chars.get(i) {
        Some(&q) if q == '"' || q == '\'' => Some(q),
        _ => None,
    };

    match quote {
        Some(q) => {
            i += 1;
            let mut key = String::new();
            while i < chars.len() {
                match chars[i] {
                    '\\' if i + 1 < chars.len() => {
                        key.push(chars[i + 1]);
                        i += 2;
                    }
                    c if c == q => {
                        return match chars.get(i + 1) {
                            Some(']') => Some((PathSegment::Key(key), i + 2)),
                            _ => None,
                        };
                    }
                    c => {
                        key.push(c);
                        i += 1;
                    }
                }
            }
            None
        }
        None => {
            let close = chars[i..].iter().position(|&c| c == ']')? + i;
            let inner: String = chars[i..close].iter().collect();
            Some((PathSegment::from_unquoted(&inner), close + 1))
        }
    }
}

/// Resolve `path` against `value`.
///
/// An empty path resolves to nothing. A literal key equal to the full path takes precedence
/// over splitting it.
pub fn navigate<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    if let Value::Object(map) = value {
        if let Some(direct) = map.get(path) {
            return Some(direct);
        }
    }

    parse_path(path)
        .iter()
        .try_fold(value, |current, segment| segment.step(current))
}

/// Human readable JSON kind, for error messages
pub fn kind_of(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}
