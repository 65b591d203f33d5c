use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Path,
    Constant,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKind::Path => write!(f, "path"),
            PathKind::Constant => write!(f, "constant"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPathSpec {
    #[error("unknown path kind {0:?}, expected \"path\" or \"constant\"")]
    UnknownKind(String),
    #[error("a path rule needs a string value, got {0}")]
    NonStringPath(&'static str),
}

impl FromStr for PathKind {
    type Err = InvalidPathSpec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(PathKind::Path),
            "constant" => Ok(PathKind::Constant),
            other => Err(InvalidPathSpec::UnknownKind(other.to_string())),
        }
    }
}

/// Extraction rule for a single canonical field.
///
/// Stored as `{"type": "path", "value": "coords.lng"}` or
/// `{"type": "constant", "value": ["sensor"]}`; any other `type` is rejected when the
/// mapping is deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PathSpec {
    /// Navigate each source element. An empty path means "not configured".
    Path(String),
    /// Use this value verbatim for every element.
    Constant(Value),
}

impl PathSpec {
    /// Build a rule from its stored parts, validating both.
    pub fn new(kind: &str, value: Value) -> Result<Self, InvalidPathSpec> {
        match kind.parse::<PathKind>()? {
            PathKind::Path => match value {
                Value::String(path) => Ok(PathSpec::Path(path)),
                other => Err(InvalidPathSpec::NonStringPath(crate::json_path::kind_of(
                    Some(&other),
                ))),
            },
            PathKind::Constant => Ok(PathSpec::Constant(value)),
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        PathSpec::Path(path.into())
    }

    pub fn constant(value: Value) -> Self {
        PathSpec::Constant(value)
    }

    pub fn kind(&self) -> PathKind {
        match self {
            PathSpec::Path(_) => PathKind::Path,
            PathSpec::Constant(_) => PathKind::Constant,
        }
    }
}
